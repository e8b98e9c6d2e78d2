// ============================================================================
// ALMACÉN ADMIN - FRONTEND MVVM (RUST + WASM)
// ============================================================================
// Arquitectura:
// - Services: SOLO comunicación (HTTP, identidad, storage)
// - State: Sesión y estado compartido con Rc<RefCell>
// - ViewModels: Sincronización de colecciones y lógica de página
// - Views: Funciones puras que devuelven HTML
// - Router: Rutas + guardia de autenticación
// ============================================================================

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod viewmodels;
pub mod router;
pub mod views;
pub mod utils;
mod dom;
mod app;

#[cfg(test)]
mod testutil;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::app::App;
use crate::config::CONFIG;

// Instancia única de la app mientras la página viva
thread_local! {
    static APP: RefCell<Option<Rc<App>>> = RefCell::new(None);
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Inicializar panic hook para mejor debugging
    console_error_panic_hook::set_once();

    let level = if CONFIG.is_logging_enabled() {
        log::Level::Debug
    } else {
        log::Level::Warn
    };
    wasm_logger::init(wasm_logger::Config::new(level));
    log::info!("🚀 Almacén Admin - Rust + WASM");

    let app = App::start()?;
    APP.with(|cell| {
        *cell.borrow_mut() = Some(app);
    });
    Ok(())
}

/// Re-render completo (llamable desde JavaScript)
#[wasm_bindgen]
pub fn rerender_app() {
    APP.with(|cell| {
        if let Some(app) = cell.borrow().as_ref() {
            app.render();
        } else {
            log::warn!("⚠️ [RERENDER] App no está inicializada");
        }
    });
}
