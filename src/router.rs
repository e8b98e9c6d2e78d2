// ============================================================================
// ROUTER - Rutas por hash + guardia de rutas protegidas
// ============================================================================
// Mientras la sesión se resuelve (LOADING) no se renderiza contenido protegido
// ni se redirige. Con ANONYMOUS se redirige a login una sola vez por intento.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::models::{ItemId, Role};
use crate::state::session_state::AuthStatus;
use crate::utils::encoding::{encode_path_segment, percent_decode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    Management,
    Products,
    Store(ItemId),
    VirtualWarehouse,
    Settings,
    NotFound,
}

impl Route {
    /// Parsear `#/ruta`, `/ruta` o `ruta` (se ignora la query)
    pub fn parse(raw: &str) -> Route {
        let raw = raw.trim().trim_start_matches('#');
        let path = raw.split('?').next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["management"] => Route::Management,
            ["products"] => Route::Products,
            ["almacenes", id] if !id.trim().is_empty() => Route::Store(ItemId::new(percent_decode(id))),
            ["almacen-virtual"] => Route::VirtualWarehouse,
            ["settings"] => Route::Settings,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Home => "/".to_string(),
            Route::Management => "/management".to_string(),
            Route::Products => "/products".to_string(),
            Route::Store(id) => format!("/almacenes/{}", encode_path_segment(id.as_str())),
            Route::VirtualWarehouse => "/almacen-virtual".to_string(),
            Route::Settings => "/settings".to_string(),
            Route::NotFound => "/not-found".to_string(),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login | Route::NotFound)
    }

    pub fn title(&self) -> String {
        match self {
            Route::Login => "Iniciar sesión".to_string(),
            Route::Home => "Inicio".to_string(),
            Route::Management => "Almacenes".to_string(),
            Route::Products => "Productos".to_string(),
            Route::Store(id) => format!("Almacén {}", id),
            Route::VirtualWarehouse => "Almacén virtual".to_string(),
            Route::Settings => "Configuración".to_string(),
            Route::NotFound => "Página no encontrada".to_string(),
        }
    }
}

/// Cambio de ruta (hash del navegador en producción)
pub trait Navigator {
    fn navigate(&self, route: &Route);
}

/// Navegación mediante `window.location.hash`
pub struct HashNavigator;

impl HashNavigator {
    pub fn current() -> Route {
        web_sys::window()
            .and_then(|w| w.location().hash().ok())
            .map(|hash| Route::parse(&hash))
            .unwrap_or(Route::Home)
    }
}

impl Navigator for HashNavigator {
    fn navigate(&self, route: &Route) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Err(e) = window.location().set_hash(&route.path()) {
            log::error!("❌ [ROUTER] No se pudo navegar a {}: {:?}", route.path(), e);
        }
    }
}

/// Qué hacer con la ruta pedida
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Sesión sin resolver: indicador neutro
    Waiting,
    Redirect(Route),
    Render(Route),
}

pub struct RouteGuard {
    navigator: Rc<dyn Navigator>,
    redirected_to: RefCell<Option<Route>>,
}

impl RouteGuard {
    pub fn new(navigator: Rc<dyn Navigator>) -> Self {
        Self { navigator, redirected_to: RefCell::new(None) }
    }

    /// Evaluar la ruta para el estado de sesión actual. Llamar en cada render:
    /// la navegación se dispara una sola vez hasta que alguna ruta se renderice.
    pub fn evaluate(&self, status: AuthStatus, route: &Route) -> GuardDecision {
        let target = match (status, route) {
            (AuthStatus::Uninitialized | AuthStatus::Loading, r) if r.is_protected() => {
                return GuardDecision::Waiting;
            }
            (AuthStatus::Anonymous, r) if r.is_protected() => Some(Route::Login),
            (AuthStatus::Authenticated, Route::Login) => Some(Route::Home),
            _ => None,
        };

        match target {
            Some(target) => {
                let mut latch = self.redirected_to.borrow_mut();
                if latch.as_ref() != Some(&target) {
                    log::info!("↪️ [ROUTER] {} → {}", route.path(), target.path());
                    *latch = Some(target.clone());
                    drop(latch);
                    self.navigator.navigate(&target);
                }
                GuardDecision::Redirect(target)
            }
            None => {
                *self.redirected_to.borrow_mut() = None;
                GuardDecision::Render(route.clone())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavLink {
    pub route: Route,
    pub label: &'static str,
}

/// Enlaces de la barra de navegación según el rol (filtro de presentación)
pub fn nav_links(role: Role) -> Vec<NavLink> {
    let mut links = vec![NavLink { route: Route::Home, label: "Inicio" }];
    if role.can_manage_inventory() {
        links.push(NavLink { route: Route::Management, label: "Almacenes" });
        links.push(NavLink { route: Route::Products, label: "Productos" });
        links.push(NavLink { route: Route::VirtualWarehouse, label: "Almacén virtual" });
    }
    if role.can_manage_settings() {
        links.push(NavLink { route: Route::Settings, label: "Configuración" });
    }
    links
}
