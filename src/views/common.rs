// ============================================================================
// COMMON VIEWS - Piezas compartidas (carga, navegación, errores, modal, mapa)
// ============================================================================
// Las vistas son funciones puras que devuelven HTML. Los eventos se enlazan por
// delegación usando `data-action` / `data-field` en el shell de la app.
// ============================================================================

use crate::error::AppError;
use crate::models::Session;
use crate::router::{nav_links, Route};
use crate::state::form_state::ModalState;
use crate::utils::format::escape_html;
use crate::viewmodels::warehouse_viewmodel::MapView;

/// Indicador neutro mientras se resuelve la sesión
pub fn render_loading(message: &str) -> String {
    format!(
        r#"<div class="loading-container"><div class="spinner"></div><p>{}</p></div>"#,
        escape_html(message)
    )
}

pub fn render_nav(session: &Session, current: &Route) -> String {
    let links: String = nav_links(session.role)
        .into_iter()
        .map(|link| {
            let active = if &link.route == current { " active" } else { "" };
            format!(
                r##"<li class="nav-item"><a class="nav-link{}" href="#{}">{}</a></li>"##,
                active,
                link.route.path(),
                link.label
            )
        })
        .collect();
    format!(
        r#"<nav class="navbar"><ul class="navbar-nav">{}</ul><span class="navbar-text">{}</span><button class="btn-logout" data-action="logout">Cerrar sesión</button></nav>"#,
        links,
        escape_html(&session.label())
    )
}

/// Error en línea junto al formulario/lista, con reintento si aplica
pub fn render_error(error: &AppError) -> String {
    let retry = if error.is_retryable() {
        r#"<button class="btn-retry" data-action="retry">Reintentar</button>"#
    } else {
        ""
    };
    format!(
        r#"<div class="error-message" role="alert"><span>{}</span>{}</div>"#,
        escape_html(&error.to_string()),
        retry
    )
}

pub fn render_optional_error(error: Option<&AppError>) -> String {
    error.map(render_error).unwrap_or_default()
}

/// Modal de confirmación. En `Saving` el botón de confirmar queda deshabilitado.
pub fn render_confirm_modal(title: &str, content: &str, confirm_label: &str, state: ModalState) -> String {
    if state == ModalState::Closed {
        return String::new();
    }
    let saving = state == ModalState::Saving;
    format!(
        r#"<div class="modal-backdrop"><div class="modal"><h3>{}</h3><p>{}</p><div class="modal-actions"><button class="btn-cancel" data-action="cancel"{}>Cancelar</button><button class="btn-confirm" data-action="confirm"{}>{}</button></div></div></div>"#,
        escape_html(title),
        escape_html(content),
        if saving { " disabled" } else { "" },
        if saving { " disabled" } else { "" },
        if saving { "Guardando..." } else { confirm_label },
    )
}

pub fn render_map(view: &MapView) -> String {
    match view {
        MapView::Available { api_key, map_id, latitude, longitude, zoom } => format!(
            r#"<div class="map-container" data-map-key="{}" data-map-id="{}" data-lat="{}" data-lng="{}" data-zoom="{}"></div>"#,
            escape_html(api_key),
            escape_html(map_id),
            latitude,
            longitude,
            zoom
        ),
        MapView::Unavailable => concat!(
            r#"<div class="map-container map-unavailable">"#,
            "<p>No se puede cargar el mapa: Falta la clave API de Google Maps</p>",
            "<p>Configura GOOGLE_MAPS_API_KEY en el archivo .env</p>",
            "</div>"
        )
        .to_string(),
    }
}

/// Portada: accesos directos según el rol
pub fn render_home(session: &Session) -> String {
    let cards: String = nav_links(session.role)
        .into_iter()
        .filter(|link| link.route != Route::Home)
        .map(|link| {
            format!(
                r##"<a class="card" href="#{}"><h3>{}</h3></a>"##,
                link.route.path(),
                link.label
            )
        })
        .collect();
    format!(
        r#"<section class="home"><h2>Bienvenido, {}</h2><div class="cards">{}</div></section>"#,
        escape_html(session.display_name.as_deref().unwrap_or(&session.email)),
        cards
    )
}

pub fn render_not_found() -> String {
    r##"<div class="not-found"><h2>Página no encontrada</h2><a href="#/">Volver al inicio</a></div>"##.to_string()
}
