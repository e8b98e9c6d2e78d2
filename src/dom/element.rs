// ============================================================================
// ELEMENT HELPERS - Funciones básicas para manipular DOM
// ============================================================================

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, EventTarget, HtmlElement, HtmlInputElement, Window};

/// Obtener window global
pub fn window() -> Option<Window> {
    web_sys::window()
}

/// Obtener document
pub fn document() -> Option<Document> {
    window()?.document()
}

/// Obtener elemento por ID
pub fn get_element_by_id(id: &str) -> Option<Element> {
    document()?.get_element_by_id(id)
}

/// Establecer inner HTML
pub fn set_inner_html(element: &Element, html: &str) {
    element.set_inner_html(html);
}

/// Valor actual de un `<input>` por ID
pub fn input_value(id: &str) -> Option<String> {
    get_element_by_id(id)?
        .dyn_into::<HtmlInputElement>()
        .ok()
        .map(|input| input.value())
}

/// Elemento más cercano (el propio target incluido) que cumple el selector
pub fn closest(target: Option<EventTarget>, selector: &str) -> Option<Element> {
    target?.dyn_into::<Element>().ok()?.closest(selector).ok()?
}

/// ID del elemento con foco, para restaurarlo tras un re-render
pub fn focused_id() -> Option<String> {
    let active = document()?.active_element()?;
    let id = active.id();
    (!id.is_empty()).then_some(id)
}

/// Devolver el foco al elemento (recreado) con ese ID, cursor al final
pub fn restore_focus(id: &str) {
    let Some(element) = get_element_by_id(id) else {
        return;
    };
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        let _ = html.focus();
    }
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        // type=number/email no admiten selección: se ignora el error
        let end = input.value().chars().count() as u32;
        let _ = input.set_selection_range(end, end);
    }
}
