// ============================================================================
// EVENT HANDLING - Listeners delegados con limpieza
// ============================================================================
// Cada listener queda atado a un `EventHandle`: al soltarlo se desregistra y
// el closure se libera. Nada de `closure.forget()` para listeners globales.
// ============================================================================

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget};

pub struct EventHandle {
    target: EventTarget,
    event_type: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Drop for EventHandle {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event_type, self.closure.as_ref().unchecked_ref());
    }
}

/// Registrar `handler` para `event_type` sobre `target`
pub fn listen<F>(target: &EventTarget, event_type: &'static str, handler: F) -> Result<EventHandle, JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())?;
    Ok(EventHandle {
        target: target.clone(),
        event_type,
        closure,
    })
}
