// ============================================================================
// STATE MODULE - State Management con Rc<RefCell> + notificaciones
// ============================================================================

pub mod reactivity;
pub mod session_state;
pub mod collection_state;
pub mod form_state;

pub use reactivity::{Listeners, Subscription};
pub use session_state::{AuthStatus, SessionManager, TokenSource};
pub use collection_state::CollectionState;
pub use form_state::{Draft, EditFormState, FormMode, ModalState};
