// ============================================================================
// COLLECTION STATE - Copia local de una colección remota
// ============================================================================
// La colección se reemplaza entera en cada fetch aplicado. Un fetch solo se
// aplica si su número de secuencia sigue siendo el último emitido.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::AppError;
use crate::models::{ItemId, Resource};

/// Estado de una colección
#[derive(Clone)]
pub struct CollectionState<R: Resource> {
    items: Rc<RefCell<Vec<R>>>,
    error: Rc<RefCell<Option<AppError>>>,
    loading: Rc<Cell<bool>>,
    suspended: Rc<Cell<bool>>,
    sequence: Rc<Cell<u64>>,
    selection: Rc<RefCell<Option<ItemId>>>,
    pending_delete: Rc<RefCell<Option<ItemId>>>,
    deleting: Rc<Cell<bool>>,
    delete_error: Rc<RefCell<Option<AppError>>>,
}

impl<R: Resource> CollectionState<R> {
    pub fn new() -> Self {
        Self {
            items: Rc::new(RefCell::new(Vec::new())),
            error: Rc::new(RefCell::new(None)),
            loading: Rc::new(Cell::new(false)),
            suspended: Rc::new(Cell::new(false)),
            sequence: Rc::new(Cell::new(0)),
            selection: Rc::new(RefCell::new(None)),
            pending_delete: Rc::new(RefCell::new(None)),
            deleting: Rc::new(Cell::new(false)),
            delete_error: Rc::new(RefCell::new(None)),
        }
    }

    /// Emitir un nuevo número de secuencia (monótono)
    pub fn next_sequence(&self) -> u64 {
        let next = self.sequence.get() + 1;
        self.sequence.set(next);
        self.loading.set(true);
        next
    }

    pub fn is_latest(&self, sequence: u64) -> bool {
        self.sequence.get() == sequence
    }

    /// Reemplazar la colección. Devuelve `false` si el fetch quedó obsoleto.
    pub fn apply(&self, sequence: u64, items: Vec<R>) -> bool {
        if !self.is_latest(sequence) {
            return false;
        }
        *self.items.borrow_mut() = items;
        *self.error.borrow_mut() = None;
        self.loading.set(false);
        self.suspended.set(false);
        true
    }

    /// Registrar un fetch fallido: los ítems anteriores se conservan
    /// y las mutaciones quedan suspendidas hasta el próximo fetch correcto.
    pub fn fail(&self, sequence: u64, error: AppError) -> bool {
        if !self.is_latest(sequence) {
            return false;
        }
        *self.error.borrow_mut() = Some(error);
        self.loading.set(false);
        self.suspended.set(true);
        true
    }

    pub fn items(&self) -> Vec<R> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn with_items<T>(&self, f: impl FnOnce(&[R]) -> T) -> T {
        f(&self.items.borrow())
    }

    pub fn find(&self, id: &ItemId) -> Option<R> {
        self.items.borrow().iter().find(|item| item.id() == id).cloned()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.borrow().iter().any(|item| item.id() == id)
    }

    pub fn error(&self) -> Option<AppError> {
        self.error.borrow().clone()
    }

    pub fn set_error(&self, error: Option<AppError>) {
        *self.error.borrow_mut() = error;
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.get()
    }

    pub fn selection(&self) -> Option<ItemId> {
        self.selection.borrow().clone()
    }

    pub fn select(&self, id: Option<ItemId>) {
        *self.selection.borrow_mut() = id;
    }

    /// Quitar la selección si apunta a `id`
    pub fn forget(&self, id: &ItemId) {
        let mut selection = self.selection.borrow_mut();
        if selection.as_ref() == Some(id) {
            *selection = None;
        }
        let mut pending = self.pending_delete.borrow_mut();
        if pending.as_ref() == Some(id) {
            *pending = None;
        }
    }

    pub fn pending_delete(&self) -> Option<ItemId> {
        self.pending_delete.borrow().clone()
    }

    /// Abrir o cerrar la confirmación; el error del intento anterior se descarta
    pub fn set_pending_delete(&self, id: Option<ItemId>) {
        *self.pending_delete.borrow_mut() = id;
        *self.delete_error.borrow_mut() = None;
    }

    /// Entrar en borrado. Independiente del guardado del formulario.
    pub fn begin_delete(&self) -> Result<(), AppError> {
        if self.deleting.get() {
            return Err(AppError::SaveInProgress);
        }
        self.deleting.set(true);
        *self.delete_error.borrow_mut() = None;
        Ok(())
    }

    pub fn finish_delete(&self, error: Option<AppError>) {
        self.deleting.set(false);
        *self.delete_error.borrow_mut() = error;
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting.get()
    }

    pub fn delete_error(&self) -> Option<AppError> {
        self.delete_error.borrow().clone()
    }
}

impl<R: Resource> Default for CollectionState<R> {
    fn default() -> Self {
        Self::new()
    }
}
