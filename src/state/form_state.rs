// ============================================================================
// FORM STATE - Formulario de edición y estado del modal
// ============================================================================

use crate::error::AppError;
use crate::models::{FormFields, ItemId};

/// Estado del modal asociado al formulario
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open,
    /// Acción asíncrona en curso: el botón de confirmar queda deshabilitado
    Saving,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormMode {
    Create,
    Edit(ItemId),
}

/// Borrador de un ítem tal como lo escribe el usuario
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Draft {
    pub id: String,
    pub fields: FormFields,
    pub auto_generate_id: bool,
}

impl Draft {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string(), ..Self::default() }
    }

    /// Borrador con id autogenerado
    pub fn auto() -> Self {
        Self { auto_generate_id: true, ..Self::default() }
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}

/// Formulario ligado a un ítem en creación o edición
#[derive(Clone, Debug, Default)]
pub struct EditFormState {
    mode: Option<FormMode>,
    draft: Draft,
    saving: bool,
    error: Option<AppError>,
}

impl EditFormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_create(&mut self, suggested_id: &ItemId) {
        self.mode = Some(FormMode::Create);
        self.draft = Draft {
            id: suggested_id.to_string(),
            fields: FormFields::new(),
            auto_generate_id: true,
        };
        self.error = None;
    }

    pub fn open_edit(&mut self, id: ItemId, fields: FormFields) {
        self.draft = Draft { id: id.to_string(), fields, auto_generate_id: false };
        self.mode = Some(FormMode::Edit(id));
        self.error = None;
    }

    /// Cerrar y limpiar el formulario
    pub fn close(&mut self) {
        self.mode = None;
        self.draft = Draft::default();
        self.error = None;
    }

    pub fn mode(&self) -> Option<&FormMode> {
        self.mode.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.mode.is_some()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        self.draft.fields.insert(name.to_string(), value.to_string());
    }

    pub fn set_id(&mut self, id: &str) {
        self.draft.id = id.to_string();
    }

    pub fn set_auto_generate(&mut self, enabled: bool) {
        self.draft.auto_generate_id = enabled;
    }

    pub fn modal(&self) -> ModalState {
        if self.saving {
            ModalState::Saving
        } else if self.mode.is_some() {
            ModalState::Open
        } else {
            ModalState::Closed
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Entrar en `Saving`. Una segunda confirmación se rechaza.
    pub fn begin_save(&mut self) -> Result<(), AppError> {
        if self.saving {
            return Err(AppError::SaveInProgress);
        }
        self.saving = true;
        Ok(())
    }

    pub fn finish_save(&mut self) {
        self.saving = false;
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: Option<AppError>) {
        self.error = error;
    }
}
