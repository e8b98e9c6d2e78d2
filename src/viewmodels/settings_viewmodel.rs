// ============================================================================
// SETTINGS VIEWMODEL - Configuración maestra (porcentaje y distancia mínima)
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::AppError;
use crate::models::{ConfigField, MasterConfig};
use crate::services::api_client::ApiClient;
use crate::services::settings_service::SettingsService;
use crate::state::reactivity::{Listeners, Subscription};
use crate::state::session_state::{checked, TokenSource};

struct SettingsState {
    saved: RefCell<Option<MasterConfig>>,
    draft: RefCell<MasterConfig>,
    error: RefCell<Option<AppError>>,
    loading: Cell<bool>,
    saving: Cell<bool>,
    listeners: Listeners<()>,
}

#[derive(Clone)]
pub struct SettingsViewModel {
    service: SettingsService,
    tokens: Rc<dyn TokenSource>,
    state: Rc<SettingsState>,
}

impl SettingsViewModel {
    pub fn new(api: ApiClient, tokens: Rc<dyn TokenSource>) -> Self {
        Self {
            service: SettingsService::new(api),
            tokens,
            state: Rc::new(SettingsState {
                saved: RefCell::new(None),
                draft: RefCell::new(MasterConfig::default()),
                error: RefCell::new(None),
                loading: Cell::new(false),
                saving: Cell::new(false),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&()) + 'static,
    {
        self.state.listeners.subscribe(callback)
    }

    fn notify(&self) {
        self.state.listeners.emit(&());
    }

    /// Valores confirmados por el backend
    pub fn saved(&self) -> Option<MasterConfig> {
        self.state.saved.borrow().clone()
    }

    /// Valores en edición
    pub fn draft(&self) -> MasterConfig {
        self.state.draft.borrow().clone()
    }

    pub fn error(&self) -> Option<AppError> {
        self.state.error.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading.get()
    }

    pub fn is_saving(&self) -> bool {
        self.state.saving.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.saved.borrow().as_ref() != Some(&*self.state.draft.borrow())
    }

    /// GET de la configuración. Un fallo conserva los valores previos y
    /// deja un error reintentable.
    pub async fn load(&self) -> Result<MasterConfig, AppError> {
        let token = self.tokens.require_token()?;
        self.state.loading.set(true);
        self.notify();

        let result = checked(self.tokens.as_ref(), &token, self.service.fetch(&token).await);
        self.state.loading.set(false);
        match &result {
            Ok(config) => {
                log::info!(
                    "⚙️ [SETTINGS] Configuración cargada: percentage={}, minDistance={}",
                    config.percentage,
                    config.min_distance
                );
                *self.state.saved.borrow_mut() = Some(config.clone());
                *self.state.draft.borrow_mut() = config.clone();
                *self.state.error.borrow_mut() = None;
            }
            Err(e) => {
                log::error!("❌ [SETTINGS] Error cargando configuración: {}", e);
                *self.state.error.borrow_mut() = Some(e.clone());
            }
        }
        self.notify();
        result
    }

    pub fn set_field(&self, field: ConfigField, value: &str) {
        {
            let mut draft = self.state.draft.borrow_mut();
            match field {
                ConfigField::Percentage => draft.percentage = value.trim().to_string(),
                ConfigField::MinDistance => draft.min_distance = value.trim().to_string(),
            }
        }
        self.notify();
    }

    fn validate(draft: &MasterConfig) -> Result<(), AppError> {
        for field in ConfigField::ALL {
            let raw = field.value(draft);
            if raw.is_empty() {
                return Err(AppError::validation(field.name(), "es obligatorio"));
            }
            if !raw.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
                return Err(AppError::validation(field.name(), format!("'{}' no es un número", raw)));
            }
        }
        Ok(())
    }

    /// Guardar: dos PUT en orden (`percentage`, luego `min-distance`) y recarga.
    /// Si falla el segundo, el primero ya quedó aplicado y se reporta así.
    pub async fn save(&self) -> Result<(), AppError> {
        if self.state.saving.get() {
            return Err(AppError::SaveInProgress);
        }
        let draft = self.draft();
        if let Err(e) = Self::validate(&draft) {
            *self.state.error.borrow_mut() = Some(e.clone());
            self.notify();
            return Err(e);
        }
        let token = self.tokens.require_token()?;

        self.state.saving.set(true);
        self.notify();
        let result = checked(self.tokens.as_ref(), &token, self.apply_fields(&token, &draft).await);
        self.state.saving.set(false);

        match result {
            Ok(()) => {
                log::info!("✅ [SETTINGS] Configuración actualizada");
                *self.state.error.borrow_mut() = None;
                if let Err(e) = self.load().await {
                    log::warn!("⚠️ [SETTINGS] Guardado correcto pero la recarga falló: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                *self.state.error.borrow_mut() = Some(e.clone());
                if matches!(e, AppError::PartialUpdate { .. }) {
                    // Refrescar lo confirmado sin pisar el borrador del usuario
                    if let Ok(config) = self.service.fetch(&token).await {
                        *self.state.saved.borrow_mut() = Some(config);
                    }
                }
                self.notify();
                Err(e)
            }
        }
    }

    async fn apply_fields(&self, token: &str, draft: &MasterConfig) -> Result<(), AppError> {
        let mut applied: Vec<String> = Vec::new();
        for field in ConfigField::ALL {
            if let Err(e) = self.service.update_field(token, field, field.value(draft)).await {
                log::error!("❌ [SETTINGS] Falló '{}' tras {:?}: {}", field.name(), applied, e);
                return Err(AppError::PartialUpdate {
                    failed_field: field.name().to_string(),
                    applied,
                    reason: Box::new(e),
                });
            }
            applied.push(field.name().to_string());
        }
        Ok(())
    }
}
