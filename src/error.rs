// ============================================================================
// ERRORES - Taxonomía única de errores del cliente
// ============================================================================
// Todos los fallos de I/O se convierten en una de estas variantes y se guardan
// en el estado local del componente. Ninguna es fatal.
// ============================================================================

use thiserror::Error;

/// Error de aplicación (recuperable siempre)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// Credenciales incorrectas, token expirado o inválido
    #[error("Error de autenticación: {0}")]
    Auth(String),

    /// La petición nunca llegó al servidor (o expiró)
    #[error("Error de red: {0}")]
    Network(String),

    /// El servidor respondió con un estado no 2xx
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Precondición del formulario no cumplida (antes de cualquier request)
    #[error("Campo '{field}' inválido: {reason}")]
    Validation { field: String, reason: String },

    /// El backend devolvió una forma distinta a la esperada
    #[error("Respuesta inesperada del backend: {0}")]
    DataShape(String),

    /// Endpoint protegido sin token
    #[error("No hay una sesión activa")]
    Unauthenticated,

    #[error("Configuración incompleta: {0}")]
    Config(String),

    /// El último fetch falló: no se permiten mutaciones hasta recargar
    #[error("La colección está desactualizada, recarga antes de modificarla")]
    SyncSuspended,

    #[error("Ya hay un guardado en curso")]
    SaveInProgress,

    /// Actualización campo a campo interrumpida
    #[error("Actualización parcial: falló '{failed_field}' (aplicados: {applied:?}): {reason}")]
    PartialUpdate {
        failed_field: String,
        applied: Vec<String>,
        reason: Box<AppError>,
    },

    #[error("Almacenamiento local: {0}")]
    Storage(String),
}

impl AppError {
    /// Atajo para errores de validación
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Indica si la vista debe ofrecer "reintentar"
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) | AppError::DataShape(_) | AppError::SyncSuspended => true,
            AppError::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            AppError::PartialUpdate { reason, .. } => reason.is_retryable(),
            _ => false,
        }
    }

    /// Campo afectado (validación o saga parcial)
    pub fn field(&self) -> Option<&str> {
        match self {
            AppError::Validation { field, .. } => Some(field),
            AppError::PartialUpdate { failed_field, .. } => Some(failed_field),
            _ => None,
        }
    }

    /// El backend rechazó el token usado (también dentro de una saga parcial)
    pub fn is_token_rejection(&self) -> bool {
        match self {
            AppError::Auth(_) => true,
            AppError::PartialUpdate { reason, .. } => reason.is_token_rejection(),
            _ => false,
        }
    }

    /// Estado HTTP si el servidor llegó a responder
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Http { status, .. } => Some(*status),
            AppError::PartialUpdate { reason, .. } => reason.status(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::DataShape(err.to_string())
    }
}
