// ============================================================================
// SESSION STORE - Registro persistido {authToken, userData}
// ============================================================================
// Lectura libre para cualquier componente; escritura solo desde el
// SessionManager (métodos `pub(crate)`).
// ============================================================================

use std::rc::Rc;

use crate::models::{Session, UserProfile};
use crate::utils::storage::KeyValueStorage;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_DATA_KEY: &str = "userData";

/// Resultado de leer el registro persistido
#[derive(Debug, PartialEq)]
pub enum StoredSession {
    Missing,
    Malformed(String),
    Valid(Session),
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Rc<dyn KeyValueStorage>,
}

impl SessionStore {
    pub fn new(storage: Rc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Snapshot del token en el momento de la llamada
    pub fn read_token(&self) -> Option<String> {
        self.storage
            .get(AUTH_TOKEN_KEY)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn load(&self) -> StoredSession {
        let token = self.read_token();
        let user_data = self.storage.get(USER_DATA_KEY);

        match (token, user_data) {
            (None, None) => StoredSession::Missing,
            (None, Some(_)) => StoredSession::Malformed("userData sin authToken".to_string()),
            (Some(_), None) => StoredSession::Malformed("authToken sin userData".to_string()),
            (Some(token), Some(json)) => match serde_json::from_str::<UserProfile>(&json) {
                Ok(profile) if !profile.uid.trim().is_empty() => {
                    StoredSession::Valid(Session::from_parts(token, profile))
                }
                Ok(_) => StoredSession::Malformed("userData sin uid".to_string()),
                Err(e) => StoredSession::Malformed(format!("userData ilegible: {}", e)),
            },
        }
    }

    pub(crate) fn save(&self, session: &Session) -> Result<(), crate::error::AppError> {
        let profile = serde_json::to_string(&session.profile())
            .map_err(|e| crate::error::AppError::Storage(e.to_string()))?;
        self.storage.set(AUTH_TOKEN_KEY, &session.token)?;
        self.storage.set(USER_DATA_KEY, &profile)?;
        Ok(())
    }

    pub(crate) fn clear(&self) {
        self.storage.remove(AUTH_TOKEN_KEY);
        self.storage.remove(USER_DATA_KEY);
    }
}
