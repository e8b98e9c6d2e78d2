// ============================================================================
// AUTH SERVICE - Proveedor de identidad externo + roles
// ============================================================================

use std::rc::Rc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::IdentityConfig;
use crate::error::AppError;
use crate::models::{IdentityUser, Role};
use crate::services::api_client::{decode, ApiClient};
use crate::services::http::{HttpRequest, HttpTransport, Method};
use crate::state::reactivity::{Listeners, Subscription};

/// Notificación de cambio de estado del proveedor
#[derive(Clone, Debug, PartialEq)]
pub enum IdentityEvent {
    SignedIn(IdentityUser),
    SignedOut,
    Failed(String),
}

/// Proveedor de identidad (Firebase en producción)
#[async_trait(?Send)]
pub trait IdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, AppError>;

    /// Confirmar que un token persistido sigue siendo válido
    async fn verify(&self, token: &str) -> Result<IdentityUser, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    fn subscribe(&self, listener: Box<dyn Fn(&IdentityEvent)>) -> Subscription;
}

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct IdentityErrorBody {
    error: IdentityErrorDetail,
}

#[derive(Deserialize)]
struct IdentityErrorDetail {
    #[serde(default)]
    message: String,
}

/// Proveedor Firebase vía API REST de Identity Toolkit
pub struct FirebaseIdentityProvider {
    transport: Rc<dyn HttpTransport>,
    api_key: Option<String>,
    base_url: String,
    listeners: Listeners<IdentityEvent>,
}

impl FirebaseIdentityProvider {
    pub fn new(transport: Rc<dyn HttpTransport>, config: &IdentityConfig) -> Self {
        Self {
            transport,
            api_key: config.api_key.clone(),
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
            listeners: Listeners::new(),
        }
    }

    /// Apuntar a otro host (emulador)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, action: &str) -> Result<String, AppError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Auth("Proveedor de identidad no configurado".to_string()))?;
        Ok(format!("{}/accounts:{}?key={}", self.base_url, action, key))
    }

    async fn post<B: Serialize>(&self, action: &str, body: &B) -> Result<String, AppError> {
        let url = self.endpoint(action)?;
        let json = serde_json::to_string(body).map_err(|e| AppError::Auth(e.to_string()))?;
        let response = self
            .transport
            .send(HttpRequest::new(Method::Post, url).json_body(json))
            .await?;
        if response.ok() {
            return Ok(response.body);
        }
        let reason = serde_json::from_str::<IdentityErrorBody>(&response.body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| format!("HTTP {}", response.status));
        Err(AppError::Auth(describe_identity_error(&reason)))
    }
}

/// Traducir los códigos de Identity Toolkit a mensajes para el usuario
fn describe_identity_error(code: &str) -> String {
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => {
            "Credenciales incorrectas. Por favor, verifica tu email y contraseña.".to_string()
        }
        "USER_DISABLED" => "La cuenta está deshabilitada.".to_string(),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => "La sesión ha expirado.".to_string(),
        other => other.to_string(),
    }
}

#[async_trait(?Send)]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, AppError> {
        let body = SignInRequest { email, password, return_secure_token: true };
        let raw = self.post("signInWithPassword", &body).await?;
        let response: SignInResponse = decode(&raw)?;

        let token_expiry = response
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|secs| Utc::now() + Duration::seconds(secs));
        let user = IdentityUser {
            uid: response.local_id,
            email: response.email,
            display_name: response.display_name,
            token: response.id_token,
            token_expiry,
        };
        self.listeners.emit(&IdentityEvent::SignedIn(user.clone()));
        Ok(user)
    }

    async fn verify(&self, token: &str) -> Result<IdentityUser, AppError> {
        let raw = self.post("lookup", &LookupRequest { id_token: token }).await;
        let raw = match raw {
            Ok(raw) => raw,
            Err(err) => {
                self.listeners.emit(&IdentityEvent::Failed(err.to_string()));
                return Err(err);
            }
        };
        let response: LookupResponse = decode(&raw)?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Auth("La sesión ha expirado.".to_string()))?;
        Ok(IdentityUser {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
            token: token.to_string(),
            token_expiry: None,
        })
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        // Los tokens de Firebase no se revocan desde el cliente: basta con olvidarlos
        self.listeners.emit(&IdentityEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self, listener: Box<dyn Fn(&IdentityEvent)>) -> Subscription {
        self.listeners.subscribe(move |event| listener(event))
    }
}

/// Consulta de roles del backend (`GET /auth/getRoles`)
#[derive(Clone)]
pub struct RoleService {
    api: ApiClient,
}

impl RoleService {
    pub const PATH: &'static str = "/auth/getRoles";

    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch_role(&self, token: &str) -> Result<Role, AppError> {
        let request = HttpRequest::new(Method::Get, self.api.backend_url(Self::PATH)).bearer(token);
        let response = self.api.execute(request).await?;
        let value: serde_json::Value = decode(&response.body)?;
        highest_role(&value)
            .ok_or_else(|| AppError::DataShape(format!("Roles ilegibles: {}", response.body)))
    }
}

/// Acepta `["ADMIN"]`, `{"roles": [...]}`, `{"role": "..."}` o `"admin"`
fn highest_role(value: &serde_json::Value) -> Option<Role> {
    match value {
        serde_json::Value::String(s) => Some(Role::parse(s)),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(highest_role)
                .max()
                .unwrap_or_default(),
        ),
        serde_json::Value::Object(map) => map
            .get("roles")
            .or_else(|| map.get("role"))
            .or_else(|| map.get("authority"))
            .and_then(highest_role),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::http::HttpResponse;
    use crate::testutil::{FakeBackend, ScriptedTransport};
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn highest_role_accepts_backend_variants() {
        assert_eq!(highest_role(&json!(["USER", "SUPER_ADMIN"])), Some(Role::SuperAdmin));
        assert_eq!(highest_role(&json!({"roles": ["admin"]})), Some(Role::Admin));
        assert_eq!(highest_role(&json!({"role": "superadmin"})), Some(Role::SuperAdmin));
        assert_eq!(highest_role(&json!([{"authority": "ROLE_ADMIN"}])), Some(Role::Admin));
        assert_eq!(highest_role(&json!([])), Some(Role::User));
        assert_eq!(highest_role(&json!(42)), None);
    }

    #[test]
    fn role_service_queries_auth_endpoint() {
        let backend = FakeBackend::new();
        backend.set_roles(json!(["SUPER_ADMIN"]));
        let roles = RoleService::new(backend.api_client());

        assert_eq!(block_on(roles.fetch_role("tok")).unwrap(), Role::SuperAdmin);
        let requests = backend.requests();
        assert_eq!(requests[0].url, "http://backend.test/auth/getRoles");
        assert_eq!(requests[0].header("Authorization"), Some("Bearer tok"));
    }

    fn firebase(responses: Vec<HttpResponse>) -> (Rc<ScriptedTransport>, FirebaseIdentityProvider) {
        let transport = Rc::new(ScriptedTransport::new(responses));
        let config = IdentityConfig { api_key: Some("KEY".into()), ..IdentityConfig::default() };
        let provider = FirebaseIdentityProvider::new(transport.clone(), &config);
        (transport, provider)
    }

    #[test]
    fn firebase_sign_in_parses_tokens_and_notifies() {
        let (transport, provider) = firebase(vec![HttpResponse::new(
            200,
            r#"{"localId":"u1","email":"ana@almacen.co","displayName":"Ana","idToken":"jwt","expiresIn":"3600"}"#,
        )]);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let _sub = provider.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));

        let user = block_on(provider.sign_in("ana@almacen.co", "secreto")).unwrap();
        assert_eq!(user.uid, "u1");
        assert_eq!(user.token, "jwt");
        assert!(user.token_expiry.is_some());
        assert!(matches!(events.borrow()[0], IdentityEvent::SignedIn(_)));

        let sent = transport.requests();
        assert!(sent[0].url.ends_with("/accounts:signInWithPassword?key=KEY"));
        assert!(sent[0].body.as_deref().unwrap_or("").contains("\"returnSecureToken\":true"));
    }

    #[test]
    fn firebase_bad_credentials_become_auth_error() {
        let (_, provider) = firebase(vec![HttpResponse::new(
            400,
            r#"{"error":{"code":400,"message":"INVALID_PASSWORD"}}"#,
        )]);
        let err = block_on(provider.sign_in("ana@almacen.co", "x")).unwrap_err();
        assert!(matches!(err, AppError::Auth(ref msg) if msg.starts_with("Credenciales incorrectas")));
    }

    #[test]
    fn firebase_without_api_key_refuses_sign_in() {
        let transport = Rc::new(ScriptedTransport::new(vec![]));
        let provider = FirebaseIdentityProvider::new(transport.clone(), &IdentityConfig::default());
        let err = block_on(provider.sign_in("a@b.co", "x")).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn firebase_verify_failure_is_broadcast() {
        let (_, provider) = firebase(vec![HttpResponse::new(
            400,
            r#"{"error":{"message":"INVALID_ID_TOKEN"}}"#,
        )]);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let _sub = provider.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));

        assert!(block_on(provider.verify("old")).is_err());
        assert!(matches!(events.borrow()[0], IdentityEvent::Failed(_)));
    }
}
