// ============================================================================
// API CLIENT - SOLO COMUNICACIÓN HTTP (Stateless)
// ============================================================================
// NO tiene lógica de negocio: construye requests, clasifica errores y decodifica
// ============================================================================

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::http::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Cliente API - SOLO comunicación HTTP (stateless)
#[derive(Clone)]
pub struct ApiClient {
    transport: Rc<dyn HttpTransport>,
    backend_url: String,
    api_base: String,
}

impl ApiClient {
    pub fn new(transport: Rc<dyn HttpTransport>, config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            transport,
            backend_url: config.backend_url()?.to_string(),
            api_base: config.api_base()?,
        })
    }

    pub fn transport(&self) -> Rc<dyn HttpTransport> {
        self.transport.clone()
    }

    /// URL bajo la base de la API (`/master-data/...`, `/almacenes/...`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// URL bajo la raíz del backend (`/auth/...`)
    pub fn backend_url(&self, path: &str) -> String {
        format!("{}{}", self.backend_url, path)
    }

    /// Enviar y exigir 2xx. Non-2xx → `Http{status, body}`, salvo 401 con
    /// token bearer → `Auth` (token expirado o inválido)
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        let method = request.method;
        let url = request.url.clone();
        let authorized = request.header("Authorization").is_some();
        let response = self.transport.send(request).await?;
        if response.status == 401 && authorized {
            log::warn!("🔒 [API] {} {} → token rechazado", method.as_str(), url);
            return Err(AppError::Auth(format!("token rechazado por el backend: {}", response.body)));
        }
        if !response.ok() {
            log::warn!("⚠️ [API] {} {} → HTTP {}", method.as_str(), url, response.status);
            return Err(AppError::Http {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, AppError> {
        let request = HttpRequest::new(Method::Get, self.api_url(path)).bearer(token);
        let response = self.execute(request).await?;
        decode(&response.body)
    }

    /// GET de una colección tolerando que el backend devuelva un objeto suelto
    pub async fn get_sequence<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<Vec<T>, AppError> {
        let request = HttpRequest::new(Method::Get, self.api_url(path)).bearer(token);
        let response = self.execute(request).await?;
        decode_sequence(&response.body)
    }

    pub async fn send_json<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<HttpResponse, AppError> {
        let json = serde_json::to_string(body)
            .map_err(|e| AppError::DataShape(format!("Error serializando: {}", e)))?;
        let request = HttpRequest::new(method, self.api_url(path))
            .bearer(token)
            .json_body(json);
        self.execute(request).await
    }

    /// Request sin cuerpo (DELETE, PUT con query string)
    pub async fn send_empty(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> Result<HttpResponse, AppError> {
        let request = HttpRequest::new(method, self.api_url(path)).bearer(token);
        self.execute(request).await
    }
}

/// Decodificar un objeto JSON; forma inesperada → `DataShape`
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, AppError> {
    serde_json::from_str(body).map_err(|e| AppError::DataShape(e.to_string()))
}

/// Decodificar una secuencia: array → Vec, objeto suelto → vec![objeto],
/// cuerpo vacío o `null` → vacío; cualquier otra cosa → `DataShape`
pub fn decode_sequence<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, AppError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = decode(body)?;
    match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| AppError::DataShape(e.to_string()))
        }
        serde_json::Value::Object(_) => {
            log::warn!("⚠️ [API] Se esperaba una lista y llegó un objeto; normalizando");
            let item = serde_json::from_value(value).map_err(|e| AppError::DataShape(e.to_string()))?;
            Ok(vec![item])
        }
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(AppError::DataShape(format!(
            "Se esperaba una lista, llegó: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;
    use crate::testutil::FakeBackend;
    use futures::executor::block_on;

    #[test]
    fn sequence_normalizes_single_object() {
        let body = r#"{"id": 1, "name": "Arroz", "category": "Granos", "price": 3.5, "stock": 2}"#;
        let products: Vec<Product> = decode_sequence(body).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Arroz");
    }

    #[test]
    fn sequence_rejects_scalars() {
        let err = decode_sequence::<Product>("42").unwrap_err();
        assert!(matches!(err, AppError::DataShape(_)));
        assert!(decode_sequence::<Product>("null").unwrap().is_empty());
        assert!(decode_sequence::<Product>("").unwrap().is_empty());
    }

    #[test]
    fn non_2xx_becomes_http_error_with_body() {
        let backend = FakeBackend::new();
        backend.fail_next(409, "id duplicado");
        let api = backend.api_client();

        let err = block_on(api.get_sequence::<Product>("/master-data/products", "tok")).unwrap_err();
        assert_eq!(
            err,
            AppError::Http { status: 409, body: "id duplicado".into() }
        );
    }

    #[test]
    fn rejected_bearer_token_is_auth_error() {
        let backend = FakeBackend::new();
        backend.fail_next(401, "token expirado");
        let api = backend.api_client();

        let err = block_on(api.get_sequence::<Product>("/master-data/products", "tok")).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(err.is_token_rejection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn requests_carry_bearer_token() {
        let backend = FakeBackend::new();
        let api = backend.api_client();
        block_on(api.get_sequence::<Product>("/master-data/products", "tok-123")).unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://backend.test/api/master-data/products");
        assert_eq!(requests[0].header("Authorization"), Some("Bearer tok-123"));
    }

    #[test]
    fn missing_backend_url_fails_construction() {
        let backend = FakeBackend::new();
        let result = ApiClient::new(backend.transport(), &AppConfig::default());
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
