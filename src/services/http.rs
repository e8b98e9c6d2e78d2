// ============================================================================
// HTTP TRANSPORT - Única puerta de salida a la red
// ============================================================================
// `FetchTransport` usa gloo-net (fetch del navegador) con timeout explícito;
// los tests usan transportes en memoria.
// ============================================================================

use async_trait::async_trait;
use futures::future::{select, Either};
use gloo_net::http::{Request, RequestBuilder};
use gloo_timers::future::TimeoutFuture;

use crate::error::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        self
    }

    pub fn json_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transporte HTTP (un solo hilo: sin `Send`)
#[async_trait(?Send)]
pub trait HttpTransport {
    /// Errores de transporte (incluido timeout) se devuelven como `AppError::Network`.
    /// Cualquier respuesta del servidor, aunque sea 5xx, es `Ok`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AppError>;
}

/// Transporte del navegador (fetch) con timeout
pub struct FetchTransport {
    timeout_ms: u32,
}

impl FetchTransport {
    pub fn new(timeout_ms: u32) -> Self {
        Self { timeout_ms }
    }

    fn builder(request: &HttpRequest) -> RequestBuilder {
        let mut builder = match request.method {
            Method::Get => Request::get(&request.url),
            Method::Post => Request::post(&request.url),
            Method::Put => Request::put(&request.url),
            Method::Delete => Request::delete(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder
    }

    async fn perform(request: HttpRequest) -> Result<HttpResponse, AppError> {
        let builder = Self::builder(&request);
        let pending = match request.body {
            Some(body) => builder
                .body(body)
                .map_err(|e| AppError::Network(format!("Error construyendo request: {}", e)))?,
            None => builder
                .build()
                .map_err(|e| AppError::Network(format!("Error construyendo request: {}", e)))?,
        };
        let response = pending
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}

#[async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        let label = format!("{} {}", request.method.as_str(), request.url);
        let call = Box::pin(Self::perform(request));
        let timeout = Box::pin(TimeoutFuture::new(self.timeout_ms));

        match select(call, timeout).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => {
                log::warn!("⏱️ [HTTP] Timeout tras {} ms: {}", self.timeout_ms, label);
                Err(AppError::Network(format!(
                    "Sin respuesta tras {} s",
                    self.timeout_ms / 1000
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_and_content_type_headers() {
        let req = HttpRequest::new(Method::Get, "http://x/api").bearer("abc");
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn ok_range() {
        assert!(HttpResponse::new(204, "").ok());
        assert!(!HttpResponse::new(302, "").ok());
        assert!(!HttpResponse::new(500, "").ok());
    }
}
