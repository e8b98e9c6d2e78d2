use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_url: Option<String>,
    pub api_url: Option<String>,
    pub enable_logging: bool,
    pub network_timeout_seconds: u32,
    pub identity: IdentityConfig,
    pub maps: MapsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            api_url: None,
            enable_logging: true,
            network_timeout_seconds: 30,
            identity: IdentityConfig::default(),
            maps: MapsConfig::default(),
        }
    }
}

/// Credenciales del proveedor de identidad (Firebase)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    pub api_key: Option<String>,
    pub map_id: String,
    pub default_center_lat: f64,
    pub default_center_lng: f64,
    pub default_zoom: f64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            map_id: "default-map-id".to_string(),
            default_center_lat: 5.5351,
            default_center_lng: -73.3672,
            default_zoom: 15.0,
        }
    }
}

/// `option_env!` devuelve "" si la variable existe vacía: tratarla como ausente
fn non_empty(value: Option<&'static str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.trim_end_matches('/').to_string())
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno en tiempo de compilación
    pub fn from_env() -> Self {
        let defaults = MapsConfig::default();
        Self {
            backend_url: non_empty(option_env!("BACKEND_URL")),
            api_url: non_empty(option_env!("API_URL")),
            enable_logging: option_env!("ENABLE_LOGGING")
                .unwrap_or("true").parse().unwrap_or(true),
            network_timeout_seconds: option_env!("NETWORK_TIMEOUT_SECONDS")
                .unwrap_or("30").parse().unwrap_or(30),
            identity: IdentityConfig {
                api_key: non_empty(option_env!("FIREBASE_API_KEY")),
                auth_domain: non_empty(option_env!("FIREBASE_AUTH_DOMAIN")),
                app_id: non_empty(option_env!("FIREBASE_APP_ID")),
            },
            maps: MapsConfig {
                api_key: non_empty(option_env!("GOOGLE_MAPS_API_KEY")),
                map_id: non_empty(option_env!("GOOGLE_MAPS_ID")).unwrap_or(defaults.map_id),
                ..defaults
            },
        }
    }

    /// Config mínima apuntando a un backend concreto
    pub fn with_backend(url: &str) -> Self {
        Self {
            backend_url: Some(url.trim_end_matches('/').to_string()),
            ..Self::default()
        }
    }

    /// URL del backend (raíz, usada por `/auth/*`)
    pub fn backend_url(&self) -> Result<&str, AppError> {
        self.backend_url
            .as_deref()
            .ok_or_else(|| AppError::Config("Backend URL is not set".to_string()))
    }

    /// Base de la API REST: `API_URL` o `BACKEND_URL/api`
    pub fn api_base(&self) -> Result<String, AppError> {
        match &self.api_url {
            Some(url) => Ok(url.clone()),
            None => Ok(format!("{}/api", self.backend_url()?)),
        }
    }

    pub fn request_timeout_ms(&self) -> u32 {
        self.network_timeout_seconds.max(1).saturating_mul(1000)
    }

    /// El mapa solo se renderiza con clave configurada
    pub fn maps_available(&self) -> bool {
        self.maps.api_key.is_some()
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}
