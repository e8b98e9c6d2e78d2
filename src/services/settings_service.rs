use crate::error::AppError;
use crate::models::{ConfigField, MasterConfig};
use crate::services::api_client::ApiClient;
use crate::services::http::Method;
use crate::utils::encoding::encode_query_value;

/// Configuración maestra (`/master-data/config`)
#[derive(Clone)]
pub struct SettingsService {
    api: ApiClient,
}

impl SettingsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, token: &str) -> Result<MasterConfig, AppError> {
        self.api.get_json(MasterConfig::PATH, token).await
    }

    pub async fn update_field(&self, token: &str, field: ConfigField, value: &str) -> Result<(), AppError> {
        let path = field.path(&encode_query_value(value));
        self.api.send_empty(Method::Put, &path, token).await.map(|_| ())
    }
}
