// ============================================================================
// RESOURCE SERVICE - CRUD HTTP genérico sobre una colección
// ============================================================================

use std::marker::PhantomData;

use crate::error::AppError;
use crate::models::{ItemId, Resource};
use crate::services::api_client::ApiClient;
use crate::services::http::Method;
use crate::utils::encoding::encode_query_value;

/// Llamadas CRUD de una colección `R` (sin estado)
#[derive(Clone)]
pub struct ResourceService<R: Resource> {
    api: ApiClient,
    _marker: PhantomData<R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(api: ApiClient) -> Self {
        Self { api, _marker: PhantomData }
    }

    pub async fn list(&self, token: &str) -> Result<Vec<R>, AppError> {
        self.api.get_sequence(R::COLLECTION_PATH, token).await
    }

    pub async fn create(&self, token: &str, item: &R) -> Result<(), AppError> {
        self.api
            .send_json(Method::Post, R::COLLECTION_PATH, token, item)
            .await
            .map(|_| ())
    }

    /// PUT del objeto completo (actualización atómica)
    pub async fn replace(&self, token: &str, item: &R) -> Result<(), AppError> {
        self.api
            .send_json(Method::Put, &R::item_path(item.id()), token, item)
            .await
            .map(|_| ())
    }

    /// `PUT {item}/{field}?{field}=value` (un paso de la saga campo a campo)
    pub async fn update_field(
        &self,
        token: &str,
        id: &ItemId,
        field: &str,
        value: &str,
    ) -> Result<(), AppError> {
        let path = format!(
            "{}/{}?{}={}",
            R::item_path(id),
            field,
            field,
            encode_query_value(value)
        );
        self.api.send_empty(Method::Put, &path, token).await.map(|_| ())
    }

    pub async fn delete(&self, token: &str, id: &ItemId) -> Result<(), AppError> {
        self.api
            .send_empty(Method::Delete, &R::item_path(id), token)
            .await
            .map(|_| ())
    }
}
