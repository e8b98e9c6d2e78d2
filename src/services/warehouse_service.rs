use crate::error::AppError;
use crate::models::{ItemId, Product, Store, VirtualWarehouse};
use crate::services::api_client::ApiClient;

/// Consultas de solo lectura sobre almacenes
#[derive(Clone)]
pub struct WarehouseService {
    api: ApiClient,
}

impl WarehouseService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Productos de un almacén concreto
    pub async fn store_products(&self, token: &str, store_id: &ItemId) -> Result<Vec<Product>, AppError> {
        self.api.get_sequence(&Store::products_path(store_id), token).await
    }

    /// Almacén virtual (agregado de todos los almacenes)
    pub async fn virtual_warehouse(&self, token: &str) -> Result<VirtualWarehouse, AppError> {
        self.api.get_json(VirtualWarehouse::PATH, token).await
    }
}
