// ============================================================================
// WAREHOUSE VIEWMODEL - Detalle de almacén y almacén virtual
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::MapsConfig;
use crate::error::AppError;
use crate::models::{ItemId, Product, Store, VirtualWarehouse};
use crate::services::api_client::ApiClient;
use crate::services::warehouse_service::WarehouseService;
use crate::state::reactivity::{Listeners, Subscription};
use crate::state::session_state::{checked, TokenSource};

/// Qué mostrar en el hueco del mapa
#[derive(Clone, Debug, PartialEq)]
pub enum MapView {
    Available {
        api_key: String,
        map_id: String,
        latitude: f64,
        longitude: f64,
        zoom: f64,
    },
    /// Falta la clave del proveedor de mapas: se muestra un aviso, nunca se rompe
    Unavailable,
}

struct WarehouseState {
    store_id: RefCell<Option<ItemId>>,
    products: RefCell<Vec<Product>>,
    virtual_warehouse: RefCell<Option<VirtualWarehouse>>,
    error: RefCell<Option<AppError>>,
    loading: Cell<bool>,
    sequence: Cell<u64>,
    listeners: Listeners<()>,
}

#[derive(Clone)]
pub struct WarehouseViewModel {
    service: WarehouseService,
    tokens: Rc<dyn TokenSource>,
    maps: MapsConfig,
    state: Rc<WarehouseState>,
}

impl WarehouseViewModel {
    pub fn new(api: ApiClient, tokens: Rc<dyn TokenSource>, maps: MapsConfig) -> Self {
        Self {
            service: WarehouseService::new(api),
            tokens,
            maps,
            state: Rc::new(WarehouseState {
                store_id: RefCell::new(None),
                products: RefCell::new(Vec::new()),
                virtual_warehouse: RefCell::new(None),
                error: RefCell::new(None),
                loading: Cell::new(false),
                sequence: Cell::new(0),
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

    fn begin(&self) -> u64 {
        let next = self.state.sequence.get() + 1;
        self.state.sequence.set(next);
        self.state.loading.set(true);
        self.notify();
        next
    }

    /// Cerrar una carga; `false` si otra más reciente la reemplazó
    fn finish(&self, sequence: u64, error: Option<AppError>) -> bool {
        if self.state.sequence.get() != sequence {
            return false;
        }
        self.state.loading.set(false);
        *self.state.error.borrow_mut() = error;
        true
    }

    pub fn store_id(&self) -> Option<ItemId> {
        self.state.store_id.borrow().clone()
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.products.borrow().clone()
    }

    pub fn virtual_warehouse(&self) -> Option<VirtualWarehouse> {
        self.state.virtual_warehouse.borrow().clone()
    }

    pub fn error(&self) -> Option<AppError> {
        self.state.error.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading.get()
    }

    /// Productos de un almacén. Al cambiar de almacén rápido, gana la última carga.
    pub async fn load_store(&self, store_id: &ItemId) -> Result<usize, AppError> {
        let token = self.tokens.require_token()?;
        let sequence = self.begin();
        if self.state.store_id.borrow().as_ref() != Some(store_id) {
            self.state.products.borrow_mut().clear();
            *self.state.store_id.borrow_mut() = Some(store_id.clone());
        }

        let result = checked(self.tokens.as_ref(), &token, self.service.store_products(&token, store_id).await);
        let applied = self.finish(sequence, result.as_ref().err().cloned());
        if applied {
            match &result {
                Ok(products) => {
                    log::info!("🏬 [WAREHOUSE] Almacén {}: {} productos", store_id, products.len());
                    *self.state.products.borrow_mut() = products.clone();
                }
                Err(e) => log::error!("❌ [WAREHOUSE] Error cargando almacén {}: {}", store_id, e),
            }
            self.notify();
        }
        result.map(|products| products.len())
    }

    pub async fn load_virtual(&self) -> Result<VirtualWarehouse, AppError> {
        let token = self.tokens.require_token()?;
        let sequence = self.begin();

        let result = checked(self.tokens.as_ref(), &token, self.service.virtual_warehouse(&token).await);
        if self.finish(sequence, result.as_ref().err().cloned()) {
            match &result {
                Ok(warehouse) => {
                    log::info!(
                        "🏭 [WAREHOUSE] Almacén virtual '{}' con {} productos",
                        warehouse.display_name(),
                        warehouse.total_products()
                    );
                    *self.state.virtual_warehouse.borrow_mut() = Some(warehouse.clone());
                }
                Err(e) => log::error!("❌ [WAREHOUSE] Error cargando almacén virtual: {}", e),
            }
            self.notify();
        }
        result
    }

    pub fn total_products(&self) -> usize {
        self.state.products.borrow().len()
    }

    /// Mapa del almacén: centro en sus coordenadas o en el centro por defecto
    pub fn map_for(&self, store: Option<&Store>) -> MapView {
        let Some(api_key) = self.maps.api_key.clone() else {
            return MapView::Unavailable;
        };
        let (latitude, longitude) = store
            .and_then(|s| s.coordinates)
            .map(|c| (c.latitude, c.longitude))
            .unwrap_or((self.maps.default_center_lat, self.maps.default_center_lng));
        MapView::Available {
            api_key,
            map_id: self.maps.map_id.clone(),
            latitude,
            longitude,
            zoom: self.maps.default_zoom,
        }
    }
}
