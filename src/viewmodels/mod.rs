pub mod resource_viewmodel;
pub mod settings_viewmodel;
pub mod warehouse_viewmodel;

pub use resource_viewmodel::{FetchOutcome, ResourceSynchronizer, UpdateMode};
pub use settings_viewmodel::SettingsViewModel;
pub use warehouse_viewmodel::{MapView, WarehouseViewModel};
