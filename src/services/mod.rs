pub mod http;
pub mod api_client;
pub mod auth_service;
pub mod session_store;
pub mod resource_service;
pub mod warehouse_service;
pub mod settings_service;

pub use http::{FetchTransport, HttpRequest, HttpResponse, HttpTransport, Method};
pub use api_client::ApiClient;
pub use auth_service::{FirebaseIdentityProvider, IdentityEvent, IdentityProvider, RoleService};
pub use session_store::{SessionStore, StoredSession};
pub use resource_service::ResourceService;
pub use warehouse_service::WarehouseService;
pub use settings_service::SettingsService;
