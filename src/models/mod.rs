pub mod auth;
pub mod resource;
pub mod product;
pub mod store;
pub mod settings;

pub use auth::{Credentials, IdentityUser, Role, Session, UserProfile};
pub use resource::{FieldKind, FieldSpec, FormFields, ItemId, Resource};
pub use product::Product;
pub use store::{Coordinates, Store, VirtualWarehouse};
pub use settings::{ConfigField, MasterConfig};
