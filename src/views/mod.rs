pub mod common;
pub mod login;
pub mod collection;
pub mod settings;
pub mod warehouse;

pub use common::{render_error, render_home, render_loading, render_nav, render_not_found};
pub use login::render_login;
pub use collection::render_collection_page;
pub use settings::render_settings;
pub use warehouse::{render_store, render_virtual_warehouse};
