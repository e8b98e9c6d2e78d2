// Utils compartidos

pub mod encoding;
pub mod format;
pub mod storage;

pub use format::{escape_html, format_price};
pub use storage::{get_local_storage, KeyValueStorage, LocalStorageBackend, MemoryStorage};
