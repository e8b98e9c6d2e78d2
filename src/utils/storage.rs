use std::cell::RefCell;
use std::collections::HashMap;

use web_sys::{window, Storage};

use crate::error::AppError;

pub fn get_local_storage() -> Option<Storage> {
    window()?.local_storage().ok()?
}

/// Almacenamiento durable clave → texto
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str);
}

/// localStorage del navegador
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageBackend;

impl KeyValueStorage for LocalStorageBackend {
    fn get(&self, key: &str) -> Option<String> {
        get_local_storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let storage = get_local_storage()
            .ok_or_else(|| AppError::Storage("No se pudo acceder a localStorage".to_string()))?;
        storage
            .set_item(key, value)
            .map_err(|_| AppError::Storage(format!("Error guardando '{}' en localStorage", key)))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = get_local_storage() {
            if storage.remove_item(key).is_err() {
                log::warn!("⚠️ No se pudo eliminar '{}' de localStorage", key);
            }
        }
    }
}

/// Almacenamiento en memoria (tests y navegadores sin localStorage)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.borrow().contains_key(key)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}
