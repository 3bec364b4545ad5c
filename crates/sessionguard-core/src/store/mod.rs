//! Durable key-value storage for the persisted session.
//!
//! This module provides:
//! - `DurableStore`: the minimal get/set/delete contract the session manager needs
//! - `MemoryStore`: process-local storage, for tests and embedding
//! - `FileStore`: a JSON file in the cache directory
//! - `KeyringStore`: one OS keychain entry per key

pub mod file;
pub mod keyring;
pub mod memory;

use std::sync::Arc;

use thiserror::Error;

use crate::config::{SessionConfig, StoreBackend};

pub use self::keyring::KeyringStore;
pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed store contents: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Keyring error: {0}")]
    Keyring(#[from] ::keyring::Error),

    #[error("Store location unavailable: {0}")]
    Unavailable(String),
}

/// A persistent key-value store that survives process restarts.
///
/// Implementations must be safe to call from any thread; the session
/// manager calls them while holding its own state lock, so they must not
/// call back into the manager.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Open the store backend selected in the configuration.
pub fn open_store(config: &SessionConfig) -> Result<Arc<dyn DurableStore>, StoreError> {
    let store: Arc<dyn DurableStore> = match config.store {
        StoreBackend::File => {
            let dir = config
                .cache_dir()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Arc::new(FileStore::in_dir(dir))
        }
        StoreBackend::Keyring => Arc::new(KeyringStore::default()),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
