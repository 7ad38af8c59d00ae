//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fetch;

pub use cache::execute as cache;
pub use config::execute as config;
pub use fetch::execute as fetch;

use crate::config::{Config, ConfigManager};
use crate::error::QuarryResult;
use crate::storage::{FileStore, KeyValueStore, StorageContext, StorageContexts, SystemClock};
use std::sync::Arc;
use tracing::debug;

/// Open the configured store and bind a context to it
fn open_storage(config: &Config) -> QuarryResult<Arc<StorageContext>> {
    let path = ConfigManager::store_path(config);
    debug!("Using store {}", path.display());

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(path)?);
    let contexts = StorageContexts::new(Arc::new(SystemClock));
    Ok(contexts.context(&store))
}
