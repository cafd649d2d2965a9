// Adapters layer: concrete implementations for external systems (record stores, http).

pub mod data_api_store;
pub mod http;
pub mod memory_store;
pub mod mongo_store;

pub use data_api_store::DataApiRecordStore;
pub use memory_store::MemoryRecordStore;
pub use mongo_store::MongoRecordStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::domain::ports::RecordStore;
use crate::utils::error::{AppError, Result};
use std::sync::Arc;

/// 程序啟動時開啟一次，之後所有請求共用
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend {
        StoreBackend::Memory => {
            let store = match &config.records_file {
                Some(path) => MemoryRecordStore::from_json_file(path).await?,
                None => {
                    tracing::warn!("No records_file configured, starting with an empty store");
                    MemoryRecordStore::default()
                }
            };
            Ok(Arc::new(store))
        }
        StoreBackend::DataApi => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| AppError::MissingConfigError {
                field: "store.endpoint".to_string(),
            })?;
            tracing::info!(
                "Using data API record store {}/{}",
                config.database,
                config.collection
            );
            let store = DataApiRecordStore::new(
                endpoint,
                config.data_source.clone(),
                config.database.clone(),
                config.collection.clone(),
            )
            .with_api_key(config.api_key.clone());
            Ok(Arc::new(store))
        }
        StoreBackend::Mongodb => {
            let uri = config.uri.as_deref().ok_or_else(|| AppError::MissingConfigError {
                field: "store.uri".to_string(),
            })?;
            tracing::info!(
                "Using MongoDB record store {}/{}",
                config.database,
                config.collection
            );
            let store = MongoRecordStore::connect(uri, &config.database, &config.collection).await?;
            Ok(Arc::new(store))
        }
    }
}
