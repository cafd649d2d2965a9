pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::http::build_router;
pub use adapters::{open_store, DataApiRecordStore, MemoryRecordStore, MongoRecordStore};
pub use config::AppConfig;
pub use core::service::CountsService;
pub use utils::error::{AppError, Result, StoreError, ValidationError};
