pub mod planner;
pub mod response;
pub mod service;
pub mod validator;

pub use crate::domain::model::{AggregatedRecord, RangeQuery, Record};
pub use crate::domain::ports::RecordStore;
pub use crate::utils::error::Result;
