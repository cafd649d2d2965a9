use crate::core::planner;
use crate::core::response::FormattedResponse;
use crate::core::validator;
use crate::domain::ports::RecordStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// 驗證 → 規劃 → 執行 → 格式化，每個請求彼此獨立
#[derive(Clone)]
pub struct CountsService {
    store: Arc<dyn RecordStore>,
    deadline: Option<Duration>,
}

impl CountsService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn handle(&self, raw: &Value) -> FormattedResponse {
        let query = match validator::validate(raw) {
            Ok(query) => query,
            Err(e) => {
                tracing::debug!("Rejected counts request: {}", e);
                return FormattedResponse::validation_failure(&e);
            }
        };

        let plan = planner::plan(&query);
        tracing::debug!(
            "Aggregating records from {} to {} with totalCount in [{}, {}]",
            query.start_date(),
            query.end_date(),
            query.min_count(),
            query.max_count()
        );

        match plan.execute(self.store.as_ref(), self.deadline).await {
            Ok(records) => {
                tracing::debug!("Aggregation matched {} records", records.len());
                FormattedResponse::success(records)
            }
            Err(e) => {
                tracing::error!("❌ Record store aggregation failed: {}", e);
                FormattedResponse::store_failure(&e)
            }
        }
    }
}
