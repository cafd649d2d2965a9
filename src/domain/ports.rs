use crate::core::planner::AggregationPlan;
use crate::domain::model::AggregatedRecord;
use crate::utils::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// 唯讀的聚合查詢能力，整個程序共用同一個實例
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 依序執行 range filter、sum projection、threshold filter
    ///
    /// `deadline` 由呼叫端傳入，實作可用於限制單次查詢時間。
    async fn aggregate(
        &self,
        plan: &AggregationPlan,
        deadline: Option<Duration>,
    ) -> Result<Vec<AggregatedRecord>, StoreError>;
}
