use crate::core::planner::AggregationPlan;
use crate::domain::model::{AggregatedRecord, Record};
use crate::domain::ports::RecordStore;
use crate::utils::error::StoreError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// 在記憶體中保存所有 Record，查詢時直接套用聚合計畫
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Vec<Record>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// 從 JSON 陣列檔案載入資料
    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let data = tokio::fs::read(path.as_ref()).await?;
        let records: Vec<Record> = serde_json::from_slice(&data)?;
        tracing::info!(
            "Loaded {} records from {}",
            records.len(),
            path.as_ref().display()
        );
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    // 同步完成，不需要 deadline
    async fn aggregate(
        &self,
        plan: &AggregationPlan,
        _deadline: Option<Duration>,
    ) -> Result<Vec<AggregatedRecord>, StoreError> {
        Ok(plan.apply(&self.records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{planner, validator};
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RECORDS: &str = r#"[
        {"key": "a", "value": "x", "counts": [1000, 1500], "createdAt": "2017-01-01T00:00:00.000Z"},
        {"key": "b", "value": "y", "counts": [1000, 1500], "createdAt": "2019-01-01T00:00:00.000Z"},
        {"key": "c", "value": "z", "counts": [], "createdAt": {"$date": "2017-06-01T00:00:00Z"}}
    ]"#;

    #[tokio::test]
    async fn test_load_and_aggregate_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(RECORDS.as_bytes()).unwrap();

        let store = MemoryRecordStore::from_json_file(temp_file.path()).await.unwrap();
        assert_eq!(store.len(), 3);

        let query = validator::validate(&json!({
            "startDate": "2016-01-26",
            "endDate": "2018-02-02",
            "minCount": 2400,
            "maxCount": 3000
        }))
        .unwrap();

        let records = planner::plan(&query).execute(&store, None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "a");
        assert_eq!(records[0].total_count, 2500);
    }

    #[tokio::test]
    async fn test_missing_file_is_store_error() {
        let result = MemoryRecordStore::from_json_file("/nonexistent/records.json").await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_is_store_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"{\"not\": \"an array\"}").unwrap();

        let result = MemoryRecordStore::from_json_file(temp_file.path()).await;
        assert!(matches!(result, Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let store = MemoryRecordStore::new(serde_json::from_str(RECORDS).unwrap());
        let query = validator::validate(&json!({
            "startDate": "2000-01-01",
            "endDate": "2020-11-28",
            "minCount": 0,
            "maxCount": 65000
        }))
        .unwrap();
        let plan = planner::plan(&query);

        let first = tokio_test::block_on(plan.execute(&store, None)).unwrap();
        let second = tokio_test::block_on(plan.execute(&store, None)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
