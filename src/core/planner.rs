//! 聚合計畫
//!
//! 一個 `AggregationPlan` 固定由三個階段組成，順序不可調換：
//! 先以 createdAt 篩選，再計算 totalCount，最後以 totalCount 篩選。
//! 建立計畫不會存取 Record Store，只有 `execute` 才會交給 store 執行。

use crate::domain::model::{format_timestamp, utc_midnight, AggregatedRecord, RangeQuery, Record};
use crate::domain::ports::RecordStore;
use crate::utils::error::StoreError;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::time::Duration;

/// 第一階段：createdAt 落在 `[from, to]`（含端點）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFilter {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl RangeFilter {
    pub fn matches(&self, record: &Record) -> bool {
        record
            .created_at
            .map(|ts| self.from <= ts && ts <= self.to)
            .unwrap_or(false)
    }

    fn to_stage(self) -> Value {
        json!({
            "$match": {
                "createdAt": {
                    "$gte": { "$date": format_timestamp(&self.from) },
                    "$lte": { "$date": format_timestamp(&self.to) }
                }
            }
        })
    }
}

/// 第二階段：保留 key、createdAt，counts 加總為 totalCount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SumProjection;

impl SumProjection {
    /// 沒有 createdAt 的資料不會通過第一階段，這裡回傳 None
    pub fn project(&self, record: &Record) -> Option<AggregatedRecord> {
        let created_at = record.created_at?;
        Some(AggregatedRecord {
            key: record.key.clone(),
            created_at,
            total_count: sum_counts(&record.counts),
        })
    }

    fn to_stage(self) -> Value {
        json!({
            "$project": {
                "_id": 0,
                "key": 1,
                "createdAt": 1,
                "totalCount": { "$sum": "$counts" }
            }
        })
    }
}

/// 空序列總和為 0，溢位時停在 i64 上下限
pub fn sum_counts(counts: &[i64]) -> i64 {
    counts.iter().fold(0i64, |acc, c| acc.saturating_add(*c))
}

/// 第三階段：totalCount 落在 `[min, max]`（含端點）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdFilter {
    pub min: i64,
    pub max: i64,
}

impl ThresholdFilter {
    pub fn matches(&self, record: &AggregatedRecord) -> bool {
        self.min <= record.total_count && record.total_count <= self.max
    }

    fn to_stage(self) -> Value {
        json!({
            "$match": {
                "totalCount": { "$gte": self.min, "$lte": self.max }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationPlan {
    pub range: RangeFilter,
    pub projection: SumProjection,
    pub threshold: ThresholdFilter,
}

impl AggregationPlan {
    /// 以 MongoDB aggregation pipeline 的形式輸出三個階段
    pub fn to_pipeline(&self) -> Value {
        Value::Array(vec![
            self.range.to_stage(),
            self.projection.to_stage(),
            self.threshold.to_stage(),
        ])
    }

    /// 在記憶體中依序套用三個階段
    pub fn apply<'a, I>(&self, records: I) -> Vec<AggregatedRecord>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records
            .into_iter()
            .filter(|record| self.range.matches(record))
            .filter_map(|record| self.projection.project(record))
            .filter(|record| self.threshold.matches(record))
            .collect()
    }

    /// 交給 Record Store 執行，每個請求只呼叫一次 store
    pub async fn execute(
        &self,
        store: &dyn RecordStore,
        deadline: Option<Duration>,
    ) -> Result<Vec<AggregatedRecord>, StoreError> {
        store.aggregate(self, deadline).await
    }
}

pub fn plan(query: &RangeQuery) -> AggregationPlan {
    AggregationPlan {
        range: RangeFilter {
            from: utc_midnight(query.start_date()),
            to: utc_midnight(query.end_date()),
        },
        projection: SumProjection,
        threshold: ThresholdFilter {
            min: query.min_count(),
            max: query.max_count(),
        },
    }
}
