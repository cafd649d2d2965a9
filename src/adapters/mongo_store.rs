use crate::core::planner::AggregationPlan;
use crate::domain::model::{integral_from_f64, AggregatedRecord};
use crate::domain::ports::RecordStore;
use crate::utils::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Client, Collection};
use std::time::Duration;

/// 直接以 MongoDB driver 執行 aggregation pipeline
///
/// 查詢時限同時以 `maxTimeMS` 交給伺服器，並在用戶端等待時套用。
#[derive(Debug, Clone)]
pub struct MongoRecordStore {
    collection: Collection<Document>,
}

impl MongoRecordStore {
    /// 解析連線字串並建立連線池；實際連線延後到第一次查詢
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self::from_collection(
            client.database(database).collection(collection),
        ))
    }

    pub fn from_collection(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    async fn run(
        &self,
        pipeline: Vec<Document>,
        deadline: Option<Duration>,
    ) -> Result<Vec<AggregatedRecord>, StoreError> {
        let mut action = self.collection.aggregate(pipeline);
        if let Some(deadline) = deadline {
            action = action.max_time(deadline);
        }

        let mut cursor = action.await?;
        let mut records = Vec::new();
        while cursor.advance().await? {
            let document: Document = cursor.deserialize_current()?;
            records.push(decode_document(&document)?);
        }
        Ok(records)
    }
}

/// 與 `AggregationPlan::to_pipeline` 相同的三個階段，日期以 BSON Date 表示
pub fn to_documents(plan: &AggregationPlan) -> Vec<Document> {
    vec![
        doc! {
            "$match": {
                "createdAt": {
                    "$gte": bson_date(&plan.range.from),
                    "$lte": bson_date(&plan.range.to),
                }
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "key": 1,
                "createdAt": 1,
                "totalCount": { "$sum": "$counts" },
            }
        },
        doc! {
            "$match": {
                "totalCount": { "$gte": plan.threshold.min, "$lte": plan.threshold.max }
            }
        },
    ]
}

fn bson_date(ts: &DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(ts.timestamp_millis())
}

fn malformed(message: impl Into<String>) -> StoreError {
    StoreError::MalformedResponse {
        message: message.into(),
    }
}

pub fn decode_document(document: &Document) -> Result<AggregatedRecord, StoreError> {
    let key = document
        .get_str("key")
        .map_err(|e| malformed(format!("key: {}", e)))?;

    let created_at = document
        .get_datetime("createdAt")
        .map_err(|e| malformed(format!("createdAt: {}", e)))?;
    let created_at = DateTime::from_timestamp_millis(created_at.timestamp_millis())
        .ok_or_else(|| malformed(format!("createdAt out of range: {}", created_at)))?;

    // $sum 的型別跟著 counts 元素走，Mongoose 的 Number 會存成 double
    let total_count = match document.get("totalCount") {
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Double(f)) => integral_from_f64(*f).map_err(malformed)?,
        other => return Err(malformed(format!("totalCount: unexpected value {:?}", other))),
    };

    Ok(AggregatedRecord {
        key: key.to_string(),
        created_at,
        total_count,
    })
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn aggregate(
        &self,
        plan: &AggregationPlan,
        deadline: Option<Duration>,
    ) -> Result<Vec<AggregatedRecord>, StoreError> {
        let pipeline = to_documents(plan);
        tracing::debug!("Running aggregate on {}", self.collection.namespace());

        match deadline {
            // 伺服器選擇與網路等待不受 maxTimeMS 限制
            Some(deadline) => tokio::time::timeout(deadline, self.run(pipeline, Some(deadline)))
                .await
                .map_err(|_| StoreError::Timeout)?,
            None => self.run(pipeline, None).await,
        }
    }
}
