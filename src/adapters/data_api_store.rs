use crate::core::planner::AggregationPlan;
use crate::domain::model::AggregatedRecord;
use crate::domain::ports::RecordStore;
use crate::utils::error::StoreError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// 透過 Data API 風格的 HTTP 端點執行 aggregation pipeline
///
/// 請求：`POST {endpoint}/action/aggregate`
/// `{"dataSource", "database", "collection", "pipeline"}`，回應為 `{"documents": [...]}`。
#[derive(Debug, Clone)]
pub struct DataApiRecordStore {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    data_source: String,
    database: String,
    collection: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRequest<'a> {
    data_source: &'a str,
    database: &'a str,
    collection: &'a str,
    pipeline: Value,
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    documents: Vec<AggregatedRecord>,
}

impl DataApiRecordStore {
    pub fn new(
        endpoint: impl Into<String>,
        data_source: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
            data_source: data_source.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn aggregate_url(&self) -> String {
        format!("{}/action/aggregate", self.endpoint)
    }
}

#[async_trait]
impl RecordStore for DataApiRecordStore {
    async fn aggregate(
        &self,
        plan: &AggregationPlan,
        deadline: Option<Duration>,
    ) -> Result<Vec<AggregatedRecord>, StoreError> {
        let body = AggregateRequest {
            data_source: &self.data_source,
            database: &self.database,
            collection: &self.collection,
            pipeline: plan.to_pipeline(),
        };

        tracing::debug!("Making aggregate request to: {}", self.aggregate_url());
        let mut request = self.client.post(self.aggregate_url()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header("api-key", api_key);
        }
        if let Some(deadline) = deadline {
            request = request.timeout(deadline);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Record store response status: {}", status);

        let text = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: AggregateResponse =
            serde_json::from_str(&text).map_err(|e| StoreError::MalformedResponse {
                message: e.to_string(),
            })?;
        Ok(parsed.documents)
    }
}
