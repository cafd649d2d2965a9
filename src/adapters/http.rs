//! HTTP 路由
//!
//! - `POST /api/counts` 查詢聚合結果
//! - 其他路徑或方法一律回傳 `{"status": false, "msg": "404"}`

use crate::core::response::{ApiResponse, FormattedResponse, NotFoundResponse};
use crate::core::service::CountsService;
use crate::utils::error::ValidationError;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(service: Arc<CountsService>) -> Router {
    Router::new()
        .route("/api/counts", post(post_counts).fallback(not_found))
        .fallback(not_found)
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

async fn post_counts(
    State(service): State<Arc<CountsService>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let formatted = match body {
        Ok(body) => match decode_body(&headers, &body) {
            Ok(raw) => service.handle(&raw).await,
            Err(e) => {
                tracing::debug!("Rejected undecodable request body: {}", e);
                FormattedResponse::validation_failure(&e)
            }
        },
        Err(rejection) => unreadable_body(&rejection),
    };

    let status =
        StatusCode::from_u16(formatted.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(formatted.body))
}

/// 讀取內容失敗 (例如超過大小上限) 時仍回傳一般的錯誤格式，沿用拒絕原因的狀態碼
fn unreadable_body(rejection: &BytesRejection) -> FormattedResponse {
    tracing::debug!("Failed to read request body: {}", rejection.body_text());
    let mut formatted =
        FormattedResponse::validation_failure(&ValidationError::shape(rejection.body_text()));
    let status = rejection.status();
    formatted.status = if status.is_client_error() {
        status.as_u16()
    } else {
        StatusCode::BAD_REQUEST.as_u16()
    };
    formatted
}

async fn not_found() -> (StatusCode, Json<NotFoundResponse>) {
    (StatusCode::NOT_FOUND, Json(NotFoundResponse::default()))
}

/// 支援 JSON 與 urlencoded 表單，空內容視為空物件
fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, ValidationError> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        let fields: Map<String, Value> = url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        return Ok(Value::Object(fields));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(body)
        .map_err(|e| ValidationError::shape(format!("Invalid JSON body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_decode_form_body() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let value = decode_body(&headers, b"startDate=2016-01-26&minCount=2400").unwrap();
        assert_eq!(value["startDate"], "2016-01-26");
        assert_eq!(value["minCount"], "2400");
    }

    #[test]
    fn test_decode_empty_and_invalid_json() {
        let headers = HeaderMap::new();
        assert_eq!(decode_body(&headers, b"").unwrap(), Value::Object(Map::new()));
        assert!(matches!(
            decode_body(&headers, b"{not json"),
            Err(ValidationError::Shape { .. })
        ));
    }
}
