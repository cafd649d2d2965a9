use crate::core::validator::DATE_FORMAT_MESSAGE;
use crate::domain::model::AggregatedRecord;
use crate::utils::error::{StoreError, ValidationError};
use serde::{Deserialize, Serialize};

pub const CODE_SUCCESS: i32 = 0;
pub const CODE_SHAPE_ERROR: i32 = 1;
pub const CODE_FORMAT_ERROR: i32 = 2;
pub const CODE_STORE_ERROR: i32 = 3;

pub const SUCCESS_MESSAGE: &str = "Success";
pub const STORE_ERROR_MESSAGE: &str = "Internal server error";

/// 所有分支共用的回應格式，records 永遠是陣列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: i32,
    pub msg: String,
    pub records: Vec<AggregatedRecord>,
}

/// 回應內容加上對應的 HTTP 狀態碼
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResponse {
    pub status: u16,
    pub body: ApiResponse,
}

impl FormattedResponse {
    pub fn success(records: Vec<AggregatedRecord>) -> Self {
        Self {
            status: 200,
            body: ApiResponse {
                code: CODE_SUCCESS,
                msg: SUCCESS_MESSAGE.to_string(),
                records,
            },
        }
    }

    pub fn validation_failure(err: &ValidationError) -> Self {
        let (code, msg) = match err {
            ValidationError::Shape { message } => (CODE_SHAPE_ERROR, message.clone()),
            ValidationError::Format { .. } => (CODE_FORMAT_ERROR, DATE_FORMAT_MESSAGE.to_string()),
        };
        Self {
            status: 400,
            body: ApiResponse {
                code,
                msg,
                records: Vec::new(),
            },
        }
    }

    /// store 錯誤細節不回傳給客戶端
    pub fn store_failure(_err: &StoreError) -> Self {
        Self {
            status: 500,
            body: ApiResponse {
                code: CODE_STORE_ERROR,
                msg: STORE_ERROR_MESSAGE.to_string(),
                records: Vec::new(),
            },
        }
    }
}

/// 未對應路由的固定回應
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub status: bool,
    pub msg: String,
}

impl Default for NotFoundResponse {
    fn default() -> Self {
        Self {
            status: false,
            msg: "404".to_string(),
        }
    }
}
