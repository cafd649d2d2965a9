//! 查詢條件驗證
//!
//! 規則依序檢查，遇到第一個錯誤即返回：
//! 1. 四個欄位都必須存在，且不得有多餘欄位
//! 2. 日期必須是嚴格的 `YYYY-MM-DD`
//! 3. `endDate` 不得早於 `startDate`
//! 4. `minCount`、`maxCount` 必須是大於等於 0 的整數
//! 5. `maxCount` 不得小於 `minCount`

use crate::domain::model::RangeQuery;
use crate::utils::error::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const MIN_COUNT: &str = "minCount";
pub const MAX_COUNT: &str = "maxCount";

const FIELDS: [&str; 4] = [START_DATE, END_DATE, MIN_COUNT, MAX_COUNT];

pub const DATE_FORMAT_MESSAGE: &str = "Format of dates must be YYYY-MM-DD";

// JavaScript Number.MAX_SAFE_INTEGER
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn strict_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"))
}

/// 驗證原始請求內容，成功時回傳 `RangeQuery`
pub fn validate(raw: &Value) -> Result<RangeQuery, ValidationError> {
    let body = raw
        .as_object()
        .ok_or_else(|| ValidationError::shape("\"value\" must be of type object"))?;

    // 1. 欄位存在與多餘欄位
    check_fields(body)?;

    // 2. 日期：先確認可被解析，再確認是嚴格格式
    let start_raw = date_string(body, START_DATE)?;
    let end_raw = date_string(body, END_DATE)?;
    let start_date = strict_date(start_raw)?;
    let end_date = strict_date(end_raw)?;

    // 3. 日期先後
    if end_date < start_date {
        return Err(ValidationError::shape(format!(
            "\"{}\" must be greater than or equal to \"ref:{}\"",
            END_DATE, START_DATE
        )));
    }

    // 4. 非負整數
    let min_count = non_negative_integer(body, MIN_COUNT)?;
    let max_count = non_negative_integer(body, MAX_COUNT)?;

    // 5. 數量上下限
    if max_count < min_count {
        return Err(ValidationError::shape(format!(
            "\"{}\" must be greater than or equal to ref:{}",
            MAX_COUNT, MIN_COUNT
        )));
    }

    Ok(RangeQuery::new(start_date, end_date, min_count, max_count))
}

fn check_fields(body: &Map<String, Value>) -> Result<(), ValidationError> {
    if let Some(missing) = FIELDS.iter().find(|field| !body.contains_key(**field)) {
        return Err(ValidationError::shape(format!("\"{}\" is required", missing)));
    }

    if let Some(unknown) = body.keys().find(|key| !FIELDS.contains(&key.as_str())) {
        return Err(ValidationError::shape(format!(
            "\"{}\" is not allowed",
            unknown
        )));
    }

    Ok(())
}

fn date_string<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a str, ValidationError> {
    let text = body
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::shape(format!("\"{}\" must be a valid date", field)))?;

    if !is_parseable_date(text) && !is_overflowing_day(text) {
        return Err(ValidationError::shape(format!(
            "\"{}\" must be in ISO 8601 date format",
            field
        )));
    }

    Ok(text)
}

/// `2019-02-30` 這類月份合法、日期在 1..=31 但超出當月天數的字串，
/// 一般日期解析會進位到下個月，視為可解析，交由嚴格格式檢查回報
fn is_overflowing_day(text: &str) -> bool {
    if !strict_date_pattern().is_match(text) {
        return false;
    }
    let month: u32 = text[5..7].parse().unwrap_or(0);
    let day: u32 = text[8..10].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// 一般日期解析：接受純日期與常見的日期時間寫法
fn is_parseable_date(text: &str) -> bool {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M").is_ok()
}

/// 嚴格格式：只允許 `YYYY-MM-DD`，不含時間與時區
fn strict_date(text: &str) -> Result<NaiveDate, ValidationError> {
    if !strict_date_pattern().is_match(text) {
        return Err(ValidationError::format(DATE_FORMAT_MESSAGE));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| ValidationError::format(DATE_FORMAT_MESSAGE))
}

fn non_negative_integer(body: &Map<String, Value>, field: &str) -> Result<i64, ValidationError> {
    let number = match body.get(field) {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                check_safe(field, i.unsigned_abs() as f64)?;
                return check_non_negative(field, i);
            }
            n.as_f64()
        }
        // 數字字串視同數字
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
    .ok_or_else(|| ValidationError::shape(format!("\"{}\" must be a number", field)))?;

    if number.fract() != 0.0 {
        return Err(ValidationError::shape(format!(
            "\"{}\" must be an integer",
            field
        )));
    }
    check_safe(field, number.abs())?;

    check_non_negative(field, number as i64)
}

fn check_safe(field: &str, magnitude: f64) -> Result<(), ValidationError> {
    if magnitude > MAX_SAFE_INTEGER {
        return Err(ValidationError::shape(format!(
            "\"{}\" must be a safe number",
            field
        )));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: i64) -> Result<i64, ValidationError> {
    if value < 0 {
        return Err(ValidationError::shape(format!(
            "\"{}\" must be greater than or equal to 0",
            field
        )));
    }
    Ok(value)
}
