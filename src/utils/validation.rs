//! 設定值檢查

use crate::utils::error::{AppError, Result};
use std::fmt::Display;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> AppError {
    AppError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn require<'a, T>(field: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| AppError::MissingConfigError {
        field: field.to_string(),
    })
}

pub fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "must not be blank"));
    }
    Ok(())
}

pub fn non_zero(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, value, "must be greater than 0"));
    }
    Ok(())
}

/// Data API 端點：必須是 http 或 https
pub fn http_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| invalid(field, value, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(invalid(field, value, format!("unsupported scheme {}", scheme))),
    }
}

/// 只檢查 `scheme://` 前綴；MongoDB 連線字串可含多個主機，不適合用 `Url` 解析
pub fn uri_scheme(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    match value.split_once("://") {
        Some((scheme, rest)) if allowed.contains(&scheme) && !rest.is_empty() => Ok(()),
        _ => Err(invalid(
            field,
            value,
            format!("expected one of {}:// schemes", allowed.join("://, ")),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        let present = Some("records.json".to_string());
        let missing: Option<String> = None;
        assert_eq!(require("store.records_file", &present).unwrap(), "records.json");
        assert!(matches!(
            require("store.records_file", &missing),
            Err(AppError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_non_empty_and_non_zero() {
        assert!(non_empty("store.collection", "records").is_ok());
        assert!(non_empty("store.collection", "   ").is_err());
        assert!(non_zero("server.port", 8080).is_ok());
        assert!(matches!(
            non_zero("server.port", 0),
            Err(AppError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_http_url() {
        assert!(http_url("store.endpoint", "https://example.com").is_ok());
        assert!(http_url("store.endpoint", "http://127.0.0.1:27080").is_ok());
        assert!(http_url("store.endpoint", "").is_err());
        assert!(http_url("store.endpoint", "invalid-url").is_err());
        assert!(http_url("store.endpoint", "mongodb://localhost").is_err());
    }

    #[test]
    fn test_uri_scheme() {
        let allowed = ["mongodb", "mongodb+srv"];
        assert!(uri_scheme("store.uri", "mongodb://a:27017,b:27017/?replicaSet=rs0", &allowed).is_ok());
        assert!(uri_scheme("store.uri", "mongodb+srv://user:pw@cluster0.example.net/counts", &allowed).is_ok());
        assert!(uri_scheme("store.uri", "https://example.com", &allowed).is_err());
        assert!(uri_scheme("store.uri", "mongodb://", &allowed).is_err());
        assert!(uri_scheme("store.uri", "localhost:27017", &allowed).is_err());
    }
}
