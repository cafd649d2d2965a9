use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEVELOPMENT_CONFIG_FILE: &str = "config.development.toml";

/// MongoDB 連線字串可用的 scheme
pub const MONGODB_SCHEMES: [&str; 2] = ["mongodb", "mongodb+srv"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    DataApi,
    Mongodb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub records_file: Option<String>,
    pub uri: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub data_source: String,
    pub database: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            records_file: None,
            uri: None,
            endpoint: None,
            api_key: None,
            data_source: "Cluster0".to_string(),
            database: "counts".to_string(),
            collection: "records".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 依序選擇：指定路徑、APP_ENV=development 的開發設定、預設設定檔；
    /// 檔案不存在時使用預設值
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let app_env = std::env::var("APP_ENV").ok();
        let path = resolve_config_path(explicit_path, app_env.as_deref());

        let mut config = if path.exists() {
            tracing::info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else if explicit_path.is_some() {
            return Err(AppError::ConfigError {
                message: format!("Configuration file not found: {}", path.display()),
            });
        } else {
            tracing::info!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// 替換環境變數 (例如 ${RECORD_STORE_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        // 使用正規表達式匹配 ${VAR_NAME} 格式
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 以環境變數覆寫：PORT、RECORD_STORE_URI (或 MONGODB_SRV)、RECORD_STORE_API_KEY
    ///
    /// `mongodb://`、`mongodb+srv://` 連線字串切換到 MongoDB，其餘視為 Data API 端點
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(uri) = lookup("RECORD_STORE_URI").or_else(|| lookup("MONGODB_SRV")) {
            if is_mongodb_uri(&uri) {
                self.store.uri = Some(uri);
                self.store.backend = StoreBackend::Mongodb;
            } else {
                self.store.endpoint = Some(uri);
                self.store.backend = StoreBackend::DataApi;
            }
        }
        if let Some(api_key) = lookup("RECORD_STORE_API_KEY") {
            self.store.api_key = Some(api_key);
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 傳給 Record Store 的單次查詢時限
    pub fn request_timeout(&self) -> Option<Duration> {
        self.server.request_timeout_seconds.map(Duration::from_secs)
    }
}

fn is_mongodb_uri(uri: &str) -> bool {
    uri.split_once("://")
        .map(|(scheme, _)| MONGODB_SCHEMES.contains(&scheme))
        .unwrap_or(false)
}

pub fn resolve_config_path(explicit_path: Option<&Path>, app_env: Option<&str>) -> PathBuf {
    match (explicit_path, app_env) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some("development")) => PathBuf::from(DEVELOPMENT_CONFIG_FILE),
        (None, _) => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::non_zero("server.port", u64::from(self.server.port))?;
        validation::non_empty("server.host", &self.server.host)?;

        if let Some(timeout) = self.server.request_timeout_seconds {
            validation::non_zero("server.request_timeout_seconds", timeout)?;
        }

        match self.store.backend {
            StoreBackend::Memory => {
                if let Some(path) = &self.store.records_file {
                    validation::non_empty("store.records_file", path)?;
                }
            }
            StoreBackend::DataApi => {
                let endpoint = validation::require("store.endpoint", &self.store.endpoint)?;
                validation::http_url("store.endpoint", endpoint)?;
                validation::non_empty("store.data_source", &self.store.data_source)?;
                validation::non_empty("store.database", &self.store.database)?;
                validation::non_empty("store.collection", &self.store.collection)?;
            }
            StoreBackend::Mongodb => {
                let uri = validation::require("store.uri", &self.store.uri)?;
                validation::uri_scheme("store.uri", uri, &MONGODB_SCHEMES)?;
                validation::non_empty("store.database", &self.store.database)?;
                validation::non_empty("store.collection", &self.store.collection)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[server]
port = 3000
request_timeout_seconds = 5

[store]
backend = "data_api"
endpoint = "https://data.example.com/app/abc/endpoint/data/v1"
database = "analytics"

[logging]
level = "debug"
json = true
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.store.backend, StoreBackend::DataApi);
        assert_eq!(config.store.database, "analytics");
        assert_eq!(config.store.collection, "records");
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COUNTS_TEST_API_KEY", "secret-key");

        let toml_content = r#"
[store]
backend = "data_api"
endpoint = "https://data.example.com"
api_key = "${COUNTS_TEST_API_KEY}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.store.api_key.as_deref(), Some("secret-key"));

        std::env::remove_var("COUNTS_TEST_API_KEY");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "9090"),
            ("RECORD_STORE_URI", "http://127.0.0.1:8081"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.store.backend, StoreBackend::DataApi);
        assert_eq!(config.store.endpoint.as_deref(), Some("http://127.0.0.1:8081"));
        assert!(config.store.api_key.is_none());
    }

    #[test]
    fn test_mongodb_uri_override_selects_driver_store() {
        let mut config = AppConfig::default();
        config.apply_overrides(|name| {
            (name == "RECORD_STORE_URI")
                .then(|| "mongodb+srv://user:pw@cluster0.example.net/counts".to_string())
        });
        assert_eq!(config.store.backend, StoreBackend::Mongodb);
        assert_eq!(
            config.store.uri.as_deref(),
            Some("mongodb+srv://user:pw@cluster0.example.net/counts")
        );
        assert!(config.store.endpoint.is_none());
        assert!(config.validate().is_ok());

        // 沒有 RECORD_STORE_URI 時接受 MONGODB_SRV
        let mut config = AppConfig::default();
        config.apply_overrides(|name| {
            (name == "MONGODB_SRV").then(|| "mongodb://127.0.0.1:27017".to_string())
        });
        assert_eq!(config.store.backend, StoreBackend::Mongodb);
        assert_eq!(config.store.uri.as_deref(), Some("mongodb://127.0.0.1:27017"));
    }

    #[test]
    fn test_mongodb_backend_validation() {
        let config = AppConfig::from_toml_str(
            r#"
[store]
backend = "mongodb"
uri = "mongodb://127.0.0.1:27017"
collection = "records"
"#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Mongodb);
        assert!(config.validate().is_ok());

        let config = AppConfig::from_toml_str("[store]\nbackend = \"mongodb\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(AppError::MissingConfigError { .. })
        ));

        let config = AppConfig::from_toml_str(
            "[store]\nbackend = \"mongodb\"\nuri = \"https://example.com\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|name| (name == "PORT").then(|| "eighty".to_string()));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::from_toml_str(
            r#"
[store]
backend = "data_api"
endpoint = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str(
            r#"
[store]
backend = "data_api"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(AppError::MissingConfigError { .. })
        ));

        let config = AppConfig::from_toml_str("[server]\nport = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_config_path() {
        assert_eq!(
            resolve_config_path(Some(Path::new("/etc/counts.toml")), Some("development")),
            PathBuf::from("/etc/counts.toml")
        );
        assert_eq!(
            resolve_config_path(None, Some("development")),
            PathBuf::from(DEVELOPMENT_CONFIG_FILE)
        );
        assert_eq!(
            resolve_config_path(None, Some("production")),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
        assert_eq!(resolve_config_path(None, None), PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[store]\nbackend = \"memory\"\nrecords_file = \"./data/records.json\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.store.records_file.as_deref(), Some("./data/records.json"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/counts.toml")));
        assert!(matches!(result, Err(AppError::ConfigError { .. })));
    }
}
