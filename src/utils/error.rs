use thiserror::Error;

/// 請求驗證失敗，分為結構錯誤與日期格式錯誤兩類
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{message}")]
    Shape { message: String },

    #[error("{message}")]
    Format { message: String },
}

impl ValidationError {
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }
}

/// Record Store 相關錯誤，細節只寫入日誌，不回傳給客戶端
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record store connection failed: {0}")]
    Connection(String),

    #[error("Record store request timed out")]
    Timeout,

    #[error("Record store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Record store returned malformed data: {message}")]
    MalformedResponse { message: String },

    #[error("Record store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record store decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::MalformedResponse {
                message: err.to_string(),
            }
        } else {
            StoreError::Connection(err.to_string())
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;
        match err.kind.as_ref() {
            // MaxTimeMSExpired
            ErrorKind::Command(command) if command.code == 50 => StoreError::Timeout,
            ErrorKind::BsonDeserialization(_) => StoreError::MalformedResponse {
                message: err.to_string(),
            },
            _ => StoreError::Connection(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, AppError>;
