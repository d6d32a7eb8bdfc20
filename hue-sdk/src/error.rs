use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("API error: {0}")]
    Api(#[from] hue_api::ApiError),

    #[error("Link button was not pressed within {0:?}")]
    LinkButtonTimeout(Duration),

    #[error("Failed to access config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("Invalid config value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("Logging error: {0}")]
    Logging(#[from] hue_state::LoggingError),
}

pub type Result<T> = std::result::Result<T, SdkError>;

impl SdkError {
    /// Bridge error code carried by an API error
    pub fn api_code(&self) -> Option<i64> {
        match self {
            SdkError::Api(error) => error.api_code(),
            _ => None,
        }
    }
}
