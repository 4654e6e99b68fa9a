use thiserror::Error;

use hue::error::HueError;

#[derive(Error, Debug)]
pub enum ApiError {
    /* mapped errors */
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    SerdeYaml(#[from] serde_yml::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    JoinError(#[from] tokio::task::JoinError),

    #[error(transparent)]
    SetLoggerError(#[from] log::SetLoggerError),

    #[error(transparent)]
    HueError(#[from] HueError),

    /* bridge errors */
    #[error("Timeout after {0} seconds waiting for bridge {1}")]
    BridgeTimeout(u64, String),

    #[error("Light {0} not found on bridge")]
    LightNotFound(String),

    /* color source errors */
    #[error("Invalid circadian reading from {0}: {1}")]
    InvalidReading(String, String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    #[must_use]
    pub const fn service_error(msg: String) -> Self {
        Self::ServiceError(msg)
    }
}
