use crate::core::engine::{DEFAULT_FAILURE_MESSAGE, DEFAULT_REJECTION_MESSAGE};
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Input violated the moderation policy")]
    InputRejected,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Malformed upstream response: {message}")]
    MalformedResponse { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 呼叫端送出的內容有問題，重新送出即可
    Client,
    /// 外部模型服務失敗
    Upstream,
    Configuration,
    Internal,
}

impl RelayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::InputRejected | RelayError::InvalidRequest { .. } => ErrorCategory::Client,
            RelayError::ApiError(_)
            | RelayError::UpstreamStatus { .. }
            | RelayError::MalformedResponse { .. } => ErrorCategory::Upstream,
            RelayError::ConfigError { .. }
            | RelayError::MissingConfigError { .. }
            | RelayError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            RelayError::IoError(_) => ErrorCategory::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Client => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 給終端使用者看的訊息，不含內部細節
    pub fn user_friendly_message(&self) -> String {
        match self {
            RelayError::InputRejected => DEFAULT_REJECTION_MESSAGE.to_string(),
            RelayError::InvalidRequest { message } => message.clone(),
            RelayError::ApiError(_)
            | RelayError::UpstreamStatus { .. }
            | RelayError::MalformedResponse { .. } => DEFAULT_FAILURE_MESSAGE.to_string(),
            RelayError::MissingConfigError { field } => {
                format!("Missing required configuration value: {}", field)
            }
            RelayError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid configuration value for {}: {}", field, reason)
            }
            RelayError::ConfigError { message } => format!("Configuration problem: {}", message),
            RelayError::IoError(_) => "Internal error.".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RelayError::InputRejected => "Rephrase the prompt without disallowed keywords",
            RelayError::InvalidRequest { .. } => {
                "Send a JSON body such as {\"userPrompt\": \"...\"}"
            }
            RelayError::ApiError(_) => "Check network connectivity to the upstream endpoint",
            RelayError::UpstreamStatus { status, .. } if *status == 401 || *status == 403 => {
                "Check that OPENROUTER_API_KEY is valid"
            }
            RelayError::UpstreamStatus { .. } => "The upstream service rejected the call; try again later",
            RelayError::MalformedResponse { .. } => {
                "Verify the configured endpoint speaks the chat completions protocol"
            }
            RelayError::MissingConfigError { .. } => {
                "Set the value in the config file, the environment or .env"
            }
            RelayError::InvalidConfigValueError { .. } | RelayError::ConfigError { .. } => {
                "Fix the configuration file and restart"
            }
            RelayError::IoError(_) => "Check file paths and permissions",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        assert_eq!(RelayError::InputRejected.status_code(), StatusCode::BAD_REQUEST);
        let err = RelayError::InvalidRequest {
            message: "bad".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.category(), ErrorCategory::Client);
        assert_eq!(
            RelayError::InputRejected.user_friendly_message(),
            DEFAULT_REJECTION_MESSAGE
        );
    }

    #[test]
    fn test_upstream_errors_map_to_server_error() {
        let err = RelayError::UpstreamStatus {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_friendly_message(), DEFAULT_FAILURE_MESSAGE);

        let err = RelayError::MalformedResponse {
            message: "no choices".to_string(),
        };
        assert_eq!(err.user_friendly_message(), DEFAULT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_io_errors_are_internal() {
        let err = RelayError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "relay.toml"));
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_config_errors() {
        let err = RelayError::MissingConfigError {
            field: "upstream.api_key".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.user_friendly_message().contains("upstream.api_key"));
    }
}
