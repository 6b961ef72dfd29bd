// Error types shared by the transport, parser and tracking service
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{message}")]
    Api { status_code: u16, message: String },

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // Expected while the carrier is still computing a batch; callers poll again.
    #[error("Batch results not ready yet.")]
    BatchNotReady,

    #[error("API request timed out after {0}ms.")]
    Timeout(u64),

    #[error("Network/Fetch error: {0}")]
    Transport(String),
}

impl TrackingError {
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        TrackingError::Api {
            status_code,
            message: message.into(),
        }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        TrackingError::Parsing {
            message: message.into(),
            source: None,
        }
    }

    pub fn parsing_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TrackingError::Parsing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    // HTTP status the REST facade answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TrackingError::InvalidInput(_) => 400,
            TrackingError::Api { status_code, .. } => *status_code,
            TrackingError::Parsing { .. } => 500,
            TrackingError::BatchNotReady => 202,
            TrackingError::Timeout(_) => 504,
            TrackingError::Transport(_) => 503,
        }
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, TrackingError::BatchNotReady)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(TrackingError::InvalidInput("barcode".into()), 400; "invalid input")]
    #[test_case(TrackingError::api(502, "API Error: boom"), 502; "api keeps carried status")]
    #[test_case(TrackingError::parsing("bad envelope"), 500; "parsing")]
    #[test_case(TrackingError::BatchNotReady, 202; "not ready")]
    #[test_case(TrackingError::Timeout(30000), 504; "timeout")]
    #[test_case(TrackingError::Transport("connection refused".into()), 503; "transport")]
    fn test_status_code_mapping(error: TrackingError, expected: u16) {
        assert_eq!(error.status_code(), expected);
    }

    #[test]
    fn test_parsing_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated");
        let error = TrackingError::parsing_with("Failed to parse batch status XML", io);
        let source = std::error::Error::source(&error).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("truncated"));
        assert!(!error.is_not_ready());
    }

    #[test]
    fn test_api_error_displays_message_only() {
        let error = TrackingError::api(500, "API Error (soap:Server): failure");
        assert_eq!(error.to_string(), "API Error (soap:Server): failure");
    }
}
