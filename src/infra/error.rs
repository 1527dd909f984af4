use thiserror::Error;

/// Infrastructure failures: I/O, outbound HTTP, configuration, telemetry.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("outbound http failure: {message}")]
    Http { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),

    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest errors can embed URLs with query strings; keep the message,
        // drop the URL.
        Self::Http {
            message: err.without_url().to_string(),
        }
    }
}
