use thiserror::Error;

/// Errors surfaced by the transport and credential layers.
///
/// Data-shape irregularities in API responses are never reported through this
/// type; those records are skipped where they are read.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP {status} from {url}: {body}")]
    Transport { status: u16, url: String, body: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
