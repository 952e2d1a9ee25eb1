//! Error types for the snapshot engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering or exporting a card
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the engine
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to build, lay out, or rasterize the card
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// The highlighter rejected the code or theme
    #[error("Highlighting failed: {0}")]
    HighlightError(String),

    /// An external resource could not be inlined into the SVG document
    #[error("Failed to inline resource {url}: {reason}")]
    ResourceError { url: String, reason: String },

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn resource(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::ResourceError {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Other(format!("Worker task failed: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
