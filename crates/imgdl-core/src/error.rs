//! Error types for imgdl core

use thiserror::Error;

/// Errors that can occur in imgdl core
#[derive(Debug, Error)]
pub enum ImgdlError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid or expired session")]
    SessionNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Search provider error: {0}")]
    Provider(String),

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },
}

impl ImgdlError {
    /// Whether the caller is at fault (maps to a 400-class response)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImgdlError::Validation(_) | ImgdlError::SessionNotFound(_) | ImgdlError::InvalidUrl(_)
        )
    }

    /// Whether an upstream request went quiet for longer than the fetch timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ImgdlError::Network(e) if e.is_timeout())
    }

    /// Message reported for a failed transfer, naming timeouts explicitly
    pub fn transfer_message(&self) -> String {
        if self.is_timeout() {
            format!("Timed out waiting for upstream: {}", self)
        } else {
            self.to_string()
        }
    }
}
