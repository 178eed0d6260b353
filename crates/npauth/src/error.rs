//! Auth error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("ticket codec error: {0}")]
    Codec(npauth_core::Error),
}

impl From<npauth_core::Error> for AuthError {
    fn from(e: npauth_core::Error) -> Self {
        match e {
            npauth_core::Error::InvalidArgument(msg) => AuthError::InvalidArgument(msg),
            npauth_core::Error::ConfigurationMissing(what) => {
                AuthError::ConfigurationMissing(what.to_string())
            }
            other => AuthError::Codec(other),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Config(e.to_string())
    }
}
