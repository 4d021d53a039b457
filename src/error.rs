//! Error types for devgen.

use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// Result type alias using devgen's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no device overrides registered for backend '{0}'")]
    BackendNotFound(String),

    #[error("cannot resolve subclass type '{0}'")]
    TypeResolution(String),

    #[error("{type_name}: {message}")]
    KeyMismatch { type_name: String, message: String },

    #[error("invalid declaration of '{type_name}': {message}")]
    InvalidDeclaration { type_name: String, message: String },

    #[error("'{type_name}' object has no attribute '{attr}'")]
    Attribute { type_name: String, attr: String },

    #[error("hook failed: {0}")]
    Hook(String),

    #[error("config error: {}", .0.message)]
    Config(Diagnostic),
}

impl Error {
    pub(crate) fn key_mismatch(type_name: &str, message: String) -> Self {
        Error::KeyMismatch {
            type_name: type_name.to_string(),
            message,
        }
    }

    pub(crate) fn invalid_declaration(type_name: &str, message: String) -> Self {
        Error::InvalidDeclaration {
            type_name: type_name.to_string(),
            message,
        }
    }
}

impl From<Diagnostic> for Error {
    fn from(diag: Diagnostic) -> Self {
        Error::Config(diag)
    }
}
