//! Unified application error model and mapping helpers.
//! One enum is shared by the bank, the MIME/config readers and the HTTP
//! dispatcher, along with the mapping onto the three wire status codes.

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    NotFound { message: String },
    Auth { message: String },
    Format { message: String },
    UnknownType { message: String },
    Unsupported { message: String },
    Io { message: String },
}

impl AppError {
    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound { message }
            | AppError::Auth { message }
            | AppError::Format { message }
            | AppError::UnknownType { message }
            | AppError::Unsupported { message }
            | AppError::Io { message } => message.as_str(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self { AppError::NotFound { message: msg.into() } }
    pub fn auth<S: Into<String>>(msg: S) -> Self { AppError::Auth { message: msg.into() } }
    pub fn format<S: Into<String>>(msg: S) -> Self { AppError::Format { message: msg.into() } }
    pub fn unknown_type<S: Into<String>>(msg: S) -> Self { AppError::UnknownType { message: msg.into() } }
    pub fn unsupported<S: Into<String>>(msg: S) -> Self { AppError::Unsupported { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { AppError::Io { message: msg.into() } }

    /// Map to HTTP status code. The wire protocol only ever answers 200, 404
    /// and 401: missing keys and I/O failures share 404, every auth or
    /// validation failure shares 401.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::NotFound { .. } | AppError::Io { .. } => 404,
            AppError::Auth { .. }
            | AppError::Format { .. }
            | AppError::UnknownType { .. }
            | AppError::Unsupported { .. } => 401,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
