//! Forge Client error/result types (spec.md §4.1).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    User,
    Organization,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence {
    Exists,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidity {
    Valid,
    Invalid { reason: String },
}

/// Errors returned by Forge Client operations.
#[derive(Debug, Clone)]
pub enum ForgeError {
    /// No credential is available; the client is in read-only-local mode.
    NetworkError,
    /// The forge returned a non-2xx/404 response.
    Api { code: u16, message: String },
    /// The owner-type probe's response lacked a type field.
    OwnerClassificationUnavailable,
}

impl fmt::Display for ForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForgeError::NetworkError => write!(f, "forge is unreachable (read-only-local mode)"),
            ForgeError::Api { code, message } => write!(f, "forge API error {code}: {message}"),
            ForgeError::OwnerClassificationUnavailable => {
                write!(f, "forge did not report an owner type")
            }
        }
    }
}

impl std::error::Error for ForgeError {}
