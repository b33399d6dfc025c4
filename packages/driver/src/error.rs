//! Error types for the driver layer.
//!
//! Errors at this level are transport-focused. The store maps everything except
//! `AccessDenied` onto "not found"; semantic failures belong in higher layers.

/// Errors raised by a [`Driver`](crate::Driver).
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Nothing exists at the address.
    #[error("not found: {uri}")]
    NotFound { uri: String },

    /// The driver refused the operation for the current access context.
    ///
    /// This is the only driver failure the store propagates as fatal.
    #[error("access denied ({level}): {uri}")]
    AccessDenied { uri: String, level: crate::AccessLevel },

    /// The operation is not supported by this driver.
    ///
    /// For example, appending to a read-only backend.
    #[error("operation not supported: {operation}")]
    NotSupported { operation: &'static str },

    /// The address is malformed for this backend (e.g. escapes its root).
    #[error("invalid address '{uri}': {message}")]
    InvalidAddress { uri: String, message: String },

    /// Local I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic transport failure (network, IPC, ...).
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl DriverError {
    /// Shorthand for a not-found error.
    pub fn not_found(uri: impl Into<String>) -> Self {
        DriverError::NotFound { uri: uri.into() }
    }

    /// Check whether this error must terminate the calling operation.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, DriverError::AccessDenied { .. })
    }

    /// Check whether this error means "nothing there".
    pub fn is_not_found(&self) -> bool {
        match self {
            DriverError::NotFound { .. } => true,
            DriverError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
