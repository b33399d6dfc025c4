use vdoc_core::DataError;
use vdoc_driver::{AccessLevel, DriverError};

/// Errors surfaced by a [`DocumentStore`](crate::DocumentStore).
///
/// Absence is never an error here: missing documents come back as `Ok(None)`
/// and unresolvable references stay in place as markers.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("access denied ({level}): {uri}")]
    AccessDenied { uri: String, level: AccessLevel },

    #[error("not found: {uri}")]
    NotFound { uri: String },

    #[error("core error: {0}")]
    Core(#[from] vdoc_core::Error),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the driver refused the operation for the current context.
    pub fn is_access_denied(&self) -> bool {
        match self {
            StoreError::AccessDenied { .. } => true,
            StoreError::Driver(e) => e.is_access_denied(),
            _ => false,
        }
    }
}

impl From<DataError> for StoreError {
    fn from(error: DataError) -> Self {
        StoreError::Core(error.into())
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_from_either_layer() {
        let direct = StoreError::AccessDenied {
            uri: "/a".to_string(),
            level: AccessLevel::Read,
        };
        assert!(direct.is_access_denied());
        assert_eq!(direct.to_string(), "access denied (read): /a");

        let wrapped: StoreError = DriverError::AccessDenied {
            uri: "/a".to_string(),
            level: AccessLevel::Write,
        }
        .into();
        assert!(wrapped.is_access_denied());

        let other: StoreError = DriverError::not_found("/a").into();
        assert!(!other.is_access_denied());
    }

    #[test]
    fn data_errors_surface_through_core() {
        let e: StoreError = DataError::DepthExceeded {
            key: "k".to_string(),
            max: 1,
        }
        .into();
        assert!(matches!(e, StoreError::Core(vdoc_core::Error::Data(_))));
    }
}
