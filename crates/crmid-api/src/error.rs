use thiserror::Error;

/// Top-level error type for the `crmid-api` crate.
///
/// Raised by [`RecordSource`](crate::RecordSource) implementations.
/// `crmid-core` maps these into its own diagnostics; the attribute codec
/// and the caches never produce errors of their own.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Structured fault returned by the backend service.
    #[error("Backend fault {code}: {message}")]
    Fault { code: String, message: String },

    /// The requested record or metadata does not exist on the backend.
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The backend payload could not be deserialized into a native record.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String },

    /// The operation is not available on the connected schema version.
    #[error("Operation not supported on this backend: {operation}")]
    Unsupported { operation: String },
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization {
            message: err.to_string(),
        }
    }
}
