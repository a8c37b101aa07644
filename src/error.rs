use thiserror::Error;

/// Failures raised while loading or constructing a snapshot.
///
/// Construction either fully succeeds or returns one of these before any
/// snapshot value exists, so callers never observe a half-built graph.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse snapshot document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot metadata is missing field `{0}`")]
    MissingField(&'static str),
    /// The flat tables do not form a valid compressed-sparse-row graph.
    #[error("structural integrity violation: {0}")]
    StructuralIntegrity(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

macro_rules! integrity_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::SnapshotError::StructuralIntegrity(format!($($arg)*)))
    };
}
pub(crate) use integrity_bail;
