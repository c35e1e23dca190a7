//! Validation errors for job inputs.

/// A submission precondition that was not met.
///
/// Validation runs synchronously before any network activity and the
/// first violated precondition short-circuits, so a caller always sees
/// the earliest problem in check order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No primary media file has been supplied.
    #[error("A primary media file is required before submitting")]
    MissingPrimaryMedia,

    /// The sound palette is empty.
    #[error("The sound palette must contain at least one entry")]
    EmptyPalette,

    /// The primary selection does not reference any palette entry.
    #[error("The primary sound selection does not match any palette entry")]
    UnknownPrimarySelection,

    /// A configuration value is outside its permitted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
