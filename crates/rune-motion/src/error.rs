//! Error types for the motion engine.

use thiserror::Error;

use super::types::Key;

/// Result type for list operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors raised by the few fallible list operations.
///
/// State machine paths never fail; they degrade to settling immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MotionError {
    /// The same key appeared twice in one desired key list.
    #[error("duplicate key in list: {0}")]
    DuplicateKey(Key),

    /// The list was used after `dispose`.
    #[error("motion list has been disposed")]
    Disposed,
}
