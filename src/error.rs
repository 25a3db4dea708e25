//! Error types for store construction and action dispatch.

use thiserror::Error;

/// Errors surfaced by [`Store`](crate::Store) and
/// [`ReactiveState`](crate::ReactiveState) operations.
///
/// All errors are synchronous and returned to the immediate caller; no
/// operation retries internally.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The value supplied as initial state was not a JSON object.
    #[error("state must be an object, got {0}")]
    InvalidState(&'static str),

    /// `dispatch` was called with a name that no configured action matches.
    #[error("no action named `{0}` is registered")]
    UnknownAction(String),

    /// `dispatch` resolved the name to a configured entry that is not a
    /// handler function.
    #[error("action `{0}` is not callable")]
    ActionNotCallable(String),
}

/// Convenience alias for results carrying a [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
