//! Error types for the reactivity runtime.
//!
//! Two families of failures flow through the crate:
//!
//! - Usage errors: malformed watch sources, operations applied to a value
//!   kind that does not support them, unhashable keys, missing keys or
//!   attributes. These are returned eagerly from the public API.
//!
//! - User-code failures: panics inside effect functions, getters, and watch
//!   callbacks. Those are not converted into `Error`; they unwind through
//!   `Effect::run`, which restores the active-subscriber stack on the way
//!   out.

use thiserror::Error;

/// Errors produced by the reactivity runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// A mapping was asked for a key it does not contain.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A sequence index was out of range.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// An object has no attribute with the given name.
    #[error("no attribute named `{0}`")]
    UnknownAttribute(String),

    /// A value passed to `watch` was neither a ref, a reactive proxy, nor a
    /// getter.
    #[error("invalid watch source type: {0}")]
    InvalidWatchSource(&'static str),

    /// The operation is not defined for this value kind, e.g. `append` on a
    /// mapping or item assignment on a tuple.
    #[error("{kind} value does not support `{op}`")]
    UnsupportedOperation {
        kind: &'static str,
        op: &'static str,
    },

    /// The value cannot be used as a mapping key or set member.
    #[error("{0} value is not hashable")]
    Unhashable(&'static str),

    /// Two values could not be ordered relative to each other during `sort`.
    #[error("values of kind {0} and {1} are not orderable")]
    NotOrderable(&'static str, &'static str),

    /// A value expected to be removed was not present in the container.
    #[error("value not present in {0}")]
    MissingValue(&'static str),

    /// `pop` was called on an empty container.
    #[error("pop from an empty {0}")]
    EmptyPop(&'static str),

    /// A mutation was attempted through a readonly view.
    #[error("cannot mutate a readonly view")]
    ReadonlyViolation,

    /// Assignment to a computed property accessor.
    #[error("attribute `{0}` is read-only")]
    ReadonlyAttribute(String),

    /// JSON serialization failed, either because a value kind has no JSON
    /// representation or because the underlying writer failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
