use thiserror::Error;

/// Virtual filesystem errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// The path escapes the namespace root or is otherwise unusable.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Missing directory or file.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation requires a file but found a directory, or vice versa.
    #[error("Wrong entry type: {0}")]
    WrongType(String),

    /// The backing store is out of space.
    #[error("Out of space")]
    OutOfSpace,

    /// The namespace refused to bind a store.
    #[error("Mount failed at {location}: {reason}")]
    MountFailed {
        /// Location that could not be bound.
        location: String,
        /// Why the bind was refused.
        reason: String,
    },

    /// A session tried to release a location it never acquired.
    #[error("You didn't mount this location: {0}")]
    ProtocolViolation(String),
}

/// Convenience result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;
