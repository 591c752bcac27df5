//! Error types for the virtual SMC key store

use std::io;
use thiserror::Error;

/// Result type alias for vsmc operations
pub type Result<T> = std::result::Result<T, SmcError>;

/// IOKit-style numeric status code returned across the user-client boundary.
pub type IoReturn = u32;

/// `kIOReturnSuccess`
pub const IO_RETURN_SUCCESS: IoReturn = 0;
/// `kIOReturnError`
pub const IO_RETURN_ERROR: IoReturn = 0xE000_02BC;
/// `kIOReturnBadArgument`
pub const IO_RETURN_BAD_ARGUMENT: IoReturn = 0xE000_02C2;
/// `kIOReturnNotAttached`
pub const IO_RETURN_NOT_ATTACHED: IoReturn = 0xE000_02D9;
/// `kIOReturnNotPermitted`
pub const IO_RETURN_NOT_PERMITTED: IoReturn = 0xE000_02E2;
/// `kIOReturnNotFound`
pub const IO_RETURN_NOT_FOUND: IoReturn = 0xE000_02F0;

/// Error type for store, protocol, and sensor operations
#[derive(Error, Debug)]
pub enum SmcError {
    /// Session has no attached, active key store
    #[error("no attached key store")]
    NotAttached,

    /// Key name or index not present in the store
    #[error("key not found: {0}")]
    NotFound(String),

    /// Caller lacks administrator privilege for a mutating command
    #[error("operation not permitted")]
    NotPermitted,

    /// Unrecognized outer selector or inner command byte
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Supplied payload exceeds the key's declared size
    #[error("payload of {supplied} bytes exceeds declared size {declared}")]
    PayloadTooLarge { supplied: usize, declared: usize },

    /// Attempted to create a key whose name is already registered
    #[error("key already exists: {0}")]
    KeyAlreadyExists(String),

    /// Key name is not exactly 4 printable ASCII characters
    #[error("invalid key name: {0}")]
    InvalidName(String),

    /// Sensor back-end could not produce a reading
    #[error("sensor error: {0}")]
    Sensor(String),

    /// I/O error (config persistence)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration parse error
    #[error("configuration error: {0}")]
    Config(String),
}

impl SmcError {
    /// Map this error onto the numeric status code existing user-space
    /// callers expect from the external-method boundary.
    pub fn io_return(&self) -> IoReturn {
        match self {
            SmcError::NotAttached => IO_RETURN_NOT_ATTACHED,
            SmcError::NotFound(_) => IO_RETURN_NOT_FOUND,
            SmcError::NotPermitted => IO_RETURN_NOT_PERMITTED,
            SmcError::BadArgument(_)
            | SmcError::PayloadTooLarge { .. }
            | SmcError::InvalidName(_) => IO_RETURN_BAD_ARGUMENT,
            _ => IO_RETURN_ERROR,
        }
    }
}
