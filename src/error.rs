//! Error types for the modem driver.

use thiserror::Error;

/// Errors surfaced by the driver's public API.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A command's timeout elapsed before the Response Router delivered a
    /// terminator line.
    #[error("command timed out")]
    Timeout,

    /// The modem replied with a line matching an error pattern (e.g. `ERROR`).
    #[error("modem error: {0}")]
    ModemError(String),

    /// A response did not match the shape expected for the command that
    /// produced it.
    #[error("failed to parse modem response: {0}")]
    ParseError(String),

    /// SBDIX reported status 18 (radio failure).
    #[error("radio failure")]
    RadioFailure,

    /// SBDIX reported status 32 (network failure).
    #[error("network failure")]
    NetworkFailure,

    /// SBDIX reported a status code outside the known set.
    #[error("unknown SBD failure (status {0})")]
    UnknownSbdFailure(u32),

    /// The mailbox send retry loop exhausted `Config::max_attempts`.
    #[error("exceeded maximum send attempts")]
    MaxAttemptsExceeded,

    /// The SBDRB checksum did not match the payload.
    #[error("checksum mismatch in binary read")]
    ChecksumMismatch,

    /// The driver actor task ended while a request was still in flight.
    #[error("driver is no longer running")]
    ActorShutDown,

    /// Programming error: a command was enqueued while one was already
    /// in flight. The actor never does this itself; this only fires if
    /// an internal invariant is violated.
    #[error("a command is already in flight")]
    AlreadyInFlight,
}

pub type Result<T> = std::result::Result<T, Error>;
