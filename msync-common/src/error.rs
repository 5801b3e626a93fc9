//! Common error types for msync

use thiserror::Error;

/// Common result type for msync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the msync crates
///
/// Per-artist failures (`ArtistNotFound`, `RemoteOperation`) are caught at
/// the worker that produced them and aggregated into the run's error
/// counter; they never abort a batch. `Config` and `Interrupted` are fatal.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identifier resolution found no candidate for the artist
    #[error("Artist not found: {0}")]
    ArtistNotFound(String),

    /// A ledger operation referenced a name that is not in the ledger
    #[error("Unknown artist in ledger: {0}")]
    UnknownArtist(String),

    /// Add/delete/list call against the remote catalog failed
    #[error("Remote catalog operation failed: {0}")]
    RemoteOperation(String),

    /// The ledger file could not be written
    #[error("Ledger persistence failed: {0}")]
    Persistence(String),

    /// MPD protocol error (ACK response or malformed exchange)
    #[error("MPD protocol error: {0}")]
    Protocol(String),

    /// The run was interrupted by the operator
    #[error("Sync interrupted")]
    Interrupted,
}

impl Error {
    /// Whether this error indicates a lost connection to the music source,
    /// in which case callers reconnect and retry once.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
