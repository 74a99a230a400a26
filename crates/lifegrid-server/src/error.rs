//! Error types for the websocket server.
//!
//! [`CommandError`] covers everything reported back to a client. Its
//! `Display` text is exactly the `error` string sent on the wire, and it
//! converts into an [`OutgoingMessage`] with `From`.
//!
//! [`ConnectionError`] covers the transport: once a write fails the
//! current dispatch stops.

use crate::protocol::OutgoingMessage;

/// A client-visible command failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Unknown command name, or a frame / payload that does not decode.
    #[error("unknown command")]
    UnknownCommand,

    /// `cells` missing, malformed, or without a single valid entry.
    #[error("invalid cells data")]
    InvalidCells,

    /// `sync` without usable bounds.
    #[error("bounds not provided")]
    BoundsNotProvided,

    /// `observe` without usable bounds.
    #[error("invalid bounds data")]
    InvalidBounds,

    /// Width or height is zero or negative.
    #[error("bounds must have positive width and height")]
    NonPositiveBounds,

    /// Diagonal larger than the configured maximum.
    #[error("bounds diagonal length exceeds maximum allowed ({max})")]
    RegionTooLarge {
        /// Configured maximum diagonal.
        max: u32,
    },

    /// `unobserve` with no active region.
    #[error("not observing any grid")]
    NotObserving,
}

impl From<CommandError> for OutgoingMessage {
    fn from(err: CommandError) -> Self {
        Self::error(err.to_string())
    }
}

/// Failure writing to or reading from a client socket.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The websocket layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),

    /// The connection was closed and accepts no more commands.
    #[error("connection closed")]
    Closed(#[from] tokio::sync::AcquireError),
}
