//! Error types for the dialogue simulator

use thiserror::Error;

/// Main error type for the simulator
#[derive(Error, Debug)]
pub enum SimError {
    /// Failure to establish a channel or streaming subscription.
    ///
    /// Fatal to the session that raised it; never retried. The simulator
    /// assumes a reachable, correctly configured backend.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failure of an individual send or responder call (transport failure
    /// or backend rejection). Fatal to the session.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A turn-engine wait exceeded its configured bound
    #[error("turn {turn} timed out after {waited_secs:.1}s while {phase}")]
    TurnTimeout {
        /// Turn index that was in progress
        turn: u32,
        /// Phase the turn was stuck in
        phase: crate::session::TurnPhase,
        /// How long the engine waited, in seconds
        waited_secs: f64,
    },

    /// The responder's payload is missing the expected text field
    #[error("Malformed responder reply: {message}")]
    MalformedReply {
        /// Error message
        message: String,
        /// Raw payload that failed to yield a reply text
        data: Option<serde_json::Value>,
    },

    /// A conversation id without the reserved test prefix was asked to
    /// perform a responder call
    #[error(
        "conversation id {0:?} must start with the reserved test prefix when responder calls are required"
    )]
    InvalidConversationId(String),

    /// JSON decode error on a wire frame
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an RPC error
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// Create a malformed-reply error
    pub fn malformed_reply(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MalformedReply {
            message: msg.into(),
            data,
        }
    }
}
