//! Wire frames for the newline-delimited JSON transport
//!
//! The backend contract is behavioral rather than byte-exact: each line
//! carries one frame. Clients issue `subscribe` and `send` frames; the
//! server pushes `interaction` frames for every message posted to a
//! subscribed conversation and answers each `send` with a correlated
//! `reply` (or `error`) frame.

use serde::{Deserialize, Serialize};

use crate::types::{Interaction, InteractionRequest};

/// Frames sent client -> server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Open the server-push stream for the request's
    /// (conversation, user) pair
    Subscribe {
        /// Scoping request; only conversation and user ids are consulted
        request: InteractionRequest,
    },
    /// Post one interaction; the server answers with a `reply` frame
    /// carrying the same id
    Send {
        /// Correlation id, unique per connection
        id: u64,
        /// The outbound interaction envelope
        request: InteractionRequest,
    },
}

/// Frames sent server -> client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A message pushed on the subscription stream
    Interaction {
        /// The observed message
        interaction: Interaction,
    },
    /// Answer to a `send` frame
    Reply {
        /// Correlation id of the originating `send`
        id: u64,
        /// The responder's reply, when the send targeted the responder
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interaction: Option<Interaction>,
    },
    /// Backend rejection; scoped to one request when `id` is present,
    /// otherwise fatal to the subscription
    Error {
        /// Correlation id of the rejected `send`, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        /// Human-readable rejection reason
        message: String,
    },
}
