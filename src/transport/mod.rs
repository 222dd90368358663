//! Transport layer for talking to the dialogue backend
//!
//! One [`DialogueChannel`] is one authenticated connection on behalf of one
//! logical participant. It exposes the two operations the simulator needs:
//! a long-lived server-push subscription and a unary send whose reply is
//! only meaningful for responder calls.

pub mod tcp;
pub mod wire;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{Interaction, InteractionRequest};

/// A channel to the dialogue backend held on behalf of one participant.
///
/// Implementations spawn a background reader so that the inbound stream is
/// drained concurrently with the caller's control flow; `subscribe` hands
/// back an owned receiver the caller can consume at its own pace.
pub trait DialogueChannel: Send {
    /// Open the long-lived server-push stream for one
    /// (conversation, user) pair.
    ///
    /// At most one subscription may be active per channel.
    ///
    /// # Errors
    /// Returns [`crate::SimError::Connection`] if the stream cannot be
    /// established; the failure is fatal to the session and not retried.
    fn subscribe(
        &mut self,
        conversation_id: &str,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<mpsc::UnboundedReceiver<Result<Interaction>>>> + Send;

    /// Transmit one outbound interaction.
    ///
    /// When the request targets the automated responder the call is
    /// synchronous and the result is the single reply message; for ordinary
    /// participant sends callers ignore the result.
    ///
    /// # Errors
    /// Returns [`crate::SimError::Rpc`] on transport failure or backend
    /// rejection; fatal to the session.
    fn send(
        &mut self,
        request: InteractionRequest,
    ) -> impl std::future::Future<Output = Result<Option<Interaction>>> + Send;

    /// Whether the channel is connected and usable
    fn is_ready(&self) -> bool;

    /// Close the channel and release its background reader
    fn close(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Factory opening one [`DialogueChannel`] per participant.
///
/// A session opens two channels through the same connector; tests substitute
/// an in-memory implementation.
pub trait Connector: Send + Sync {
    /// Channel type produced by this connector
    type Channel: DialogueChannel;

    /// Open and connect a fresh channel.
    ///
    /// # Errors
    /// Returns [`crate::SimError::Connection`] if the transport cannot be
    /// established.
    fn open(&self) -> impl std::future::Future<Output = Result<Self::Channel>> + Send;
}

pub use tcp::{TcpChannel, TcpConnector};
