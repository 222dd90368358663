//! TCP transport speaking newline-delimited JSON frames
//!
//! Each [`TcpChannel`] owns one socket. A background reader task drains the
//! socket for the lifetime of the connection, routing pushed interactions to
//! the subscription channel and correlating `reply`/`error` frames with
//! in-flight `send` calls through per-request oneshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::wire::{ClientFrame, ServerFrame};
use super::{Connector, DialogueChannel};
use crate::error::{Result, SimError};
use crate::types::{Interaction, InteractionRequest};

type ReplySender = oneshot::Sender<Result<Option<Interaction>>>;
type PendingReplies = Arc<Mutex<HashMap<u64, ReplySender>>>;
type SubscriptionSlot = Arc<Mutex<Option<mpsc::UnboundedSender<Result<Interaction>>>>>;

/// Connector dialing a fixed backend address
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    /// Create a connector for the given `host:port` address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The backend address this connector dials
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connector for TcpConnector {
    type Channel = TcpChannel;

    async fn open(&self) -> Result<TcpChannel> {
        TcpChannel::connect(&self.address).await
    }
}

/// One connection to the dialogue backend on behalf of one participant
#[derive(Debug)]
pub struct TcpChannel {
    writer: OwnedWriteHalf,
    pending: PendingReplies,
    subscription: SubscriptionSlot,
    ready: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
    next_request_id: u64,
    peer: String,
}

impl TcpChannel {
    /// Dial the backend and start the background reader.
    ///
    /// # Errors
    /// Returns [`SimError::Connection`] if the socket cannot be established.
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| SimError::connection(format!("failed to connect to {address}: {e}")))?;
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let subscription: SubscriptionSlot = Arc::new(Mutex::new(None));
        let ready = Arc::new(AtomicBool::new(true));

        let reader_task = tokio::spawn(Self::reader_loop(
            read_half,
            pending.clone(),
            subscription.clone(),
            ready.clone(),
        ));

        Ok(Self {
            writer: write_half,
            pending,
            subscription,
            ready,
            reader_task,
            next_request_id: 0,
            peer: address.to_string(),
        })
    }

    /// Drain the socket for the lifetime of the connection.
    ///
    /// Pushed interactions go to the subscription channel; replies and
    /// request-scoped errors resolve their pending oneshot. When the socket
    /// closes, every in-flight request is failed and the subscription sender
    /// is dropped so the listener observes end-of-stream.
    async fn reader_loop(
        read_half: OwnedReadHalf,
        pending: PendingReplies,
        subscription: SubscriptionSlot,
        ready: Arc<AtomicBool>,
    ) {
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<ServerFrame>(trimmed) {
                        Ok(ServerFrame::Interaction { interaction }) => {
                            if let Some(tx) = subscription.lock().as_ref() {
                                // receiver dropped means the session is
                                // tearing down; keep draining for replies
                                let _ = tx.send(Ok(interaction));
                            }
                        }
                        Ok(ServerFrame::Reply { id, interaction }) => {
                            if let Some(tx) = pending.lock().remove(&id) {
                                let _ = tx.send(Ok(interaction));
                            } else {
                                log::warn!("reply for unknown request id {id}");
                            }
                        }
                        Ok(ServerFrame::Error {
                            id: Some(id),
                            message,
                        }) => {
                            if let Some(tx) = pending.lock().remove(&id) {
                                let _ = tx.send(Err(SimError::rpc(message)));
                            }
                        }
                        Ok(ServerFrame::Error { id: None, message }) => {
                            if let Some(tx) = subscription.lock().as_ref() {
                                let _ = tx.send(Err(SimError::rpc(message)));
                            }
                        }
                        Err(e) => {
                            if let Some(tx) = subscription.lock().as_ref() {
                                let _ = tx.send(Err(SimError::JsonDecode(e)));
                            }
                        }
                    }
                }
                Err(e) => {
                    if let Some(tx) = subscription.lock().as_ref() {
                        let _ = tx.send(Err(SimError::Io(e)));
                    }
                    break;
                }
            }
        }

        ready.store(false, Ordering::SeqCst);
        for (_, tx) in pending.lock().drain() {
            let _ = tx.send(Err(SimError::connection("stream closed before reply")));
        }
        // dropping the sender closes the listener's receive loop
        subscription.lock().take();
    }

    async fn write_frame(&mut self, frame: &ClientFrame) -> std::io::Result<()> {
        let mut payload = serde_json::to_string(frame)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        payload.push('\n');
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.flush().await
    }
}

impl DialogueChannel for TcpChannel {
    async fn subscribe(
        &mut self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<mpsc::UnboundedReceiver<Result<Interaction>>> {
        if !self.is_ready() {
            return Err(SimError::connection(format!(
                "channel to {} is not connected",
                self.peer
            )));
        }
        if self.subscription.lock().is_some() {
            return Err(SimError::connection(
                "channel already has an active subscription",
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.subscription.lock() = Some(tx);

        let request = InteractionRequest::scoped(conversation_id, user_id);
        let frame = ClientFrame::Subscribe { request };
        if let Err(e) = self.write_frame(&frame).await {
            self.subscription.lock().take();
            return Err(SimError::connection(format!(
                "failed to open subscription for {user_id}@{conversation_id}: {e}"
            )));
        }

        log::debug!("subscribed {user_id}@{conversation_id} via {}", self.peer);
        Ok(rx)
    }

    async fn send(&mut self, request: InteractionRequest) -> Result<Option<Interaction>> {
        if !self.is_ready() {
            return Err(SimError::rpc(format!(
                "channel to {} is not connected",
                self.peer
            )));
        }

        self.next_request_id += 1;
        let id = self.next_request_id;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let frame = ClientFrame::Send { id, request };
        if let Err(e) = self.write_frame(&frame).await {
            self.pending.lock().remove(&id);
            return Err(SimError::rpc(format!("failed to write send frame: {e}")));
        }

        rx.await
            .map_err(|_| SimError::rpc("connection closed before reply"))?
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);
        let _ = self.writer.shutdown().await;
        self.reader_task.abort();
        Ok(())
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
