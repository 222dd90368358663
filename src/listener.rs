//! Stream listener draining one subscription into an ordered buffer
//!
//! Each listener runs as an independent background task for the session's
//! lifetime. It appends every received interaction to a bounded ring of
//! recent messages and publishes the tail through a watch channel, so the
//! turn engine can block on "last message's sender matches" with a deadline
//! instead of spinning on a poll interval.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{Result, SimError};
use crate::types::Interaction;

/// Ring capacity for the per-listener history.
///
/// Only the tail is consulted by the turn engine; the history exists for
/// reporting and assertions.
const BUFFER_CAPACITY: usize = 1000;

/// Tail of a listener's buffer
#[derive(Debug, Clone, Default)]
enum Tail {
    /// Nothing received yet
    #[default]
    Empty,
    /// Most recently received interaction
    Message(Interaction),
    /// The underlying stream ended or failed
    Closed,
}

/// Background drain task for one participant's inbound stream
pub struct StreamListener {
    label: String,
    history: Arc<Mutex<VecDeque<Interaction>>>,
    tail: watch::Receiver<Tail>,
    task: JoinHandle<()>,
}

impl StreamListener {
    /// Spawn a listener over a subscription receiver.
    ///
    /// The task runs until the stream closes or the listener is dropped;
    /// it never signals completion back to the turn engine.
    pub fn spawn(
        label: impl Into<String>,
        mut stream: mpsc::UnboundedReceiver<Result<Interaction>>,
    ) -> Self {
        let label = label.into();
        let history = Arc::new(Mutex::new(VecDeque::with_capacity(64)));
        let (tail_tx, tail_rx) = watch::channel(Tail::Empty);

        let task_label = label.clone();
        let task_history = history.clone();
        let task = tokio::spawn(async move {
            while let Some(item) = stream.recv().await {
                match item {
                    Ok(interaction) => {
                        log::debug!(
                            "[{task_label}] received message from {}",
                            interaction.user_id
                        );
                        {
                            let mut history = task_history.lock();
                            if history.len() == BUFFER_CAPACITY {
                                history.pop_front();
                            }
                            history.push_back(interaction.clone());
                        }
                        tail_tx.send_replace(Tail::Message(interaction));
                    }
                    Err(e) => {
                        log::error!("[{task_label}] stream error: {e}");
                        tail_tx.send_replace(Tail::Closed);
                        return;
                    }
                }
            }
            log::debug!("[{task_label}] stream ended");
            tail_tx.send_replace(Tail::Closed);
        });

        Self {
            label,
            history,
            tail: tail_rx,
            task,
        }
    }

    /// Wait until the buffer is non-empty and its most recent message was
    /// sent by `sender`.
    ///
    /// Returns `Ok(Some(message))` when the condition holds (including when
    /// it already holds on entry), `Ok(None)` if the deadline passes first.
    ///
    /// # Errors
    /// Returns [`SimError::Rpc`] if the subscription stream closed, since
    /// the expected message can then never arrive.
    pub async fn wait_for_sender(
        &mut self,
        sender: &str,
        timeout: Duration,
    ) -> Result<Option<Interaction>> {
        let wait = self.tail.wait_for(|tail| match tail {
            Tail::Message(message) => message.user_id == sender,
            Tail::Closed => true,
            Tail::Empty => false,
        });

        let outcome = match tokio::time::timeout(timeout, wait).await {
            Err(_) => Ok(None),
            Ok(Err(_)) => Err(()),
            Ok(Ok(tail)) => match &*tail {
                Tail::Message(message) => Ok(Some(message.clone())),
                _ => Err(()),
            },
        };
        match outcome {
            Ok(result) => Ok(result),
            Err(()) => Err(self.closed_error()),
        }
    }

    /// Most recently received message, if any
    pub fn last_message(&self) -> Option<Interaction> {
        match &*self.tail.borrow() {
            Tail::Message(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Snapshot of the recorded history, oldest first
    pub fn messages(&self) -> Vec<Interaction> {
        self.history.lock().iter().cloned().collect()
    }

    /// Number of messages currently recorded
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    /// Listener label used in logs
    pub fn label(&self) -> &str {
        &self.label
    }

    fn closed_error(&self) -> SimError {
        SimError::rpc(format!("[{}] subscription stream closed", self.label))
    }
}

impl Drop for StreamListener {
    fn drop(&mut self) {
        // listener lifetime is tied to the session; release the drain task
        // deterministically instead of leaving it to process exit
        self.task.abort();
    }
}
