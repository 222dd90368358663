//! In-process mock dialogue backend shared by the integration tests
//!
//! Speaks the simulator's wire protocol over real TCP: routes every posted
//! interaction to all subscribers of its conversation and answers
//! responder-targeted sends with the fixed payload (or a rejection, when
//! failure injection is on). Messages are delivered in post order, matching
//! the backend's per-conversation fan-out.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use dialogue_sim::SessionOptions;
use dialogue_sim::mock_responder::fixed_response;
use dialogue_sim::transport::wire::{ClientFrame, ServerFrame};
use dialogue_sim::types::{Interaction, InteractionRequest};

/// Behavior switches for the mock backend
#[derive(Debug, Clone, Copy)]
pub struct MockBackendConfig {
    /// Reject responder calls instead of answering them
    pub fail_llm: bool,
    /// Route posted messages to subscribers; disable to simulate a backend
    /// that accepts sends but never delivers
    pub route_messages: bool,
}

impl Default for MockBackendConfig {
    fn default() -> Self {
        Self {
            fail_llm: false,
            route_messages: true,
        }
    }
}

struct Hub {
    config: MockBackendConfig,
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<ServerFrame>>>>,
    llm_calls: AtomicUsize,
}

/// A mock backend bound to an ephemeral local port
pub struct MockBackend {
    addr: SocketAddr,
    hub: Arc<Hub>,
}

impl MockBackend {
    /// Start a well-behaved backend
    pub async fn start() -> Self {
        Self::start_with(MockBackendConfig::default()).await
    }

    /// Start a backend that rejects every responder call
    pub async fn start_failing_llm() -> Self {
        Self::start_with(MockBackendConfig {
            fail_llm: true,
            ..Default::default()
        })
        .await
    }

    /// Start a backend that accepts everything but never delivers
    pub async fn start_black_hole() -> Self {
        Self::start_with(MockBackendConfig {
            route_messages: false,
            ..Default::default()
        })
        .await
    }

    pub async fn start_with(config: MockBackendConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        let hub = Arc::new(Hub {
            config,
            subscribers: Mutex::new(HashMap::new()),
            llm_calls: AtomicUsize::new(0),
        });

        let accept_hub = hub.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let hub = accept_hub.clone();
                        tokio::spawn(handle_connection(socket, hub));
                    }
                    Err(_) => break,
                }
            }
        });

        Self { addr, hub }
    }

    /// `host:port` address to hand to a connector
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Number of responder calls received so far
    pub fn llm_calls(&self) -> usize {
        self.hub.llm_calls.load(Ordering::SeqCst)
    }
}

async fn handle_connection(socket: TcpStream, hub: Arc<Hub>) {
    let (read_half, mut write_half) = socket.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerFrame>();

    // single writer per connection; frames may come from this connection's
    // replies or from other connections' broadcasts
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let Ok(mut payload) = serde_json::to_string(&frame) else {
                continue;
            };
            payload.push('\n');
            if write_half.write_all(payload.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let Ok(frame) = serde_json::from_str::<ClientFrame>(trimmed) else {
                    let _ = out_tx.send(ServerFrame::Error {
                        id: None,
                        message: "unparseable frame".to_string(),
                    });
                    continue;
                };
                match frame {
                    ClientFrame::Subscribe { request } => {
                        hub.subscribers
                            .lock()
                            .entry(request.conversation_id.clone())
                            .or_default()
                            .push(out_tx.clone());
                    }
                    ClientFrame::Send { id, request } => {
                        handle_send(&hub, &out_tx, id, request);
                    }
                }
            }
        }
    }
}

fn handle_send(
    hub: &Hub,
    out_tx: &mpsc::UnboundedSender<ServerFrame>,
    id: u64,
    request: InteractionRequest,
) {
    if request.targets_responder() {
        hub.llm_calls.fetch_add(1, Ordering::SeqCst);
        if hub.config.fail_llm {
            let _ = out_tx.send(ServerFrame::Error {
                id: Some(id),
                message: "responder unavailable".to_string(),
            });
        } else {
            let mut reply = interaction_from(&request);
            reply.user_id = "LLMAgent".to_string();
            reply.unstructured_result = Some(fixed_response());
            let _ = out_tx.send(ServerFrame::Reply {
                id,
                interaction: Some(reply),
            });
        }
        return;
    }

    if hub.config.route_messages {
        let interaction = interaction_from(&request);
        let mut subscribers = hub.subscribers.lock();
        if let Some(conversation) = subscribers.get_mut(&request.conversation_id) {
            conversation.retain(|tx| {
                tx.send(ServerFrame::Interaction {
                    interaction: interaction.clone(),
                })
                .is_ok()
            });
        }
    }
    let _ = out_tx.send(ServerFrame::Reply {
        id,
        interaction: None,
    });
}

fn interaction_from(request: &InteractionRequest) -> Interaction {
    Interaction {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: request.conversation_id.clone(),
        user_id: request.user_id.clone(),
        role: request.role,
        kind: request.kind,
        text: request.text.clone(),
        language_code: request.language_code.clone(),
        unstructured_result: None,
        timestamp: Utc::now(),
    }
}

/// Session options tuned for fast tests
pub fn fast_options(num_turns: u32) -> SessionOptions {
    SessionOptions::builder()
        .num_turns(num_turns)
        .delay(Duration::from_millis(10))
        .randomize(false)
        .warmup(Duration::from_millis(50))
        .turn_timeout(Duration::from_secs(5))
        .build()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
