//! Conversation session: the turn-taking engine
//!
//! A session emulates one complete dialogue between a WoZ operator and an
//! end user. It owns two channels (one per participant) and two stream
//! listeners, and drives a strict alternating-turn protocol inferred purely
//! from the asynchronously arriving stream data: the engine only ever looks
//! at the most recent message on each listener and who sent it.
//!
//! Lifecycle: INIT -> SUBSCRIBING -> WARMUP -> RUNNING -> DONE. Turn 0 is
//! operator-initiated with no responder involvement; every later turn is
//! gated on the previous reply and mediated by a synchronous responder call.

pub mod responder;

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::sleep;

use crate::error::{Result, SimError};
use crate::listener::StreamListener;
use crate::transport::{Connector, DialogueChannel};
use crate::types::{
    ConversationIdentity, Interaction, InteractionRequest, InteractionRole, SessionOptions,
};

/// Greeting the operator opens every conversation with
pub const GREETING_TEXT: &str =
    "Hello there, I'm here to assist you in your culinary adventures";

/// Coarse lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing opened yet
    Init,
    /// Opening channels and subscriptions
    Subscribing,
    /// Waiting out the warm-up window
    Warmup,
    /// Executing turns
    Running,
    /// All turns completed
    Done,
}

/// Phase within one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Waiting for the greeting to propagate to the end-user listener
    AwaitingGreetingAck,
    /// Waiting for the previous turn's reply on the operator listener
    AwaitingUserReply,
    /// Blocked on the synchronous responder call
    AwaitingResponderCall,
    /// Waiting for the forwarded responder text on the end-user listener
    AwaitingForwardAck,
    /// Turn finished
    TurnComplete,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AwaitingGreetingAck => "awaiting greeting ack",
            Self::AwaitingUserReply => "awaiting user reply",
            Self::AwaitingResponderCall => "awaiting responder call",
            Self::AwaitingForwardAck => "awaiting forward ack",
            Self::TurnComplete => "turn complete",
        };
        f.write_str(text)
    }
}

/// Turn counter plus current phase; mutated only by the session's own
/// control task, never by listeners
#[derive(Debug, Clone, Copy)]
pub struct TurnState {
    /// Zero-based turn index
    pub index: u32,
    /// Current phase within the turn
    pub phase: TurnPhase,
}

/// Outcome summary for one completed session
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Conversation the session ran
    pub conversation_id: String,
    /// Turns fully executed (equals the configured count on success)
    pub turns_completed: u32,
    /// Synchronous responder calls issued
    pub responder_calls: u32,
    /// Messages recorded by the operator-side listener
    pub woz_messages_observed: usize,
    /// Messages recorded by the end-user-side listener
    pub chat_messages_observed: usize,
}

/// One simulated end-to-end dialogue instance
pub struct ConversationSession {
    identity: ConversationIdentity,
    options: SessionOptions,
    state: SessionState,
}

impl ConversationSession {
    /// Create a session; nothing is opened until [`run`](Self::run)
    pub fn new(identity: ConversationIdentity, options: SessionOptions) -> Self {
        Self {
            identity,
            options,
            state: SessionState::Init,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The session's fixed conversation identity
    pub fn identity(&self) -> &ConversationIdentity {
        &self.identity
    }

    /// Run the full conversation: subscribe both participants, wait out the
    /// warm-up window, then execute every turn sequentially.
    ///
    /// # Errors
    /// Any connection, RPC, timeout, or responder failure aborts the
    /// remaining turns and is returned; nothing is swallowed or retried.
    pub async fn run<F: Connector>(&mut self, connector: &F) -> Result<SessionReport> {
        let conversation_id = self.identity.conversation_id.clone();
        log::info!("[{conversation_id}] starting conversation");

        // Responder calls happen from turn 1 on; reject a bad namespace
        // before opening any connection.
        if self.options.num_turns > 1 {
            self.identity.ensure_responder_allowed()?;
        }

        self.state = SessionState::Subscribing;
        let mut woz_channel = connector.open().await?;
        let woz_stream = woz_channel
            .subscribe(&conversation_id, &self.identity.woz_id)
            .await?;
        let woz_listener = StreamListener::spawn(format!("{conversation_id}:WOZ"), woz_stream);

        let mut chat_channel = connector.open().await?;
        let chat_stream = chat_channel
            .subscribe(&conversation_id, &self.identity.chat_id)
            .await?;
        let chat_listener = StreamListener::spawn(format!("{conversation_id}:CHAT"), chat_stream);

        // Let any backlog already queued on the backend drain into the
        // buffers before the turn loop starts trusting them.
        self.state = SessionState::Warmup;
        sleep(self.options.warmup).await;
        log::info!(
            "[{conversation_id}] received {} initial messages, starting {} turns",
            woz_listener.len() + chat_listener.len(),
            self.options.num_turns
        );

        self.state = SessionState::Running;
        let mut active = ActiveSession {
            identity: self.identity.clone(),
            options: self.options.clone(),
            woz_channel,
            chat_channel,
            woz_listener,
            chat_listener,
            turn: TurnState {
                index: 0,
                phase: TurnPhase::TurnComplete,
            },
            responder_calls: 0,
        };

        for turn_index in 0..self.options.num_turns {
            log::info!(
                "[{conversation_id}] ________ TURN {turn_index}/{} ________",
                self.options.num_turns
            );
            active.do_turn(turn_index).await?;
            active.pace().await;
        }

        self.state = SessionState::Done;
        log::info!("[{conversation_id}] conversation done");

        let report = SessionReport {
            conversation_id,
            turns_completed: self.options.num_turns,
            responder_calls: active.responder_calls,
            woz_messages_observed: active.woz_listener.len(),
            chat_messages_observed: active.chat_listener.len(),
        };
        active.teardown().await;
        Ok(report)
    }
}

/// Session with live channels and listeners; exists only inside `run`
struct ActiveSession<C: DialogueChannel> {
    identity: ConversationIdentity,
    options: SessionOptions,
    woz_channel: C,
    chat_channel: C,
    woz_listener: StreamListener,
    chat_listener: StreamListener,
    turn: TurnState,
    responder_calls: u32,
}

impl<C: DialogueChannel> ActiveSession<C> {
    async fn do_turn(&mut self, turn_index: u32) -> Result<()> {
        self.turn = TurnState {
            index: turn_index,
            phase: TurnPhase::TurnComplete,
        };

        if turn_index == 0 {
            // First turn: the operator initiates immediately, no responder.
            self.send_woz_to_chat(GREETING_TEXT.to_string()).await?;

            self.await_on_chat(TurnPhase::AwaitingGreetingAck).await?;

            log::debug!(
                "[{}] user received message, sending reply",
                self.identity.conversation_id
            );
            self.send_chat_to_woz(format!("chat reply to turn {turn_index}"))
                .await?;
        } else {
            // The previous turn ended with the user's reply; its arrival on
            // the operator's subscription is what opens this turn.
            self.await_on_woz(TurnPhase::AwaitingUserReply).await?;

            self.turn.phase = TurnPhase::AwaitingResponderCall;
            let reply_text = self.call_responder().await?;
            log::info!(
                "[{}] forwarding responder reply [{reply_text}] to chat",
                self.identity.conversation_id
            );
            self.send_woz_to_chat(format!("WoZ #{turn_index}, {reply_text}"))
                .await?;

            self.await_on_chat(TurnPhase::AwaitingForwardAck).await?;

            self.send_chat_to_woz(format!("chat reply to turn {turn_index}"))
                .await?;
        }

        self.turn.phase = TurnPhase::TurnComplete;
        Ok(())
    }

    /// Send an operator message to the user, then pace
    async fn send_woz_to_chat(&mut self, text: String) -> Result<()> {
        log::debug!("[{}] send_woz_to_chat: {text}", self.identity.conversation_id);
        let request = InteractionRequest::message(
            &self.identity.conversation_id,
            &self.identity.woz_id,
            InteractionRole::Assistant,
            text,
        );
        self.woz_channel.send(request).await?;
        self.pace().await;
        Ok(())
    }

    /// Send a user message to the operator, then pace
    async fn send_chat_to_woz(&mut self, text: String) -> Result<()> {
        log::debug!("[{}] send_chat_to_woz: {text}", self.identity.conversation_id);
        let request = InteractionRequest::message(
            &self.identity.conversation_id,
            &self.identity.chat_id,
            InteractionRole::NoRole,
            text,
        );
        self.chat_channel.send(request).await?;
        self.pace().await;
        Ok(())
    }

    /// Issue the synchronous responder call and extract the reply text.
    ///
    /// Blocks the turn loop until the responder answers; the next outbound
    /// message depends on its content, so no other work proceeds.
    async fn call_responder(&mut self) -> Result<String> {
        log::debug!(
            "[{}] WoZ requesting responder reply",
            self.identity.conversation_id
        );
        let request = responder::responder_request(&self.identity)?;
        let reply = self.woz_channel.send(request).await?.ok_or_else(|| {
            SimError::malformed_reply("responder returned no reply message", None)
        })?;
        self.responder_calls += 1;
        responder::extract_reply_text(&reply)
    }

    /// Wait until the end-user listener's latest message came from the
    /// operator
    async fn await_on_chat(&mut self, phase: TurnPhase) -> Result<Interaction> {
        self.turn.phase = phase;
        let started = Instant::now();
        let found = self
            .chat_listener
            .wait_for_sender(&self.identity.woz_id, self.options.turn_timeout)
            .await?;
        found.ok_or_else(|| Self::timeout_error(self.turn, started))
    }

    /// Wait until the operator listener's latest message came from the
    /// end user
    async fn await_on_woz(&mut self, phase: TurnPhase) -> Result<Interaction> {
        self.turn.phase = phase;
        let started = Instant::now();
        let found = self
            .woz_listener
            .wait_for_sender(&self.identity.chat_id, self.options.turn_timeout)
            .await?;
        found.ok_or_else(|| Self::timeout_error(self.turn, started))
    }

    fn timeout_error(turn: TurnState, started: Instant) -> SimError {
        SimError::TurnTimeout {
            turn: turn.index,
            phase: turn.phase,
            waited_secs: started.elapsed().as_secs_f64(),
        }
    }

    /// Sleep the base delay plus, when randomization is on, a uniform
    /// jitter in `[0, jitter_cap)`. Applied unconditionally, including
    /// after the final turn.
    async fn pace(&self) {
        let mut period = self.options.delay;
        if self.options.randomize && !self.options.jitter_cap.is_zero() {
            let jitter = rand::thread_rng().gen_range(0.0..self.options.jitter_cap.as_secs_f64());
            period += Duration::from_secs_f64(jitter);
        }
        log::debug!(
            "[{}] delay for {:.2}s...",
            self.identity.conversation_id,
            period.as_secs_f64()
        );
        sleep(period).await;
    }

    async fn teardown(mut self) {
        // listeners abort their drain tasks on drop; channels just need
        // their sockets shut down
        if let Err(e) = self.woz_channel.close().await {
            log::warn!("[{}] woz channel close: {e}", self.identity.conversation_id);
        }
        if let Err(e) = self.chat_channel.close().await {
            log::warn!("[{}] chat channel close: {e}", self.identity.conversation_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_names() {
        assert_eq!(
            TurnPhase::AwaitingGreetingAck.to_string(),
            "awaiting greeting ack"
        );
        assert_eq!(
            TurnPhase::AwaitingResponderCall.to_string(),
            "awaiting responder call"
        );
    }

    #[test]
    fn session_starts_in_init() {
        let session = ConversationSession::new(
            ConversationIdentity::new("___test_s_0", "w1", "u1"),
            SessionOptions::default(),
        );
        assert_eq!(session.state(), SessionState::Init);
    }
}
