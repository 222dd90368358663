//! # dialogue-sim
//!
//! A test-simulation client for a turn-structured dialogue backend reachable
//! over a bidirectional streaming RPC surface. It emulates a realistic
//! three-party exchange — a WoZ operator, an end user, and a synchronous
//! language-generation responder — to exercise the backend under timed,
//! turn-structured load.
//!
//! The core is the [`session::ConversationSession`] turn engine: per
//! participant it opens a [`transport::DialogueChannel`], drains the inbound
//! stream through a [`listener::StreamListener`] background task, and infers
//! whose turn it is purely from the latest message on each listener. The
//! [`orchestrator`] fans out many sessions as isolated OS processes.
//!
//! ## Example
//!
//! ```no_run
//! use dialogue_sim::{
//!     ConversationIdentity, ConversationSession, SessionOptions, TcpConnector,
//! };
//!
//! # async fn example() -> dialogue_sim::Result<()> {
//! let identity = ConversationIdentity::new("___test_demo_0", "test_agent_demo_0", "test_user_demo_0");
//! let options = SessionOptions::builder().num_turns(3).randomize(true).build();
//!
//! let connector = TcpConnector::new("127.0.0.1:7770");
//! let mut session = ConversationSession::new(identity, options);
//! let report = session.run(&connector).await?;
//! println!("completed {} turns", report.turns_completed);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod listener;
pub mod mock_responder;
pub mod orchestrator;
pub mod session;
pub mod transport;
pub mod types;

pub use error::{Result, SimError};
pub use listener::StreamListener;
pub use orchestrator::{FanOutOptions, FanOutReport};
pub use session::{
    ConversationSession, GREETING_TEXT, SessionReport, SessionState, TurnPhase, TurnState,
};
pub use transport::{Connector, DialogueChannel, TcpChannel, TcpConnector};
pub use types::{
    ConversationIdentity, Interaction, InteractionRequest, InteractionRole, InteractionType,
    SessionOptions, TEST_CONVERSATION_PREFIX,
};
