//! Type definitions for the dialogue simulator
//!
//! Organized into submodules:
//! - [`interaction`] - messages and send envelopes on the backend surface
//! - [`identity`] - conversation/participant identity and namespacing
//! - [`options`] - session configuration

pub mod identity;
pub mod interaction;
pub mod options;

pub use identity::{ConversationIdentity, TEST_CONVERSATION_PREFIX};
pub use interaction::{
    ClientId, Interaction, InteractionRequest, InteractionRole, InteractionType, LLM_AGENT,
    WIZARD_AGENT,
};
pub use options::{SessionOptions, SessionOptionsBuilder};
