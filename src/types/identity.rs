//! Conversation identity and test-namespace validation

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Reserved prefix marking a conversation as test traffic.
///
/// The automated responder treats conversations without this prefix as
/// production traffic, so any session that will issue a responder call must
/// carry it.
pub const TEST_CONVERSATION_PREFIX: &str = "___test";

/// The fixed identity of one simulated conversation.
///
/// Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationIdentity {
    /// Conversation id shared by both participants
    pub conversation_id: String,
    /// Operator ("WoZ") user id
    pub woz_id: String,
    /// End-user ("chat") user id
    pub chat_id: String,
}

impl ConversationIdentity {
    /// Create a new conversation identity
    pub fn new(
        conversation_id: impl Into<String>,
        woz_id: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            woz_id: woz_id.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Whether the conversation id carries the reserved test prefix
    pub fn is_test_namespaced(&self) -> bool {
        self.conversation_id.starts_with(TEST_CONVERSATION_PREFIX)
    }

    /// Reject identities that would route responder calls at a
    /// non-namespaced conversation.
    ///
    /// Sessions with more than one turn call this before opening any
    /// connection, so a bad id fails fast instead of mid-run.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidConversationId`] if the prefix is missing.
    pub fn ensure_responder_allowed(&self) -> Result<()> {
        if self.is_test_namespaced() {
            Ok(())
        } else {
            Err(SimError::InvalidConversationId(
                self.conversation_id.clone(),
            ))
        }
    }
}
