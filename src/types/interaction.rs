//! Interaction types exchanged with the dialogue backend
//!
//! These mirror the backend's message surface behaviorally: an
//! [`Interaction`] is one message observed on a conversation stream, and an
//! [`InteractionRequest`] is the envelope a client sends to post one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agent name the backend routes ordinary participant messages through
pub const WIZARD_AGENT: &str = "WizardOfOz";

/// Agent name for the synchronous language-generation responder
pub const LLM_AGENT: &str = "LLMAgent";

/// Role of the participant that produced an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionRole {
    /// Default role, used for end-user messages
    #[default]
    NoRole,
    /// Operator-originated (assistant) messages
    Assistant,
}

/// Payload kind of an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// Plain text message
    #[default]
    Text,
    /// Audio payload
    Audio,
    /// Client action
    Action,
}

/// Identity tag of the client software issuing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientId {
    /// Standalone client such as this simulator
    #[default]
    ExternalApplication,
    /// Browser-based chat or wizard UI
    WebApplication,
}

/// One message observed on a conversation stream.
///
/// Immutable once sent; every subscriber of the conversation receives its
/// own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Backend-assigned message id
    pub id: String,
    /// Conversation this message belongs to
    pub conversation_id: String,
    /// Sender's user id
    pub user_id: String,
    /// Sender role
    #[serde(default)]
    pub role: InteractionRole,
    /// Payload kind
    #[serde(rename = "type", default)]
    pub kind: InteractionType,
    /// Message text
    pub text: String,
    /// BCP-47 language code
    #[serde(default)]
    pub language_code: String,
    /// Structured responder payload, when the message is a responder reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unstructured_result: Option<serde_json::Value>,
    /// When the backend accepted the message
    pub timestamp: DateTime<Utc>,
}

/// Outbound send envelope.
///
/// Carries the interaction payload plus routing information: which agents
/// should see it and any agent-specific request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRequest {
    /// Client-identity tag
    #[serde(default)]
    pub client_id: ClientId,
    /// Conversation the message is addressed to
    pub conversation_id: String,
    /// Sender's user id
    pub user_id: String,
    /// Sender role
    #[serde(default)]
    pub role: InteractionRole,
    /// Payload kind
    #[serde(rename = "type", default)]
    pub kind: InteractionType,
    /// Message text
    #[serde(default)]
    pub text: String,
    /// BCP-47 language code
    #[serde(default)]
    pub language_code: String,
    /// Agents the backend should dispatch this message to
    pub chosen_agents: Vec<String>,
    /// Agent-specific request parameters
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub agent_request_parameters: serde_json::Map<String, serde_json::Value>,
    /// Client-side send time
    pub time: DateTime<Utc>,
}

impl InteractionRequest {
    /// Build a bare request scoped to one (conversation, user) pair.
    ///
    /// Used both for subscriptions and as the base for message sends.
    pub fn scoped(conversation_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            client_id: ClientId::ExternalApplication,
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            role: InteractionRole::NoRole,
            kind: InteractionType::Text,
            text: String::new(),
            language_code: "en-GB".to_string(),
            chosen_agents: vec![WIZARD_AGENT.to_string()],
            agent_request_parameters: serde_json::Map::new(),
            time: Utc::now(),
        }
    }

    /// Build an ordinary participant-to-participant text message
    pub fn message(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        role: InteractionRole,
        text: impl Into<String>,
    ) -> Self {
        let mut request = Self::scoped(conversation_id, user_id);
        request.role = role;
        request.text = text.into();
        request
    }

    /// Set a request parameter, returning the request for chaining
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.agent_request_parameters.insert(key.into(), value);
        self
    }

    /// Whether this request targets the synchronous responder
    pub fn targets_responder(&self) -> bool {
        self.chosen_agents.iter().any(|a| a == LLM_AGENT)
    }
}
