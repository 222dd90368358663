//! Responder call construction and reply extraction
//!
//! The automated responder is invoked through the same send surface as
//! ordinary messages, but the call is synchronous: the backend returns the
//! responder's single reply, whose structured payload carries the generated
//! text under `data.message`.

use serde_json::json;

use crate::error::{Result, SimError};
use crate::types::{ConversationIdentity, Interaction, InteractionRequest, LLM_AGENT};

/// Build the synchronous responder request for a conversation.
///
/// The responder requires the conversation id both as a top-level request
/// parameter and nested under `request_body`, which it forwards downstream.
///
/// # Errors
/// Returns [`SimError::InvalidConversationId`] if the conversation is not
/// test-namespaced; the responder would treat it as production traffic.
pub fn responder_request(identity: &ConversationIdentity) -> Result<InteractionRequest> {
    identity.ensure_responder_allowed()?;

    let mut request = InteractionRequest::scoped(&identity.conversation_id, &identity.woz_id);
    request.chosen_agents = vec![LLM_AGENT.to_string()];
    let request = request
        .with_parameter("conversationId", json!(identity.conversation_id))
        .with_parameter(
            "request_body",
            json!({ "conversationId": identity.conversation_id }),
        );
    Ok(request)
}

/// Extract the generated text from a responder reply.
///
/// # Errors
/// Returns [`SimError::MalformedReply`] when the structured result is
/// missing, lacks `data.message`, or carries an empty text — forwarding a
/// garbled message would invalidate the rest of the session.
pub fn extract_reply_text(reply: &Interaction) -> Result<String> {
    let payload = reply.unstructured_result.as_ref().ok_or_else(|| {
        SimError::malformed_reply("responder reply carries no structured result", None)
    })?;

    let text = payload
        .get("data")
        .and_then(|data| data.get("message"))
        .and_then(|message| message.as_str())
        .ok_or_else(|| {
            SimError::malformed_reply(
                "responder reply is missing data.message",
                Some(payload.clone()),
            )
        })?;

    if text.is_empty() {
        return Err(SimError::malformed_reply(
            "responder reply text is empty",
            Some(payload.clone()),
        ));
    }

    Ok(text.to_string())
}
