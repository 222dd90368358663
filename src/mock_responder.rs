//! Fixed-response double for the language-generation responder
//!
//! A deliberately dumb HTTP endpoint: accept any POST body, wait a random
//! moment, and return the same success payload every time, so sessions can
//! be exercised deterministically without a real generation backend.

use std::time::Duration;

use axum::{Json, Router, routing::post};
use rand::Rng;
use serde_json::{Value, json};

use crate::error::Result;

/// Text every mock reply carries under `data.message`
pub const SAMPLE_RESPONSE_TEXT: &str = "Sample LLM response";

/// The fixed success payload
pub fn fixed_response() -> Value {
    json!({
        "status": "success",
        "message": "Processed successfully",
        "data": {
            "message": SAMPLE_RESPONSE_TEXT,
            "role": "assistant",
            "stepNo": 1
        }
    })
}

/// Router answering `POST /` with the fixed payload after a uniform random
/// delay in `[0, max_delay)`
pub fn router(max_delay: Duration) -> Router {
    Router::new().route(
        "/",
        post(move |Json(body): Json<Value>| async move {
            log::debug!("mock responder request: {body}");
            if !max_delay.is_zero() {
                let wait = rand::thread_rng().gen_range(0.0..max_delay.as_secs_f64());
                tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            }
            Json(fixed_response())
        }),
    )
}

/// Bind and serve the mock responder until the process exits
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(port: u16, max_delay: Duration) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("mock responder listening on {}", listener.local_addr()?);
    axum::serve(listener, router(max_delay)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_expected_fields() {
        let payload = fixed_response();
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["data"]["message"], SAMPLE_RESPONSE_TEXT);
        assert_eq!(payload["data"]["role"], "assistant");
        assert_eq!(payload["data"]["stepNo"], 1);
    }
}
