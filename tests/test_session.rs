//! End-to-end session scenarios against the mock backend

mod common;

use std::time::Duration;

use common::{MockBackend, fast_options, init_logging};
use dialogue_sim::{
    ConversationIdentity, ConversationSession, DialogueChannel, GREETING_TEXT, InteractionRole,
    SessionOptions, SessionState, SimError, StreamListener, TcpChannel, TcpConnector, TurnPhase,
};

/// Third-party observer subscribed to a conversation, used to assert on the
/// messages the backend actually distributed
async fn observe(backend: &MockBackend, conversation_id: &str) -> (TcpChannel, StreamListener) {
    let mut channel = TcpChannel::connect(&backend.address())
        .await
        .expect("observer connect");
    let stream = channel
        .subscribe(conversation_id, "observer")
        .await
        .expect("observer subscribe");
    (channel, StreamListener::spawn("OBSERVER", stream))
}

#[tokio::test]
async fn scenario_a_single_turn() {
    init_logging();
    let backend = MockBackend::start().await;
    let conversation_id = "___test_scenario_a_0";
    let (_observer, observed) = observe(&backend, conversation_id).await;

    let identity = ConversationIdentity::new(conversation_id, "W1", "U1");
    let mut session = ConversationSession::new(identity, fast_options(1));
    let connector = TcpConnector::new(backend.address());
    let report = session.run(&connector).await.expect("session should complete");

    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(report.turns_completed, 1);
    assert_eq!(report.responder_calls, 0);
    assert_eq!(backend.llm_calls(), 0);

    // listener independence: both subscriptions saw both messages
    assert_eq!(report.woz_messages_observed, 2);
    assert_eq!(report.chat_messages_observed, 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let messages = observed.messages();
    assert_eq!(messages.len(), 2);

    assert_eq!(messages[0].user_id, "W1");
    assert_eq!(messages[0].role, InteractionRole::Assistant);
    assert_eq!(messages[0].text, GREETING_TEXT);

    assert_eq!(messages[1].user_id, "U1");
    assert_eq!(messages[1].role, InteractionRole::NoRole);
    assert_eq!(messages[1].text, "chat reply to turn 0");
}

#[tokio::test]
async fn scenario_b_responder_mediated_turns() {
    init_logging();
    let backend = MockBackend::start().await;
    let conversation_id = "___test_scenario_b_0";
    let (_observer, observed) = observe(&backend, conversation_id).await;

    let identity = ConversationIdentity::new(conversation_id, "W1", "U1");
    let mut session = ConversationSession::new(identity, fast_options(3));
    let connector = TcpConnector::new(backend.address());
    let report = session.run(&connector).await.expect("session should complete");

    // turn monotonicity: exactly the configured number of turns ran
    assert_eq!(report.turns_completed, 3);
    // responder gating: turns 1 and 2 each issued exactly one call
    assert_eq!(report.responder_calls, 2);
    assert_eq!(backend.llm_calls(), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let messages = observed.messages();
    assert_eq!(messages.len(), 6, "3 assistant sends + 3 user replies");

    // role alternation: every even message is the operator's, every odd the
    // user's reply
    for (i, message) in messages.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(message.user_id, "W1");
            assert_eq!(message.role, InteractionRole::Assistant);
        } else {
            assert_eq!(message.user_id, "U1");
            assert_eq!(message.role, InteractionRole::NoRole);
            assert_eq!(message.text, format!("chat reply to turn {}", i / 2));
        }
    }

    // forwarded text is derived from the responder reply
    assert_eq!(messages[0].text, GREETING_TEXT);
    assert_eq!(
        messages[2].text,
        format!("WoZ #1, {}", dialogue_sim::mock_responder::SAMPLE_RESPONSE_TEXT)
    );
    assert_eq!(
        messages[4].text,
        format!("WoZ #2, {}", dialogue_sim::mock_responder::SAMPLE_RESPONSE_TEXT)
    );
}

#[tokio::test]
async fn scenario_c_unreachable_backend() {
    init_logging();
    // nothing listens on port 1
    let connector = TcpConnector::new("127.0.0.1:1");
    let identity = ConversationIdentity::new("___test_scenario_c_0", "W1", "U1");
    let mut session = ConversationSession::new(identity, fast_options(1));

    let err = session.run(&connector).await.unwrap_err();
    assert!(matches!(err, SimError::Connection(_)), "got {err:?}");
    // the session never reached RUNNING
    assert_eq!(session.state(), SessionState::Subscribing);
}

#[tokio::test]
async fn non_namespaced_conversation_fails_before_connecting() {
    init_logging();
    // unreachable address proves the rejection happens before any dial
    let connector = TcpConnector::new("127.0.0.1:1");
    let identity = ConversationIdentity::new("plain_conversation", "W1", "U1");
    let mut session = ConversationSession::new(identity, fast_options(2));

    let err = session.run(&connector).await.unwrap_err();
    assert!(matches!(err, SimError::InvalidConversationId(_)), "got {err:?}");
}

#[tokio::test]
async fn single_turn_session_tolerates_non_namespaced_id() {
    init_logging();
    let backend = MockBackend::start().await;
    let identity = ConversationIdentity::new("plain_conversation", "W1", "U1");
    let mut session = ConversationSession::new(identity, fast_options(1));
    let connector = TcpConnector::new(backend.address());

    // no responder call is required, so the namespace precondition does
    // not apply
    let report = session.run(&connector).await.expect("session should complete");
    assert_eq!(report.turns_completed, 1);
    assert_eq!(backend.llm_calls(), 0);
}

#[tokio::test]
async fn undelivered_greeting_surfaces_turn_timeout() {
    init_logging();
    let backend = MockBackend::start_black_hole().await;
    let identity = ConversationIdentity::new("___test_timeout_0", "W1", "U1");
    let options = SessionOptions::builder()
        .num_turns(1)
        .delay(Duration::from_millis(10))
        .warmup(Duration::from_millis(20))
        .turn_timeout(Duration::from_millis(200))
        .build();
    let mut session = ConversationSession::new(identity, options);
    let connector = TcpConnector::new(backend.address());

    let err = session.run(&connector).await.unwrap_err();
    match err {
        SimError::TurnTimeout { turn, phase, .. } => {
            assert_eq!(turn, 0);
            assert_eq!(phase, TurnPhase::AwaitingGreetingAck);
        }
        other => panic!("expected TurnTimeout, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_responder_reply_fails_the_session() {
    init_logging();
    let backend = MockBackend::start_with(common::MockBackendConfig {
        fail_llm: true,
        route_messages: true,
    })
    .await;
    let identity = ConversationIdentity::new("___test_badllm_0", "W1", "U1");
    let mut session = ConversationSession::new(identity, fast_options(2));
    let connector = TcpConnector::new(backend.address());

    // the backend rejects the responder call, which aborts turn 1
    let err = session.run(&connector).await.unwrap_err();
    assert!(matches!(err, SimError::Rpc(_)), "got {err:?}");
    assert_eq!(backend.llm_calls(), 1);
}
