//! Session handling: id assignment, rate limiting, persistence and timeouts.

mod common;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use cadence::backend::{KeyValueBackend, MemoryBackend};
use cadence::capability::CapabilityRegistry;
use cadence::conversation::ConversationStore;
use cadence::dialogue::DialogueLoop;
use cadence::error::CadenceError;
use cadence::rate_limit::RateLimiter;
use cadence::session::{SessionHandler, SessionRequest};
use cadence::types::{Message, Transcript};

use common::{counting_capability, slow_capability, ScriptedReasoner};

struct Harness {
    reasoner: Arc<ScriptedReasoner>,
    store: ConversationStore,
    sessions: SessionHandler,
}

fn harness(registry: CapabilityRegistry, limit: u32) -> Harness {
    let reasoner = Arc::new(ScriptedReasoner::new());
    let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::new());
    let dialogue = DialogueLoop::builder()
        .reasoner(reasoner.clone())
        .registry(Arc::new(registry))
        .system_prompt("You book meetings.")
        .build();
    let store = ConversationStore::new(backend.clone(), Duration::from_secs(3600));
    let limiter = RateLimiter::new(backend, limit, Duration::from_secs(60)).unwrap();
    Harness {
        reasoner,
        store: store.clone(),
        sessions: SessionHandler::new(Arc::new(dialogue), store, limiter),
    }
}

#[tokio::test]
async fn new_conversation_gets_an_id_and_persists_two_messages() {
    let h = harness(CapabilityRegistry::new(), 20);
    h.reasoner.queue_text("Hello! How can I help?");

    let reply = h
        .sessions
        .handle(SessionRequest::new("client-1", "hi"))
        .await
        .unwrap();

    assert_eq!(reply.reply, "Hello! How can I help?");
    assert!(uuid::Uuid::parse_str(&reply.conversation_id).is_ok());
    assert_eq!(
        h.store.load(&reply.conversation_id).await.unwrap(),
        Transcript::from(vec![
            Message::user("hi"),
            Message::assistant("Hello! How can I help?"),
        ])
    );
}

#[tokio::test]
async fn intermediate_loop_messages_are_not_persisted() {
    let registry = CapabilityRegistry::new()
        .with(counting_capability(
            "list_bookings",
            Arc::new(AtomicUsize::new(0)),
            Ok(serde_json::json!("1 booking")),
        ))
        .unwrap();
    let h = harness(registry, 20);
    h.reasoner
        .queue_invocations(&[("call_1", "list_bookings", serde_json::json!({}))])
        .queue_text("You have one booking.");

    let reply = h
        .sessions
        .handle(SessionRequest::new("client-1", "what's booked?").in_conversation("conv-1"))
        .await
        .unwrap();

    assert_eq!(reply.conversation_id, "conv-1");
    let saved = h.store.load("conv-1").await.unwrap();
    assert_eq!(
        saved.messages(),
        &[
            Message::user("what's booked?"),
            Message::assistant("You have one booking."),
        ]
    );
}

#[tokio::test]
async fn history_accumulates_across_turns() {
    let h = harness(CapabilityRegistry::new(), 20);
    h.reasoner.queue_text("first answer").queue_text("second answer");

    let first = h
        .sessions
        .handle(SessionRequest::new("client-1", "first"))
        .await
        .unwrap();
    h.sessions
        .handle(SessionRequest::new("client-1", "second").in_conversation(first.conversation_id.clone()))
        .await
        .unwrap();

    let second_request = &h.reasoner.requests()[1];
    assert_eq!(
        second_request.messages,
        vec![
            Message::system("You book meetings."),
            Message::user("first"),
            Message::assistant("first answer"),
            Message::user("second"),
        ]
    );
    assert_eq!(h.store.load(&first.conversation_id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn rate_limited_requests_never_reach_the_reasoner() {
    let h = harness(CapabilityRegistry::new(), 1);
    h.reasoner.queue_text("ok");

    h.sessions
        .handle(SessionRequest::new("client-1", "one").in_conversation("c"))
        .await
        .unwrap();
    let err = h
        .sessions
        .handle(SessionRequest::new("client-1", "two").in_conversation("c"))
        .await
        .unwrap_err();

    assert!(matches!(err, CadenceError::RateLimited { ref subject } if subject == "client-1"));
    assert_eq!(h.reasoner.call_count(), 1);
    assert_eq!(h.store.load("c").await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_turns_leave_history_untouched() {
    let h = harness(CapabilityRegistry::new(), 20);
    h.reasoner.queue_error(CadenceError::api(500, "upstream down"));

    let err = h
        .sessions
        .handle(SessionRequest::new("client-1", "hi").in_conversation("c"))
        .await
        .unwrap_err();

    assert!(matches!(err, CadenceError::Api { status: 500, .. }));
    assert!(h.store.load("c").await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn turn_timeout_aborts_slow_capabilities() {
    let registry = CapabilityRegistry::new()
        .with(slow_capability("list_bookings", Duration::from_secs(30), "late"))
        .unwrap();
    let Harness {
        reasoner,
        store,
        sessions,
    } = harness(registry, 20);
    reasoner.queue_invocations(&[("call_1", "list_bookings", serde_json::json!({}))]);
    let sessions = sessions.with_turn_timeout(Duration::from_secs(5));

    let err = sessions
        .handle(SessionRequest::new("client-1", "slow").in_conversation("c"))
        .await
        .unwrap_err();

    assert!(matches!(err, CadenceError::Timeout(5000)));
    assert!(store.load("c").await.unwrap().is_empty());
}
