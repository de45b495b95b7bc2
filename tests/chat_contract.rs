//! End-to-end tests of the controller against a mock backend.

use email_agent::api::client::ApiClient;
use email_agent::api::models::Role;
use email_agent::config::EnvConfig;
use email_agent::controller::{ConversationController, ERROR_PREFIX, EXAMPLE_PROMPTS};
use email_agent::settings_panel::{run_connection_test, SettingsPanel, MIN_TEST_DURATION};
use email_agent::storage::{StorageLocation, Store};
use email_agent::toast::{ToastKind, ToastNotifier};
use serde_json::json;
use std::time::Duration;
use tokio::runtime::Handle;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn controller_for(backend_url: &str, client: ApiClient, store: Store) -> ConversationController {
    let env = EnvConfig {
        backend_url: backend_url.to_string(),
        data_dir: None,
    };
    ConversationController::new(env, store, client, ToastNotifier::new(Handle::current()))
}

fn controller(backend_url: &str) -> ConversationController {
    controller_for(backend_url, ApiClient::new(), Store::in_memory())
}

async fn reply_to(server: &MockServer, message: &str, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "message": message })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": reply })))
        .mount(server)
        .await;
}

// ── Conversation flow ─────────────────────────────────────────────

#[tokio::test]
async fn first_exchange_creates_titled_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "message": "Hello", "history": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi there" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));

    let messages = ctl.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hi there");
    assert!(!ctl.is_busy());

    let stored = ctl.store().load_conversations();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "Hello");
    assert_eq!(stored[0].messages, messages);
    assert_eq!(ctl.current_conversation_id(), Some(stored[0].id.as_str()));
}

#[tokio::test]
async fn follow_up_carries_prior_turns_as_history() {
    let server = MockServer::start().await;
    reply_to(&server, "Hello", "Hi there").await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "message": "Thanks",
            "history": [
                { "role": "user", "content": "Hello" },
                { "role": "assistant", "content": "Hi there" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "You're welcome" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));
    ctl.send_message("Thanks").await.unwrap_or_else(|e| panic!("send rejected: {e}"));

    assert_eq!(ctl.messages().len(), 4);
    assert_eq!(ctl.messages()[3].content, "You're welcome");
}

#[tokio::test]
async fn recipients_travel_with_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "recipients": ["boss@corp.com"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Sent" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    ctl.add_recipient("Boss@Corp.com").unwrap_or_else(|e| panic!("rejected: {e}"));
    ctl.send_message("Email my boss").await.unwrap_or_else(|e| panic!("send rejected: {e}"));
    assert_eq!(ctl.messages()[1].content, "Sent");
}

#[tokio::test]
async fn regenerate_replaces_reply_without_growing_the_log() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "message": "Hello", "history": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi there" })))
        .expect(2)
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));
    ctl.regenerate_response().await.unwrap_or_else(|e| panic!("regenerate rejected: {e}"));

    let messages = ctl.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].content, "Hi there");
}

#[tokio::test]
async fn example_prompt_is_sent_from_the_draft() {
    let server = MockServer::start().await;
    let prompt = EXAMPLE_PROMPTS[1].prompt;
    reply_to(&server, prompt, "Here is a draft").await;

    let mut ctl = controller(&server.uri());
    ctl.use_example_prompt(1);
    assert_eq!(ctl.input(), prompt);
    ctl.send_input().await.unwrap_or_else(|e| panic!("send rejected: {e}"));

    assert!(ctl.input().is_empty());
    assert_eq!(ctl.messages()[0].content, prompt);
    assert_eq!(ctl.messages()[1].content, "Here is a draft");
}

// ── Failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn server_error_detail_reaches_the_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "Gmail quota exceeded" })))
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));

    let last = &ctl.messages()[1];
    assert!(last.is_error);
    assert_eq!(last.content, format!("{ERROR_PREFIX}Server error: 500. Gmail quota exceeded"));
    assert!(ctl.is_online(), "a server error does not mean the backend is down");
    assert!(!ctl.is_busy());
}

#[tokio::test]
async fn unreachable_backend_marks_offline() {
    let mut ctl = controller("http://127.0.0.1:1");
    ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));

    let last = &ctl.messages()[1];
    assert!(last.is_error);
    assert!(last.content.starts_with(ERROR_PREFIX));
    assert!(last.content.contains("Cannot reach the server"));
    assert!(!ctl.is_online());
    assert!(ctl.toasts().active().iter().any(|t| t.kind == ToastKind::Error));

    // Offline: further sends are refused before anything is recorded.
    assert!(ctl.send_message("again").await.is_err());
    assert_eq!(ctl.messages().len(), 2);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "too late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = ApiClient::with_timeouts(Duration::from_secs(1), Duration::from_millis(200));
    let mut ctl = controller_for(&server.uri(), client, Store::in_memory());
    ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));

    let last = &ctl.messages()[1];
    assert!(last.is_error);
    assert!(last.content.contains("Request timed out"));
    assert!(!ctl.is_busy());
}

#[tokio::test]
async fn malformed_reply_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));
    assert_eq!(ctl.messages()[1].content, format!("{ERROR_PREFIX}Sorry, I encountered an error."));
}

// ── Connectivity ──────────────────────────────────────────────────

#[tokio::test]
async fn repeated_probes_against_healthy_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    for _ in 0..3 {
        assert!(ctl.check_connection().await);
    }
    assert!(ctl.is_online());
    assert!(ctl.toasts().active().is_empty());
}

#[tokio::test]
async fn probe_against_unhealthy_backend_goes_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut ctl = controller(&server.uri());
    assert!(!ctl.check_connection().await);
    assert!(!ctl.is_online());
}

#[tokio::test]
async fn connection_test_shows_for_at_least_the_minimum() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let ctl = controller(&server.uri());
    let started = std::time::Instant::now();
    assert!(run_connection_test(ctl.connection_probe()).await);
    assert!(started.elapsed() >= MIN_TEST_DURATION);
}

#[tokio::test]
async fn panel_connection_test_updates_controller() {
    let mut ctl = controller("http://127.0.0.1:1");
    let mut panel = SettingsPanel::open(&ctl);
    assert!(!panel.test_connection(&mut ctl).await);
    assert!(!ctl.is_online());
    assert!(!panel.is_testing());
}

// ── Persistence ───────────────────────────────────────────────────

#[tokio::test]
async fn conversations_survive_a_restart() {
    let server = MockServer::start().await;
    reply_to(&server, "Hello", "Hi there").await;
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let store = Store::open(StorageLocation::Local, dir.path()).unwrap();
        let mut ctl = controller_for(&server.uri(), ApiClient::new(), store);
        ctl.send_message("Hello").await.unwrap_or_else(|e| panic!("send rejected: {e}"));
        ctl.current_conversation_id().map(str::to_string).unwrap()
    };

    // Remote storage is not available, so this lands on the same local file.
    let store = Store::open(StorageLocation::Remote, dir.path()).unwrap();
    let mut ctl = controller_for(&server.uri(), ApiClient::new(), store);
    assert_eq!(ctl.conversations().len(), 1);
    assert!(ctl.messages().is_empty());
    assert!(ctl.switch_conversation(&id));
    assert_eq!(ctl.messages().len(), 2);
}
