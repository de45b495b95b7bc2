//! Conversation state and the operations the chat window drives.
//!
//! Sending is split in three so an event-loop UI never holds the controller
//! across an await: `begin_send` validates and records the user message,
//! `PendingSend::dispatch` does the network call on any thread, and
//! `finish_send` records the outcome. `send_message` chains the three for
//! callers that can simply await.

use crate::api::client::ApiClient;
use crate::api::models::{ChatRequest, Conversation, Message, Role};
use crate::config::{normalize_backend_url, resolve_settings, EnvConfig, Settings};
use crate::error::{RequestError, SendRejected, ValidationError};
use crate::recipients::RecipientList;
use crate::storage::{upsert_conversation, ImportSummary, Store, CONVERSATIONS_KEY};
use crate::toast::{ToastKind, ToastNotifier, DEFAULT_DURATION, SHORT_DURATION};
use crate::utils::truncate_chars;
use chrono::Utc;
use uuid::Uuid;

pub const TITLE_MAX_CHARS: usize = 50;
pub const NEW_CONVERSATION_TITLE: &str = "New conversation";
pub const ERROR_PREFIX: &str = "⚠️ ";
pub const DELETE_CONVERSATION_PROMPT: &str = "Delete this conversation?";
pub const CLEAR_ALL_PROMPT: &str = "Are you sure you want to delete all conversations? This cannot be undone.";

pub struct ExamplePrompt {
    pub title: &'static str,
    pub prompt: &'static str,
}

pub const EXAMPLE_PROMPTS: [ExamplePrompt; 3] = [
    ExamplePrompt {
        title: "Draft a professional email",
        prompt: "Help me draft a professional email to schedule a meeting with my team next week",
    },
    ExamplePrompt {
        title: "Write a follow-up email",
        prompt: "Write a follow-up email to a client about our project proposal",
    },
    ExamplePrompt {
        title: "Create a thank you note",
        prompt: "Create a thank you email for my colleague who helped me with the presentation",
    },
];

/// Messages of the active conversation plus the positions of user and
/// assistant entries, kept up to date on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
    users: Vec<usize>,
    assistants: Vec<usize>,
}

impl MessageLog {
    pub fn new(messages: Vec<Message>) -> Self {
        let mut log = Self::default();
        for message in messages {
            log.push(message);
        }
        log
    }

    pub fn push(&mut self, message: Message) {
        let idx = self.messages.len();
        match message.role {
            Role::User => self.users.push(idx),
            Role::Assistant => self.assistants.push(idx),
        }
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_user_index(&self) -> Option<usize> {
        self.users.last().copied()
    }

    pub fn remove_last_assistant(&mut self) -> Option<Message> {
        let idx = self.assistants.pop()?;
        let removed = self.messages.remove(idx);
        for pos in self.users.iter_mut().rev() {
            if *pos > idx {
                *pos -= 1;
            } else {
                break;
            }
        }
        Some(removed)
    }

    /// First user message, cut to the sidebar title length.
    pub fn title(&self) -> String {
        self.users
            .first()
            .map(|&idx| truncate_chars(&self.messages[idx].content, TITLE_MAX_CHARS).to_string())
            .unwrap_or_else(|| NEW_CONVERSATION_TITLE.to_string())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The single outstanding-request slot. At most one exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// A chat request that has been recorded but not yet sent.
#[derive(Debug)]
pub struct PendingSend {
    token: RequestToken,
    conversation_id: String,
    base_url: String,
    request: ChatRequest,
    client: ApiClient,
}

impl PendingSend {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub async fn dispatch(self) -> SendOutcome {
        let result = self.client.chat(&self.base_url, &self.request).await;
        SendOutcome {
            token: self.token,
            conversation_id: self.conversation_id,
            result,
        }
    }
}

#[derive(Debug)]
pub struct SendOutcome {
    token: RequestToken,
    conversation_id: String,
    pub result: Result<String, RequestError>,
}

/// Everything needed to run the liveness probe off the UI thread.
#[derive(Debug, Clone)]
pub struct ConnectionProbe {
    client: ApiClient,
    base_url: String,
}

impl ConnectionProbe {
    pub async fn run(self) -> bool {
        match self.client.ping(&self.base_url).await {
            Ok(()) => true,
            Err(e) => {
                log::info!("backend at {} is offline: {e}", self.base_url);
                false
            }
        }
    }
}

pub struct ConversationController {
    env: EnvConfig,
    settings: Settings,
    store: Store,
    client: ApiClient,
    toasts: ToastNotifier,
    recipients: RecipientList,
    conversations: Vec<Conversation>,
    current_id: Option<String>,
    log: MessageLog,
    input: String,
    online: bool,
    in_flight: Option<RequestToken>,
    next_token: u64,
}

impl ConversationController {
    /// Loads the persisted records and resolves settings against `env`.
    pub fn new(env: EnvConfig, store: Store, client: ApiClient, toasts: ToastNotifier) -> Self {
        let settings = resolve_settings(store.load_settings(), &env);
        let conversations = store.load_conversations();
        let recipients = RecipientList::new(store.load_recipients());
        log::info!(
            "loaded {} conversations and {} recipients",
            conversations.len(),
            recipients.len()
        );
        Self {
            env,
            settings,
            store,
            client,
            toasts,
            recipients,
            conversations,
            current_id: None,
            log: MessageLog::default(),
            input: String::new(),
            online: true,
            in_flight: None,
            next_token: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn toasts(&self) -> &ToastNotifier {
        &self.toasts
    }

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn recipients(&self) -> &[String] {
        self.recipients.as_slice()
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// True while a chat request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn use_example_prompt(&mut self, index: usize) {
        if let Some(example) = EXAMPLE_PROMPTS.get(index) {
            self.input = example.prompt.to_string();
        }
    }

    pub fn start_new_chat(&mut self) {
        self.log.clear();
        self.input.clear();
        let id = Uuid::new_v4().to_string();
        log::debug!("new conversation {id}");
        self.current_id = Some(id);
    }

    /// Makes a stored conversation the active one. Unknown ids are ignored.
    pub fn switch_conversation(&mut self, id: &str) -> bool {
        let Some(conversation) = self.conversations.iter().find(|c| c.id == id) else {
            return false;
        };
        self.log = MessageLog::new(conversation.messages.clone());
        self.current_id = Some(conversation.id.clone());
        true
    }

    /// Deletes a stored conversation once `confirm` agrees.
    pub fn delete_conversation(&mut self, id: &str, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(DELETE_CONVERSATION_PROMPT) {
            return false;
        }
        self.conversations.retain(|c| c.id != id);
        self.save_conversations();
        if self.current_id.as_deref() == Some(id) {
            self.start_new_chat();
        }
        true
    }

    fn ensure_ready(&self) -> Result<(), SendRejected> {
        if !self.online {
            let err = SendRejected::Offline;
            self.toasts.error(err.to_string());
            return Err(err);
        }
        if self.in_flight.is_some() {
            let err = SendRejected::Busy;
            self.toasts.push(ToastKind::Warning, err.to_string(), DEFAULT_DURATION);
            return Err(err);
        }
        Ok(())
    }

    fn issue(&mut self, message: String, history: Vec<Message>) -> PendingSend {
        let token = RequestToken(self.next_token);
        self.next_token += 1;
        self.in_flight = Some(token);
        PendingSend {
            token,
            conversation_id: self.current_id.clone().unwrap_or_default(),
            base_url: self.settings.backend_url.clone(),
            request: ChatRequest::new(message, history, self.recipients.as_slice()),
            client: self.client.clone(),
        }
    }

    /// Records the user message and takes the request slot.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, SendRejected> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        self.ensure_ready()?;
        if self.current_id.is_none() {
            self.current_id = Some(Uuid::new_v4().to_string());
        }
        let history = self.log.messages().to_vec();
        self.log.push(Message::user(text));
        self.input.clear();
        self.persist_active();
        Ok(self.issue(text.to_string(), history))
    }

    /// Drops the latest assistant reply and re-asks the latest user message.
    /// `Ok(None)` when there is nothing to regenerate.
    pub fn begin_regenerate(&mut self) -> Result<Option<PendingSend>, SendRejected> {
        if self.log.len() < 2 || self.log.last_user_index().is_none() {
            return Ok(None);
        }
        self.ensure_ready()?;
        self.log.remove_last_assistant();
        let Some(idx) = self.log.last_user_index() else {
            return Ok(None);
        };
        let text = self.log.messages()[idx].content.clone();
        let history = self.log.messages()[..idx].to_vec();
        self.persist_active();
        Ok(Some(self.issue(text, history)))
    }

    /// Records the reply (or a visible error) and frees the request slot.
    /// Replies for a conversation that is no longer active go to its
    /// stored record.
    pub fn finish_send(&mut self, outcome: SendOutcome) {
        if self.in_flight == Some(outcome.token) {
            self.in_flight = None;
        }
        let message = match outcome.result {
            Ok(reply) => Message::assistant(reply),
            Err(err) => {
                log::warn!("chat request failed: {err:?}");
                if err.marks_offline() {
                    self.online = false;
                }
                self.toasts.error(err.to_string());
                Message::error(format!("{ERROR_PREFIX}{err}"))
            }
        };

        if self.current_id.as_deref() == Some(outcome.conversation_id.as_str()) {
            self.log.push(message);
            self.persist_active();
            return;
        }
        let Some(stored) = self.conversations.iter().find(|c| c.id == outcome.conversation_id) else {
            log::debug!("dropping reply for deleted conversation {}", outcome.conversation_id);
            return;
        };
        let mut stored = stored.clone();
        stored.messages.push(message);
        stored.updated_at = Utc::now();
        upsert_conversation(&mut self.conversations, stored);
        self.save_conversations();
    }

    pub async fn send_message(&mut self, text: &str) -> Result<(), SendRejected> {
        let pending = self.begin_send(text)?;
        let outcome = pending.dispatch().await;
        self.finish_send(outcome);
        Ok(())
    }

    /// Sends whatever is in the input draft.
    pub async fn send_input(&mut self) -> Result<(), SendRejected> {
        let text = self.input.clone();
        self.send_message(&text).await
    }

    pub async fn regenerate_response(&mut self) -> Result<(), SendRejected> {
        if let Some(pending) = self.begin_regenerate()? {
            let outcome = pending.dispatch().await;
            self.finish_send(outcome);
        }
        Ok(())
    }

    pub fn connection_probe(&self) -> ConnectionProbe {
        ConnectionProbe {
            client: self.client.clone(),
            base_url: self.settings.backend_url.clone(),
        }
    }

    pub fn set_online(&mut self, online: bool) {
        if self.online != online {
            log::info!("backend is {}", if online { "online" } else { "offline" });
        }
        self.online = online;
    }

    pub async fn check_connection(&mut self) -> bool {
        let online = self.connection_probe().run().await;
        self.set_online(online);
        online
    }

    /// Commits new settings. Returns whether the backend URL changed, in
    /// which case the caller should re-probe the connection.
    pub fn update_settings(&mut self, mut settings: Settings) -> bool {
        settings.backend_url = normalize_backend_url(&settings.backend_url);
        let backend_changed = settings.backend_url != self.settings.backend_url;
        self.settings = settings;
        if let Err(e) = self.store.save_settings(&self.settings) {
            log::error!("failed to save settings: {e}");
        }
        backend_changed
    }

    pub fn add_recipient(&mut self, input: &str) -> Result<String, ValidationError> {
        let email = self.recipients.add(input)?;
        self.save_recipients();
        self.toasts.success(format!("Added {email} to recipients"), SHORT_DURATION);
        Ok(email)
    }

    pub fn remove_recipient(&mut self, email: &str) {
        self.recipients.remove(email);
        self.save_recipients();
        self.toasts.success(format!("Removed {email}"), SHORT_DURATION);
    }

    pub fn clear_all_conversations(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(CLEAR_ALL_PROMPT) {
            return false;
        }
        self.conversations.clear();
        if let Err(e) = self.store.clear(CONVERSATIONS_KEY) {
            log::error!("failed to clear conversations: {e}");
        }
        self.start_new_chat();
        true
    }

    /// Refreshes in-memory state from an import so later saves build on the
    /// imported records. The active conversation is left as it is.
    pub fn apply_import(&mut self, summary: &ImportSummary) {
        if summary.conversations.is_some() {
            self.conversations = self.store.load_conversations();
        }
        if let Some(settings) = &summary.settings {
            self.settings = resolve_settings(Some(settings.clone()), &self.env);
        }
        if let Some(recipients) = &summary.recipients {
            self.recipients.replace(recipients.clone());
        }
    }

    pub fn notify_copied(&self) {
        self.toasts.success("Copied to clipboard!", SHORT_DURATION);
    }

    fn persist_active(&mut self) {
        let Some(id) = self.current_id.clone() else {
            return;
        };
        if self.log.is_empty() {
            return;
        }
        let conversation = Conversation {
            id,
            title: self.log.title(),
            messages: self.log.messages().to_vec(),
            updated_at: Utc::now(),
        };
        upsert_conversation(&mut self.conversations, conversation);
        self.save_conversations();
    }

    fn save_conversations(&self) {
        if let Err(e) = self.store.save_conversations(&self.conversations) {
            log::error!("failed to save conversations: {e}");
        }
    }

    fn save_recipients(&self) {
        if let Err(e) = self.store.save_recipients(self.recipients.as_slice()) {
            log::error!("failed to save recipients: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Handle;

    fn controller() -> ConversationController {
        ConversationController::new(
            EnvConfig::default(),
            Store::in_memory(),
            ApiClient::new(),
            ToastNotifier::new(Handle::current()),
        )
    }

    fn outcome(pending: &PendingSend, result: Result<String, RequestError>) -> SendOutcome {
        SendOutcome {
            token: pending.token,
            conversation_id: pending.conversation_id.clone(),
            result,
        }
    }

    #[test]
    fn log_tracks_positions_through_removal() {
        let mut log = MessageLog::new(vec![
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant("a2"),
        ]);
        assert_eq!(log.last_user_index(), Some(2));
        assert_eq!(log.remove_last_assistant().unwrap().content, "a2");
        assert_eq!(log.remove_last_assistant().unwrap().content, "a1");
        assert_eq!(log.last_user_index(), Some(1));
        assert_eq!(log.messages()[1].content, "q2");
        assert!(log.remove_last_assistant().is_none());
    }

    #[test]
    fn title_is_first_user_message_capped() {
        let long = "x".repeat(80);
        let log = MessageLog::new(vec![Message::assistant("hi"), Message::user(long), Message::user("later")]);
        assert_eq!(log.title().chars().count(), TITLE_MAX_CHARS);
        assert_eq!(MessageLog::default().title(), NEW_CONVERSATION_TITLE);
    }

    #[tokio::test]
    async fn new_chat_is_not_persisted_until_first_message() {
        let mut ctl = controller();
        ctl.set_input("draft");
        ctl.start_new_chat();
        assert!(ctl.current_conversation_id().is_some());
        assert!(ctl.input().is_empty());
        assert!(ctl.conversations().is_empty());
        assert!(ctl.store().load_conversations().is_empty());
    }

    #[tokio::test]
    async fn begin_send_records_and_persists_the_user_message() {
        let mut ctl = controller();
        let pending = ctl.begin_send("Hello").unwrap();
        assert!(ctl.is_busy());
        assert!(pending.request().history.is_empty());
        assert_eq!(ctl.messages(), [Message::user("Hello")]);

        let stored = ctl.store().load_conversations();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Hello");
        assert_eq!(Some(stored[0].id.as_str()), ctl.current_conversation_id());

        let result = outcome(&pending, Ok("Hi there".into()));
        ctl.finish_send(result);
        assert!(!ctl.is_busy());
        assert_eq!(ctl.messages()[1], Message::assistant("Hi there"));
        assert_eq!(ctl.store().load_conversations()[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn second_send_while_pending_is_rejected() {
        let mut ctl = controller();
        let _pending = ctl.begin_send("one").unwrap();
        assert_eq!(ctl.begin_send("two").unwrap_err(), SendRejected::Busy);
        assert_eq!(ctl.messages().len(), 1);
        assert_eq!(ctl.toasts().active()[0].kind, ToastKind::Warning);
    }

    #[tokio::test]
    async fn empty_and_offline_sends_make_no_request() {
        let mut ctl = controller();
        assert_eq!(
            ctl.begin_send("   ").unwrap_err(),
            SendRejected::Invalid(ValidationError::EmptyMessage)
        );
        assert!(ctl.toasts().active().is_empty());

        ctl.set_online(false);
        assert_eq!(ctl.begin_send("Hello").unwrap_err(), SendRejected::Offline);
        assert!(ctl.messages().is_empty());
        assert!(!ctl.is_busy());
        let toasts = ctl.toasts().active();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
    }

    #[tokio::test]
    async fn failure_appends_flagged_message_and_toast() {
        let mut ctl = controller();
        let pending = ctl.begin_send("Hello").unwrap();
        ctl.finish_send(outcome(&pending, Err(RequestError::Unreachable("refused".into()))));

        assert!(!ctl.is_online());
        assert!(!ctl.is_busy());
        let last = ctl.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.starts_with(ERROR_PREFIX));
        assert_eq!(ctl.toasts().active().len(), 1);
    }

    #[tokio::test]
    async fn reply_for_inactive_conversation_goes_to_its_record() {
        let mut ctl = controller();
        let pending = ctl.begin_send("first topic").unwrap();
        let first_id = ctl.current_conversation_id().unwrap().to_string();
        ctl.start_new_chat();

        ctl.finish_send(outcome(&pending, Ok("answer".into())));
        assert!(ctl.messages().is_empty());
        let stored = ctl.conversations().iter().find(|c| c.id == first_id).unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[1].content, "answer");

        assert!(ctl.switch_conversation(&first_id));
        assert_eq!(ctl.messages().len(), 2);
    }

    #[tokio::test]
    async fn switch_to_unknown_id_changes_nothing() {
        let mut ctl = controller();
        let pending = ctl.begin_send("Hello").unwrap();
        ctl.finish_send(outcome(&pending, Ok("Hi".into())));
        let before = ctl.current_conversation_id().map(str::to_string);
        assert!(!ctl.switch_conversation("missing"));
        assert_eq!(ctl.current_conversation_id().map(str::to_string), before);
        assert_eq!(ctl.messages().len(), 2);
    }

    #[tokio::test]
    async fn delete_requires_confirmation_and_resets_active() {
        let mut ctl = controller();
        let pending = ctl.begin_send("Hello").unwrap();
        ctl.finish_send(outcome(&pending, Ok("Hi".into())));
        let id = ctl.current_conversation_id().unwrap().to_string();

        assert!(!ctl.delete_conversation(&id, |_| false));
        assert_eq!(ctl.conversations().len(), 1);

        let mut asked = String::new();
        assert!(ctl.delete_conversation(&id, |prompt| {
            asked = prompt.to_string();
            true
        }));
        assert_eq!(asked, DELETE_CONVERSATION_PROMPT);
        assert!(ctl.conversations().is_empty());
        assert!(ctl.store().load_conversations().is_empty());
        assert!(ctl.messages().is_empty());
        assert_ne!(ctl.current_conversation_id(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn regenerate_needs_two_messages_and_a_user_message() {
        let mut ctl = controller();
        assert!(ctl.begin_regenerate().unwrap().is_none());

        let pending = ctl.begin_send("Hello").unwrap();
        assert!(ctl.begin_regenerate().unwrap().is_none());
        ctl.finish_send(outcome(&pending, Ok("Hi".into())));

        let pending = ctl.begin_regenerate().unwrap().unwrap();
        assert_eq!(pending.request().message, "Hello");
        assert!(pending.request().history.is_empty());
        assert_eq!(ctl.messages(), [Message::user("Hello")]);
        ctl.finish_send(outcome(&pending, Ok("Hi again".into())));
        assert_eq!(ctl.messages().len(), 2);
        assert_eq!(ctl.messages()[1].content, "Hi again");

        let _pending = ctl.begin_send("Another").unwrap();
        assert_eq!(ctl.begin_regenerate().unwrap_err(), SendRejected::Busy);
        assert_eq!(ctl.messages().len(), 3);
    }

    #[tokio::test]
    async fn recipients_persist_and_notify() {
        let mut ctl = controller();
        assert_eq!(ctl.add_recipient("A@Example.com").unwrap(), "a@example.com");
        assert!(matches!(
            ctl.add_recipient("a@example.com"),
            Err(ValidationError::DuplicateRecipient(_))
        ));
        assert_eq!(ctl.recipients().len(), 1);
        assert_eq!(ctl.store().load_recipients(), vec!["a@example.com".to_string()]);
        assert_eq!(ctl.toasts().active()[0].message, "Added a@example.com to recipients");

        let pending = ctl.begin_send("mail them").unwrap();
        assert_eq!(pending.request().recipients, Some(vec!["a@example.com".to_string()]));

        ctl.remove_recipient("a@example.com");
        assert!(ctl.store().load_recipients().is_empty());
    }

    #[tokio::test]
    async fn clear_all_wipes_history() {
        let mut ctl = controller();
        let pending = ctl.begin_send("Hello").unwrap();
        ctl.finish_send(outcome(&pending, Ok("Hi".into())));

        assert!(!ctl.clear_all_conversations(|_| false));
        assert_eq!(ctl.conversations().len(), 1);

        assert!(ctl.clear_all_conversations(|_| true));
        assert!(ctl.conversations().is_empty());
        assert!(ctl.messages().is_empty());
        assert!(ctl.store().load_conversations().is_empty());
    }

    #[tokio::test]
    async fn settings_commit_normalises_and_reports_backend_change() {
        let mut ctl = controller();
        let mut next = ctl.settings().clone();
        next.user_name = "Ada".into();
        assert!(!ctl.update_settings(next.clone()));
        next.backend_url = "agent.local:9000/".into();
        assert!(ctl.update_settings(next));
        assert_eq!(ctl.settings().backend_url, "http://agent.local:9000");
        assert_eq!(ctl.store().load_settings().unwrap().user_name, "Ada");
    }

    #[tokio::test]
    async fn example_prompt_fills_the_input() {
        let mut ctl = controller();
        ctl.use_example_prompt(1);
        assert_eq!(ctl.input(), EXAMPLE_PROMPTS[1].prompt);
        ctl.use_example_prompt(99);
        assert_eq!(ctl.input(), EXAMPLE_PROMPTS[1].prompt);
    }

    #[tokio::test]
    async fn import_refreshes_settings_but_keeps_environment_backend() {
        let mut ctl = controller();
        let summary = ImportSummary {
            conversations: None,
            settings: Some(Settings {
                user_name: "Imported".into(),
                backend_url: "http://elsewhere".into(),
                ..Settings::default()
            }),
            recipients: Some(vec!["z@z.io".into()]),
        };
        ctl.apply_import(&summary);
        assert_eq!(ctl.settings().user_name, "Imported");
        assert_eq!(ctl.settings().backend_url, EnvConfig::default().backend_url);
        assert_eq!(ctl.recipients(), ["z@z.io".to_string()]);
    }

    #[tokio::test]
    async fn imported_conversations_survive_the_next_send() {
        let mut source = controller();
        for text in ["first", "second", "third"] {
            source.start_new_chat();
            let pending = source.begin_send(text).unwrap();
            let done = outcome(&pending, Ok(format!("re: {text}")));
            source.finish_send(done);
        }
        let backup = source.store().export_bundle(Utc::now()).to_json().unwrap();

        let mut ctl = controller();
        let summary = ctl.store().import_document(&backup).unwrap();
        assert_eq!(summary.conversations, Some(3));
        ctl.apply_import(&summary);
        assert_eq!(ctl.conversations().len(), 3);

        ctl.start_new_chat();
        let pending = ctl.begin_send("local message").unwrap();
        drop(pending);
        let stored = ctl.store().load_conversations();
        assert_eq!(stored.len(), 4);
        for text in ["first", "second", "third", "local message"] {
            assert!(stored.iter().any(|c| c.title == text), "{text} missing");
        }
    }
}
