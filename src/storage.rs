use crate::api::models::Conversation;
use crate::config::Settings;
use crate::error::{ImportError, StorageError};
use chrono::{DateTime, NaiveDate, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONVERSATIONS_KEY: &str = "email_agent_conversations";
pub const SETTINGS_KEY: &str = "email_agent_settings";
pub const RECIPIENTS_KEY: &str = "email_agent_recipients";

pub const MAX_CONVERSATIONS: usize = 50;

/// Raw key/value access. Values are JSON text and every write replaces
/// the previous value wholesale.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub fn default_data_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "EmailAgent")?;
    Some(proj.data_dir().to_path_buf())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
            params![key, value, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Where records live. Only local storage exists today; the remote
/// variant is kept as a named capability so callers can ask for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLocation {
    Local,
    Remote,
}

impl StorageLocation {
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.use_remote_storage { StorageLocation::Remote } else { StorageLocation::Local }
    }

    pub fn describe(self) -> &'static str {
        match self {
            StorageLocation::Local => "locally on this device",
            StorageLocation::Remote => "in the cloud",
        }
    }
}

pub fn open_backend(location: StorageLocation, data_dir: &Path) -> Result<Box<dyn KeyValueStore>, StorageError> {
    match location {
        StorageLocation::Local => Ok(Box::new(SqliteStore::open(&data_dir.join("store.sqlite"))?)),
        StorageLocation::Remote => Err(StorageError::Unsupported("remote")),
    }
}

/// Typed access to the three persisted records.
pub struct Store {
    backend: Box<dyn KeyValueStore>,
}

impl Store {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::default()))
    }

    /// Opens the requested location, falling back to local storage when
    /// it is unavailable.
    pub fn open(location: StorageLocation, data_dir: &Path) -> Result<Self, StorageError> {
        match open_backend(location, data_dir) {
            Ok(backend) => Ok(Self::new(backend)),
            Err(StorageError::Unsupported(what)) => {
                log::warn!("{what} storage is not available, using local storage");
                Ok(Self::new(open_backend(StorageLocation::Local, data_dir)?))
            }
            Err(e) => Err(e),
        }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.backend.set(key, &text)
    }

    pub fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.backend.remove(key)
    }

    /// Like `load`, but a missing or unreadable record is just absent.
    fn load_lenient<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.load(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("discarding unreadable record {key}: {e}");
                None
            }
        }
    }

    pub fn load_conversations(&self) -> Vec<Conversation> {
        self.load_lenient(CONVERSATIONS_KEY).unwrap_or_default()
    }

    pub fn save_conversations(&self, conversations: &[Conversation]) -> Result<(), StorageError> {
        self.save(CONVERSATIONS_KEY, conversations)
    }

    pub fn load_settings(&self) -> Option<Settings> {
        self.load_lenient(SETTINGS_KEY)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.save(SETTINGS_KEY, settings)
    }

    pub fn load_recipients(&self) -> Vec<String> {
        self.load_lenient(RECIPIENTS_KEY).unwrap_or_default()
    }

    pub fn save_recipients(&self, recipients: &[String]) -> Result<(), StorageError> {
        self.save(RECIPIENTS_KEY, recipients)
    }

    pub fn export_bundle(&self, now: DateTime<Utc>) -> ExportBundle {
        ExportBundle {
            conversations: self.load_conversations(),
            settings: self.load_settings().unwrap_or_default(),
            recipients: self.load_recipients(),
            export_date: now,
        }
    }

    /// Writes whichever top-level fields the document carries. Fields are
    /// applied in order and one that fails to parse stops the import
    /// without undoing the fields already written.
    pub fn import_document(&self, text: &str) -> Result<ImportSummary, ImportError> {
        let doc: serde_json::Value = serde_json::from_str(text).map_err(ImportError::Malformed)?;
        let serde_json::Value::Object(mut fields) = doc else {
            return Err(ImportError::NotAnObject);
        };
        let mut summary = ImportSummary::default();

        if let Some(value) = fields.remove("conversations") {
            let conversations: Vec<Conversation> = serde_json::from_value(value)
                .map_err(|source| ImportError::InvalidField { field: "conversations", source })?;
            self.save_conversations(&conversations)?;
            summary.conversations = Some(conversations.len());
        }
        if let Some(value) = fields.remove("settings") {
            let settings: Settings = serde_json::from_value(value)
                .map_err(|source| ImportError::InvalidField { field: "settings", source })?;
            self.save_settings(&settings)?;
            summary.settings = Some(settings);
        }
        if let Some(value) = fields.remove("recipients") {
            let recipients: Vec<String> = serde_json::from_value(value)
                .map_err(|source| ImportError::InvalidField { field: "recipients", source })?;
            self.save_recipients(&recipients)?;
            summary.recipients = Some(recipients);
        }
        log::info!(
            "imported conversations={:?} settings={} recipients={:?}",
            summary.conversations,
            summary.settings.is_some(),
            summary.recipients.as_ref().map(Vec::len)
        );
        Ok(summary)
    }
}

/// Replaces the conversation with the same id (or adds it), keeps the list
/// ordered most recently updated first and drops anything past the cap.
pub fn upsert_conversation(list: &mut Vec<Conversation>, conversation: Conversation) {
    list.retain(|c| c.id != conversation.id);
    list.insert(0, conversation);
    list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    list.truncate(MAX_CONVERSATIONS);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub conversations: Vec<Conversation>,
    pub settings: Settings,
    pub recipients: Vec<String>,
    #[serde(rename = "exportDate")]
    pub export_date: DateTime<Utc>,
}

impl ExportBundle {
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn file_name(date: NaiveDate) -> String {
        format!("email-agent-backup-{}.json", date.format("%Y-%m-%d"))
    }
}

/// What an import actually wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub conversations: Option<usize>,
    pub settings: Option<Settings>,
    pub recipients: Option<Vec<String>>,
}

impl ImportSummary {
    /// The conversation list is only re-read at startup.
    pub fn needs_restart(&self) -> bool {
        self.conversations.is_some()
    }
}
