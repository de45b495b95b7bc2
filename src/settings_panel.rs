use crate::config::{parse_backend_url, FontSize, Settings};
use crate::controller::{ConnectionProbe, ConversationController};
use crate::error::{ImportError, StorageError, ValidationError};
use crate::storage::{ExportBundle, ImportSummary, StorageLocation};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest time the "Testing..." state is shown, however fast the probe.
pub const MIN_TEST_DURATION: Duration = Duration::from_secs(1);

pub const IMPORT_SUCCESS_MESSAGE: &str = "Data imported successfully! Please restart the application to see all changes.";
pub const IMPORT_FAILURE_MESSAGE: &str = "Error importing data. Please check the file format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsTab {
    #[default]
    Account,
    Recipients,
    Api,
    Appearance,
    Data,
}

impl SettingsTab {
    pub const ALL: [SettingsTab; 5] = [
        SettingsTab::Account,
        SettingsTab::Recipients,
        SettingsTab::Api,
        SettingsTab::Appearance,
        SettingsTab::Data,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsTab::Account => "Account",
            SettingsTab::Recipients => "Recipients",
            SettingsTab::Api => "API",
            SettingsTab::Appearance => "Appearance",
            SettingsTab::Data => "Data",
        }
    }
}

/// Staged copy of the settings. Nothing reaches the controller until
/// `save`; dropping the panel discards the draft.
#[derive(Debug, Clone)]
pub struct SettingsPanel {
    draft: Settings,
    tab: SettingsTab,
    testing: bool,
}

impl SettingsPanel {
    pub fn open(controller: &ConversationController) -> Self {
        Self {
            draft: controller.settings().clone(),
            tab: SettingsTab::default(),
            testing: false,
        }
    }

    pub fn draft(&self) -> &Settings {
        &self.draft
    }

    pub fn set_user_name(&mut self, name: &str) {
        self.draft.user_name = name.to_string();
    }

    pub fn set_backend_url(&mut self, url: &str) {
        self.draft.backend_url = url.to_string();
    }

    pub fn set_font_size(&mut self, size: FontSize) {
        self.draft.font_size = size;
    }

    pub fn tab(&self) -> SettingsTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: SettingsTab) {
        self.tab = tab;
    }

    pub fn is_dirty(&self, controller: &ConversationController) -> bool {
        &self.draft != controller.settings()
    }

    pub fn storage_location(&self) -> StorageLocation {
        StorageLocation::from_settings(&self.draft)
    }

    /// Checks the draft before it may be saved.
    pub fn validate(&self) -> Result<(), ValidationError> {
        parse_backend_url(&self.draft.backend_url).map(|_| ())
    }

    /// Commits the draft. Returns whether the backend URL changed.
    pub fn save(self, controller: &mut ConversationController) -> bool {
        controller.update_settings(self.draft)
    }

    pub fn is_testing(&self) -> bool {
        self.testing
    }

    /// Enters the testing state; false if a test is already running.
    pub fn begin_connection_test(&mut self) -> bool {
        if self.testing {
            return false;
        }
        self.testing = true;
        true
    }

    pub fn end_connection_test(&mut self) {
        self.testing = false;
    }

    pub async fn test_connection(&mut self, controller: &mut ConversationController) -> bool {
        if !self.begin_connection_test() {
            return controller.is_online();
        }
        let online = run_connection_test(controller.connection_probe()).await;
        controller.set_online(online);
        self.end_connection_test();
        online
    }

    /// Writes a backup of all three records into `dir`.
    pub fn export_data(&self, controller: &ConversationController, dir: &Path) -> Result<PathBuf, StorageError> {
        let now = Utc::now();
        let bundle = controller.store().export_bundle(now);
        let path = dir.join(ExportBundle::file_name(now.date_naive()));
        fs::write(&path, bundle.to_json()?)?;
        log::info!("exported {} conversations to {}", bundle.conversations.len(), path.display());
        Ok(path)
    }

    /// Imports a backup and refreshes whatever can be refreshed in place.
    pub fn import_data(
        &mut self,
        controller: &mut ConversationController,
        path: &Path,
    ) -> Result<ImportSummary, ImportError> {
        let text = fs::read_to_string(path)?;
        let summary = controller.store().import_document(&text)?;
        controller.apply_import(&summary);
        self.draft = controller.settings().clone();
        Ok(summary)
    }

    pub fn clear_all(&self, controller: &mut ConversationController, confirm: impl FnOnce(&str) -> bool) -> bool {
        controller.clear_all_conversations(confirm)
    }
}

/// Runs the probe, holding the result back until `MIN_TEST_DURATION` has
/// passed since the start.
pub async fn run_connection_test(probe: ConnectionProbe) -> bool {
    let deadline = tokio::time::Instant::now() + MIN_TEST_DURATION;
    let online = probe.run().await;
    tokio::time::sleep_until(deadline).await;
    online
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::ApiClient;
    use crate::config::EnvConfig;
    use crate::storage::Store;
    use crate::toast::ToastNotifier;
    use tokio::runtime::Handle;

    fn controller() -> ConversationController {
        ConversationController::new(
            EnvConfig::default(),
            Store::in_memory(),
            ApiClient::new(),
            ToastNotifier::new(Handle::current()),
        )
    }

    #[tokio::test]
    async fn draft_is_isolated_until_saved() {
        let mut ctl = controller();
        let mut panel = SettingsPanel::open(&ctl);
        panel.set_user_name("Draft Name");
        panel.set_font_size(FontSize::Large);
        assert!(panel.is_dirty(&ctl));
        assert_eq!(ctl.settings().user_name, "User");
        drop(panel);
        assert_eq!(ctl.settings().user_name, "User");
        assert!(ctl.store().load_settings().is_none());

        let mut panel = SettingsPanel::open(&ctl);
        assert!(!panel.is_dirty(&ctl));
        panel.set_user_name("Saved Name");
        assert!(!panel.save(&mut ctl));
        assert_eq!(ctl.settings().user_name, "Saved Name");
        assert_eq!(ctl.store().load_settings().unwrap().user_name, "Saved Name");
    }

    #[tokio::test]
    async fn draft_backend_url_is_validated() {
        let ctl = controller();
        let mut panel = SettingsPanel::open(&ctl);
        assert!(panel.validate().is_ok());
        panel.set_backend_url("http://");
        assert!(matches!(panel.validate(), Err(ValidationError::InvalidUrl(_))));
        panel.set_backend_url("agent.internal:8080");
        assert!(panel.validate().is_ok());
    }

    #[tokio::test]
    async fn only_one_connection_test_at_a_time() {
        let ctl = controller();
        let mut panel = SettingsPanel::open(&ctl);
        assert!(panel.begin_connection_test());
        assert!(panel.is_testing());
        assert!(!panel.begin_connection_test());
        panel.end_connection_test();
        assert!(!panel.is_testing());
    }

    #[tokio::test]
    async fn export_import_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = controller();
        source.add_recipient("boss@corp.com").unwrap();
        let mut settings = source.settings().clone();
        settings.user_name = "Exporter".into();
        source.update_settings(settings);
        let pending = source.begin_send("Quarterly report").unwrap();
        drop(pending);

        let panel = SettingsPanel::open(&source);
        let path = panel.export_data(&source, dir.path()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("email-agent-backup-"));

        let mut target = controller();
        let mut panel = SettingsPanel::open(&target);
        let summary = panel.import_data(&mut target, &path).unwrap();
        assert_eq!(summary.conversations, Some(1));
        assert!(summary.needs_restart());
        assert_eq!(target.recipients(), ["boss@corp.com".to_string()]);
        assert_eq!(target.settings().user_name, "Exporter");
        assert_eq!(panel.draft().user_name, "Exporter");
        assert_eq!(target.store().load_conversations(), source.store().load_conversations());
    }

    #[tokio::test]
    async fn import_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller();
        let mut panel = SettingsPanel::open(&ctl);

        let missing = dir.path().join("nope.json");
        assert!(matches!(panel.import_data(&mut ctl, &missing), Err(ImportError::Io(_))));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{{{").unwrap();
        assert!(matches!(panel.import_data(&mut ctl, &garbage), Err(ImportError::Malformed(_))));
    }

    #[tokio::test]
    async fn clear_all_goes_through_confirmation() {
        let mut ctl = controller();
        let pending = ctl.begin_send("Hello").unwrap();
        drop(pending);
        let panel = SettingsPanel::open(&ctl);
        assert!(!panel.clear_all(&mut ctl, |_| false));
        assert_eq!(ctl.conversations().len(), 1);
        assert!(panel.clear_all(&mut ctl, |_| true));
        assert!(ctl.conversations().is_empty());
    }

    #[test]
    fn tabs_have_labels() {
        let labels: Vec<_> = SettingsTab::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(labels, ["Account", "Recipients", "API", "Appearance", "Data"]);
    }
}
