use crate::api::client::ApiClient;
use crate::config::EnvConfig;
use crate::controller::ConversationController;
use crate::error::StorageError;
use crate::storage::{default_data_dir, StorageLocation, Store};
use crate::toast::ToastNotifier;
use crate::utils::RUNTIME;
use adw::Application;
use std::cell::RefCell;
use std::rc::Rc;

/// Opens local storage, then switches location if the saved settings
/// ask for remote storage.
fn open_store(env: &EnvConfig) -> Result<Store, StorageError> {
    let dir = env.data_dir.clone().or_else(default_data_dir).ok_or(StorageError::NoDataDir)?;
    let local = Store::open(StorageLocation::Local, &dir)?;
    let wants_remote = local.load_settings().is_some_and(|s| s.use_remote_storage);
    if wants_remote {
        drop(local);
        Store::open(StorageLocation::Remote, &dir)
    } else {
        Ok(local)
    }
}

pub fn build_ui(app: &Application) {
    let env = EnvConfig::load();
    let toasts = ToastNotifier::new(RUNTIME.handle().clone());
    let store = match open_store(&env) {
        Ok(store) => store,
        Err(e) => {
            log::error!("storage unavailable, nothing will be saved: {e}");
            toasts.push(
                crate::toast::ToastKind::Warning,
                format!("Storage unavailable, changes will not be saved: {e}"),
                std::time::Duration::ZERO,
            );
            Store::in_memory()
        }
    };
    let controller = ConversationController::new(env, store, ApiClient::new(), toasts);
    crate::ui::main_window::show_main_window(app, Rc::new(RefCell::new(controller)));
}
