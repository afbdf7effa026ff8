use std::sync::Arc;

use tauri::AppHandle;

use crate::config::SettingsStore;
use crate::launcher::Launcher;
use crate::system::{DetachedSpawner, TauriOpener};
use crate::updates::{TauriReleaseFeed, UpdateManager};

pub type HostLauncher = Launcher<DetachedSpawner, TauriOpener>;
pub type HostUpdateManager = UpdateManager<TauriReleaseFeed>;

pub struct DesktopState {
    pub settings: SettingsStore,
    pub launcher: HostLauncher,
    pub updates: Arc<HostUpdateManager>,
}

impl DesktopState {
    pub fn new(app: &AppHandle) -> Self {
        let settings = SettingsStore::at_default_location();
        log::info!("Settings file: {:?}", settings.path());

        Self {
            settings,
            launcher: Launcher::new(DetachedSpawner, TauriOpener::new(app.clone())),
            updates: Arc::new(UpdateManager::new(TauriReleaseFeed::new(app.clone()))),
        }
    }
}
