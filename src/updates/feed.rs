use tauri::AppHandle;
use tauri_plugin_updater::{Update, UpdaterExt};

use super::{AvailableRelease, ReleaseFeed};
use crate::error::UpdateError;

/// Release feed backed by the updater plugin and the endpoints configured in
/// `tauri.conf.json`.
pub struct TauriReleaseFeed {
    app: AppHandle,
}

impl TauriReleaseFeed {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ReleaseFeed for TauriReleaseFeed {
    type Release = Update;

    fn current_version(&self) -> String {
        self.app.package_info().version.to_string()
    }

    fn is_packaged(&self) -> bool {
        !tauri::is_dev()
    }

    async fn check(&self) -> Result<Option<AvailableRelease<Update>>, UpdateError> {
        // Version ordering is decided by the manager, so every remote release
        // is reported back.
        let updater = self
            .app
            .updater_builder()
            .version_comparator(|_, _| true)
            .build()
            .map_err(|error| UpdateError::Check(error.to_string()))?;

        let update = updater
            .check()
            .await
            .map_err(|error| UpdateError::Check(error.to_string()))?;

        Ok(update.map(|update| AvailableRelease {
            version: update.version.clone(),
            notes: update.body.clone(),
            published_at: update.date.map(|date| date.to_string()),
            release: update,
        }))
    }

    async fn download<P>(
        &self,
        release: &Update,
        mut on_progress: P,
    ) -> Result<Vec<u8>, UpdateError>
    where
        P: FnMut(u64, Option<u64>) + Send + 'static,
    {
        release
            .download(move |chunk, total| on_progress(chunk as u64, total), || {})
            .await
            .map_err(|error| UpdateError::Download(error.to_string()))
    }

    fn install(&self, release: &Update, package: &[u8]) -> Result<(), UpdateError> {
        release
            .install(package)
            .map_err(|error| UpdateError::Install(error.to_string()))?;
        log::info!("Update installed, restarting");
        self.app.restart()
    }
}
