use serde_json::Value;
use tauri::{ipc::Channel, AppHandle, State};
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_notification::NotificationExt;
use url::Url;
use uuid::Uuid;

use crate::config::Settings;
use crate::discovery::{detect_applications, DetectedApplication};
use crate::launcher::{OpenFileResult, SystemOpener};
use crate::platform::{self, HostRegistry, EXECUTABLE_EXTENSIONS};
use crate::state::DesktopState;
use crate::updates::UpdateStatus;

#[tauri::command]
pub async fn get_settings(state: State<'_, DesktopState>) -> Result<Settings, String> {
    Ok(state.settings.load())
}

/// Accepts whatever the UI sends; malformed fields fall back to defaults.
#[tauri::command]
pub async fn save_settings(
    state: State<'_, DesktopState>,
    settings: Value,
) -> Result<bool, String> {
    Ok(state.settings.save(&Settings::from_value(settings)))
}

#[tauri::command]
pub async fn open_file(
    state: State<'_, DesktopState>,
    path: String,
) -> Result<OpenFileResult, String> {
    let settings = state.settings.load();
    Ok(state.launcher.open_file(&path, &settings))
}

#[tauri::command]
pub async fn select_file(app: AppHandle) -> Result<Option<String>, String> {
    let picked = app
        .dialog()
        .file()
        .set_title("Choisir un fichier")
        .blocking_pick_file();

    picked_path(picked)
}

#[tauri::command]
pub async fn select_launcher_path(app: AppHandle) -> Result<Option<String>, String> {
    let picked = app
        .dialog()
        .file()
        .set_title("Choisir une application")
        .add_filter("Applications", &EXECUTABLE_EXTENSIONS)
        .blocking_pick_file();

    picked_path(picked)
}

#[tauri::command]
pub async fn detect_apps() -> Result<Vec<DetectedApplication>, String> {
    tauri::async_runtime::spawn_blocking(|| {
        detect_applications(&platform::probe_table(), &HostRegistry)
    })
    .await
    .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn check_for_updates(state: State<'_, DesktopState>) -> Result<UpdateStatus, String> {
    Ok(state.updates.check().await)
}

#[tauri::command]
pub async fn install_update(state: State<'_, DesktopState>) -> Result<bool, String> {
    state
        .updates
        .install()
        .map_err(|error| error.user_message().to_string())
}

#[tauri::command]
pub async fn open_external_url(
    state: State<'_, DesktopState>,
    url: String,
) -> Result<bool, String> {
    Ok(open_external(state.launcher.opener(), &url))
}

/// Sends the current status, then every transition, to `on_event` until
/// unsubscribed or the channel closes.
#[tauri::command]
pub async fn subscribe_update_status(
    state: State<'_, DesktopState>,
    on_event: Channel<UpdateStatus>,
) -> Result<String, String> {
    state
        .updates
        .subscribe_with_current(move |status| on_event.send(status.clone()))
        .map(|id| id.to_string())
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn unsubscribe_update_status(
    state: State<'_, DesktopState>,
    id: String,
) -> Result<bool, String> {
    Ok(Uuid::parse_str(&id).is_ok_and(|id| state.updates.unsubscribe(id)))
}

pub fn notify(app: &AppHandle, title: &str, body: &str) {
    let _ = app
        .notification()
        .builder()
        .title(title)
        .body(body)
        .show();
}

fn picked_path(picked: Option<tauri_plugin_dialog::FilePath>) -> Result<Option<String>, String> {
    picked
        .map(|file| {
            file.into_path()
                .map(|path| path.display().to_string())
                .map_err(|error| error.to_string())
        })
        .transpose()
}

/// Only `http` and `https` reach the OS; anything else is refused.
fn open_external<O: SystemOpener>(opener: &O, raw: &str) -> bool {
    let Some(url) = web_url(raw) else {
        log::warn!("Refusing to open {raw:?}");
        return false;
    };

    match opener.open_url(url.as_str()) {
        Ok(()) => true,
        Err(error) => {
            log::warn!("{error}");
            false
        }
    }
}

fn web_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::tests::FakeOpener;

    #[test]
    fn test_only_web_urls_are_opened() {
        let opener = FakeOpener::default();

        assert!(!open_external(&opener, "ftp://files.example.com/rapport.pdf"));
        assert!(!open_external(&opener, "file:///etc/passwd"));
        assert!(!open_external(&opener, "javascript:alert(1)"));
        assert!(!open_external(&opener, "pas une url"));
        assert!(!open_external(&opener, ""));
        assert!(opener.urls.lock().is_empty());

        assert!(open_external(&opener, "https://example.com"));
        assert!(open_external(&opener, "http://example.com/docs?q=1"));
        assert_eq!(
            *opener.urls.lock(),
            vec![
                "https://example.com/".to_string(),
                "http://example.com/docs?q=1".to_string(),
            ]
        );
    }

    #[test]
    fn test_os_failure_reports_false() {
        let opener = FakeOpener {
            fail_urls: true,
            ..FakeOpener::default()
        };

        assert!(!open_external(&opener, "https://example.com"));
        assert_eq!(opener.urls.lock().len(), 1);
    }
}
