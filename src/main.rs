#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod commands;
mod config;
mod discovery;
mod error;
mod launcher;
mod platform;
mod state;
mod system;
mod updates;

use anyhow::Context;
use log::LevelFilter;
use tauri::{App, Manager};

use commands::{
    check_for_updates, detect_apps, get_settings, install_update, notify, open_external_url,
    open_file, save_settings, select_file, select_launcher_path, subscribe_update_status,
    unsubscribe_update_status,
};
use state::DesktopState;
use updates::{run_scheduled_checks, UpdateState, CHECK_INTERVAL};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    tauri::Builder::default()
        .plugin(tauri_plugin_log::Builder::default().level(level).build())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_updater::Builder::new().build())
        .setup(|app| {
            setup(app);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_settings,
            save_settings,
            open_file,
            select_file,
            select_launcher_path,
            detect_apps,
            check_for_updates,
            install_update,
            open_external_url,
            subscribe_update_status,
            unsubscribe_update_status
        ])
        .run(tauri::generate_context!())
        .context("error while running Classify")
}

fn setup(app: &mut App) {
    let handle = app.handle().clone();
    let state = DesktopState::new(&handle);
    let updates = state.updates.clone();
    let settings = state.settings.clone();
    app.manage(state);

    updates.subscribe(move |status| {
        if status.status == UpdateState::Downloaded {
            let version = status.latest_version.as_deref().unwrap_or_default();
            notify(&handle, "Mise à jour prête", &download_ready_body(version));
        }
    });

    tauri::async_runtime::spawn(run_scheduled_checks(updates, CHECK_INTERVAL, move || {
        settings.load().auto_updates_enabled
    }));
}

fn download_ready_body(version: &str) -> String {
    format!("La version {version} de Classify est prête à être installée.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_ready_body_waits_for_install() {
        let body = download_ready_body("1.4.0");

        assert_eq!(body, "La version 1.4.0 de Classify est prête à être installée.");
        assert!(!body.contains("redémarrage"));
    }
}
