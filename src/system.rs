//! Host implementations of the launcher seams.

use std::{
    ffi::{OsStr, OsString},
    io,
    path::Path,
    process::{Command, Stdio},
    thread,
};

use tauri::AppHandle;
use tauri_plugin_opener::OpenerExt;

use crate::error::LaunchError;
use crate::launcher::{ProcessSpawner, SystemOpener};
use crate::platform;

/// Starts programs without keeping a handle on them. Each child is reaped on
/// a background thread once it exits; nothing waits for it.
pub struct DetachedSpawner;

impl ProcessSpawner for DetachedSpawner {
    fn spawn_detached(&self, program: &OsStr, args: &[OsString]) -> io::Result<()> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        platform::detach(&mut command);

        let mut child = command.spawn()?;
        let pid = child.id();
        log::debug!("Spawned {program:?} as pid {pid}");

        let reaper = thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => log::debug!("Launched process {pid} exited with {status}"),
                Err(error) => log::warn!("Unable to reap process {pid}: {error}"),
            });
        if let Err(error) = reaper {
            log::warn!("Unable to start reaper for process {pid}: {error}");
        }

        Ok(())
    }
}

pub struct TauriOpener {
    app: AppHandle,
}

impl TauriOpener {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl SystemOpener for TauriOpener {
    fn open_path(&self, path: &Path) -> Result<(), LaunchError> {
        self.app
            .opener()
            .open_path(path.to_string_lossy(), None::<&str>)
            .map_err(|error| LaunchError::SystemOpen(error.to_string()))
    }

    fn open_url(&self, url: &str) -> Result<(), LaunchError> {
        self.app
            .opener()
            .open_url(url, None::<&str>)
            .map_err(|error| LaunchError::SystemOpen(error.to_string()))
    }
}
