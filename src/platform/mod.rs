//! Host-specific probe tables, registry queries and launch commands.

#[cfg(any(windows, target_os = "macos"))]
use std::process::Command;

#[cfg(any(windows, target_os = "macos"))]
use crate::error::DiscoveryError;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::*;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::*;

#[cfg(all(unix, not(target_os = "macos")))]
mod linux;
#[cfg(all(unix, not(target_os = "macos")))]
pub use linux::*;

/// Extensions offered by the launcher picker.
pub const EXECUTABLE_EXTENSIONS: [&str; 5] = ["exe", "app", "sh", "bat", "cmd"];

/// Runs a registry query and returns its stdout.
#[cfg(any(windows, target_os = "macos"))]
fn run_query(mut command: Command) -> Result<String, DiscoveryError> {
    let output = command
        .output()
        .map_err(|error| DiscoveryError::Query(error.to_string()))?;

    if !output.status.success() {
        return Err(DiscoveryError::Query(format!(
            "{:?} exited with {}",
            command.get_program(),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
