use std::{
    ffi::OsString,
    os::windows::process::CommandExt,
    path::{Path, PathBuf},
    process::Command,
};

use dirs::{data_local_dir, home_dir};

use super::run_query;
use crate::discovery::{parse_start_apps, AppRegistry, ProbeTable, RegistryApp};
use crate::error::DiscoveryError;

const DETACHED_PROCESS: u32 = 0x0000_0008;
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

const RENAMES: &[(&str, &str)] = &[("WINWORD", "Word"), ("swriter", "LibreOffice Writer")];

pub fn probe_table() -> ProbeTable {
    let local = data_local_dir().unwrap_or_else(|| {
        home_dir()
            .unwrap_or_default()
            .join("AppData")
            .join("Local")
    });

    let locations = vec![
        PathBuf::from(r"C:\Program Files\Microsoft Office\root\Office16\WINWORD.EXE"),
        PathBuf::from(r"C:\Program Files (x86)\Microsoft Office\root\Office16\WINWORD.EXE"),
        PathBuf::from(r"C:\Program Files\Notepad++\notepad++.exe"),
        PathBuf::from(r"C:\Program Files (x86)\Notepad++\notepad++.exe"),
        PathBuf::from(r"C:\Program Files\LibreOffice\program\swriter.exe"),
        PathBuf::from(r"C:\Program Files (x86)\LibreOffice\program\swriter.exe"),
        local.join(r"Obsidian\Obsidian.exe"),
        local.join(r"Programs\Obsidian\Obsidian.exe"),
        local.join(r"Programs\obsidian\Obsidian.exe"),
        PathBuf::from(r"C:\Program Files\Microsoft VS Code\Code.exe"),
        local.join(r"Programs\Microsoft VS Code\Code.exe"),
        PathBuf::from(r"C:\Windows\notepad.exe"),
    ];

    ProbeTable {
        locations,
        renames: RENAMES,
    }
}

/// Start menu entries as reported by `Get-StartApps`.
pub struct HostRegistry;

impl AppRegistry for HostRegistry {
    fn installed_apps(&self) -> Result<Vec<RegistryApp>, DiscoveryError> {
        let mut command = Command::new("powershell.exe");
        command
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-Command",
                "Get-StartApps | ConvertTo-Json",
            ])
            .creation_flags(CREATE_NO_WINDOW);

        parse_start_apps(&run_query(command)?)
    }
}

/// `cmd /c start "" <token> <file>`; the empty argument is the window title.
pub fn shell_launch_command(token: &str, file: &Path) -> (OsString, Vec<OsString>) {
    (
        OsString::from("cmd.exe"),
        vec![
            OsString::from("/c"),
            OsString::from("start"),
            OsString::new(),
            OsString::from(token),
            file.as_os_str().to_os_string(),
        ],
    )
}

pub fn editor_launch_command(executable: &Path, file: &Path) -> (OsString, Vec<OsString>) {
    (
        executable.as_os_str().to_os_string(),
        vec![file.as_os_str().to_os_string()],
    )
}

pub fn detach(command: &mut Command) {
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}
