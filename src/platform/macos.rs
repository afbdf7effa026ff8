use std::{
    ffi::OsString,
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::Command,
};

use dirs::home_dir;

use super::run_query;
use crate::discovery::{parse_system_profiler, AppRegistry, ProbeTable, RegistryApp};
use crate::error::DiscoveryError;
use crate::launcher::SHELL_TOKEN_PREFIX;

const RENAMES: &[(&str, &str)] = &[("Microsoft Word", "Word")];

const BUNDLES: [&str; 7] = [
    "Microsoft Word.app",
    "Pages.app",
    "LibreOffice.app",
    "Obsidian.app",
    "Visual Studio Code.app",
    "BBEdit.app",
    "TextEdit.app",
];

pub fn probe_table() -> ProbeTable {
    let user_apps = home_dir().unwrap_or_default().join("Applications");
    let mut locations: Vec<PathBuf> = BUNDLES
        .iter()
        .map(|bundle| Path::new("/Applications").join(bundle))
        .collect();
    locations.extend(BUNDLES.iter().map(|bundle| user_apps.join(bundle)));
    locations.push(PathBuf::from("/System/Applications/TextEdit.app"));

    ProbeTable {
        locations,
        renames: RENAMES,
    }
}

/// Application bundles as reported by `system_profiler`.
pub struct HostRegistry;

impl AppRegistry for HostRegistry {
    fn installed_apps(&self) -> Result<Vec<RegistryApp>, DiscoveryError> {
        let mut command = Command::new("system_profiler");
        command.args(["-json", "-detailLevel", "mini", "SPApplicationsDataType"]);

        parse_system_profiler(&run_query(command)?)
    }
}

/// `open -a <name> <file>`
pub fn shell_launch_command(token: &str, file: &Path) -> (OsString, Vec<OsString>) {
    let app = token.strip_prefix(SHELL_TOKEN_PREFIX).unwrap_or(token);
    (
        OsString::from("open"),
        vec![
            OsString::from("-a"),
            OsString::from(app),
            file.as_os_str().to_os_string(),
        ],
    )
}

/// Bundles cannot be executed directly, they go through `open -a`.
pub fn editor_launch_command(executable: &Path, file: &Path) -> (OsString, Vec<OsString>) {
    if executable.extension().is_some_and(|ext| ext == "app") {
        return (
            OsString::from("open"),
            vec![
                OsString::from("-a"),
                executable.as_os_str().to_os_string(),
                file.as_os_str().to_os_string(),
            ],
        );
    }

    (
        executable.as_os_str().to_os_string(),
        vec![file.as_os_str().to_os_string()],
    )
}

pub fn detach(command: &mut Command) {
    command.process_group(0);
}
