use std::{
    env,
    ffi::OsString,
    fs,
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::Command,
};

use dirs::{data_dir, home_dir};
use walkdir::WalkDir;

use crate::discovery::{parse_desktop_entry, AppRegistry, ProbeTable, RegistryApp};
use crate::error::DiscoveryError;
use crate::launcher::SHELL_TOKEN_PREFIX;

const RENAMES: &[(&str, &str)] = &[
    ("libreoffice", "LibreOffice"),
    ("lowriter", "LibreOffice Writer"),
    ("gedit", "Gedit"),
    ("gnome-text-editor", "Text Editor"),
    ("kate", "Kate"),
    ("mousepad", "Mousepad"),
    ("code", "Visual Studio Code"),
    ("obsidian", "Obsidian"),
];

const DEFAULT_XDG_DATA_DIRS: &str = "/usr/local/share:/usr/share";

pub fn probe_table() -> ProbeTable {
    let local_bin = home_dir().unwrap_or_default().join(".local").join("bin");

    let mut locations: Vec<PathBuf> = [
        "/usr/bin/libreoffice",
        "/usr/bin/lowriter",
        "/usr/bin/gedit",
        "/usr/bin/gnome-text-editor",
        "/usr/bin/kate",
        "/usr/bin/mousepad",
        "/usr/bin/code",
        "/usr/local/bin/code",
        "/snap/bin/code",
        "/usr/bin/obsidian",
        "/snap/bin/obsidian",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    locations.push(local_bin.join("obsidian"));

    ProbeTable {
        locations,
        renames: RENAMES,
    }
}

/// `.desktop` entries from the XDG application directories.
pub struct HostRegistry;

impl AppRegistry for HostRegistry {
    fn installed_apps(&self) -> Result<Vec<RegistryApp>, DiscoveryError> {
        let mut apps = Vec::new();

        for dir in application_dirs() {
            let entries = WalkDir::new(&dir)
                .max_depth(3)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "desktop"));

            for entry in entries {
                let Ok(content) = fs::read_to_string(entry.path()) else {
                    continue;
                };
                let id = desktop_id(&dir, entry.path());
                if let Some(app) = parse_desktop_entry(&id, &content) {
                    apps.push(app);
                }
            }
        }

        Ok(apps)
    }
}

fn application_dirs() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = data_dir().into_iter().collect();
    let shared = env::var_os("XDG_DATA_DIRS")
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| OsString::from(DEFAULT_XDG_DATA_DIRS));
    roots.extend(env::split_paths(&shared));
    roots.push(PathBuf::from("/var/lib/flatpak/exports/share"));

    roots
        .into_iter()
        .map(|dir| dir.join("applications"))
        .filter(|dir| dir.is_dir())
        .collect()
}

/// Desktop ids join sub-directories with `-` and drop the extension.
fn desktop_id(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file).with_extension("");
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("-")
}

/// `gtk-launch <desktop-id> <file>`
pub fn shell_launch_command(token: &str, file: &Path) -> (OsString, Vec<OsString>) {
    let id = token.strip_prefix(SHELL_TOKEN_PREFIX).unwrap_or(token);
    (
        OsString::from("gtk-launch"),
        vec![OsString::from(id), file.as_os_str().to_os_string()],
    )
}

pub fn editor_launch_command(executable: &Path, file: &Path) -> (OsString, Vec<OsString>) {
    (
        executable.as_os_str().to_os_string(),
        vec![file.as_os_str().to_os_string()],
    )
}

pub fn detach(command: &mut Command) {
    command.process_group(0);
}
