//! Editor discovery: static install-path probes merged with the host's
//! application registry.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::DiscoveryError;
use crate::launcher::SHELL_TOKEN_PREFIX;

/// Registry entries are kept when their name contains one of these.
pub const EDITOR_KEYWORDS: [&str; 8] = [
    "word", "notepad", "obsidian", "code", "office", "writer", "text", "edit",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedApplication {
    pub name: String,
    /// Executable path or `shell:` token.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryApp {
    pub name: String,
    pub token: String,
}

/// The host's "list installed applications" query.
pub trait AppRegistry: Send + Sync {
    fn installed_apps(&self) -> Result<Vec<RegistryApp>, DiscoveryError>;
}

/// Well-known install locations, in probe order, plus raw-name fixes.
pub struct ProbeTable {
    pub locations: Vec<PathBuf>,
    pub renames: &'static [(&'static str, &'static str)],
}

pub fn detect_applications<R>(table: &ProbeTable, registry: &R) -> Vec<DetectedApplication>
where
    R: AppRegistry + ?Sized,
{
    let mut detected = probe_locations(table);

    let discovered = match registry.installed_apps() {
        Ok(apps) => apps,
        Err(error) => {
            log::warn!("Error detecting apps: {error}");
            Vec::new()
        }
    };

    merge_discovered(&mut detected, discovered);
    log::debug!("Detected {} candidate editors", detected.len());
    detected
}

fn probe_locations(table: &ProbeTable) -> Vec<DetectedApplication> {
    table
        .locations
        .iter()
        .filter(|location| location.exists())
        .map(|location| DetectedApplication {
            name: display_name(location, table.renames),
            path: location.display().to_string(),
        })
        .collect()
}

fn merge_discovered(detected: &mut Vec<DetectedApplication>, discovered: Vec<RegistryApp>) {
    for app in discovered {
        if !is_editor_like(&app.name) {
            continue;
        }

        let name = app.name.to_lowercase();
        if detected.iter().any(|known| known.name.to_lowercase() == name) {
            continue;
        }

        detected.push(DetectedApplication {
            name: app.name,
            path: app.token,
        });
    }
}

pub fn display_name(location: &Path, renames: &[(&str, &str)]) -> String {
    let raw = location
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.display().to_string());

    renames
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| to.to_string())
        .unwrap_or(raw)
}

pub fn is_editor_like(name: &str) -> bool {
    let name = name.to_lowercase();
    EDITOR_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

/// JSON list or single object, normalized to a list. Empty output is an
/// empty list.
fn json_records(raw: &str) -> Result<Vec<Value>, DiscoveryError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => Ok(items),
        record @ Value::Object(_) => Ok(vec![record]),
        _ => Err(DiscoveryError::UnexpectedShape),
    }
}

/// `Get-StartApps | ConvertTo-Json` output: `{Name, AppID}` records.
pub fn parse_start_apps(raw: &str) -> Result<Vec<RegistryApp>, DiscoveryError> {
    let apps = json_records(raw)?
        .iter()
        .filter_map(|record| {
            let name = record.get("Name")?.as_str()?;
            let id = record.get("AppID")?.as_str()?;
            Some(RegistryApp {
                name: name.to_string(),
                token: format!("{SHELL_TOKEN_PREFIX}AppsFolder\\{id}"),
            })
        })
        .collect();
    Ok(apps)
}

/// `system_profiler -json SPApplicationsDataType` output.
pub fn parse_system_profiler(raw: &str) -> Result<Vec<RegistryApp>, DiscoveryError> {
    let root = serde_json::from_str::<Value>(raw.trim())?;
    let records = match root.get("SPApplicationsDataType") {
        Some(Value::Array(items)) => items.clone(),
        Some(record @ Value::Object(_)) => vec![record.clone()],
        _ => return Err(DiscoveryError::UnexpectedShape),
    };

    let apps = records
        .iter()
        .filter_map(|record| {
            let name = record.get("_name")?.as_str()?;
            Some(RegistryApp {
                name: name.to_string(),
                token: format!("{SHELL_TOKEN_PREFIX}{name}"),
            })
        })
        .collect();
    Ok(apps)
}

/// Reads the `[Desktop Entry]` group of a `.desktop` file. Hidden entries and
/// non-applications are skipped.
pub fn parse_desktop_entry(id: &str, content: &str) -> Option<RegistryApp> {
    let mut in_entry = false;
    let mut name = None;
    let mut hidden = false;
    let mut is_application = true;

    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" if name.is_none() => name = Some(value.to_string()),
            "NoDisplay" | "Hidden" => hidden |= value.eq_ignore_ascii_case("true"),
            "Type" => is_application = value == "Application",
            _ => {}
        }
    }

    if hidden || !is_application {
        return None;
    }

    name.filter(|name| !name.is_empty()).map(|name| RegistryApp {
        name,
        token: format!("{SHELL_TOKEN_PREFIX}{id}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// `None` simulates a failing query.
    struct StaticRegistry(Option<Vec<RegistryApp>>);

    impl AppRegistry for StaticRegistry {
        fn installed_apps(&self) -> Result<Vec<RegistryApp>, DiscoveryError> {
            self.0
                .clone()
                .ok_or_else(|| DiscoveryError::Query("powershell.exe not found".into()))
        }
    }

    fn registry(apps: &[(&str, &str)]) -> StaticRegistry {
        let apps = apps
            .iter()
            .map(|(name, token)| RegistryApp {
                name: name.to_string(),
                token: token.to_string(),
            })
            .collect();
        StaticRegistry(Some(apps))
    }

    const RENAMES: &[(&str, &str)] = &[("WINWORD", "Word"), ("swriter", "LibreOffice Writer")];

    fn install(temp: &TempDir, relative: &str) -> PathBuf {
        let path = temp.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        path
    }

    fn table(locations: Vec<PathBuf>) -> ProbeTable {
        ProbeTable {
            locations,
            renames: RENAMES,
        }
    }

    #[test]
    fn test_probes_existing_locations_in_order_with_renames() {
        let temp = TempDir::new().unwrap();
        let word = install(&temp, "Office16/WINWORD.EXE");
        let writer = install(&temp, "LibreOffice/program/swriter.exe");
        let missing = temp.path().join("Notepad++/notepad++.exe");

        let apps = detect_applications(
            &table(vec![word.clone(), missing, writer.clone()]),
            &registry(&[]),
        );

        assert_eq!(
            apps,
            vec![
                DetectedApplication {
                    name: "Word".into(),
                    path: word.display().to_string(),
                },
                DetectedApplication {
                    name: "LibreOffice Writer".into(),
                    path: writer.display().to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_names_keep_the_probed_entry() {
        let temp = TempDir::new().unwrap();
        let word = install(&temp, "Office16/WINWORD.EXE");

        let apps = detect_applications(
            &table(vec![word.clone()]),
            &registry(&[
                ("WORD", "shell:AppsFolder\\Microsoft.Office.WINWORD.EXE.15"),
                ("Obsidian", "shell:AppsFolder\\md.obsidian"),
                ("obsidian", "shell:AppsFolder\\md.obsidian.portable"),
            ]),
        );

        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].path, word.display().to_string());
        assert_eq!(apps[1].name, "Obsidian");
        assert_eq!(apps[1].path, "shell:AppsFolder\\md.obsidian");
    }

    #[test]
    fn test_registry_entries_are_filtered_by_keyword() {
        let apps = detect_applications(
            &table(Vec::new()),
            &registry(&[
                ("Calculator", "shell:AppsFolder\\calc"),
                ("Sublime Text", "shell:AppsFolder\\sublime"),
                ("Visual Studio Code", "shell:AppsFolder\\vscode"),
                ("Spotify", "shell:AppsFolder\\spotify"),
            ]),
        );

        let names: Vec<_> = apps.iter().map(|app| app.name.as_str()).collect();
        assert_eq!(names, vec!["Sublime Text", "Visual Studio Code"]);
    }

    #[test]
    fn test_registry_failure_keeps_probed_results() {
        let temp = TempDir::new().unwrap();
        let notepad = install(&temp, "Windows/notepad.exe");
        let apps = detect_applications(&table(vec![notepad]), &StaticRegistry(None));

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "notepad");
    }

    #[test]
    fn test_start_apps_single_object_is_normalized() {
        let raw = r#"{ "Name": "Notepad", "AppID": "Microsoft.WindowsNotepad_8wekyb3d8bbwe!App" }"#;
        let apps = parse_start_apps(raw).unwrap();

        assert_eq!(
            apps,
            vec![RegistryApp {
                name: "Notepad".into(),
                token: "shell:AppsFolder\\Microsoft.WindowsNotepad_8wekyb3d8bbwe!App".into(),
            }]
        );
    }

    #[test]
    fn test_start_apps_list_skips_incomplete_records() {
        let raw = r#"[
            { "Name": "Word", "AppID": "Microsoft.Office.WINWORD.EXE.15" },
            { "Name": "Broken" },
            { "Name": "Obsidian", "AppID": "md.obsidian" }
        ]"#;

        let names: Vec<_> = parse_start_apps(raw)
            .unwrap()
            .into_iter()
            .map(|app| app.name)
            .collect();
        assert_eq!(names, vec!["Word", "Obsidian"]);
    }

    #[test]
    fn test_start_apps_rejects_unexpected_shapes() {
        assert!(parse_start_apps("").unwrap().is_empty());
        assert!(matches!(
            parse_start_apps("\"just a string\""),
            Err(DiscoveryError::UnexpectedShape)
        ));
        assert!(matches!(
            parse_start_apps("Get-StartApps : not recognized"),
            Err(DiscoveryError::Parse(_))
        ));
    }

    #[test]
    fn test_system_profiler_output() {
        let raw = r#"{ "SPApplicationsDataType": [
            { "_name": "TextEdit", "path": "/System/Applications/TextEdit.app" },
            { "_name": "Safari", "path": "/Applications/Safari.app" }
        ] }"#;

        let apps = parse_system_profiler(raw).unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].token, "shell:TextEdit");
        assert!(matches!(
            parse_system_profiler("{}"),
            Err(DiscoveryError::UnexpectedShape)
        ));
    }

    #[test]
    fn test_desktop_entry_parsing() {
        let entry = concat!(
            "[Desktop Entry]\nType=Application\nName=Text Editor\n",
            "Name[fr]=Éditeur de texte\nExec=gnome-text-editor %U\n\n",
            "[Desktop Action new-window]\nName=New Window\n",
        );
        assert_eq!(
            parse_desktop_entry("org.gnome.TextEditor", entry),
            Some(RegistryApp {
                name: "Text Editor".into(),
                token: "shell:org.gnome.TextEditor".into(),
            })
        );

        let hidden = "[Desktop Entry]\nType=Application\nName=Writer helper\nNoDisplay=true\n";
        assert_eq!(parse_desktop_entry("helper", hidden), None);

        let link = "[Desktop Entry]\nType=Link\nName=Documentation\n";
        assert_eq!(parse_desktop_entry("docs", link), None);
    }

    #[test]
    fn test_display_name_without_rename_uses_stem() {
        assert_eq!(
            display_name(Path::new("/opt/apps/Obsidian.exe"), RENAMES),
            "Obsidian"
        );
    }
}
