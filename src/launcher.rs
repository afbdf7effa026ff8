//! Decides how a file attached to a record gets opened.
//!
//! Resolution walks a fixed chain: a configured `shell:` app, then a
//! configured executable, then the OS default handler, then the OS default
//! handler again through a `file://` URI. Only the last step can fail the
//! request. Nothing here waits for the launched program.

use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use url::Url;

use crate::config::Settings;
use crate::error::LaunchError;
use crate::platform;

pub const SHELL_TOKEN_PREFIX: &str = "shell:";

const MSG_FILE_NOT_ACCESSIBLE: &str = "Fichier introuvable ou inaccessible.";
const MSG_DEFAULT_APP_FAILED: &str =
    "Impossible d'ouvrir le fichier avec l'application par défaut.";

/// Typed form of a value from the `editors` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherTarget {
    /// Opaque handle resolved by the OS shell (store apps, bundles, desktop ids).
    ShellToken(String),
    Executable(PathBuf),
}

impl LauncherTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw.starts_with(SHELL_TOKEN_PREFIX) {
            Some(Self::ShellToken(raw.to_string()))
        } else {
            Some(Self::Executable(PathBuf::from(raw)))
        }
    }
}

/// Spawn-and-discard. Implementations must not keep the child handle; the
/// only error channel is the spawn call itself.
pub trait ProcessSpawner: Send + Sync {
    fn spawn_detached(&self, program: &OsStr, args: &[OsString]) -> io::Result<()>;
}

/// The OS "open with default handler" primitives.
pub trait SystemOpener: Send + Sync {
    fn open_path(&self, path: &Path) -> Result<(), LaunchError>;
    fn open_url(&self, url: &str) -> Result<(), LaunchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenedWith {
    ShellApp,
    ConfiguredEditor,
    SystemDefault,
    SystemDefaultUri,
}

impl OpenedWith {
    fn message(self) -> &'static str {
        match self {
            Self::ShellApp => "Opened with shell app",
            Self::ConfiguredEditor => "Opened with configured editor",
            Self::SystemDefault => "Opened with system default",
            Self::SystemDefaultUri => "Opened with system default (file URI)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFileResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Result<OpenedWith, LaunchError>> for OpenFileResult {
    fn from(outcome: Result<OpenedWith, LaunchError>) -> Self {
        match outcome {
            Ok(opened) => Self {
                success: true,
                error: None,
                message: Some(opened.message().to_string()),
            },
            Err(LaunchError::FileNotAccessible(_)) => Self {
                success: false,
                error: Some(MSG_FILE_NOT_ACCESSIBLE.to_string()),
                message: None,
            },
            Err(_) => Self {
                success: false,
                error: Some(MSG_DEFAULT_APP_FAILED.to_string()),
                message: None,
            },
        }
    }
}

pub struct Launcher<S, O> {
    spawner: S,
    opener: O,
}

impl<S, O> Launcher<S, O>
where
    S: ProcessSpawner,
    O: SystemOpener,
{
    pub fn new(spawner: S, opener: O) -> Self {
        Self { spawner, opener }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    pub fn open_file(&self, path: &str, settings: &Settings) -> OpenFileResult {
        let outcome = self.resolve(path, settings);
        if let Err(error) = &outcome {
            log::warn!("Unable to open {path:?}: {error}");
        }
        outcome.into()
    }

    pub fn resolve(&self, path: &str, settings: &Settings) -> Result<OpenedWith, LaunchError> {
        let file = Path::new(path);
        if path.is_empty() || !file.exists() {
            return Err(LaunchError::FileNotAccessible(path.to_string()));
        }

        match settings.launcher_for(file) {
            Some(LauncherTarget::ShellToken(token)) => {
                self.launch_shell_app(&token, file);
                return Ok(OpenedWith::ShellApp);
            }
            Some(LauncherTarget::Executable(executable)) if executable.exists() => {
                match self.launch_editor(&executable, file) {
                    Ok(()) => return Ok(OpenedWith::ConfiguredEditor),
                    Err(error) => log::warn!("{error}; falling back to the system default"),
                }
            }
            Some(LauncherTarget::Executable(executable)) => {
                log::info!("Configured launcher {executable:?} is gone, using the system default");
            }
            None => {}
        }

        self.open_with_default(file)
    }

    fn launch_shell_app(&self, token: &str, file: &Path) {
        log::info!("Opening {file:?} with shell app {token}");
        let (program, args) = platform::shell_launch_command(token, file);
        if let Err(error) = self.spawner.spawn_detached(&program, &args) {
            log::warn!("Shell launch of {token} failed: {error}");
        }
    }

    fn launch_editor(&self, executable: &Path, file: &Path) -> Result<(), LaunchError> {
        log::info!("Opening {file:?} with {executable:?}");
        let (program, args) = platform::editor_launch_command(executable, file);
        self.spawner
            .spawn_detached(&program, &args)
            .map_err(|source| LaunchError::LauncherSpawn {
                launcher: executable.display().to_string(),
                source,
            })
    }

    fn open_with_default(&self, file: &Path) -> Result<OpenedWith, LaunchError> {
        log::info!("Opening {file:?} with system default");
        let error = match self.opener.open_path(file) {
            Ok(()) => return Ok(OpenedWith::SystemDefault),
            Err(error) => error,
        };

        let uri = file_uri(file);
        log::warn!("{error}; retrying with {uri}");
        self.opener
            .open_url(&uri)
            .map(|()| OpenedWith::SystemDefaultUri)
    }
}

/// `file://` URI for `file`, made absolute first.
pub fn file_uri(file: &Path) -> String {
    let absolute = dunce::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    match Url::from_file_path(&absolute) {
        Ok(url) => url.into(),
        Err(()) => {
            let normalized = absolute.to_string_lossy().replace('\\', "/");
            format!("file:///{}", normalized.trim_start_matches('/'))
        }
    }
}
