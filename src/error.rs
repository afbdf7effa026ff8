use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read settings from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("settings file {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unable to write settings to {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("file {0:?} does not exist or is not accessible")]
    FileNotAccessible(String),
    #[error("failed to spawn launcher {launcher}: {source}")]
    LauncherSpawn { launcher: String, source: io::Error },
    #[error("system open failed: {0}")]
    SystemOpen(String),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("application query failed: {0}")]
    Query(String),
    #[error("application query returned unparsable output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("application query returned an unexpected shape")]
    UnexpectedShape,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("updates are only available in installed builds")]
    NotPackaged,
    #[error("update check failed: {0}")]
    Check(String),
    #[error("update download failed: {0}")]
    Download(String),
    #[error("update install failed: {0}")]
    Install(String),
}

impl UpdateError {
    /// Short French text shown in the UI. Details stay in the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotPackaged => {
                "Les mises à jour ne sont disponibles que dans la version installée."
            }
            Self::Check(_) => "Impossible de vérifier les mises à jour.",
            Self::Download(_) => "Le téléchargement de la mise à jour a échoué.",
            Self::Install(_) => "L'installation de la mise à jour a échoué.",
        }
    }
}
