//! Update lifecycle: check, download, install.
//!
//! One [`UpdateManager`] exists per process. It owns the current
//! [`UpdateStatus`] and the set of subscribers; every transition replaces the
//! record and pushes it to each subscriber. Subscribers only ever see the
//! latest value, there is no backlog.

mod feed;
pub mod version;

use std::{
    collections::HashMap,
    fmt::Display,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use uuid::Uuid;

use crate::error::UpdateError;

pub use feed::TauriReleaseFeed;
use version::is_newer;

/// How often the background task re-checks while auto updates are enabled.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateState {
    Idle,
    Checking,
    Available,
    NotAvailable,
    Downloading,
    Downloaded,
    Error,
}

impl UpdateState {
    /// States in which a new check request is a no-op.
    fn is_busy(self) -> bool {
        matches!(self, Self::Checking | Self::Downloading | Self::Downloaded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub status: UpdateState,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_per_second: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl UpdateStatus {
    pub fn new(status: UpdateState, current_version: impl Into<String>) -> Self {
        Self {
            status,
            current_version: current_version.into(),
            latest_version: None,
            percent: None,
            bytes_per_second: None,
            transferred: None,
            total: None,
            message: None,
            release_notes: None,
            release_date: None,
            checked_at: None,
        }
    }

    fn failed(current_version: impl Into<String>, error: &UpdateError) -> Self {
        Self {
            message: Some(error.user_message().to_string()),
            checked_at: Some(Utc::now()),
            ..Self::new(UpdateState::Error, current_version)
        }
    }
}

/// A release reported by the feed, with the feed's own handle to it.
pub struct AvailableRelease<R> {
    pub version: String,
    pub notes: Option<String>,
    pub published_at: Option<String>,
    pub release: R,
}

/// The release metadata endpoint and the installer behind it.
pub trait ReleaseFeed: Send + Sync + 'static {
    type Release: Send + Sync + 'static;

    fn current_version(&self) -> String;

    /// Development builds have nothing to update.
    fn is_packaged(&self) -> bool;

    fn check(
        &self,
    ) -> impl Future<Output = Result<Option<AvailableRelease<Self::Release>>, UpdateError>> + Send;

    /// `on_progress` receives each chunk size and the total, when known.
    fn download<P>(
        &self,
        release: &Self::Release,
        on_progress: P,
    ) -> impl Future<Output = Result<Vec<u8>, UpdateError>> + Send
    where
        P: FnMut(u64, Option<u64>) + Send + 'static;

    /// Hands the package to the OS installer. On success the process is
    /// expected to be replaced.
    fn install(&self, release: &Self::Release, package: &[u8]) -> Result<(), UpdateError>;
}

/// Returns false once the subscriber is gone, which drops it.
type Listener = Box<dyn Fn(&UpdateStatus) -> bool + Send + Sync>;

struct StagedUpdate<R> {
    release: R,
    package: Vec<u8>,
}

pub struct UpdateManager<F: ReleaseFeed> {
    feed: F,
    status: Mutex<UpdateStatus>,
    staged: Mutex<Option<StagedUpdate<F::Release>>>,
    listeners: RwLock<HashMap<Uuid, Listener>>,
}

impl<F: ReleaseFeed> UpdateManager<F> {
    pub fn new(feed: F) -> Self {
        let status = UpdateStatus::new(UpdateState::Idle, feed.current_version());
        Self {
            feed,
            status: Mutex::new(status),
            staged: Mutex::new(None),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a listener for every future transition. Listeners run on
    /// the emitting task and must not call back into the manager.
    pub fn subscribe<L>(&self, listener: L) -> Uuid
    where
        L: Fn(&UpdateStatus) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners.write().insert(
            id,
            Box::new(move |status| {
                listener(status);
                true
            }),
        );
        id
    }

    /// Sends the current status to `send`, then every later transition. The
    /// subscription is dropped on the first failed send.
    pub fn subscribe_with_current<L, E>(&self, send: L) -> Result<Uuid, E>
    where
        L: Fn(&UpdateStatus) -> Result<(), E> + Send + Sync + 'static,
        E: Display,
    {
        // held so no transition slips between the snapshot and registration
        let status = self.status.lock();
        send(&status)?;

        let id = Uuid::new_v4();
        self.listeners.write().insert(
            id,
            Box::new(move |status| match send(status) {
                Ok(()) => true,
                Err(error) => {
                    log::debug!("Dropping update subscriber: {error}");
                    false
                }
            }),
        );
        Ok(id)
    }

    pub fn unsubscribe(&self, id: Uuid) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    /// Runs one check. While a check or download is in flight, or a download
    /// is waiting to be installed, returns the current status untouched.
    pub async fn check(self: &Arc<Self>) -> UpdateStatus {
        let current_version = self.feed.current_version();

        {
            let mut status = self.status.lock();
            if status.status.is_busy() {
                log::debug!("Update check already in progress ({:?})", status.status);
                return status.clone();
            }

            if !self.feed.is_packaged() {
                log::info!("Skipping update check in a development build");
                *status = UpdateStatus::failed(current_version, &UpdateError::NotPackaged);
                self.broadcast(&status);
                return status.clone();
            }

            *status = UpdateStatus::new(UpdateState::Checking, current_version.clone());
            self.broadcast(&status);
        }

        log::info!("Checking for updates (running {current_version})");
        let next = match self.feed.check().await {
            Ok(Some(found)) if is_newer(&found.version, &current_version) => {
                log::info!("Update available: {}", found.version);
                let available = UpdateStatus {
                    latest_version: Some(found.version),
                    release_notes: found.notes,
                    release_date: found.published_at,
                    checked_at: Some(Utc::now()),
                    ..UpdateStatus::new(UpdateState::Available, current_version)
                };
                self.publish(available.clone());
                // busy from here on, before the download task gets polled
                self.publish(UpdateStatus {
                    percent: Some(0.0),
                    transferred: Some(0),
                    ..UpdateStatus { status: UpdateState::Downloading, ..available.clone() }
                });
                self.start_download(found.release, available.clone());
                return available;
            }
            Ok(found) => {
                let latest = found.map(|release| release.version);
                log::info!("No update available (latest {latest:?})");
                UpdateStatus {
                    latest_version: Some(latest.unwrap_or_else(|| current_version.clone())),
                    checked_at: Some(Utc::now()),
                    ..UpdateStatus::new(UpdateState::NotAvailable, current_version)
                }
            }
            Err(error) => {
                log::error!("{error}");
                UpdateStatus::failed(current_version, &error)
            }
        };

        self.publish(next.clone());
        next
    }

    /// Installs a downloaded update. `Ok(false)` when nothing is staged.
    pub fn install(&self) -> Result<bool, UpdateError> {
        let Some(staged) = self.staged.lock().take() else {
            return Ok(false);
        };

        log::info!("Installing update");
        match self.feed.install(&staged.release, &staged.package) {
            Ok(()) => Ok(true),
            Err(error) => {
                log::error!("{error}");
                *self.staged.lock() = Some(staged);
                Err(error)
            }
        }
    }

    fn start_download(self: &Arc<Self>, release: F::Release, base: UpdateStatus) {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.download(release, base).await });
    }

    async fn download(self: Arc<Self>, release: F::Release, base: UpdateStatus) {
        let on_progress = {
            let manager = Arc::clone(&self);
            let base = base.clone();
            let started = Instant::now();
            let mut transferred = 0u64;
            move |chunk: u64, total: Option<u64>| {
                transferred += chunk;
                manager.publish(progress_status(&base, transferred, total, started.elapsed()));
            }
        };

        match self.feed.download(&release, on_progress).await {
            Ok(package) => {
                log::info!("Update downloaded ({} bytes)", package.len());
                *self.staged.lock() = Some(StagedUpdate { release, package });
                self.publish(UpdateStatus {
                    percent: Some(100.0),
                    ..UpdateStatus { status: UpdateState::Downloaded, ..base }
                });
            }
            Err(error) => {
                log::error!("{error}");
                self.publish(UpdateStatus {
                    message: Some(error.user_message().to_string()),
                    ..UpdateStatus { status: UpdateState::Error, ..base }
                });
            }
        }
    }

    fn publish(&self, next: UpdateStatus) {
        let mut status = self.status.lock();
        *status = next;
        self.broadcast(&status);
    }

    fn broadcast(&self, status: &UpdateStatus) {
        let closed: Vec<Uuid> = self
            .listeners
            .read()
            .iter()
            .filter(|(_, listener)| !listener(status))
            .map(|(id, _)| *id)
            .collect();

        if !closed.is_empty() {
            let mut listeners = self.listeners.write();
            for id in closed {
                listeners.remove(&id);
            }
        }
    }
}

fn progress_status(
    base: &UpdateStatus,
    transferred: u64,
    total: Option<u64>,
    elapsed: Duration,
) -> UpdateStatus {
    let percent = total
        .filter(|total| *total > 0)
        .map(|total| (transferred as f64 / total as f64 * 100.0).min(100.0));
    let seconds = elapsed.as_secs_f64();
    let bytes_per_second = (seconds > 0.0).then(|| (transferred as f64 / seconds) as u64);

    UpdateStatus {
        status: UpdateState::Downloading,
        percent,
        bytes_per_second,
        transferred: Some(transferred),
        total,
        ..base.clone()
    }
}

/// Checks immediately, then on every `every` tick, whenever `enabled`
/// returns true at that moment.
pub async fn run_scheduled_checks<F, E>(
    manager: Arc<UpdateManager<F>>,
    every: Duration,
    enabled: E,
) where
    F: ReleaseFeed,
    E: Fn() -> bool + Send + 'static,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if enabled() {
            manager.check().await;
        } else {
            log::debug!("Automatic update checks are disabled");
        }
    }
}
