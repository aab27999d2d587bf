// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Archive-mode lifecycle: initial load, change monitoring, snapshot diffs.
//!
//! One monitor task owns the last-known environment set and all handler
//! invocation. Wake-ups come from a filesystem watcher and from a fixed
//! stat-poll interval; either way a change is only acted on when the file's
//! mtime or size actually differs. A failed reload is assumed to be a
//! non-atomic copy in progress and is retried on a sub-second cadence within
//! a bounded window.

use crate::error::ArchiveError;
use crate::reader::ArchiveReader;
use notify::{RecursiveMode, Watcher};
use relay_core::{EnvironmentId, FilterId, UpdateHandler};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How long a torn write may take to settle before we stop retrying.
const RELOAD_RETRY_WINDOW: Duration = Duration::from_secs(2);
/// Cadence of reload attempts inside the retry window.
const RELOAD_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Fingerprint used to detect file changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    mtime: SystemTime,
    size: u64,
}

impl FileStamp {
    fn read(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self { mtime: meta.modified()?, size: meta.len() })
    }
}

/// Last snapshot of an environment for which the handler was notified.
#[derive(Debug, Clone)]
struct EnvSnapshot {
    version: u64,
    data_id: String,
    filter_key: Option<FilterId>,
}

/// File-mode counterpart of the stream manager: keeps the handler in sync
/// with the contents of one archive file.
pub struct ArchiveManager {
    halt: CancellationToken,
}

impl ArchiveManager {
    /// Open the archive, deliver the initial environment set, and start
    /// monitoring the file for changes.
    ///
    /// Fails if the file is missing or the initial snapshot is unusable.
    pub async fn new<H: UpdateHandler>(
        path: impl Into<PathBuf>,
        handler: Arc<H>,
        monitor_interval: Duration,
    ) -> Result<Self, ArchiveError> {
        let path = path.into();
        let last_stamp = FileStamp::read(&path)?;
        let mut monitor = Monitor { path, handler, last_known: HashMap::new(), last_stamp };
        monitor.reload().await?;

        let halt = CancellationToken::new();
        tokio::spawn(monitor.run(monitor_interval, halt.clone()));
        Ok(Self { halt })
    }

    /// Idempotent; stops the monitor task.
    pub fn close(&self) {
        self.halt.cancel();
    }
}

impl Drop for ArchiveManager {
    fn drop(&mut self) {
        self.halt.cancel();
    }
}

struct Monitor<H> {
    path: PathBuf,
    handler: Arc<H>,
    last_known: HashMap<EnvironmentId, EnvSnapshot>,
    last_stamp: FileStamp,
}

impl<H: UpdateHandler> Monitor<H> {
    async fn run(mut self, interval: Duration, halt: CancellationToken) {
        let (fs_tx, mut fs_rx) = mpsc::channel::<()>(16);
        let _watcher = start_watcher(&self.path, fs_tx);
        let mut poll = tokio::time::interval(interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut retry_deadline: Option<Instant> = None;

        loop {
            let retrying = retry_deadline.is_some();
            tokio::select! {
                _ = halt.cancelled() => break,
                _ = fs_rx.recv() => self.check(&mut retry_deadline).await,
                _ = poll.tick() => self.check(&mut retry_deadline).await,
                _ = tokio::time::sleep(RELOAD_RETRY_DELAY), if retrying => {
                    self.retry(&mut retry_deadline).await;
                }
            }
        }
    }

    /// Reload if the file's stamp moved since we last looked.
    async fn check(&mut self, retry_deadline: &mut Option<Instant>) {
        let stamp = match FileStamp::read(&self.path) {
            Ok(stamp) => stamp,
            Err(e) => {
                // mid-replace the file can be briefly absent
                tracing::debug!(error = %e, "archive stat failed");
                return;
            }
        };
        if stamp == self.last_stamp {
            return;
        }
        tracing::info!(path = %self.path.display(), "archive file changed, reloading");
        self.last_stamp = stamp;
        self.reload_after_change(retry_deadline).await;
    }

    /// One attempt inside the retry window.
    async fn retry(&mut self, retry_deadline: &mut Option<Instant>) {
        // a further change to the file restarts the window
        if let Ok(stamp) = FileStamp::read(&self.path) {
            if stamp != self.last_stamp {
                self.last_stamp = stamp;
                self.reload_after_change(retry_deadline).await;
                return;
            }
        }
        match self.reload().await {
            Ok(()) => {
                tracing::info!("archive reload succeeded after retry");
                *retry_deadline = None;
            }
            Err(e) => {
                if retry_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    tracing::error!(
                        error = %e,
                        "archive is still unreadable, giving up until it changes again"
                    );
                    *retry_deadline = None;
                } else {
                    tracing::debug!(error = %e, "archive reload retry failed");
                }
            }
        }
    }

    async fn reload_after_change(&mut self, retry_deadline: &mut Option<Instant>) {
        match self.reload().await {
            Ok(()) => *retry_deadline = None,
            Err(e) => {
                // likely a non-atomic copy still in flight
                tracing::warn!(error = %e, "archive reload failed, retrying while the file settles");
                *retry_deadline = Some(Instant::now() + RELOAD_RETRY_WINDOW);
            }
        }
    }

    /// Open the archive and bring the handler up to date with its contents.
    async fn reload(&mut self) -> Result<(), ArchiveError> {
        let reader = ArchiveReader::open(&self.path)?;
        self.apply_snapshot(&reader).await;
        if let Err(e) = reader.close() {
            tracing::debug!(error = %e, "failed to remove extraction directory");
        }
        Ok(())
    }

    /// Diff the snapshot against the last dispatched state. Per-environment
    /// read failures skip just that environment; its last-known entry (if
    /// any) survives untouched for the next reload.
    async fn apply_snapshot(&mut self, reader: &ArchiveReader) {
        let mut unused = self.last_known.clone();
        for env_id in reader.environment_ids() {
            let known = unused.remove(env_id);
            let metadata = match reader.environment_metadata(env_id) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::error!(%env_id, error = %e, "skipping unreadable environment");
                    continue;
                }
            };
            match known {
                None => {
                    let mut params = metadata.params;
                    match reader.environment_sdk_data(env_id) {
                        Ok(data) => params.sdk_data = Some(data),
                        Err(e) => {
                            tracing::error!(%env_id, error = %e, "skipping environment with unreadable sdk data");
                            continue;
                        }
                    }
                    let filter_key = params.filter_key.clone();
                    self.handler.add_environment(params).await;
                    self.last_known.insert(
                        env_id.clone(),
                        EnvSnapshot { version: metadata.version, data_id: metadata.data_id, filter_key },
                    );
                }
                Some(prev) if prev.version == metadata.version && prev.data_id == metadata.data_id => {}
                Some(prev) => {
                    let mut params = metadata.params;
                    if prev.data_id != metadata.data_id {
                        match reader.environment_sdk_data(env_id) {
                            Ok(data) => params.sdk_data = Some(data),
                            Err(e) => {
                                tracing::error!(%env_id, error = %e, "skipping environment with unreadable sdk data");
                                continue;
                            }
                        }
                    }
                    let filter_key = params.filter_key.clone();
                    self.handler.update_environment(params).await;
                    self.last_known.insert(
                        env_id.clone(),
                        EnvSnapshot { version: metadata.version, data_id: metadata.data_id, filter_key },
                    );
                }
            }
        }
        for (env_id, snapshot) in unused {
            self.handler.delete_environment(&env_id, snapshot.filter_key.as_ref()).await;
            self.last_known.remove(&env_id);
        }
        self.handler.received_all().await;
    }
}

/// Watch the archive's parent directory, waking the monitor on any event.
/// The parent is watched because replace-by-rename never fires events on the
/// replaced file itself. Returns `None` (with a log) when no watcher can be
/// created; the stat poll still covers changes.
fn start_watcher(path: &Path, fs_tx: mpsc::Sender<()>) -> Option<notify::RecommendedWatcher> {
    let mut watcher = match notify::recommended_watcher(
        move |res: Result<notify::Event, notify::Error>| {
            if res.is_ok() {
                let _ = fs_tx.try_send(());
            }
        },
    ) {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::warn!(error = %e, "file watcher unavailable, relying on polling");
            return None;
        }
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
        tracing::warn!(error = %e, "failed to watch archive directory, relying on polling");
        return None;
    }
    Some(watcher)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
