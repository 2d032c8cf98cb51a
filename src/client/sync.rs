//! # Sync Coordinator
//!
//! Owns the live [`ProgressRecord`] for one session and drives the flow
//! between the pure progress core and the two stores:
//!
//! ```text
//! load:      local snapshot -> remote fetch -> merge -> commit
//! mutation:  apply_update / complete_room -> local save -> remote write (detached)
//! ```
//!
//! ## Write semantics
//!
//! Mutations are synchronous and never wait on the network. Every remote
//! write is spawned onto the tokio runtime, carries the full record, is
//! never retried and never aborted. A failed write is logged; the next
//! mutation's write carries the superseding state. Writes may land out of
//! order, which can briefly regress what the remote store shows until a
//! later write arrives. The local snapshot always holds the latest record.
//!
//! Two devices playing under the same team name are not coordinated: the
//! last write to reach the remote store wins.
//!
//! ## Loading state
//!
//! While the remote record is being fetched the coordinator publishes
//! `true` on a [`watch`] channel. [`SyncCoordinator::loading`] hands out a
//! receiver that can be polled from another task during `load`/`begin`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use escape_progress::client::{Config, SyncCoordinator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let mut coordinator = SyncCoordinator::new(&config);
//!
//! coordinator.load().await;
//! coordinator.begin("Alpha").await?;
//! coordinator.complete_room(1)?;
//!
//! // Wait for detached writes before shutting down
//! coordinator.flush().await;
//! # Ok(())
//! # }
//! ```

use crate::client::config::Config;
use crate::client::local_store::LocalSnapshotStore;
use crate::client::remote::{RemoteError, RemoteProgressClient};
use crate::shared::error::ProgressError;
use crate::shared::merge::merge;
use crate::shared::progress::{ProgressPatch, ProgressRecord, StageLayout};
use crate::shared::state_machine::{self, StageStatus};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Coordinator errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// `begin` was called without a team name
    #[error("a team name is required to begin")]
    MissingIdentity,
    /// The progress core rejected the operation
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Live progress for one session
#[derive(Debug)]
pub struct SyncCoordinator {
    record: ProgressRecord,
    layout: StageLayout,
    local: LocalSnapshotStore,
    remote: RemoteProgressClient,
    loading: watch::Sender<bool>,
    pending_writes: Vec<JoinHandle<()>>,
    writes_dispatched: u64,
}

impl SyncCoordinator {
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            LocalSnapshotStore::new(config.snapshot_dir()),
            RemoteProgressClient::new(config),
            config.stage_layout(),
        )
    }

    pub fn with_parts(
        local: LocalSnapshotStore,
        remote: RemoteProgressClient,
        layout: StageLayout,
    ) -> Self {
        Self {
            record: ProgressRecord::default(),
            layout,
            local,
            remote,
            loading: watch::channel(false).0,
            pending_writes: Vec::new(),
            writes_dispatched: 0,
        }
    }

    /// The live record
    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    /// Whether a remote fetch is outstanding
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Receiver for the loading flag, usable while `load`/`begin` runs
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn layout(&self) -> StageLayout {
        self.layout
    }

    pub fn status(&self) -> StageStatus {
        state_machine::stage_status(&self.record, self.layout)
    }

    /// Number of remote writes still in flight
    pub fn pending_writes(&mut self) -> usize {
        self.pending_writes.retain(|handle| !handle.is_finished());
        self.pending_writes.len()
    }

    /// Restore the session: local snapshot, then the remote record for the
    /// same team, merged into the live record.
    pub async fn load(&mut self) -> &ProgressRecord {
        let local = self.local.load();
        let identity = local
            .as_ref()
            .map(|record| record.identity.clone())
            .unwrap_or_default();

        if identity.is_empty() {
            tracing::debug!("No team in local snapshot; starting empty");
            self.record = local.unwrap_or_default();
            self.record.is_loading = false;
            return &self.record;
        }

        tracing::info!("Resuming progress for '{}'", identity);
        let (reconciled, remote_behind) = self.reconcile(local, &identity).await;
        self.commit(reconciled, remote_behind);
        &self.record
    }

    /// Choose the team for this session.
    ///
    /// Resumes the live record when it already belongs to `identity`.
    /// Otherwise the session starts over for the new team, picking up any
    /// progress the remote store holds for it (another device, a cleared
    /// browser). Progress of a different team is never carried over.
    pub async fn begin(&mut self, identity: &str) -> Result<&ProgressRecord, SyncError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(SyncError::MissingIdentity);
        }
        if self.record.identity == identity {
            tracing::debug!("Team '{}' already active", identity);
            if self.record.start_time.is_none() {
                let now = Utc::now();
                let next = state_machine::apply_update(
                    &self.record,
                    &ProgressPatch::new().start_time(now),
                    self.layout,
                    now,
                );
                self.commit(next, true);
            }
            return Ok(&self.record);
        }
        if self.record.is_started() {
            tracing::info!(
                "Switching team from '{}' to '{}'",
                self.record.identity,
                identity
            );
        }

        let now = Utc::now();
        let local = match self.local.load().filter(|record| record.identity == identity) {
            Some(record) => record,
            None => state_machine::begin(identity, now)?,
        };

        let (mut reconciled, mut remote_behind) = self.reconcile(Some(local), identity).await;
        if reconciled.start_time.is_none() {
            reconciled = state_machine::apply_update(
                &reconciled,
                &ProgressPatch::new().start_time(now),
                self.layout,
                now,
            );
            remote_behind = true;
        }

        tracing::info!("Team '{}' started", identity);
        self.commit(reconciled, remote_behind);
        Ok(&self.record)
    }

    /// Apply a partial update, save it and push it to the remote store
    pub fn update(&mut self, patch: &ProgressPatch) -> &ProgressRecord {
        let next = state_machine::apply_update(&self.record, patch, self.layout, Utc::now());
        self.commit(next, true);
        &self.record
    }

    /// Record `stage` as completed, save it and push it to the remote store
    pub fn complete_room(&mut self, stage: u32) -> Result<&ProgressRecord, SyncError> {
        let next = state_machine::complete_room(&self.record, stage, self.layout, Utc::now())?;
        if !self.record.is_room_completed(stage) {
            tracing::info!("'{}' completed stage {}", next.identity, stage);
        }
        if next.is_finished() && !self.record.is_finished() {
            tracing::info!("'{}' reached the final stage", next.identity);
        }
        self.commit(next, true);
        Ok(&self.record)
    }

    /// Drop the live record and the local snapshot.
    ///
    /// The remote store is left alone; writes already in flight still land.
    pub fn restart(&mut self) {
        tracing::info!("Restarting; discarding progress for '{}'", self.record.identity);
        self.record = ProgressRecord::default();
        self.local.clear();
    }

    /// Wait for every in-flight remote write to finish
    pub async fn flush(&mut self) {
        let handles = std::mem::take(&mut self.pending_writes);
        if handles.is_empty() {
            return;
        }
        tracing::debug!("Waiting for {} remote write(s)", handles.len());
        for result in futures_util::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Remote write task failed: {}", e);
            }
        }
    }

    /// Fetch the remote record for `identity` and merge it with `local`.
    ///
    /// Returns the reconciled record and whether the remote store is behind it.
    async fn reconcile(
        &mut self,
        local: Option<ProgressRecord>,
        identity: &str,
    ) -> (ProgressRecord, bool) {
        self.set_loading(true);
        let remote = match self.remote.fetch(identity).await {
            Ok(remote) => remote,
            Err(RemoteError::Unconfigured) => {
                tracing::debug!("Remote store not configured; using local progress only");
                None
            }
            Err(e) => {
                tracing::warn!("Remote progress unavailable for '{}': {}", identity, e);
                None
            }
        };
        self.set_loading(false);

        let reconciled = merge(local, remote.clone(), identity, Utc::now());
        let remote_behind = remote.as_ref() != Some(&reconciled);
        (reconciled, remote_behind)
    }

    fn set_loading(&mut self, loading: bool) {
        self.record.is_loading = loading;
        self.loading.send_replace(loading);
    }

    fn commit(&mut self, record: ProgressRecord, push_remote: bool) {
        self.record = record;
        self.local.save(&self.record);
        if push_remote {
            self.dispatch_write();
        }
    }

    fn dispatch_write(&mut self) {
        if !self.record.is_started() {
            tracing::debug!("No team yet; remote write skipped");
            return;
        }
        if !self.remote.is_configured() {
            tracing::debug!("Remote store not configured; remote write skipped");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available; remote write dropped");
            return;
        };

        self.pending_writes.retain(|handle| !handle.is_finished());
        self.writes_dispatched += 1;
        let seq = self.writes_dispatched;
        let remote = self.remote.clone();
        let record = self.record.clone();

        self.pending_writes.push(runtime.spawn(async move {
            match remote.write(&record).await {
                Ok(()) => tracing::debug!("Remote write #{} for '{}' stored", seq, record.identity),
                Err(e) => tracing::warn!(
                    "Remote write #{} for '{}' dropped: {}",
                    seq,
                    record.identity,
                    e
                ),
            }
        }));
    }
}
