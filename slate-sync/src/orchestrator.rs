//! The sync orchestrator — drives the upload/download/merge protocol.
//!
//! Each cycle walks `Registering → Uploading → Downloading → Merging` and
//! returns to `Idle`; `Failed` is reachable from any active phase. Only one
//! cycle runs at a time per device: a trigger while a cycle is in flight
//! coalesces to a no-op rather than queueing, so a burst of local mutations
//! cannot stampede the relay.
//!
//! Failures never block local mutations — writes land in the outbox
//! regardless of sync health, and every phase is resumable because the
//! durable stores carry all progress.

use crate::error::{SyncError, SyncResult};
use crate::merge::{EntityStore, MergeEngine, MergeOutcome};
use crate::registrar::DeviceRegistrar;
use crate::session::SessionProvider;
use crate::transport::SyncTransport;
use rand::Rng;
use slate_store::{InboundOutcome, OutboxStore};
use slate_types::{DeviceId, EntityKind, HlcClock, SyncMessage, SyncMessageDto, SyncStatus};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for the sync cycle.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum outbox messages fetched per cycle.
    pub max_batch: usize,
    /// Bounded attempts per network operation within one cycle.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub backoff_base: Duration,
    /// Backoff ceiling.
    pub backoff_cap: Duration,
    /// Remote timestamps further ahead than this log a skew warning.
    pub skew_warn_ms: u64,
    /// Device description sent at registration.
    pub device_info: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_batch: 100,
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(30),
            skew_warn_ms: 60_000,
            device_info: "slate-sync".to_string(),
        }
    }
}

/// Where the orchestrator currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Registering,
    Uploading,
    Downloading,
    Merging,
    Failed,
}

/// Result of one `sync_cycle` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to completion.
    Completed {
        /// Messages accepted by the relay.
        uploaded: usize,
        /// Messages received from the relay.
        downloaded: usize,
        /// Downloaded messages that won their merge.
        applied: usize,
    },
    /// No signed-in user; nothing was attempted.
    SkippedNoSession,
    /// Another cycle is already in flight; this trigger coalesced away.
    AlreadyRunning,
    /// The cycle aborted. Durable state is consistent; the next trigger
    /// starts fresh.
    Failed(String),
}

/// Drives periodic and on-demand synchronization.
///
/// Scheduling is external: hosts call [`sync_cycle`](Self::sync_cycle) from
/// a timer or platform background task.
pub struct SyncOrchestrator {
    config: SyncConfig,
    clock: Arc<HlcClock>,
    outbox: Arc<OutboxStore>,
    registrar: DeviceRegistrar,
    transport: Arc<dyn SyncTransport>,
    merge: MergeEngine,
    session: Arc<dyn SessionProvider>,
    phase: RwLock<CyclePhase>,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        config: SyncConfig,
        clock: Arc<HlcClock>,
        outbox: Arc<OutboxStore>,
        registrar: DeviceRegistrar,
        transport: Arc<dyn SyncTransport>,
        entity_store: Arc<dyn EntityStore>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            config,
            clock,
            outbox,
            registrar,
            transport,
            merge: MergeEngine::new(entity_store),
            session,
            phase: RwLock::new(CyclePhase::Idle),
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The current cycle phase, for the UI status indicator.
    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        *self.phase.read().unwrap()
    }

    /// Runs one synchronization cycle.
    ///
    /// Coalesces with any cycle already in flight. Never panics and never
    /// loses durable state: a failure leaves every message's status
    /// reflecting its own outcome.
    pub async fn sync_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            debug!("sync cycle already in flight; coalescing trigger");
            return CycleOutcome::AlreadyRunning;
        };

        let Some(user_id) = self.session.current_user_id() else {
            debug!("no active session; skipping sync cycle");
            return CycleOutcome::SkippedNoSession;
        };

        match self.run_cycle(&user_id).await {
            Ok((uploaded, downloaded, applied)) => {
                self.set_phase(CyclePhase::Idle);
                info!("sync cycle complete: {uploaded} up, {downloaded} down, {applied} applied");
                CycleOutcome::Completed {
                    uploaded,
                    downloaded,
                    applied,
                }
            }
            Err(err) => {
                self.set_phase(CyclePhase::Failed);
                warn!("sync cycle failed: {err}");
                CycleOutcome::Failed(err.to_string())
            }
        }
    }

    async fn run_cycle(&self, user_id: &str) -> SyncResult<(usize, usize, usize)> {
        self.set_phase(CyclePhase::Registering);
        let device_id = self
            .with_retries("registration", || self.registrar.ensure_registered(user_id))
            .await?;

        self.set_phase(CyclePhase::Uploading);
        let uploaded = self.upload_pending(&device_id).await?;

        self.set_phase(CyclePhase::Downloading);
        let inbound = self
            .with_retries("download", || self.transport.download_all(&device_id, true))
            .await?;

        self.set_phase(CyclePhase::Merging);
        let applied = self.apply_inbound(&inbound)?;

        Ok((uploaded, inbound.len(), applied))
    }

    /// Uploads pending outbox messages, grouped by entity kind (the relay
    /// endpoint is per-type). Messages keep HLC order within each group.
    async fn upload_pending(&self, device_id: &DeviceId) -> SyncResult<usize> {
        let pending = self.outbox.pending_for_upload(self.config.max_batch)?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut groups: BTreeMap<EntityKind, Vec<SyncMessage>> = BTreeMap::new();
        for message in pending {
            groups.entry(message.kind).or_default().push(message);
        }

        let mut accepted_total = 0;
        let mut retryable_failure: Option<SyncError> = None;

        for (kind, batch) in groups {
            let ids: Vec<i64> = batch.iter().filter_map(|m| m.local_id).collect();
            let dtos: Vec<SyncMessageDto> = batch.iter().map(SyncMessage::to_dto).collect();

            self.outbox.mark_status(&ids, SyncStatus::Uploading, None)?;
            let result = self
                .with_retries("upload", || self.transport.upload(device_id, kind, &dtos))
                .await;

            match result {
                Ok(receipt) => {
                    let mut accepted_ids = Vec::new();
                    let mut rejected_ids = Vec::new();
                    for message in &batch {
                        let Some(id) = message.local_id else { continue };
                        if receipt.rejected_keys.contains(&message.crdt_key) {
                            rejected_ids.push(id);
                        } else {
                            accepted_ids.push(id);
                        }
                    }
                    if receipt.accepted_count != accepted_ids.len() {
                        warn!(
                            "relay accepted {} of {} {kind} messages",
                            receipt.accepted_count,
                            accepted_ids.len()
                        );
                    }
                    self.outbox
                        .mark_status(&accepted_ids, SyncStatus::Synced, None)?;
                    if !rejected_ids.is_empty() {
                        self.outbox
                            .mark_failed_permanent(&rejected_ids, "rejected by relay")?;
                        warn!("relay rejected {} {kind} messages", rejected_ids.len());
                    }
                    accepted_total += accepted_ids.len();
                }
                Err(err) if err.is_retryable() => {
                    // Whole batch retries next cycle.
                    self.outbox
                        .mark_status(&ids, SyncStatus::Failed, Some(&err.to_string()))?;
                    retryable_failure = Some(err);
                }
                Err(err) => {
                    self.outbox
                        .mark_failed_permanent(&ids, &err.to_string())?;
                    warn!("upload of {kind} batch permanently failed: {err}");
                }
            }
        }

        match retryable_failure {
            Some(err) => Err(err),
            None => Ok(accepted_total),
        }
    }

    /// Records, deduplicates, and merges inbound messages, advancing the
    /// clock so everything stamped afterwards is causally after them.
    fn apply_inbound(&self, inbound: &[SyncMessageDto]) -> SyncResult<usize> {
        let mut applied = 0;

        // Messages recorded by an earlier cycle but not merged before a
        // crash come first, in arrival order.
        for (local_id, dto) in self.outbox.unprocessed_inbound()? {
            applied += usize::from(self.merge_one(local_id, &dto)?);
        }

        for dto in inbound {
            let advanced = self.clock.observe(&dto.timestamp);
            let skew = HlcClock::skew_ahead_ms(&dto.timestamp);
            if skew > self.config.skew_warn_ms {
                warn!(
                    "clock skew: message from {} is {skew}ms ahead of local clock",
                    dto.device_id
                );
            }
            debug!("observed {}, clock advanced to {advanced}", dto.timestamp);

            match self.outbox.record_inbound(dto)? {
                InboundOutcome::Applied { local_id } => {
                    applied += usize::from(self.merge_one(local_id, dto)?);
                }
                InboundOutcome::DuplicateIgnored => {}
            }
        }
        Ok(applied)
    }

    /// Merges one recorded inbox message and marks it processed. A malformed
    /// payload is logged and skipped — one bad message never aborts the
    /// batch.
    fn merge_one(&self, local_id: i64, dto: &SyncMessageDto) -> SyncResult<bool> {
        let won = match self.merge.apply(dto) {
            Ok(outcome) => outcome == MergeOutcome::Applied,
            Err(SyncError::Serialization(err)) => {
                warn!("dropping malformed inbound payload for {}: {err}", dto.crdt_key);
                false
            }
            Err(err) => return Err(err),
        };
        self.outbox.mark_inbound_processed(local_id)?;
        Ok(won)
    }

    async fn with_retries<T, F, Fut>(&self, what: &str, op: F) -> SyncResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.config.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "{what} failed (attempt {}/{}): {err}; retrying in {delay:?}",
                        attempt + 1,
                        self.config.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Exponential backoff with full jitter: a uniform delay in
    /// `[0, min(cap, base * 2^attempt)]`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << attempt.min(16));
        let cap = exp.min(self.config.backoff_cap.as_millis() as u64);
        Duration::from_millis(rand::thread_rng().gen_range(0..=cap))
    }

    fn set_phase(&self, phase: CyclePhase) {
        *self.phase.write().unwrap() = phase;
        debug!("sync phase: {phase:?}");
    }
}
