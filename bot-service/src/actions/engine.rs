//! The delivery worker and its handle.
//!
//! One worker task owns the offline queue file and all action traffic. It
//! serves two channels, flush and deliver, each holding at most one pending
//! request. A pending flush always runs before a pending delivery, so queued
//! actions reach the backend before newer ones. Catalog validation also runs
//! on the worker, and only once the backend is known to be reachable.

use super::outcome::{DeliveryOutcome, RejectReason};
use super::stats::{DeliveryStats, StatsSnapshot};
use crate::catalog::{ActionCatalog, CatalogVerdict};
use crate::clock::{TimeSource, now_with_retry};
use crate::config::EngineConfig;
use crate::error::{ServiceError, ServiceResult};
use bot_storage::{DeviceStateStore, KeyMaterialStore, OfflineQueue};
use bot_transport::{BackendTransport, ConnectivityProbe, Endpoint, TransportError};
use bot_types::{Action, DeviceState};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Collaborators the engine is built from.
pub struct EngineDeps {
    pub transport: Arc<dyn BackendTransport>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub clock: Arc<dyn TimeSource>,
    pub state: Arc<DeviceStateStore>,
    pub keys: Arc<dyn KeyMaterialStore>,
    pub queue: OfflineQueue,
    /// Validates actions against the backend catalog when set.
    pub catalog: Option<Arc<ActionCatalog>>,
}

/// Result of one pass over the offline queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Records delivered during this pass.
    pub replayed: usize,
    /// Records still pending afterwards.
    pub remaining: usize,
    /// The pass stopped early because connectivity dropped.
    pub interrupted: bool,
}

struct FlushRequest {
    done: Option<oneshot::Sender<FlushReport>>,
}

/// An action that passed validation and waits for the worker.
struct PendingAction {
    action_id: String,
    value: Option<f64>,
    alternate_id: Option<String>,
}

struct DeliverRequest {
    action: PendingAction,
    reply: oneshot::Sender<DeliveryOutcome>,
}

/// Caller-facing handle to the delivery worker.
pub struct ActionDeliveryEngine {
    flush_tx: mpsc::Sender<FlushRequest>,
    deliver_tx: mpsc::Sender<DeliverRequest>,
    state: Arc<DeviceStateStore>,
    keys: Arc<dyn KeyMaterialStore>,
    queue: OfflineQueue,
    stats: Arc<DeliveryStats>,
    config: EngineConfig,
    worker: JoinHandle<()>,
}

impl ActionDeliveryEngine {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(deps: EngineDeps, config: EngineConfig) -> Self {
        let (flush_tx, flush_rx) = mpsc::channel(1);
        let (deliver_tx, deliver_rx) = mpsc::channel(1);
        let stats = Arc::new(DeliveryStats::default());

        let worker = DeliveryWorker {
            transport: deps.transport,
            probe: deps.probe,
            clock: deps.clock,
            keys: Arc::clone(&deps.keys),
            queue: deps.queue.clone(),
            stats: Arc::clone(&stats),
            catalog: deps.catalog,
            clock_retry: config.clock_retry,
        };
        let worker = tokio::spawn(worker.run(flush_rx, deliver_rx));

        Self {
            flush_tx,
            deliver_tx,
            state: deps.state,
            keys: deps.keys,
            queue: deps.queue,
            stats,
            config,
            worker,
        }
    }

    /// Triggers an action using the configured alternate id, if any.
    pub async fn trigger_action(&self, action_id: &str, value: Option<f64>) -> DeliveryOutcome {
        self.trigger_action_as(action_id, value, None).await
    }

    /// Triggers an action on behalf of `alternate_id` (multipair only).
    ///
    /// Never fails: every problem is folded into the returned outcome.
    pub async fn trigger_action_as(
        &self,
        action_id: &str,
        value: Option<f64>,
        alternate_id: Option<&str>,
    ) -> DeliveryOutcome {
        let action_id = action_id.trim();
        if action_id.is_empty() {
            return DeliveryOutcome::Rejected(RejectReason::MissingActionId);
        }

        let state = match self.state.get().await {
            Ok(state) => state,
            Err(e) => {
                error!("Cannot read device state: {e}");
                return DeliveryOutcome::Rejected(RejectReason::StateUnavailable);
            }
        };
        if !state.is_enrolled() {
            debug!(%state, action_id, "Rejecting action, device not enrolled");
            return DeliveryOutcome::Rejected(RejectReason::NotEnrolled { state });
        }

        let alternate_id = if state == DeviceState::Multipair {
            let chosen = alternate_id
                .or(self.keys.alternate_device_id())
                .map(str::trim)
                .filter(|a| !a.is_empty());
            match chosen {
                Some(alt) => Some(alt.to_string()),
                None => return DeliveryOutcome::Rejected(RejectReason::MissingAlternateId),
            }
        } else {
            None
        };

        if self.config.flush_before_delivery {
            self.request_flush();
        }

        let (reply, response) = oneshot::channel();
        let request = DeliverRequest {
            action: PendingAction {
                action_id: action_id.to_string(),
                value,
                alternate_id,
            },
            reply,
        };
        if self.deliver_tx.send(request).await.is_err() {
            return DeliveryOutcome::Rejected(RejectReason::EngineStopped);
        }
        response
            .await
            .unwrap_or(DeliveryOutcome::Rejected(RejectReason::EngineStopped))
    }

    /// Schedules a replay of the offline queue without waiting for it.
    ///
    /// Returns false if a flush is already pending or the worker is gone.
    pub fn request_flush(&self) -> bool {
        match self.flush_tx.try_send(FlushRequest { done: None }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Offline flush already pending");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Replays the offline queue and waits for the pass to finish.
    pub async fn flush(&self) -> ServiceResult<FlushReport> {
        let (done, report) = oneshot::channel();
        self.flush_tx
            .send(FlushRequest { done: Some(done) })
            .await
            .map_err(|_| ServiceError::EngineStopped)?;
        report.await.map_err(|_| ServiceError::EngineStopped)
    }

    /// Current counters plus the number of pending offline records.
    pub async fn stats(&self) -> StatsSnapshot {
        let pending = match self.queue.pending_count().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Cannot read offline queue: {e}");
                0
            }
        };
        self.stats.snapshot(pending)
    }

    /// Stops the worker after it finishes the request in hand.
    pub async fn shutdown(self) {
        let Self {
            flush_tx,
            deliver_tx,
            worker,
            ..
        } = self;
        drop(flush_tx);
        drop(deliver_tx);
        if let Err(e) = worker.await {
            error!("Delivery worker panicked: {e}");
        }
    }
}

/// State owned by the worker task.
struct DeliveryWorker {
    transport: Arc<dyn BackendTransport>,
    probe: Arc<dyn ConnectivityProbe>,
    clock: Arc<dyn TimeSource>,
    keys: Arc<dyn KeyMaterialStore>,
    queue: OfflineQueue,
    stats: Arc<DeliveryStats>,
    catalog: Option<Arc<ActionCatalog>>,
    clock_retry: Duration,
}

impl DeliveryWorker {
    async fn run(
        self,
        mut flush_rx: mpsc::Receiver<FlushRequest>,
        mut deliver_rx: mpsc::Receiver<DeliverRequest>,
    ) {
        debug!("Delivery worker started");
        loop {
            tokio::select! {
                biased;

                Some(request) = flush_rx.recv() => {
                    let report = self.flush().await;
                    if let Some(done) = request.done {
                        let _ = done.send(report);
                    }
                }
                Some(request) = deliver_rx.recv() => {
                    let outcome = self.deliver(request.action).await;
                    let _ = request.reply.send(outcome);
                }
                else => break,
            }
        }
        debug!("Delivery worker stopped");
    }

    async fn deliver(&self, pending: PendingAction) -> DeliveryOutcome {
        let now = now_with_retry(self.clock.as_ref(), self.clock_retry).await;
        let action = Action::new(pending.action_id, pending.value, pending.alternate_id);

        if !self.probe.is_reachable().await {
            info!(action_id = %action.action_id, "No connectivity, saving action offline");
            return self.queue_offline(&action, now).await;
        }

        if let Some(reason) = self.check_catalog(&action.action_id, now).await {
            return DeliveryOutcome::Rejected(reason);
        }

        let payload = action.payload(self.keys.device_id());
        match self.transport.post(Endpoint::Actions, &payload).await {
            Ok(response) if response.contains("OK") => {
                self.stats.record_delivered();
                info!(action_id = %action.action_id, queue_id = %action.queue_id, "Action delivered");
                self.record_trigger(&action.action_id, now).await;
                DeliveryOutcome::Delivered
            }
            Ok(response) if response.contains("Action not found") => {
                warn!(action_id = %action.action_id, "Backend does not know this action");
                DeliveryOutcome::Rejected(RejectReason::ActionNotFound)
            }
            Ok(response) => {
                warn!(action_id = %action.action_id, %response, "Action not acknowledged, saving offline");
                self.queue_offline(&action, now).await
            }
            Err(TransportError::HttpStatus(status)) => {
                warn!(action_id = %action.action_id, status, "Backend rejected action");
                DeliveryOutcome::Rejected(RejectReason::Backend { status })
            }
            Err(e) => {
                warn!(action_id = %action.action_id, "Action delivery failed, saving offline: {e}");
                self.queue_offline(&action, now).await
            }
        }
    }

    /// Returns why the catalog refuses `action_id`, if it does.
    ///
    /// An unavailable catalog never blocks delivery.
    async fn check_catalog(&self, action_id: &str, now: u64) -> Option<RejectReason> {
        let catalog = self.catalog.as_ref()?;
        match catalog.check(action_id, now).await {
            Ok(CatalogVerdict::Allowed) => None,
            Ok(CatalogVerdict::NotFound) => Some(RejectReason::ActionNotFound),
            Ok(CatalogVerdict::TooFrequent) => Some(RejectReason::TooFrequent),
            Err(e) => {
                warn!("Action catalog unavailable, skipping validation: {e}");
                None
            }
        }
    }

    async fn record_trigger(&self, action_id: &str, now: u64) {
        if let Some(catalog) = &self.catalog {
            if let Err(e) = catalog.record_trigger(action_id, now).await {
                warn!(action_id, "Failed to record trigger time: {e}");
            }
        }
    }

    async fn queue_offline(&self, action: &Action, now: u64) -> DeliveryOutcome {
        let record = action.to_offline_record(self.keys.device_id(), self.keys.maker_id(), now);
        match self.queue.append(record).await {
            Ok(()) => DeliveryOutcome::QueuedOffline { persisted: true },
            Err(e) => {
                error!(action_id = %action.action_id, "Failed to save offline action: {e}");
                DeliveryOutcome::QueuedOffline { persisted: false }
            }
        }
    }

    /// One pass over the queue in file order.
    async fn flush(&self) -> FlushReport {
        let mut records = match self.queue.load().await {
            Ok(records) => records,
            Err(e) => {
                error!("Cannot read offline queue: {e}");
                return FlushReport::default();
            }
        };
        let pending = records.iter().filter(|r| r.is_pending()).count();
        if pending == 0 {
            debug!("No offline actions to replay");
            return FlushReport::default();
        }
        info!(pending, "Replaying offline actions");

        let mut report = FlushReport::default();
        for record in records.iter_mut().filter(|r| r.is_pending()) {
            if !self.probe.is_reachable().await {
                info!("No connectivity, stopping offline replay");
                report.interrupted = true;
                break;
            }

            let action = Action::replay(record);
            let payload = action.payload(&record.device_id);
            match self.transport.post(Endpoint::Actions, &payload).await {
                Ok(response) if response.contains("OK") => {
                    record.mark_delivered();
                    self.stats.record_replayed();
                    report.replayed += 1;
                    info!(
                        action_id = %record.action_id,
                        queue_id = %record.queue_id,
                        timestamp = record.timestamp,
                        "Offline action delivered"
                    );
                }
                Ok(response) => {
                    warn!(action_id = %record.action_id, %response, "Offline action not acknowledged");
                }
                Err(e) => {
                    warn!(action_id = %record.action_id, "Offline action replay failed: {e}");
                }
            }
        }

        report.remaining = records.iter().filter(|r| r.is_pending()).count();
        if report.replayed > 0 {
            if let Err(e) = self.queue.save(&records).await {
                error!("Failed to persist offline queue: {e}");
            }
        }
        info!(
            replayed = report.replayed,
            remaining = report.remaining,
            "Offline replay finished"
        );
        report
    }
}
