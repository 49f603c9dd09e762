//! Telemetry Aggregator — independent polling reads merged into one snapshot
//!
//! Seven reads, three cadences: identity/mode/power/faults on the status
//! interval, bay snapshot and sensors on the fast interval, cell inventory
//! on the slow interval. Each source polls independently; a failed poll
//! keeps the source's last-known value and raises the snapshot's data-error
//! flag instead of propagating. Tag invalidation (from the push event
//! bridge) forces the tagged sources' next poll immediately.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{watch, Notify, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::AutomationClient;
use crate::config::ConsoleConfig;
use crate::events::CacheTag;
use crate::types::{Bay, Cell, FaultRecord, MachineIdentity, MachineMode, MachinePowerState, SensorVector};

use super::snapshot::{
    is_manual_for_bay, is_powered_off, sort_faults_desc, warehouse_fill_percent, TelemetrySnapshot,
};

/// One telemetry source within the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetrySource {
    Identity,
    Mode,
    Power,
    Faults,
    Cells,
    Bay,
    Sensors,
}

impl TelemetrySource {
    pub const ALL: [Self; 7] = [
        Self::Identity,
        Self::Mode,
        Self::Power,
        Self::Faults,
        Self::Cells,
        Self::Bay,
        Self::Sensors,
    ];

    /// Sources forced by `refresh()`: the five status reads.
    pub const STATUS: [Self; 5] = [
        Self::Identity,
        Self::Mode,
        Self::Power,
        Self::Faults,
        Self::Cells,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Identity => 0,
            Self::Mode => 1,
            Self::Power => 2,
            Self::Faults => 3,
            Self::Cells => 4,
            Self::Bay => 5,
            Self::Sensors => 6,
        }
    }

    fn interval(self, config: &ConsoleConfig) -> Duration {
        let ms = match self {
            Self::Identity | Self::Mode | Self::Power | Self::Faults => config.poll.status_ms,
            Self::Cells => config.poll.cells_ms,
            Self::Bay | Self::Sensors => config.poll.bay_ms,
        };
        Duration::from_millis(ms)
    }
}

impl std::fmt::Display for TelemetrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Identity => "identity",
            Self::Mode => "mode",
            Self::Power => "power",
            Self::Faults => "faults",
            Self::Cells => "cells",
            Self::Bay => "bay",
            Self::Sensors => "sensors",
        };
        write!(f, "{name}")
    }
}

/// Last-known value of one source plus the outcome of its latest poll.
#[derive(Debug, Clone)]
struct SourceSlot<T> {
    value: Option<T>,
    last_poll_failed: bool,
}

impl<T> Default for SourceSlot<T> {
    fn default() -> Self {
        Self {
            value: None,
            last_poll_failed: false,
        }
    }
}

impl<T> SourceSlot<T> {
    fn record(&mut self, outcome: Result<T, crate::client::ClientError>, source: TelemetrySource) {
        match outcome {
            Ok(value) => {
                self.value = Some(value);
                self.last_poll_failed = false;
            }
            Err(e) => {
                // Keep serving the last-known value until the next success.
                self.last_poll_failed = true;
                warn!(source = %source, error = %e, "Telemetry poll failed");
            }
        }
    }
}

#[derive(Default)]
struct AggregatorInner {
    identity: SourceSlot<MachineIdentity>,
    mode: SourceSlot<MachineMode>,
    power: SourceSlot<MachinePowerState>,
    faults: SourceSlot<Vec<FaultRecord>>,
    cells: SourceSlot<Vec<Cell>>,
    bay: SourceSlot<Bay>,
    sensors: SourceSlot<SensorVector>,
}

impl AggregatorInner {
    fn any_poll_failed(&self) -> bool {
        self.identity.last_poll_failed
            || self.mode.last_poll_failed
            || self.power.last_poll_failed
            || self.faults.last_poll_failed
            || self.cells.last_poll_failed
            || self.bay.last_poll_failed
            || self.sensors.last_poll_failed
    }
}

/// Merges independent controller reads into a `TelemetrySnapshot` published
/// through watch channels.
pub struct TelemetryAggregator {
    client: Arc<dyn AutomationClient>,
    config: ConsoleConfig,
    inner: RwLock<AggregatorInner>,
    snapshot_tx: watch::Sender<TelemetrySnapshot>,
    bay_tx: watch::Sender<Option<Bay>>,
    sensors_tx: watch::Sender<SensorVector>,
    forced: [Notify; 7],
}

impl TelemetryAggregator {
    pub fn new(client: Arc<dyn AutomationClient>, config: ConsoleConfig) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(TelemetrySnapshot::empty(config.bay_number));
        let (bay_tx, _) = watch::channel(None);
        let (sensors_tx, _) = watch::channel(SensorVector::default());
        Arc::new(Self {
            client,
            config,
            inner: RwLock::new(AggregatorInner::default()),
            snapshot_tx,
            bay_tx,
            sensors_tx,
            forced: Default::default(),
        })
    }

    /// Latest merged snapshot; the receiver sees every wholesale recompute.
    pub fn snapshot(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Latest bay snapshot for this console's bay.
    pub fn bay(&self) -> watch::Receiver<Option<Bay>> {
        self.bay_tx.subscribe()
    }

    /// Latest sensor vector.
    pub fn sensors(&self) -> watch::Receiver<SensorVector> {
        self.sensors_tx.subscribe()
    }

    /// Spawn one polling task per source into `tasks`.
    ///
    /// Each task polls once immediately, then waits for its interval or a
    /// forced invalidation, whichever comes first. All tasks stop at
    /// cancellation; no snapshot is published after that.
    pub fn spawn_pollers(self: &Arc<Self>, tasks: &mut JoinSet<()>, cancel: CancellationToken) {
        for source in TelemetrySource::ALL {
            let aggregator = Arc::clone(self);
            let cancel = cancel.clone();
            let interval = source.interval(&aggregator.config);
            tasks.spawn(async move {
                loop {
                    aggregator.poll_once(source).await;
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(interval) => {}
                        () = aggregator.forced[source.index()].notified() => {
                            debug!(source = %source, "Forced poll (cache invalidated)");
                        }
                    }
                }
            });
        }
    }

    /// Force the sources behind `tags` to poll now, bypassing their
    /// intervals. Tags with no backing source here are no-ops.
    pub fn invalidate(&self, tags: &[CacheTag]) {
        for tag in tags {
            for source in tag.sources() {
                self.forced[source.index()].notify_one();
            }
        }
    }

    /// Force the five status reads and resolve once every one has settled.
    ///
    /// No short-circuiting: a failure in one source must not hide the
    /// others' results, so each read is awaited to completion and failures
    /// are recorded independently.
    pub async fn refresh(&self) {
        join_all(
            TelemetrySource::STATUS
                .iter()
                .map(|&source| self.poll_once(source)),
        )
        .await;
    }

    /// Poll one source and publish the recomputed snapshot.
    ///
    /// Never fails: transport errors are absorbed into the source slot.
    /// The read happens outside the state lock so concurrent polls of
    /// different sources actually overlap.
    async fn poll_once(&self, source: TelemetrySource) {
        match source {
            TelemetrySource::Identity => {
                let outcome = self.client.get_identity().await;
                let mut inner = self.inner.write().await;
                inner.identity.record(outcome, source);
                self.publish(&inner);
            }
            TelemetrySource::Mode => {
                let outcome = self.client.get_mode().await;
                let mut inner = self.inner.write().await;
                inner.mode.record(outcome, source);
                self.publish(&inner);
            }
            TelemetrySource::Power => {
                let outcome = self.client.get_power().await;
                let mut inner = self.inner.write().await;
                inner.power.record(outcome, source);
                self.publish(&inner);
            }
            TelemetrySource::Faults => {
                let outcome = self.client.get_current_faults().await;
                let mut inner = self.inner.write().await;
                inner.faults.record(outcome, source);
                self.publish(&inner);
            }
            TelemetrySource::Cells => {
                let outcome = self.client.get_cells().await;
                let mut inner = self.inner.write().await;
                inner.cells.record(outcome, source);
                self.publish(&inner);
            }
            TelemetrySource::Bay => {
                let outcome = self.client.get_bay(self.config.bay_number).await;
                let mut inner = self.inner.write().await;
                inner.bay.record(outcome, source);
                self.publish(&inner);
            }
            TelemetrySource::Sensors => {
                let outcome = self.client.get_sensors().await;
                let mut inner = self.inner.write().await;
                inner.sensors.record(outcome, source);
                self.publish(&inner);
            }
        }
    }

    /// Recompute the snapshot wholesale from the latest slot values and
    /// publish it.
    fn publish(&self, inner: &AggregatorInner) {
        let mut faults = inner.faults.value.clone().unwrap_or_default();
        sort_faults_desc(&mut faults);
        let has_faults = !faults.is_empty();

        let snapshot = TelemetrySnapshot {
            identity: inner.identity.value.clone(),
            mode: inner.mode.value,
            power: inner.power.value,
            warehouse_fill_percent: inner
                .cells
                .value
                .as_deref()
                .and_then(warehouse_fill_percent),
            bay_number: self.config.bay_number,
            is_manual_for_this_bay: is_manual_for_bay(inner.mode.value, self.config.bay_number),
            is_powered_off: is_powered_off(inner.power.value),
            has_faults,
            has_data_error: inner.any_poll_failed(),
            faults,
        };

        self.snapshot_tx.send_replace(snapshot);
        self.bay_tx.send_replace(inner.bay.value.clone());
        self.sensors_tx
            .send_replace(inner.sensors.value.clone().unwrap_or_default());
    }
}
