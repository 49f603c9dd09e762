//! Console Shell — top-level wiring of the telemetry subsystem
//!
//! Owns the component lifecycle: the push event bridge feeds invalidations
//! into the telemetry aggregator; the aggregator's watch channels drive the
//! reconciliation loop; the reconciler's decisions go out through the
//! `Navigator`. Everything is torn down together through one cancellation
//! token — no reconciliation pass runs after teardown.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::AutomationClient;
use crate::config::ConsoleConfig;
use crate::events::{tags_for_event, PushEventBridge, RealtimeTransport};
use crate::reconciler::{reconcile, ConsolePath, ReconcileContext, ReconcilerState};
use crate::telemetry::TelemetryAggregator;

/// Where reconciler-driven navigations go.
///
/// Implementations must use replace semantics — the reconciler's detours
/// must not grow the back stack.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn replace(&self, target: &ConsolePath);
}

/// Navigator that only logs decisions. Used by the headless binary and as
/// a safe default in diagnostics.
pub struct LoggingNavigator;

#[async_trait]
impl Navigator for LoggingNavigator {
    async fn replace(&self, target: &ConsolePath) {
        info!(target = %target, "navigation (replace)");
    }
}

/// The running console shell.
pub struct ConsoleShell {
    config: ConsoleConfig,
    aggregator: Arc<TelemetryAggregator>,
    bridge: Option<Arc<PushEventBridge>>,
    navigator: Arc<dyn Navigator>,
    path_tx: watch::Sender<ConsolePath>,
    cancel: CancellationToken,
    tasks: tokio::sync::Mutex<JoinSet<()>>,
}

impl ConsoleShell {
    /// Wire the shell. `transport` is optional: without one the console
    /// runs poll-only, which is also the fallback data path whenever the
    /// push channels are down.
    pub fn new(
        config: ConsoleConfig,
        client: Arc<dyn AutomationClient>,
        transport: Option<Arc<dyn RealtimeTransport>>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let aggregator = TelemetryAggregator::new(client, config.clone());
        let bridge = transport.map(|transport| {
            Arc::new(PushEventBridge::new(
                transport,
                format!("{}{}", config.controller_url, config.operator_channel_path),
                format!(
                    "{}{}",
                    config.controller_url, config.installation_channel_path
                ),
            ))
        });
        let (path_tx, _) = watch::channel(ConsolePath::main_menu());
        Self {
            config,
            aggregator,
            bridge,
            navigator,
            path_tx,
            cancel: CancellationToken::new(),
            tasks: tokio::sync::Mutex::new(JoinSet::new()),
        }
    }

    pub fn aggregator(&self) -> &Arc<TelemetryAggregator> {
        &self.aggregator
    }

    /// Record an externally-driven path change (operator tapping through
    /// the console). Re-triggers a reconciliation pass.
    pub fn set_current_path(&self, path: ConsolePath) {
        self.path_tx.send_replace(path);
    }

    /// Start polling, the push channels, and the reconciliation loop.
    ///
    /// A push channel that fails to start is logged and left to a later
    /// `connect` retry by the operator — telemetry polling works without
    /// it.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;

        self.aggregator
            .spawn_pollers(&mut tasks, self.cancel.clone());

        if let Some(bridge) = &self.bridge {
            if let Err(e) = bridge.connect().await {
                warn!(error = %e, "Some push channels failed to start; polling continues");
            }
            let mut events = bridge.subscribe();
            let aggregator = Arc::clone(&self.aggregator);
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        event = events.recv() => match event {
                            Ok(event) => {
                                let tags = tags_for_event(&event.name);
                                if tags.is_empty() {
                                    debug!(event = %event.name, "Ignoring unmapped push event");
                                } else {
                                    debug!(event = %event.name, scope = %event.scope, "Invalidating for push event");
                                    aggregator.invalidate(tags);
                                }
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                                // Dropped events are re-derived from the next
                                // poll; force one for everything.
                                warn!(missed, "Push event fan-out lagged; forcing full refresh");
                                aggregator.refresh().await;
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
            });
        }

        self.spawn_reconcile_loop(&mut tasks);
        info!(bay = self.config.bay_number, "Console shell started");
    }

    fn spawn_reconcile_loop(&self, tasks: &mut JoinSet<()>) {
        let mut snapshot_rx = self.aggregator.snapshot();
        let mut bay_rx = self.aggregator.bay();
        let mut sensors_rx = self.aggregator.sensors();
        let mut path_rx = self.path_tx.subscribe();
        let path_tx = self.path_tx.clone();
        let navigator = Arc::clone(&self.navigator);
        let config = self.config.clone();
        let cancel = self.cancel.clone();

        tasks.spawn(async move {
            // Session state lives and dies with this loop.
            let mut state = ReconcilerState::default();
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = snapshot_rx.changed() => { if changed.is_err() { break; } }
                    changed = bay_rx.changed() => { if changed.is_err() { break; } }
                    changed = sensors_rx.changed() => { if changed.is_err() { break; } }
                    changed = path_rx.changed() => { if changed.is_err() { break; } }
                }

                let snapshot = snapshot_rx.borrow_and_update().clone();
                let bay = bay_rx.borrow_and_update().clone();
                let sensors = sensors_rx.borrow_and_update().clone();
                let current = path_rx.borrow_and_update().clone();

                let action = reconcile(
                    &snapshot,
                    bay.as_ref(),
                    &sensors,
                    &current,
                    &mut state,
                    &ReconcileContext::from_config(&config),
                );

                if let Some(action) = action {
                    info!(
                        from = %current,
                        to = %action.target,
                        has_faults = snapshot.has_faults,
                        "Reconciler navigation"
                    );
                    navigator.replace(&action.target).await;
                    // Track our own navigation so the next pass sees it.
                    path_tx.send_replace(action.target);
                }
            }
        });
    }

    /// Force all status reads now; resolves when every read settled.
    pub async fn refresh(&self) {
        self.aggregator.refresh().await;
    }

    /// Tear the shell down: stop the channels, the pollers, and the
    /// reconciliation loop. No pass runs after this returns.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(bridge) = &self.bridge {
            bridge.disconnect().await;
        }
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
        info!("Console shell stopped");
    }
}
