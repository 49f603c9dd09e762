//! Push Event Bridge — two long-lived named-event channels with one fan-out
//!
//! The bridge owns one channel per scope. Both channels are instances of the
//! same supervisor logic parameterized by endpoint and event-name list, so
//! connect/reconnect behavior exists exactly once. Delivery is
//! at-least-once: subscribers must tolerate gaps across a reconnect and
//! treat events as invalidation hints, re-deriving state from the next
//! successful poll rather than from event payloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::defaults::{
    PUSH_FANOUT_BUFFER, PUSH_RECONNECT_BASE_SECS, PUSH_RECONNECT_MAX_EXPONENT,
};
use super::tags::{INSTALLATION_EVENTS, OPERATOR_EVENTS};

/// Push channel scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelScope {
    /// Mission / bay / fault / product events.
    Operator,
    /// Calibration / axis / inverter / sensor / homing events.
    Installation,
}

impl std::fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operator => write!(f, "operator"),
            Self::Installation => write!(f, "installation"),
        }
    }
}

/// A named event as received from the transport, payload untouched.
#[derive(Debug, Clone)]
pub struct NamedEvent {
    pub name: String,
    pub args: Value,
}

/// A named event annotated with the scope it arrived on.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub name: String,
    pub args: Value,
    pub scope: ChannelScope,
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open channel to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("transport is shut down")]
    Closed,
}

/// Bridge errors
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to start {failed:?} channel(s)")]
    ChannelStart { failed: Vec<ChannelScope> },
}

/// The realtime wire protocol, abstracted.
///
/// `open` establishes one subscription for the given endpoint and event
/// names and yields events until the connection drops (receiver closes).
/// Reconnection is the bridge's job, not the transport's.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn open(
        &self,
        endpoint: &str,
        events: &[&'static str],
    ) -> Result<mpsc::Receiver<NamedEvent>, TransportError>;
}

struct ChannelWiring {
    scope: ChannelScope,
    endpoint: String,
    events: &'static [&'static str],
}

/// Owns the two push channels and fans their events out to subscribers.
pub struct PushEventBridge {
    transport: Arc<dyn RealtimeTransport>,
    operator_endpoint: String,
    installation_endpoint: String,
    events_tx: broadcast::Sender<PushEvent>,
    cancel: CancellationToken,
    supervisors: Mutex<HashMap<ChannelScope, JoinHandle<()>>>,
}

impl PushEventBridge {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        operator_endpoint: String,
        installation_endpoint: String,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(PUSH_FANOUT_BUFFER);
        Self {
            transport,
            operator_endpoint,
            installation_endpoint,
            events_tx,
            cancel: CancellationToken::new(),
            supervisors: Mutex::new(HashMap::new()),
        }
    }

    /// Start both channels. Idempotent: already-running channels are left
    /// alone.
    ///
    /// Best-effort, not all-or-nothing: a channel that fails its initial
    /// open is reported in the error, but the other channel still starts
    /// and keeps running. The caller may retry `connect` for the failed
    /// scope; once a channel is up, reconnection is automatic and invisible
    /// to subscribers.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        let channels = [
            ChannelWiring {
                scope: ChannelScope::Operator,
                endpoint: self.operator_endpoint.clone(),
                events: OPERATOR_EVENTS,
            },
            ChannelWiring {
                scope: ChannelScope::Installation,
                endpoint: self.installation_endpoint.clone(),
                events: INSTALLATION_EVENTS,
            },
        ];

        let mut failed = Vec::new();
        let mut supervisors = self.supervisors.lock().await;
        for channel in channels {
            if supervisors
                .get(&channel.scope)
                .is_some_and(|handle| !handle.is_finished())
            {
                continue;
            }
            let scope = channel.scope;
            match self.transport.open(&channel.endpoint, channel.events).await {
                Ok(rx) => {
                    info!(scope = %scope, endpoint = %channel.endpoint, "Push channel connected");
                    let handle = tokio::spawn(run_channel(
                        Arc::clone(&self.transport),
                        channel,
                        rx,
                        self.events_tx.clone(),
                        self.cancel.child_token(),
                    ));
                    supervisors.insert(scope, handle);
                }
                Err(e) => {
                    warn!(scope = %scope, error = %e, "Push channel failed to start");
                    failed.push(scope);
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::ChannelStart { failed })
        }
    }

    /// Stop both channels and abandon any in-flight reconnect attempts.
    ///
    /// Terminal: a disconnected bridge cannot be reconnected, matching the
    /// console shell's teardown-on-unmount lifecycle. Build a new bridge to
    /// connect again.
    pub async fn disconnect(&self) {
        self.cancel.cancel();
        let mut supervisors = self.supervisors.lock().await;
        for (scope, handle) in supervisors.drain() {
            if let Err(e) = handle.await {
                debug!(scope = %scope, error = %e, "Push channel supervisor ended abnormally");
            }
        }
        info!("Push event bridge disconnected");
    }

    /// Subscribe to the merged event stream of both channels.
    ///
    /// Dropping the receiver unsubscribes. A slow subscriber may lag and
    /// lose the oldest buffered events — acceptable, since every event is
    /// re-derivable from the next poll.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events_tx.subscribe()
    }
}

/// Per-channel supervisor: forward events until the connection drops, then
/// reconnect with capped exponential backoff until cancelled.
async fn run_channel(
    transport: Arc<dyn RealtimeTransport>,
    channel: ChannelWiring,
    initial_rx: mpsc::Receiver<NamedEvent>,
    events_tx: broadcast::Sender<PushEvent>,
    cancel: CancellationToken,
) {
    let mut rx = initial_rx;
    let mut attempts: u32 = 0;

    loop {
        // Forward until the transport closes the stream.
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                event = rx.recv() => match event {
                    Some(event) => {
                        attempts = 0;
                        let _ = events_tx.send(PushEvent {
                            name: event.name,
                            args: event.args,
                            scope: channel.scope,
                        });
                    }
                    None => break,
                },
            }
        }

        // Reconnect with backoff.
        loop {
            attempts = attempts.saturating_add(1);
            let backoff_secs =
                PUSH_RECONNECT_BASE_SECS << attempts.min(PUSH_RECONNECT_MAX_EXPONENT);
            warn!(
                scope = %channel.scope,
                attempt = attempts,
                next_retry_secs = backoff_secs,
                "Push channel dropped, reconnecting"
            );
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(Duration::from_secs(backoff_secs)) => {}
            }
            match transport.open(&channel.endpoint, channel.events).await {
                Ok(new_rx) => {
                    info!(scope = %channel.scope, "Push channel reconnected");
                    rx = new_rx;
                    break;
                }
                Err(e) => {
                    debug!(scope = %channel.scope, error = %e, "Push channel reconnect failed");
                }
            }
        }
    }
}
