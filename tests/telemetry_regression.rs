//! Telemetry Aggregator Regression Tests
//!
//! Exercises the aggregator against a scripted in-memory controller:
//! derived snapshot fields, last-known-value retention across source
//! failures, refresh settling every source, and tag invalidation forcing
//! an early poll.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use vertibay::config::ConsoleConfig;
use vertibay::events::CacheTag;
use vertibay::telemetry::TelemetryAggregator;
use vertibay::types::{
    Bay, BayPosition, BlockLevel, Cell, FaultCode, FaultRecord, LoadingUnit, MachineIdentity,
    MachineMode, MachinePowerState, SensorVector,
};
use vertibay::{AutomationClient, ClientError};

/// Scripted controller state shared with the test body.
struct ControllerState {
    mode: MachineMode,
    power: MachinePowerState,
    faults: Vec<FaultRecord>,
    cells: Vec<Cell>,
    bay: Bay,
    sensors: Vec<bool>,
    /// Sources that answer 503 until cleared.
    failing: Vec<&'static str>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            mode: MachineMode::NotSpecified,
            power: MachinePowerState::NotSpecified,
            faults: Vec::new(),
            cells: Vec::new(),
            bay: Bay::default(),
            sensors: Vec::new(),
            failing: Vec::new(),
        }
    }
}

struct FakeClient {
    state: Mutex<ControllerState>,
}

impl FakeClient {
    fn new(state: ControllerState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    async fn set<F: FnOnce(&mut ControllerState)>(&self, apply: F) {
        apply(&mut *self.state.lock().await);
    }

    async fn check(&self, source: &'static str) -> Result<(), ClientError> {
        if self.state.lock().await.failing.contains(&source) {
            Err(ClientError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AutomationClient for FakeClient {
    async fn get_identity(&self) -> Result<MachineIdentity, ClientError> {
        self.check("identity").await?;
        Ok(MachineIdentity::default())
    }

    async fn get_mode(&self) -> Result<MachineMode, ClientError> {
        self.check("mode").await?;
        Ok(self.state.lock().await.mode)
    }

    async fn get_power(&self) -> Result<MachinePowerState, ClientError> {
        self.check("power").await?;
        Ok(self.state.lock().await.power)
    }

    async fn get_current_faults(&self) -> Result<Vec<FaultRecord>, ClientError> {
        self.check("faults").await?;
        Ok(self.state.lock().await.faults.clone())
    }

    async fn get_cells(&self) -> Result<Vec<Cell>, ClientError> {
        self.check("cells").await?;
        Ok(self.state.lock().await.cells.clone())
    }

    async fn get_bay(&self, _bay_number: u8) -> Result<Bay, ClientError> {
        self.check("bay").await?;
        Ok(self.state.lock().await.bay.clone())
    }

    async fn get_sensors(&self) -> Result<SensorVector, ClientError> {
        self.check("sensors").await?;
        Ok(SensorVector::new(self.state.lock().await.sensors.clone()))
    }

    async fn resolve_fault(&self, id: i64) -> Result<(), ClientError> {
        self.state.lock().await.faults.retain(|f| f.id != Some(id));
        Ok(())
    }

    async fn resolve_all_faults(&self) -> Result<(), ClientError> {
        self.state.lock().await.faults.clear();
        Ok(())
    }

    async fn power_on(&self) -> Result<(), ClientError> {
        self.state.lock().await.power = MachinePowerState::Powered;
        Ok(())
    }

    async fn power_off(&self) -> Result<(), ClientError> {
        self.state.lock().await.power = MachinePowerState::Unpowered;
        Ok(())
    }

    async fn set_mode_automatic(&self) -> Result<(), ClientError> {
        self.state.lock().await.mode = MachineMode::Automatic;
        Ok(())
    }

    async fn set_mode_manual(&self) -> Result<(), ClientError> {
        self.state.lock().await.mode = MachineMode::Manual;
        Ok(())
    }
}

fn cell(is_free: bool, block_level: BlockLevel) -> Cell {
    Cell {
        is_free,
        block_level,
    }
}

fn fault(id: i64, code: FaultCode, date: &str) -> FaultRecord {
    FaultRecord {
        id: Some(id),
        code,
        occurrence_date: Some(date.to_string()),
        ..FaultRecord::default()
    }
}

fn test_config() -> ConsoleConfig {
    ConsoleConfig {
        bay_number: 2,
        ..ConsoleConfig::default()
    }
}

#[tokio::test]
async fn snapshot_reflects_controller_state_after_refresh() {
    let client = FakeClient::new(ControllerState {
        mode: MachineMode::Manual2,
        power: MachinePowerState::Powered,
        faults: vec![
            fault(1, FaultCode::SecurityWasTriggered, "2024-03-01T09:00:00Z"),
            fault(2, FaultCode::InverterFaultStateDetected, "2024-03-01T10:00:00Z"),
        ],
        cells: vec![
            cell(true, BlockLevel::None),
            cell(false, BlockLevel::None),
            cell(false, BlockLevel::None),
            cell(false, BlockLevel::Blocked),
        ],
        ..ControllerState::default()
    });
    let aggregator = TelemetryAggregator::new(client, test_config());

    aggregator.refresh().await;
    let snapshot = aggregator.snapshot().borrow().clone();

    assert!(snapshot.is_manual_for_this_bay, "Manual2 on bay 2 is manual");
    assert!(!snapshot.is_powered_off);
    assert!(snapshot.has_faults);
    assert!(!snapshot.has_data_error);
    // Most recent fault first.
    assert_eq!(snapshot.primary_fault().and_then(|f| f.id), Some(2));
    // 4 cells, 1 blocked, 1 free: 100 - 1/3*100.
    let fill = snapshot.warehouse_fill_percent.unwrap();
    assert!((fill - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_cell_inventory_is_none_not_zero() {
    let client = FakeClient::new(ControllerState::default());
    let aggregator = TelemetryAggregator::new(client, test_config());
    aggregator.refresh().await;
    let snapshot = aggregator.snapshot().borrow().clone();
    assert_eq!(snapshot.warehouse_fill_percent, None);
}

#[tokio::test]
async fn failed_source_keeps_last_known_value_and_raises_the_flag() {
    let client = FakeClient::new(ControllerState {
        faults: vec![fault(1, FaultCode::SecurityWasTriggered, "2024-03-01T09:00:00Z")],
        ..ControllerState::default()
    });
    let aggregator = TelemetryAggregator::new(Arc::clone(&client) as Arc<dyn AutomationClient>, test_config());

    aggregator.refresh().await;
    assert!(aggregator.snapshot().borrow().has_faults);

    // Fault source goes dark: last-known list is served, flag raised.
    client
        .set(|state| {
            state.failing.push("faults");
            state.faults.clear();
        })
        .await;
    aggregator.refresh().await;
    let snapshot = aggregator.snapshot().borrow().clone();
    assert!(snapshot.has_faults, "last-known faults are retained");
    assert!(snapshot.has_data_error);

    // Source recovers: fresh (empty) list replaces it, flag clears.
    client.set(|state| state.failing.clear()).await;
    aggregator.refresh().await;
    let snapshot = aggregator.snapshot().borrow().clone();
    assert!(!snapshot.has_faults);
    assert!(!snapshot.has_data_error);
}

#[tokio::test]
async fn refresh_settles_every_source_despite_one_failing() {
    let client = FakeClient::new(ControllerState {
        mode: MachineMode::Automatic,
        power: MachinePowerState::Powered,
        cells: vec![cell(false, BlockLevel::None)],
        failing: vec!["mode"],
        ..ControllerState::default()
    });
    let aggregator = TelemetryAggregator::new(client, test_config());

    aggregator.refresh().await;
    let snapshot = aggregator.snapshot().borrow().clone();
    // Mode failed, but power and cells still came through.
    assert_eq!(snapshot.mode, None);
    assert_eq!(snapshot.power, Some(MachinePowerState::Powered));
    assert!(snapshot.warehouse_fill_percent.is_some());
    assert!(snapshot.has_data_error);
}

#[tokio::test]
async fn invalidation_forces_an_early_poll() {
    let client = FakeClient::new(ControllerState::default());
    // Intervals far beyond the test duration: only forced polls can land.
    let mut config = test_config();
    config.poll.status_ms = 60_000;
    config.poll.bay_ms = 60_000;
    config.poll.cells_ms = 60_000;
    let aggregator = TelemetryAggregator::new(
        Arc::clone(&client) as Arc<dyn AutomationClient>,
        config,
    );

    let mut snapshot_rx = aggregator.snapshot();
    let cancel = tokio_util::sync::CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();
    aggregator.spawn_pollers(&mut tasks, cancel.clone());

    // Wait out the initial poll wave.
    tokio::time::timeout(Duration::from_secs(2), snapshot_rx.changed())
        .await
        .expect("initial poll")
        .expect("channel open");
    snapshot_rx.borrow_and_update();

    // Fault appears; without invalidation the next poll is a minute away.
    client
        .set(|state| {
            state
                .faults
                .push(fault(9, FaultCode::WarehouseIsFull, "2024-03-01T11:00:00Z"));
        })
        .await;
    aggregator.invalidate(&[CacheTag::Faults]);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        tokio::time::timeout_at(deadline, snapshot_rx.changed())
            .await
            .expect("forced poll arrives well before the interval")
            .expect("channel open");
        if snapshot_rx.borrow_and_update().has_faults {
            break;
        }
    }

    cancel.cancel();
    while tasks.join_next().await.is_some() {}
}

#[tokio::test]
async fn bay_and_sensor_channels_follow_the_controller() {
    let client = FakeClient::new(ControllerState {
        bay: Bay {
            number: 2,
            positions: vec![BayPosition {
                is_upper: true,
                loading_unit: Some(LoadingUnit {
                    id: Some(7),
                    ..LoadingUnit::default()
                }),
                ..BayPosition::default()
            }],
            ..Bay::default()
        },
        sensors: vec![false, true],
        ..ControllerState::default()
    });
    let aggregator = TelemetryAggregator::new(client, test_config());

    let cancel = tokio_util::sync::CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();
    aggregator.spawn_pollers(&mut tasks, cancel.clone());

    let mut bay_rx = aggregator.bay();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if bay_rx
            .borrow_and_update()
            .as_ref()
            .is_some_and(|bay| bay.upper_loading_unit().is_some())
        {
            break;
        }
        tokio::time::timeout_at(deadline, bay_rx.changed())
            .await
            .expect("bay poll lands")
            .expect("channel open");
    }
    assert!(aggregator.sensors().borrow().get(1));

    cancel.cancel();
    while tasks.join_next().await.is_some() {}
}
