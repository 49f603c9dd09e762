//! Controller HTTP client
//!
//! Thin typed wrapper over the machine controller's HTTP API. Every read
//! returns a point-in-time snapshot; an empty body is a valid response, not
//! an error. Action calls mutate controller state — callers observe the
//! effect through the next poll or an explicit `refresh()`, never through a
//! local state update.
//!
//! The `AutomationClient` trait is the seam the telemetry aggregator and
//! the test suites build against; `HttpAutomationClient` is the production
//! implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::defaults::CONTROLLER_HTTP_TIMEOUT_SECS;
use crate::types::{
    Bay, Cell, FaultRecord, MachineIdentity, MachineMode, MachinePowerState, SensorVector,
};

/// Controller client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Controller returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// Typed access to the machine controller.
///
/// Implementations must be cheap to share (`Arc`) and safe to call
/// concurrently — the aggregator issues several reads in parallel.
#[async_trait]
pub trait AutomationClient: Send + Sync {
    async fn get_identity(&self) -> Result<MachineIdentity, ClientError>;
    async fn get_mode(&self) -> Result<MachineMode, ClientError>;
    async fn get_power(&self) -> Result<MachinePowerState, ClientError>;
    async fn get_current_faults(&self) -> Result<Vec<FaultRecord>, ClientError>;
    async fn get_cells(&self) -> Result<Vec<Cell>, ClientError>;
    async fn get_bay(&self, bay_number: u8) -> Result<Bay, ClientError>;
    async fn get_sensors(&self) -> Result<SensorVector, ClientError>;

    async fn resolve_fault(&self, id: i64) -> Result<(), ClientError>;
    async fn resolve_all_faults(&self) -> Result<(), ClientError>;
    async fn power_on(&self) -> Result<(), ClientError>;
    async fn power_off(&self) -> Result<(), ClientError>;
    async fn set_mode_automatic(&self) -> Result<(), ClientError>;
    async fn set_mode_manual(&self) -> Result<(), ClientError>;
}

/// HTTP client for the machine controller
#[derive(Clone)]
pub struct HttpAutomationClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAutomationClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(CONTROLLER_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status()));
        }
        Ok(resp.json::<T>().await?)
    }

    async fn post_empty(&self, path: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Status(resp.status()))
        }
    }
}

#[async_trait]
impl AutomationClient for HttpAutomationClient {
    async fn get_identity(&self) -> Result<MachineIdentity, ClientError> {
        self.get_json("/api/identity").await
    }

    async fn get_mode(&self) -> Result<MachineMode, ClientError> {
        self.get_json("/api/mode").await
    }

    async fn get_power(&self) -> Result<MachinePowerState, ClientError> {
        self.get_json("/api/power").await
    }

    async fn get_current_faults(&self) -> Result<Vec<FaultRecord>, ClientError> {
        self.get_json("/api/errors/current").await
    }

    async fn get_cells(&self) -> Result<Vec<Cell>, ClientError> {
        self.get_json("/api/cells").await
    }

    async fn get_bay(&self, bay_number: u8) -> Result<Bay, ClientError> {
        self.get_json(&format!("/api/bays/{bay_number}")).await
    }

    async fn get_sensors(&self) -> Result<SensorVector, ClientError> {
        self.get_json("/api/sensors").await
    }

    async fn resolve_fault(&self, id: i64) -> Result<(), ClientError> {
        self.post_empty(&format!("/api/errors/{id}/resolve")).await
    }

    async fn resolve_all_faults(&self) -> Result<(), ClientError> {
        self.post_empty("/api/errors/resolveall").await
    }

    async fn power_on(&self) -> Result<(), ClientError> {
        self.post_empty("/api/power/power-on").await
    }

    async fn power_off(&self) -> Result<(), ClientError> {
        self.post_empty("/api/power/power-off").await
    }

    async fn set_mode_automatic(&self) -> Result<(), ClientError> {
        self.post_empty("/api/mode/automatic").await
    }

    async fn set_mode_manual(&self) -> Result<(), ClientError> {
        self.post_empty("/api/mode/manual").await
    }
}
