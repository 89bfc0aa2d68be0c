//! # Device Control Plane
//!
//! The service that runs vendor query commands against physical devices.
//!
//! Adapters build a [`CommandRequest`] and get back the raw JSON result. The control
//! plane may onboard a device it does not yet know about; readiness is polled by the
//! caller, never inside an adapter.

mod scripted;

pub use scripted::{CommandCall, ScriptedControlPlane};

use crate::Tid;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// One command against one device.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest<'a> {
    pub command: &'a str,
    pub hostname: &'a Tid,
    pub parameters: Value,
    pub timeout: Duration,
    /// Let the control plane onboard the device if it does not know it yet.
    pub attempt_onboarding: bool,
}

impl<'a> CommandRequest<'a> {
    #[must_use]
    pub fn new(command: &'a str, hostname: &'a Tid, timeout: Duration) -> Self {
        Self {
            command,
            hostname,
            parameters: Value::Null,
            timeout,
            attempt_onboarding: false,
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Failure of a control-plane call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("command rejected: {0}")]
    Rejected(String),

    #[error("device unreachable: {0}")]
    Unreachable(String),
}

/// Readiness of a device in the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationStatus {
    Active,
    /// Known but not ready, e.g. onboarding in progress.
    Pending,
    /// Not known to the control plane.
    Unknown,
    Failed(String),
}

/// Executes commands against devices.
pub trait DeviceControlPlane {
    /// Run one command. Implementations enforce `request.timeout` and never retry.
    fn execute(&self, request: &CommandRequest<'_>) -> Result<Value, ControlPlaneError>;

    /// Current readiness of a device.
    fn device_status(&self, tid: &Tid) -> Result<ActivationStatus, ControlPlaneError>;

    /// Ask the control plane to onboard a device.
    fn onboard(&self, tid: &Tid) -> Result<(), ControlPlaneError>;
}
