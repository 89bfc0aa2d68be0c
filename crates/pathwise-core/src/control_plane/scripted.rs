//! Scripted control plane for tests and offline runs.

use super::{ActivationStatus, CommandRequest, ControlPlaneError, DeviceControlPlane};
use crate::Tid;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

type Reply = Result<Value, ControlPlaneError>;

/// A recorded command call.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandCall {
    pub tid: Tid,
    pub command: String,
    pub parameters: Value,
}

/// Control plane that answers from a script.
///
/// Replies for a `(device, command)` pair are consumed in order; the last reply
/// repeats once the queue is down to one. Devices are `Active` unless a status
/// sequence is scripted for them.
#[derive(Debug, Default)]
pub struct ScriptedControlPlane {
    replies: RefCell<BTreeMap<(Tid, String), VecDeque<Reply>>>,
    statuses: RefCell<BTreeMap<Tid, VecDeque<ActivationStatus>>>,
    calls: RefCell<Vec<CommandCall>>,
    onboarded: RefCell<Vec<Tid>>,
}

impl ScriptedControlPlane {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    #[must_use]
    pub fn reply(self, tid: &str, command: &str, result: Value) -> Self {
        self.push(tid, command, Ok(result))
    }

    /// Queue a failure.
    #[must_use]
    pub fn fail(self, tid: &str, command: &str, error: ControlPlaneError) -> Self {
        self.push(tid, command, Err(error))
    }

    /// Script the readiness answers for a device.
    #[must_use]
    pub fn statuses(self, tid: &str, sequence: Vec<ActivationStatus>) -> Self {
        self.statuses
            .borrow_mut()
            .insert(Tid::new(tid), sequence.into_iter().collect());
        self
    }

    fn push(self, tid: &str, command: &str, reply: Reply) -> Self {
        self.replies
            .borrow_mut()
            .entry((Tid::new(tid), command.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Commands executed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandCall> {
        self.calls.borrow().clone()
    }

    /// Commands executed so far as `"TID command"` strings.
    #[must_use]
    pub fn call_log(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| format!("{} {}", c.tid, c.command))
            .collect()
    }

    /// Devices onboarding was requested for.
    #[must_use]
    pub fn onboarded(&self) -> Vec<Tid> {
        self.onboarded.borrow().clone()
    }
}

fn next_in<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl DeviceControlPlane for ScriptedControlPlane {
    fn execute(&self, request: &CommandRequest<'_>) -> Result<Value, ControlPlaneError> {
        self.calls.borrow_mut().push(CommandCall {
            tid: request.hostname.clone(),
            command: request.command.to_string(),
            parameters: request.parameters.clone(),
        });
        let key = (request.hostname.clone(), request.command.to_string());
        self.replies
            .borrow_mut()
            .get_mut(&key)
            .and_then(next_in)
            .unwrap_or_else(|| {
                Err(ControlPlaneError::Rejected(format!(
                    "no scripted reply for {} on {}",
                    request.command, request.hostname
                )))
            })
    }

    fn device_status(&self, tid: &Tid) -> Result<ActivationStatus, ControlPlaneError> {
        Ok(self
            .statuses
            .borrow_mut()
            .get_mut(tid)
            .and_then(next_in)
            .unwrap_or(ActivationStatus::Active))
    }

    fn onboard(&self, tid: &Tid) -> Result<(), ControlPlaneError> {
        self.onboarded.borrow_mut().push(tid.clone());
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn replies_are_consumed_then_last_repeats() {
        let plane = ScriptedControlPlane::new()
            .reply("AUSTTXGR1CW", "show_interfaces", json!(1))
            .reply("AUSTTXGR1CW", "show_interfaces", json!(2));
        let tid = Tid::new("AUSTTXGR1CW");
        let request = CommandRequest::new("show_interfaces", &tid, Duration::from_secs(1));

        let answers: Vec<Value> = (0..3)
            .map(|_| plane.execute(&request).expect("scripted"))
            .collect();
        assert_eq!(answers, vec![json!(1), json!(2), json!(2)]);
        assert_eq!(plane.calls().len(), 3);
    }

    #[test]
    fn unscripted_command_is_rejected() {
        let plane = ScriptedControlPlane::new();
        let tid = Tid::new("AUSTTXGR1CW");
        let request = CommandRequest::new("show_version", &tid, Duration::from_secs(1));
        assert!(matches!(
            plane.execute(&request),
            Err(ControlPlaneError::Rejected(_))
        ));
    }

    #[test]
    fn status_defaults_to_active() {
        let plane = ScriptedControlPlane::new().statuses(
            "AUSTTXZB1ZW",
            vec![ActivationStatus::Unknown, ActivationStatus::Active],
        );
        let cpe = Tid::new("AUSTTXZB1ZW");
        assert_eq!(plane.device_status(&cpe), Ok(ActivationStatus::Unknown));
        assert_eq!(plane.device_status(&cpe), Ok(ActivationStatus::Active));
        assert_eq!(
            plane.device_status(&Tid::new("AUSTTXGR1CW")),
            Ok(ActivationStatus::Active)
        );
    }
}
