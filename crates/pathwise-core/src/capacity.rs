//! # Capacity Planner
//!
//! Decides whether a circuit can carry more bandwidth on the equipment it already
//! uses, and what must change when it cannot.
//!
//! - **Delta**: requested minus current; equal or lower requests are rejected
//! - **Transport**: per-path available capacity against the delta
//! - **Hub eligibility**: physical-layer rules for a 1G to 10G hub optic swap
//! - **Handoff**: the customer port's maximum rate
//! - **Duplex**: threshold crossings that need a maintenance window
//! - **Oversubscription**: percentage written back to shared aggregate paths
//!
//! Everything is integer arithmetic. Optical power is held in hundredths of a dBm.

use crate::adapter::{AdapterRegistry, Probe, text};
use crate::config::EngineConfig;
use crate::control_plane::{CommandRequest, DeviceControlPlane};
use crate::diagnostics::Diagnostics;
use crate::graph::Handoff;
use crate::inventory::{ElementQuery, InventoryError, InventoryStore, PathUpdate, PathUtilization};
use crate::primitives::{
    AGG_SUFFIX, DUPLEX_CEILING_MBPS, MUX_SUFFIX, OPTIC_INFO_COMMAND, OVERSUBSCRIPTION_STEP_PERCENT,
};
use crate::{Bandwidth, Device, EligibilityDecision, Level, PathwiseError, Tid, TransportPath};
use serde_json::{Value, json};

// =============================================================================
// PURE RULES
// =============================================================================

/// Bandwidth to add: `requested - current`, rejected unless strictly positive.
///
/// # Errors
/// - `BandwidthUnchanged` when the two are equal
/// - `BandwidthDowngrade` when the request is lower
pub fn bandwidth_delta(requested: Bandwidth, current: Bandwidth) -> Result<Bandwidth, PathwiseError> {
    match requested.checked_sub(current) {
        Some(delta) if delta > Bandwidth::ZERO => Ok(delta),
        Some(_) => Err(PathwiseError::BandwidthUnchanged(requested)),
        None => Err(PathwiseError::BandwidthDowngrade { requested, current }),
    }
}

/// Whether moving from `current_mbps` to `requested_mbps` crosses a duplex threshold.
///
/// The first threshold at or above the current rate decides: the move crosses it
/// when the requested rate is above it. Requests above 1000 Mbps never cross.
#[must_use]
pub fn crosses_duplex_threshold(thresholds: &[u64], current_mbps: u64, requested_mbps: u64) -> bool {
    if requested_mbps > DUPLEX_CEILING_MBPS {
        return false;
    }
    thresholds
        .iter()
        .find(|threshold| current_mbps <= **threshold)
        .is_some_and(|threshold| requested_mbps > *threshold)
}

/// Maximum rate of a handoff port.
///
/// Composite ratings such as `"10/100/1000"` are read as Mbps and the largest token
/// wins. Anything else goes through [`Bandwidth::parse`].
#[must_use]
pub fn handoff_capacity(rating: &str) -> Option<Bandwidth> {
    if rating.contains('/') {
        return rating
            .split('/')
            .filter_map(|token| token.split_whitespace().next())
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .map(Bandwidth::from_mbps);
    }
    Bandwidth::parse(rating).ok()
}

/// Oversubscription, in percent, needed to carry `circuit` more on a shared path.
///
/// Zero when the available capacity already exceeds the circuit plus what is used.
/// Otherwise the smallest multiple of 10% of `total` that is strictly greater than
/// the shortfall `circuit + used - total`. `None` when `total` is zero and the path
/// cannot carry the circuit, since no percentage of nothing helps.
#[must_use]
pub fn oversubscription_percent(total: u64, used: u64, available: u64, circuit: u64) -> Option<u64> {
    let needed = u128::from(circuit) + u128::from(used);
    if u128::from(available) > needed {
        return Some(0);
    }
    if total == 0 {
        return None;
    }
    let step = u128::from(OVERSUBSCRIPTION_STEP_PERCENT);
    let shortfall = needed.saturating_sub(u128::from(total));
    let floor = shortfall * 100 / u128::from(total);
    u64::try_from((floor / step + 1) * step).ok()
}

/// Hundredths of a dBm from strings like `"-5.2"`, `"-21"` or `"-21.00 dBm"`.
fn parse_centi_dbm(raw: &str) -> Option<i32> {
    let trimmed = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let whole: i32 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut places = fraction.bytes().map(|b| i32::from(b - b'0'));
    let tenths = places.next().unwrap_or(0);
    let hundredths = places.next().unwrap_or(0);
    let value = whole.checked_mul(100)?.checked_add(tenths * 10 + hundredths)?;
    Some(if negative { -value } else { value })
}

/// Wavelength in whole nanometres from `"1430nm"` or `"1450.00 nm"`.
fn parse_wavelength(raw: &str) -> Option<u32> {
    let number = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim();
    number.split('.').next()?.parse().ok()
}

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome of the per-path capacity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportAssessment {
    /// First customer-side path that cannot absorb the delta.
    pub insufficient: Option<TransportPath>,
    /// Shared aggregate paths, skipped by the check but owed an oversubscription update.
    pub aggregates: Vec<(TransportPath, PathUtilization)>,
}

/// Light levels of one optic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpticTelemetry {
    pub vendor: String,
    pub wavelength_nm: Option<u32>,
    pub receive_power_centi_dbm: Option<i32>,
}

impl OpticTelemetry {
    fn from_response(response: &Value) -> Self {
        let body = response
            .get("result")
            .filter(|r| r.is_object())
            .unwrap_or(response);
        Self {
            vendor: text(body, "/vendor").unwrap_or_default(),
            wavelength_nm: text(body, "/wavelength").as_deref().and_then(parse_wavelength),
            receive_power_centi_dbm: text(body, "/receive_power")
                .as_deref()
                .and_then(parse_centi_dbm),
        }
    }
}

// =============================================================================
// PLANNER
// =============================================================================

/// Capacity and eligibility decisions for one circuit.
pub struct CapacityPlanner<'a> {
    inventory: &'a dyn InventoryStore,
    control_plane: &'a dyn DeviceControlPlane,
    registry: &'a AdapterRegistry,
    config: &'a EngineConfig,
}

impl<'a> CapacityPlanner<'a> {
    #[must_use]
    pub fn new(
        inventory: &'a dyn InventoryStore,
        control_plane: &'a dyn DeviceControlPlane,
        registry: &'a AdapterRegistry,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            inventory,
            control_plane,
            registry,
            config,
        }
    }

    /// Check every transport path of the circuit against `delta`.
    ///
    /// Aggregate paths are skipped and returned separately. Every other path must
    /// report exactly one utilization row.
    ///
    /// # Errors
    /// - `HubTransportUnsupported` when a path leaving a hub router is short
    /// - `InconsistentRecord` for missing or ambiguous utilization data
    pub fn assess_transport(
        &self,
        paths: &[TransportPath],
        delta: Bandwidth,
    ) -> Result<TransportAssessment, PathwiseError> {
        if paths.is_empty() {
            return Err(PathwiseError::InconsistentRecord(
                "circuit has no transport paths".into(),
            ));
        }

        let mut assessment = TransportAssessment::default();
        for path in paths {
            let rows = self
                .inventory
                .path_utilization(&path.path_id, &path.path_instance_id)?;
            let Some(first) = rows.first() else {
                return Err(PathwiseError::InconsistentRecord(format!(
                    "no utilization for {}",
                    path.path_id
                )));
            };
            if first.is_aggregate() {
                tracing::debug!(path = %path.path_id, "aggregate path skipped");
                assessment.aggregates.push((path.clone(), first.clone()));
                continue;
            }
            if rows.len() > 1 {
                return Err(PathwiseError::InconsistentRecord(format!(
                    "{} utilization rows for {}",
                    rows.len(),
                    path.path_id
                )));
            }

            let available = first.available().ok_or_else(|| {
                PathwiseError::InconsistentRecord(format!("no available bandwidth on {}", path.path_id))
            })?;
            let mut checked = path.clone();
            checked.bandwidth_available = Some(available);

            if delta > available {
                if path.is_hub_segment() {
                    return Err(PathwiseError::HubTransportUnsupported(path.path_id.clone()));
                }
                tracing::info!(path = %path.path_id, %delta, %available, "transport path is short");
                if assessment.insufficient.is_none() {
                    assessment.insufficient = Some(checked);
                }
            }
        }
        Ok(assessment)
    }

    /// Decide whether a short transport can be swapped to 10G.
    ///
    /// Paths not leaving an aggregation node need no hub work and are always
    /// eligible. A `serviceable_shelf` override skips the shared-channel, optic
    /// vendor and receive power rules, never the wavelength rule. Failing to read
    /// the optic is tolerated and skips the optic rules.
    pub fn evaluate_hub_upgrade(
        &self,
        path: &TransportPath,
        serviceable_shelf: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<EligibilityDecision, PathwiseError> {
        let context = Some(path.path_id.clone());
        let Some(start) = path.upstream_tid().filter(|tid| tid.has_suffix(AGG_SUFFIX)) else {
            return Ok(EligibilityDecision::eligible(context, false));
        };
        if path.downstream_tid().is_some_and(|tid| tid.has_suffix(MUX_SUFFIX)) {
            return Ok(EligibilityDecision::rejected(
                "MTU in hub transport path",
                context,
            ));
        }

        if !serviceable_shelf {
            let channels = match self.inventory.channels_in_use(&path.path_id) {
                Ok(channels) => channels,
                Err(InventoryError::NotFound(_)) => Vec::new(),
                Err(err) => return Err(err.into()),
            };
            if channels.len() != 1 {
                return Ok(EligibilityDecision::rejected(
                    format!("{} circuits on transport path", channels.len()),
                    context,
                ));
            }
        }

        let elements = self
            .inventory
            .path_elements(&ElementQuery::instance(&path.path_instance_id, Level::Transport))?;
        let port = elements
            .iter()
            .find_map(|e| e.port_access_id())
            .ok_or_else(|| {
                PathwiseError::InconsistentRecord(format!("no port on transport {}", path.path_id))
            })?
            .to_string();

        let optic = match self.optic_telemetry(&start, &port) {
            Ok(optic) => optic,
            Err(err) => {
                diagnostics.tolerated(&err);
                return Ok(EligibilityDecision::eligible(context, true));
            }
        };

        if let Some(wavelength) = optic.wavelength_nm {
            if self.config.cwdm_reserved_wavelengths.contains(&wavelength) {
                return Ok(EligibilityDecision::rejected(
                    format!("unsupported CWDM wavelength {wavelength}nm"),
                    context,
                ));
            }
        }
        if !serviceable_shelf {
            if self.config.optic_vendor_denied(&optic.vendor) {
                return Ok(EligibilityDecision::rejected(
                    format!("unsupported optic vendor {}", optic.vendor),
                    context,
                ));
            }
            if let Some(power) = optic.receive_power_centi_dbm {
                if power <= self.config.rx_power_floor_centi_dbm {
                    return Ok(EligibilityDecision::rejected(
                        format!("optic receive power {power} centi-dBm at or below floor"),
                        context,
                    ));
                }
            }
        }

        tracing::info!(path = %path.path_id, tid = %start, "hub optic swap eligible");
        Ok(EligibilityDecision::eligible(context, true))
    }

    /// Read the light levels of `port` on `tid`.
    pub fn optic_telemetry(&self, tid: &Tid, port: &str) -> Result<OpticTelemetry, PathwiseError> {
        let request = CommandRequest::new(OPTIC_INFO_COMMAND, tid, self.config.device_timeout())
            .with_parameters(json!({ "device_port": port }));
        let response = self
            .control_plane
            .execute(&request)
            .map_err(|e| PathwiseError::DeviceCommunication {
                tid: tid.to_string(),
                command: OPTIC_INFO_COMMAND.to_string(),
                detail: e.to_string(),
            })?;
        Ok(OpticTelemetry::from_response(&response))
    }

    /// Whether the handoff device must be swapped for one with a faster port.
    ///
    /// # Errors
    /// `InconsistentRecord` when the handoff port rating cannot be read.
    pub fn handoff_needs_swap(
        &self,
        handoff: &Handoff,
        requested: Bandwidth,
        transport_upgrade: bool,
    ) -> Result<bool, PathwiseError> {
        let rating = handoff.port_bandwidth.as_deref().unwrap_or_default();
        let capacity = handoff_capacity(rating).ok_or_else(|| {
            PathwiseError::InconsistentRecord(format!(
                "handoff port {} on {} has no usable rating '{rating}'",
                handoff.port, handoff.tid
            ))
        })?;
        Ok(requested > capacity || transport_upgrade)
    }

    /// Whether a bandwidth change needs a speed/duplex change on the handoff.
    ///
    /// A crossing of the configured thresholds is checked again against the CPE's
    /// live negotiated rate. When the live rate cannot be read the crossing stands.
    pub fn duplex_change_required(
        &self,
        cpe: &Device,
        circuit_id: &str,
        current: Bandwidth,
        requested: Bandwidth,
        diagnostics: &mut Diagnostics,
    ) -> Result<bool, PathwiseError> {
        let (current_mbps, requested_mbps) = (current.mbps(), requested.mbps());
        if !crosses_duplex_threshold(&self.config.duplex_thresholds_mbps, current_mbps, requested_mbps)
        {
            return Ok(false);
        }

        let adapter = self.registry.resolve(cpe)?;
        let probe = Probe {
            device: cpe,
            circuit_id,
            control_plane: self.control_plane,
            timeout: self.config.device_timeout(),
        };
        match adapter.duplex_rate(&probe) {
            Ok(rate) => match rate.speed_mbps {
                Some(live) => Ok(crosses_duplex_threshold(&[live], current_mbps, requested_mbps)),
                None => {
                    diagnostics.note(format!("{} handoff auto-negotiates; speed unknown", cpe.tid));
                    Ok(true)
                }
            },
            Err(err) => {
                diagnostics.tolerated(&PathwiseError::from(err));
                Ok(true)
            }
        }
    }

    /// Raise the oversubscription of a shared path so it can carry `circuit` more.
    ///
    /// The new percentage is added to what the path already records. A zero
    /// percentage writes nothing. Returns the percentage added.
    ///
    /// # Errors
    /// `InconsistentRecord` when the utilization row lacks capacity figures.
    pub fn apply_oversubscription(
        &self,
        path: &TransportPath,
        utilization: &PathUtilization,
        circuit: Bandwidth,
    ) -> Result<u64, PathwiseError> {
        let missing =
            || PathwiseError::InconsistentRecord(format!("incomplete utilization for {}", path.path_id));
        let total = utilization.total_bps.ok_or_else(missing)?;
        let used = utilization.used_bps.ok_or_else(missing)?;
        let available = utilization.available_bps.ok_or_else(missing)?;
        let percent =
            oversubscription_percent(total, used, available, circuit.bps()).ok_or_else(missing)?;
        if percent == 0 {
            return Ok(0);
        }

        let recorded = utilization.oversubscription_percent.unwrap_or(0);
        self.inventory.update_path(&PathUpdate::Oversubscription {
            path_name: path.path_id.clone(),
            instance_id: path.path_instance_id.clone(),
            percent: recorded.saturating_add(percent),
        })?;
        tracing::info!(path = %path.path_id, percent, recorded, "oversubscription raised");
        Ok(percent)
    }
}

// =============================================================================
// TESTS
// =============================================================================
