//! # Device Role Classifier
//!
//! Derives a device's topological role from its TID suffix and element level.
//!
//! Classification is a pure function of its inputs. The builder calls it on every
//! pass and nothing stores the result beyond that pass, so a topology change in the
//! inventory is picked up on the next reconciliation.

use crate::primitives::{AGG_SUFFIX, CPE_SUFFIX, HUB_SUFFIX, LEGACY_CPE_SUFFIX, MUX_SUFFIX};
use crate::{DeviceRole, Level, Tid};

/// Stateless role classifier.
pub struct RoleClassifier;

impl RoleClassifier {
    /// Classify a device.
    ///
    /// - `..CW` is a hub router, `..QW` an aggregation node, `..ZW` (or `..01W`) a CPE.
    /// - `..AW` is a multiplexer on the transport level. On the service level it is a
    ///   multiplexer only when the adjacent service path hands off from it to a CPE;
    ///   otherwise it is acting as an aggregation leg between routers.
    ///
    /// `adjacent_path` is the dotted name of the path the element belongs to.
    /// Returns `None` for identifiers that follow no role convention.
    #[must_use]
    pub fn classify(tid: &Tid, level: Level, adjacent_path: Option<&str>) -> Option<DeviceRole> {
        if tid.has_suffix(LEGACY_CPE_SUFFIX) {
            return Some(DeviceRole::Cpe);
        }
        if !tid.is_standard() {
            return None;
        }

        if tid.has_suffix(HUB_SUFFIX) {
            Some(DeviceRole::Hub)
        } else if tid.has_suffix(AGG_SUFFIX) {
            Some(DeviceRole::Agg)
        } else if tid.has_suffix(CPE_SUFFIX) {
            Some(DeviceRole::Cpe)
        } else if tid.has_suffix(MUX_SUFFIX) {
            match level {
                Level::Transport => Some(DeviceRole::Mux),
                Level::Service => Some(Self::service_leg_role(tid, adjacent_path)),
            }
        } else {
            None
        }
    }

    /// Role of a leg-router on the service level.
    fn service_leg_role(tid: &Tid, adjacent_path: Option<&str>) -> DeviceRole {
        let Some(path) = adjacent_path else {
            return DeviceRole::Mux;
        };
        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        let hands_off_to_cpe = segments.len() >= 4
            && segments[2].eq_ignore_ascii_case(tid.as_str())
            && segments[segments.len() - 1]
                .to_ascii_uppercase()
                .ends_with(CPE_SUFFIX);

        if hands_off_to_cpe || segments.len() < 4 {
            DeviceRole::Mux
        } else {
            DeviceRole::Agg
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
