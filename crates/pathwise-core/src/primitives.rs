//! # Engine Primitives
//!
//! Hardcoded naming conventions and limits shared by every pathwise component.
//!
//! These are the facts of the inventory and device estate that do not change per
//! deployment. Tunables that operators may want to move live in
//! [`EngineConfig`](crate::config::EngineConfig) instead, seeded from the defaults here.
//!
//! ## Conventions
//!
//! 1. **Role suffixes**: the last two characters of an 11-character TID name the device role.
//! 2. **Eligible statuses**: only elements in these statuses take part in a topology.
//! 3. **Fixed thresholds**: duplex thresholds, optical floors and poll ceilings.

// =============================================================================
// DEVICE NAMING
// =============================================================================

/// Length of a standard device identifier (TID).
pub const STANDARD_TID_LENGTH: usize = 11;

/// Hub router suffix.
pub const HUB_SUFFIX: &str = "CW";

/// Aggregation node suffix.
pub const AGG_SUFFIX: &str = "QW";

/// Multiplexer (MTU) suffix.
pub const MUX_SUFFIX: &str = "AW";

/// Customer premises device suffix.
pub const CPE_SUFFIX: &str = "ZW";

/// Short-form customer premises suffix accepted regardless of TID length.
///
/// Older CPE installs were named with a numbered suffix instead of the two-letter one.
pub const LEGACY_CPE_SUFFIX: &str = "01W";

// =============================================================================
// ELEMENT RECORDS
// =============================================================================

/// Element statuses that participate in a circuit topology.
pub const ELIGIBLE_STATUSES: [&str; 3] = ["LIVE", "PENDING DECOMMISSION", "DO-NOT-USE"];

/// Element category fragments that denote a passive optical (EPON) topology.
pub const PASSIVE_OPTICAL_CATEGORIES: [&str; 2] = ["OPTICAL LINE TERMINAL", "EPON"];

/// Vendor name the inventory uses for placeholder equipment.
pub const GENERIC_VENDOR: &str = "GENERIC";

/// Model fragment the inventory uses for passive multiplexers.
pub const PASSIVE_MUX_MODEL: &str = "MUX";

/// Element category of a physical transport leg.
pub const ETHERNET_TRANSPORT_CATEGORY: &str = "ETHERNET TRANSPORT";

/// Element category of a shared aggregate path.
pub const AGGREGATE_CATEGORY: &str = "AGGREGATE";

/// Response fragment the inventory returns instead of an empty list.
pub const NO_RECORDS_SENTINEL: &str = "No records";

/// Attribute holding comma-separated legacy circuit identifiers.
pub const LEGACY_ID_ATTRIBUTE: &str = "L-ID";

// =============================================================================
// CAPACITY
// =============================================================================

/// Duplex/speed thresholds in Mbps. Crossing one requires a maintenance window.
pub const DUPLEX_THRESHOLDS_MBPS: [u64; 3] = [10, 100, 1000];

/// Above this requested rate (Mbps) no duplex threshold can be crossed.
pub const DUPLEX_CEILING_MBPS: u64 = 1000;

/// Largest bandwidth the upgrade workflow will plan for, in Mbps.
pub const MAX_UPGRADE_MBPS: u64 = 10_000;

/// Nominal rate of an upgraded transport leg.
pub const UPGRADED_TRANSPORT: &str = "10 Gbps";

/// Nominal rate of a legacy transport leg.
pub const LEGACY_TRANSPORT: &str = "1 Gbps";

/// Oversubscription is raised in steps of this many percent.
pub const OVERSUBSCRIPTION_STEP_PERCENT: u64 = 10;

// =============================================================================
// OPTICS
// =============================================================================

/// Received optical power floor in hundredths of a dBm (-21.00 dBm).
pub const RX_POWER_FLOOR_CENTI_DBM: i32 = -2100;

/// CWDM wavelengths (nm) reserved for other services.
pub const CWDM_RESERVED_WAVELENGTHS: [u32; 2] = [1430, 1450];

/// Optic vendors that cannot be reused at 10G.
pub const DENYLISTED_OPTIC_VENDORS: [&str; 1] = ["CHAMPION"];

/// Control-plane command that reads a port's optic light levels.
pub const OPTIC_INFO_COMMAND: &str = "post_install_light_level";

/// Card template inserted when a hub optic is swapped to 10G.
pub const TEN_GIG_CARD_TEMPLATE: &str = "GENERIC SFP+ LEVEL 1";

// =============================================================================
// DEVICE CONTROL PLANE
// =============================================================================

/// Default bound on a single device command, in seconds.
pub const DEVICE_TIMEOUT_SECS: u64 = 120;

/// Default number of activation polls before giving up.
pub const ONBOARDING_MAX_ATTEMPTS: u32 = 36;

/// Default pause between activation polls, in seconds.
pub const ONBOARDING_INTERVAL_SECS: u64 = 10;

// =============================================================================
// WORKFLOW
// =============================================================================

/// Status a committed revision is promoted to.
pub const PLANNED_STATUS: &str = "Planned";

/// Handoff note added when a duplex change survives the live check.
pub const DUPLEX_COORDINATION_NOTE: &str =
    "Customer coordination is required for Port Speed/Duplex change on handoff.";

/// Z-site type for which a full disconnect needs no hub work.
pub const ACTIVE_MTU_SITE: &str = "ACTIVE MTU";

/// Note added when the handoff device is swapped for a 10G shelf.
pub const CPE_SWAP_NOTE: &str = "Customer coordination is required for CPE shelf swap.";

/// Maintenance window verdict when hub equipment is touched.
pub const MW_HUB_IMPACTED: &str = "Yes - Hub Impacted - Inflight Customer Only Impacted";

/// Maintenance window verdict when only customer-side equipment is touched.
pub const MW_NO_HUB_IMPACTED: &str = "Yes - No Hub Impacted - Inflight Customer Only Impacted";

/// Maintenance window verdict when no window is needed.
pub const MW_NOT_NEEDED: &str = "No";

/// Status of a port taken into use by a transport swap.
pub const ASSIGNED_PORT_STATUS: &str = "Assigned";

/// Port access id prefixes of 1G and 10G optics.
pub const ONE_GIG_PORT_PREFIX: &str = "GE";
pub const TEN_GIG_PORT_PREFIX: &str = "XE";

/// Restricted product variant.
pub const TYPE_TWO_MARKER: &str = "TYPE II";
