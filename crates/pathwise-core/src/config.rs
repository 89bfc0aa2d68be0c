//! # Engine Configuration
//!
//! Tunables of the engine, each defaulting to the value in [`crate::primitives`].
//! The binary reads this from TOML; library callers build it directly.

use crate::poll::PollPolicy;
use crate::primitives::{
    CWDM_RESERVED_WAVELENGTHS, DENYLISTED_OPTIC_VENDORS, DEVICE_TIMEOUT_SECS,
    DUPLEX_THRESHOLDS_MBPS, ONBOARDING_INTERVAL_SECS, ONBOARDING_MAX_ATTEMPTS,
    RX_POWER_FLOOR_CENTI_DBM,
};
use crate::{PathwiseError, Vendor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Bound on a single device command, in seconds.
    pub device_timeout_secs: u64,
    /// Activation polling after onboarding a device.
    pub onboarding: PollPolicy,
    /// Ordered duplex thresholds in Mbps.
    pub duplex_thresholds_mbps: Vec<u64>,
    /// Received optical power floor in hundredths of a dBm.
    pub rx_power_floor_centi_dbm: i32,
    pub cwdm_reserved_wavelengths: Vec<u32>,
    pub denylisted_optic_vendors: Vec<String>,
    /// Products the upgrade workflow accepts.
    pub upgrade_products: Vec<String>,
    /// CPE vendors the upgrade workflow can plan for.
    pub supported_cpe_vendors: Vec<String>,
    /// Replacement 10G model per CPE vendor.
    pub cpe_swap_models: BTreeMap<String, String>,
    /// CPE models whose removal needs an installer on site.
    pub installer_cpe_models: Vec<String>,
    /// Access policy assigned per product on commit.
    pub product_policies: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_timeout_secs: DEVICE_TIMEOUT_SECS,
            onboarding: PollPolicy::new(ONBOARDING_INTERVAL_SECS, ONBOARDING_MAX_ATTEMPTS),
            duplex_thresholds_mbps: DUPLEX_THRESHOLDS_MBPS.to_vec(),
            rx_power_floor_centi_dbm: RX_POWER_FLOOR_CENTI_DBM,
            cwdm_reserved_wavelengths: CWDM_RESERVED_WAVELENGTHS.to_vec(),
            denylisted_optic_vendors: DENYLISTED_OPTIC_VENDORS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            upgrade_products: [
                "Fiber Internet Access",
                "Carrier E-Access (Fiber)",
                "EPL (Fiber)",
                "Wireless Internet Access",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            supported_cpe_vendors: vec!["ADVA".to_string(), "RAD".to_string()],
            cpe_swap_models: BTreeMap::from([
                ("ADVA".to_string(), "FSP 150-XG108".to_string()),
                ("RAD".to_string(), "ETX-2I-10G-B/8.5/8SFPP".to_string()),
            ]),
            installer_cpe_models: vec!["ETX203AX/2SFP/2UTP2SFP".to_string()],
            product_policies: BTreeMap::from([
                ("Fiber Internet Access".to_string(), "GSIP".to_string()),
                ("Carrier E-Access (Fiber)".to_string(), "GSIP".to_string()),
                ("EPL (Fiber)".to_string(), "GSIP".to_string()),
            ]),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), PathwiseError> {
        if self.device_timeout_secs == 0 {
            return Err(PathwiseError::InvalidInput(
                "device_timeout_secs must be positive".into(),
            ));
        }
        if self.onboarding.max_attempts == 0 {
            return Err(PathwiseError::InvalidInput(
                "onboarding.max_attempts must be positive".into(),
            ));
        }
        if self
            .duplex_thresholds_mbps
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(PathwiseError::InvalidInput(
                "duplex_thresholds_mbps must be strictly ascending".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn supports_product(&self, product: &str) -> bool {
        self.upgrade_products
            .iter()
            .any(|p| p.eq_ignore_ascii_case(product.trim()))
    }

    #[must_use]
    pub fn supports_cpe_vendor(&self, vendor: &Vendor) -> bool {
        self.supported_cpe_vendors
            .iter()
            .any(|v| Vendor::from_name(v) == *vendor)
    }

    /// Replacement model for a CPE vendor.
    #[must_use]
    pub fn swap_model(&self, vendor: &Vendor) -> Option<&str> {
        self.cpe_swap_models
            .iter()
            .find(|(name, _)| Vendor::from_name(name) == *vendor)
            .map(|(_, model)| model.as_str())
    }

    #[must_use]
    pub fn optic_vendor_denied(&self, vendor: &str) -> bool {
        let upper = vendor.trim().to_ascii_uppercase();
        self.denylisted_optic_vendors
            .iter()
            .any(|denied| upper.contains(&denied.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn needs_installer(&self, model: &str) -> bool {
        self.installer_cpe_models
            .iter()
            .any(|m| m.eq_ignore_ascii_case(model.trim()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
