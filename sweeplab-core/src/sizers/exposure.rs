//! Exposure Sizer
//!
//! Default sizer: commit a fixed fraction of available cash. Whole shares
//! (`floor`) unless fractional shares are explicitly allowed; the choice is
//! fixed per sizer, so one run never mixes the two.

use serde::{Deserialize, Serialize};

use crate::sizers::Sizer;

/// Serializable sizing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Fraction of cash committed per entry, in (0, 1].
    pub exposure_fraction: f64,
    /// Allow fractional share quantities.
    pub allow_fractional: bool,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            exposure_fraction: 1.0,
            allow_fractional: false,
        }
    }
}

/// `floor(cash × exposure / price)`, or the exact quotient when fractional.
#[derive(Debug, Clone)]
pub struct ExposureSizer {
    exposure_fraction: f64,
    allow_fractional: bool,
}

impl ExposureSizer {
    pub fn new(exposure_fraction: f64, allow_fractional: bool) -> Self {
        Self {
            exposure_fraction,
            allow_fractional,
        }
    }

    pub fn from_config(config: &SizingConfig) -> Self {
        Self::new(config.exposure_fraction, config.allow_fractional)
    }
}

impl Sizer for ExposureSizer {
    fn size(&self, budget: f64, price: f64) -> f64 {
        if budget <= 0.0 || price <= 0.0 || !price.is_finite() {
            return 0.0;
        }
        let raw = budget * self.exposure_fraction / price;
        if self.allow_fractional {
            raw
        } else {
            raw.floor()
        }
    }
}
