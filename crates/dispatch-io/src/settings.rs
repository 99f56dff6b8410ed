//! System-wide settings for a case, read from `settings.toml`.
//!
//! Every field has a default, so a missing file, a missing section or a
//! missing key all fall back to the values below:
//!
//! ```toml
//! [system]
//! value_of_lost_load = 10000.0
//! shedding_enabled = false
//!
//! [linearization]
//! single_segment = "linear-term"
//!
//! [solver]
//! lp_solver = "clarabel"
//! base_mva = 100.0
//! ```

use anyhow::{anyhow, Context, Result};
use dispatch_core::{CostPerMwh, SingleSegmentCost};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up inside a case directory
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SystemSettings {
    #[serde(default)]
    pub system: SystemSection,
    #[serde(default)]
    pub linearization: LinearizationSection,
    #[serde(default)]
    pub solver: SolverSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSection {
    /// Price of unserved energy (currency/MWh)
    #[serde(default = "default_voll")]
    pub value_of_lost_load: f64,
    /// Add one shedding unit per load bus
    #[serde(default)]
    pub shedding_enabled: bool,
}

impl Default for SystemSection {
    fn default() -> Self {
        Self {
            value_of_lost_load: default_voll(),
            shedding_enabled: false,
        }
    }
}

fn default_voll() -> f64 {
    10_000.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LinearizationSection {
    #[serde(default)]
    pub single_segment: SingleSegmentCost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSection {
    #[serde(default = "default_lp_solver")]
    pub lp_solver: String,
    /// Power base used to scale branch susceptances (MVA)
    #[serde(default = "default_base_mva")]
    pub base_mva: f64,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            lp_solver: default_lp_solver(),
            base_mva: default_base_mva(),
        }
    }
}

fn default_lp_solver() -> String {
    "clarabel".to_string()
}

fn default_base_mva() -> f64 {
    100.0
}

impl SystemSettings {
    /// Parse and check a settings file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: SystemSettings = toml::from_str(&contents)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        settings.check()?;
        Ok(settings)
    }

    /// `settings.toml` from a case directory, or defaults when absent
    pub fn from_case_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if path.exists() {
            Self::from_path(&path)
        } else {
            tracing::debug!(case = %dir.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject values the model cannot use
    pub fn check(&self) -> Result<()> {
        if !self.system.value_of_lost_load.is_finite() {
            return Err(anyhow!(
                "value_of_lost_load must be finite, got {}",
                self.system.value_of_lost_load
            ));
        }
        if !(self.solver.base_mva.is_finite() && self.solver.base_mva > 0.0) {
            return Err(anyhow!(
                "base_mva must be positive, got {}",
                self.solver.base_mva
            ));
        }
        Ok(())
    }

    pub fn voll(&self) -> CostPerMwh {
        CostPerMwh(self.system.value_of_lost_load)
    }
}
