//! Loading a case directory and its settings, shared by every subcommand.

use std::path::Path;

use anyhow::{Context, Result};
use dispatch_core::OptimizationModel;
use dispatch_io::{assemble, read_case, CaseDiagnostics, SystemSettings};

/// Command-line values that take precedence over `settings.toml`
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub voll: Option<f64>,
    pub shedding: Option<bool>,
    pub lp_solver: Option<String>,
}

pub struct LoadedCase {
    pub settings: SystemSettings,
    pub model: OptimizationModel,
    pub diagnostics: CaseDiagnostics,
}

pub fn resolve_settings(
    case: &Path,
    settings_path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<SystemSettings> {
    let mut settings = match settings_path {
        Some(path) => SystemSettings::from_path(path)?,
        None => SystemSettings::from_case_dir(case)?,
    };
    if let Some(voll) = overrides.voll {
        settings.system.value_of_lost_load = voll;
    }
    if let Some(shedding) = overrides.shedding {
        settings.system.shedding_enabled = shedding;
    }
    if let Some(lp_solver) = &overrides.lp_solver {
        settings.solver.lp_solver = lp_solver.clone();
    }
    settings.check().context("checking settings")?;
    Ok(settings)
}

/// Read, coerce and assemble the case in `dir`
pub fn load_case(
    dir: &Path,
    settings_path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<LoadedCase> {
    let settings = resolve_settings(dir, settings_path, overrides)?;
    let mut import = read_case(dir)?;
    let model = assemble(&import.tables, &settings, &mut import.diagnostics)
        .with_context(|| format!("building model for {}", dir.display()))?;
    Ok(LoadedCase {
        settings,
        model,
        diagnostics: import.diagnostics,
    })
}
