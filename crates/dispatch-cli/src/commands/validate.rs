use std::path::Path;

use anyhow::{bail, Result};
use dispatch_core::Diagnostics;

use super::case::{load_case, SettingsOverrides};

/// Load and assemble a case, then report every data and structure issue.
///
/// Fails on structural errors, and on any warning when `strict`.
pub fn handle(case: &Path, settings: Option<&Path>, strict: bool) -> Result<()> {
    let loaded = load_case(case, settings, &SettingsOverrides::default())?;

    let mut structural = Diagnostics::new();
    loaded.model.validate_into(&mut structural);

    for issue in loaded.diagnostics.issues.iter().chain(&structural.issues) {
        println!("{issue}");
    }
    println!("Input: {}", loaded.diagnostics.summary());
    println!("Model: {}", structural.summary());

    let warnings = loaded.diagnostics.warning_count() + structural.warning_count();
    if structural.has_errors() {
        bail!("{} failed validation: {}", case.display(), structural.summary());
    }
    if strict && warnings > 0 {
        bail!("{} has {} warning(s) in strict mode", case.display(), warnings);
    }
    println!("Case {} is valid", case.display());
    Ok(())
}
