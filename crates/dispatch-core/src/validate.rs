//! Checks run by [`ModelDraft::build`](crate::ModelDraft::build).
//!
//! These are hard failures: a draft that fails any of them cannot be turned
//! into an [`OptimizationModel`](crate::OptimizationModel). Softer findings
//! belong in [`OptimizationModel::validate_into`](crate::OptimizationModel::validate_into).

use std::collections::HashSet;
use std::hash::Hash;

use crate::{BusId, ModelDraft, ModelError, ModelResult};

/// Run every check in order: ids, bus references, branch parameters.
pub fn check_draft(draft: &ModelDraft) -> ModelResult<()> {
    check_unique_ids(draft)?;
    check_references(draft)?;
    check_branch_parameters(draft)?;
    Ok(())
}

fn ensure_unique<I, T>(kind: &'static str, ids: I) -> ModelResult<()>
where
    I: IntoIterator<Item = (T, usize)>,
    T: Eq + Hash,
{
    let mut seen = HashSet::new();
    for (id, raw) in ids {
        if !seen.insert(id) {
            return Err(ModelError::DuplicateId { kind, id: raw });
        }
    }
    Ok(())
}

pub fn check_unique_ids(draft: &ModelDraft) -> ModelResult<()> {
    ensure_unique("bus", draft.buses.iter().map(|b| (b.id, b.id.value())))?;
    ensure_unique(
        "branch",
        draft.branches.iter().map(|b| (b.id, b.id.value())),
    )?;
    ensure_unique(
        "generator",
        draft.generators.iter().map(|g| (g.id, g.id.value())),
    )?;
    ensure_unique("block", draft.blocks.iter().map(|b| (b.id, b.id.value())))?;
    ensure_unique("load", draft.loads.iter().map(|l| (l.id, l.id.value())))?;
    Ok(())
}

/// Every branch end, block, load and generator must sit on a known bus.
pub fn check_references(draft: &ModelDraft) -> ModelResult<()> {
    let known: HashSet<BusId> = draft.buses.iter().map(|b| b.id).collect();
    let check = |entity: &str, bus: BusId| {
        if known.contains(&bus) {
            Ok(())
        } else {
            Err(ModelError::UnknownBusReference {
                entity: entity.to_string(),
                bus: bus.value(),
            })
        }
    };

    for branch in &draft.branches {
        check(&branch.name, branch.from_bus)?;
        check(&branch.name, branch.to_bus)?;
    }
    for generator in &draft.generators {
        check(&generator.name, generator.bus)?;
    }
    for block in &draft.blocks {
        check(&block.name, block.bus)?;
    }
    for load in &draft.loads {
        check(&load.name, load.bus)?;
    }
    Ok(())
}

/// Branch flow is `Δθ / x`, so reactance must be finite and non-zero.
pub fn check_branch_parameters(draft: &ModelDraft) -> ModelResult<()> {
    for branch in &draft.branches {
        if !branch.reactance.is_finite() || branch.reactance == 0.0 {
            return Err(ModelError::Validation(format!(
                "{} has invalid reactance {}",
                branch.name, branch.reactance
            )));
        }
        if branch.s_nom.is_nan() {
            return Err(ModelError::Validation(format!(
                "{} has no thermal limit",
                branch.name
            )));
        }
    }
    Ok(())
}
