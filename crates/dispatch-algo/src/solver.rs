//! Boundary between a built model and the optimizer that dispatches it.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::anyhow;
use dispatch_core::{BlockId, BranchId, BusId, LoadId, OptimizationModel};
use good_lp::ResolutionError;
use serde::Serialize;
use thiserror::Error;

/// Why a dispatch could not be produced.
///
/// A failed solve is always reported through this type and never as an
/// all-zero dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveFailure {
    /// No dispatch satisfies demand, limits and must-run output
    #[error("dispatch is infeasible")]
    Infeasible,

    /// Objective can decrease without bound (e.g. negative marginal costs)
    #[error("dispatch is unbounded")]
    Unbounded,

    /// Anything else the solver reported
    #[error("solver error: {0}")]
    SolverError(String),
}

impl From<ResolutionError> for SolveFailure {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolveFailure::Infeasible,
            ResolutionError::Unbounded => SolveFailure::Unbounded,
            other => SolveFailure::SolverError(other.to_string()),
        }
    }
}

/// Solved operating point for the model's snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dispatch {
    /// Backend that produced this dispatch
    pub backend: String,
    /// Linearized objective `Σ marginal_cost · p`
    pub objective: f64,
    pub block_mw: HashMap<BlockId, f64>,
    /// Flow measured from `from_bus` to `to_bus`
    pub branch_flow_mw: HashMap<BranchId, f64>,
    pub load_served_mw: HashMap<LoadId, f64>,
    pub bus_angle_rad: HashMap<BusId, f64>,
    pub solve_time_ms: u128,
}

impl Dispatch {
    pub fn block(&self, id: BlockId) -> f64 {
        self.block_mw.get(&id).copied().unwrap_or(0.0)
    }

    pub fn flow(&self, id: BranchId) -> f64 {
        self.branch_flow_mw.get(&id).copied().unwrap_or(0.0)
    }

    pub fn served(&self, id: LoadId) -> f64 {
        self.load_served_mw.get(&id).copied().unwrap_or(0.0)
    }
}

/// Turns an [`OptimizationModel`] into a [`Dispatch`].
pub trait DispatchSolver: Send + Sync {
    /// Unique identifier (e.g. "dc-opf/clarabel")
    fn id(&self) -> &str;

    /// Solve the single snapshot of `model`
    fn solve(&self, model: &OptimizationModel) -> Result<Dispatch, SolveFailure>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LpSolverKind {
    #[default]
    Clarabel,
    #[cfg(feature = "solver-highs")]
    Highs,
}

impl LpSolverKind {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_LP_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LpSolverKind::Clarabel => "clarabel",
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => "highs",
        }
    }
}

const AVAILABLE_LP_SOLVERS: &[&str] = &[
    "clarabel",
    #[cfg(feature = "solver-highs")]
    "highs",
];

fn unknown_solver_error(label: &str) -> anyhow::Error {
    anyhow!(
        "unknown lp solver '{}'; supported values: {}",
        label,
        LpSolverKind::available().join(", ")
    )
}

impl FromStr for LpSolverKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "clarabel" => Ok(LpSolverKind::Clarabel),
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(LpSolverKind::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            other => Err(unknown_solver_error(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_trait_is_object_safe() {
        fn _accepts_solver(_s: &dyn DispatchSolver) {}
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Box<dyn DispatchSolver>>();
    }

    #[test]
    fn test_resolution_errors_map_to_typed_failures() {
        assert_eq!(
            SolveFailure::from(ResolutionError::Infeasible),
            SolveFailure::Infeasible
        );
        assert_eq!(
            SolveFailure::from(ResolutionError::Unbounded),
            SolveFailure::Unbounded
        );
        assert!(matches!(
            SolveFailure::from(ResolutionError::Str("max iterations".into())),
            SolveFailure::SolverError(msg) if msg.contains("max iterations")
        ));
    }

    #[test]
    fn test_lp_solver_parsing() {
        assert_eq!(
            "Clarabel".parse::<LpSolverKind>().unwrap(),
            LpSolverKind::Clarabel
        );
        assert_eq!(LpSolverKind::default().as_str(), "clarabel");

        let err = "gurobi".parse::<LpSolverKind>().unwrap_err();
        assert!(err.to_string().contains("supported values: clarabel"));
    }

    #[test]
    fn test_dispatch_lookups_default_to_zero() {
        let mut dispatch = Dispatch::default();
        dispatch.block_mw.insert(BlockId::new(1), 42.0);

        assert_eq!(dispatch.block(BlockId::new(1)), 42.0);
        assert_eq!(dispatch.block(BlockId::new(2)), 0.0);
        assert_eq!(dispatch.flow(BranchId::new(1)), 0.0);
    }
}
