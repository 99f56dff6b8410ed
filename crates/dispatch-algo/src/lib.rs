//! # dispatch-algo: Dispatch Solvers
//!
//! Solves an [`OptimizationModel`](dispatch_core::OptimizationModel) for its
//! single snapshot and reports the result.
//!
//! ## Architecture
//!
//! - **[`DispatchSolver`]**: boundary trait between a built model and an
//!   optimizer. Returns a [`Dispatch`] or a typed [`SolveFailure`]; a failed
//!   solve never comes back as an all-zero dispatch.
//! - **[`DcDispatch`]**: DC optimal power flow as a linear program on
//!   `good_lp`, solved with Clarabel (HiGHS with the `solver-highs` feature).
//! - **[`DispatchReport`]**: implements `dispatch_io::SolutionExport` for a
//!   model + dispatch pair.
//!
//! ## Example
//!
//! ```no_run
//! use dispatch_algo::{DcDispatch, DispatchReport, DispatchSolver};
//! use dispatch_io::{assemble, read_case, SolutionExport, SystemSettings};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let dir = Path::new("demos/three_bus");
//!     let mut case = read_case(dir)?;
//!     let settings = SystemSettings::from_case_dir(dir)?;
//!     let model = assemble(&case.tables, &settings, &mut case.diagnostics)?;
//!
//!     let dispatch = DcDispatch::default().solve(&model)?;
//!     DispatchReport::new(&model, &dispatch).to_csv_dir(Path::new("out"))?;
//!     Ok(())
//! }
//! ```

pub mod export;
pub mod lp;
pub mod solver;

pub use export::{
    generation_by_bus, generator_output, DispatchReport, DispatchSummary, GeneratorOutput,
};
pub use lp::DcDispatch;
pub use solver::{Dispatch, DispatchSolver, LpSolverKind, SolveFailure};
