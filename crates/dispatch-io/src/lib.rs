//! # dispatch-io: Case Input & Result Output
//!
//! Reads a case directory of CSV sheets, applies the lenient coercion rules,
//! assembles an [`OptimizationModel`] and writes result sheets.
//!
//! ## Design Philosophy
//!
//! **Lenient reading, strict building**: malformed cells are coerced and
//! recorded in [`CaseDiagnostics`]; only structural problems (a load on a
//! bus that does not exist) stop the pipeline, as a typed
//! [`dispatch_core::ModelError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dispatch_io::{assemble, read_case, SystemSettings};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let dir = Path::new("demos/three_bus");
//!     let mut case = read_case(dir)?;
//!     let settings = SystemSettings::from_case_dir(dir)?;
//!     let model = assemble(&case.tables, &settings, &mut case.diagnostics)?;
//!
//!     println!("{}", model.stats());
//!     Ok(())
//! }
//! ```
//!
//! ## Case Directory
//!
//! | File | Required | Columns |
//! |------|----------|---------|
//! | `buses.csv` | yes | `Bus rated voltage (kV)` |
//! | `branches.csv` | yes | `From`, `To`, `Reactance (p.u)`, `Thermal limit (MW)` |
//! | `loads.csv` | yes | `Active power demand (MW)`, `Loss factor (%)`, `Bus`? |
//! | `generators.csv` | yes | `Rated active power (MW)`, `Pmin (MW)`, `a (€/MW²h)`, `b (€/MWh)`, `c (€)`, `pwl segments`, `Bus`? |
//! | `renewables.csv` | no | `Rated active power (MW)`, `Bus`? |
//! | `settings.toml` | no | see [`settings`] |
//!
//! ## Modules
//!
//! - [`tables`] - row types and coercion
//! - [`reader`] - CSV sheet reading
//! - [`settings`] - `settings.toml`
//! - [`assembler`] - model construction
//! - [`export`] - result sheets

pub mod assembler;
pub mod export;
pub mod reader;
pub mod settings;
pub mod tables;

pub use assembler::{assemble, AddResult, ModelAssembler};
pub use dispatch_core::{CaseDiagnostics, OptimizationModel};
pub use export::SolutionExport;
pub use reader::{read_case, CaseImport};
pub use settings::SystemSettings;
pub use tables::CaseTables;
