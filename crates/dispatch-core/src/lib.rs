//! # dispatch-core: Economic Dispatch Model
//!
//! Data structures for a single-snapshot economic dispatch problem: buses,
//! transmission branches, loads and the linear generation blocks a solver
//! dispatches.
//!
//! ## Design Philosophy
//!
//! A case is assembled into a mutable [`ModelDraft`] and then frozen into an
//! [`OptimizationModel`] by [`ModelDraft::build`]. Building runs the
//! validation pass in [`validate`], so an `OptimizationModel` always has:
//! - unique identifiers per entity kind
//! - every bus reference pointing at an existing bus
//! - finite, non-zero branch reactances
//!
//! Entities live in plain vectors (arenas) in creation order and refer to
//! each other by newtype id, never by pointer.
//!
//! ## Quick Start
//!
//! ```
//! use dispatch_core::*;
//!
//! let mut draft = ModelDraft::default();
//! draft.buses.push(Bus::new(BusId::new(1), Kilovolts(220.0)));
//! draft.buses.push(Bus::new(BusId::new(2), Kilovolts(220.0)));
//! draft.branches.push(Branch::new(
//!     BranchId::new(1),
//!     "L12".to_string(),
//!     BusId::new(1),
//!     BusId::new(2),
//!     0.1,
//!     Megawatts(100.0),
//! ));
//! draft.loads.push(Load::new(LoadId::new(1), BusId::new(2), Megawatts(80.0), 0.05));
//!
//! let model = draft.build().unwrap();
//! assert_eq!(model.stats().buses, 2);
//! assert!((model.total_demand().value() - 84.0).abs() < 1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`cost`] - quadratic cost curves and piecewise linearization
//! - [`validate`] - reference and parameter checks run by `build`
//! - [`graph_utils`] - island detection over the branch graph
//! - [`diagnostics`] - non-fatal issue reporting
//! - [`units`] - MW, per-unit, kV and price newtypes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod cost;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod units;
pub mod validate;

pub use cost::{CostBlock, QuadraticCost, SingleSegmentCost};
pub use diagnostics::{CaseDiagnostics, CaseStats, DiagnosticIssue, Diagnostics, Severity};
pub use error::{ModelError, ModelResult};
pub use graph_utils::Island;
pub use units::{CostPerMwh, Kilovolts, Megawatts, PerUnit};

/// Resistance given to every line; only reactance enters the DC model.
pub const LINE_RESISTANCE_PU: f64 = 1e-6;

/// Capacity of a load-shedding unit (MW)
pub const SHEDDING_CAPACITY_MW: f64 = 1e6;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn new(value: usize) -> Self {
                $name(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// 1-based bus number, stable across runs of the same case
    BusId
);
define_id!(BranchId);
define_id!(BlockId);
define_id!(LoadId);
define_id!(
    /// Source generator row a block was cut from
    GeneratorId
);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub v_nom: Kilovolts,
}

impl Bus {
    pub fn new(id: BusId, v_nom: Kilovolts) -> Self {
        Self {
            id,
            name: format!("Bus_node_{}", id.value()),
            v_nom,
        }
    }
}

/// Transmission line between two buses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series reactance (p.u.)
    pub reactance: f64,
    /// Series resistance (p.u.), fixed at [`LINE_RESISTANCE_PU`]
    pub resistance: f64,
    /// Thermal limit (MW)
    pub s_nom: Megawatts,
}

impl Branch {
    pub fn new(
        id: BranchId,
        name: String,
        from_bus: BusId,
        to_bus: BusId,
        reactance: f64,
        s_nom: Megawatts,
    ) -> Self {
        Self {
            id,
            name,
            from_bus,
            to_bus,
            reactance,
            resistance: LINE_RESISTANCE_PU,
            s_nom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Ac,
    Renewable,
}

impl Carrier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::Ac => "AC",
            Carrier::Renewable => "renewable",
        }
    }
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a generation block stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// One linear segment of a thermal unit's cost curve
    Dispatchable {
        generator: GeneratorId,
        segment: usize,
    },
    /// Whole output of a zero-cost renewable unit
    Renewable { generator: GeneratorId },
    /// Fictitious unit priced at the value of lost load
    Shedding,
}

/// Linear capacity block the solver dispatches between `p_min()` and `p_nom`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationBlock {
    pub id: BlockId,
    pub name: String,
    pub bus: BusId,
    pub p_nom: Megawatts,
    pub p_min_pu: PerUnit,
    pub marginal_cost: CostPerMwh,
    pub carrier: Carrier,
    pub kind: BlockKind,
}

impl GenerationBlock {
    /// Block cut from generator row `row` (1-based)
    pub fn dispatchable(
        id: BlockId,
        generator: GeneratorId,
        row: usize,
        bus: BusId,
        block: &CostBlock,
    ) -> Self {
        Self {
            id,
            name: format!("Generator_node_{}_seg{}", row, block.segment),
            bus,
            p_nom: block.p_nom,
            p_min_pu: block.p_min_pu,
            marginal_cost: block.marginal_cost,
            carrier: Carrier::Ac,
            kind: BlockKind::Dispatchable {
                generator,
                segment: block.segment,
            },
        }
    }

    pub fn renewable(
        id: BlockId,
        generator: GeneratorId,
        row: usize,
        bus: BusId,
        p_nom: Megawatts,
    ) -> Self {
        Self {
            id,
            name: format!("Renewable_node_{}", row),
            bus,
            p_nom,
            p_min_pu: PerUnit::ZERO,
            marginal_cost: CostPerMwh(0.0),
            carrier: Carrier::Renewable,
            kind: BlockKind::Renewable { generator },
        }
    }

    pub fn shedding(id: BlockId, bus: BusId, voll: CostPerMwh) -> Self {
        Self {
            id,
            name: format!("shedding_gen_node_{}", bus.value()),
            bus,
            p_nom: Megawatts(SHEDDING_CAPACITY_MW),
            p_min_pu: PerUnit::ZERO,
            marginal_cost: voll,
            carrier: Carrier::Ac,
            kind: BlockKind::Shedding,
        }
    }

    /// Must-run output (MW)
    pub fn p_min(&self) -> Megawatts {
        self.p_nom * self.p_min_pu.value()
    }

    pub fn is_shedding(&self) -> bool {
        matches!(self.kind, BlockKind::Shedding)
    }
}

/// Demand at a bus, grossed up by its loss factor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    /// Demand as entered (MW)
    pub nominal: Megawatts,
    /// Fractional losses, e.g. 0.05 for 5%
    pub loss_factor: f64,
    /// Demand the network must serve: `nominal * (1 + loss_factor)`
    pub p_set: Megawatts,
}

impl Load {
    pub fn new(id: LoadId, bus: BusId, nominal: Megawatts, loss_factor: f64) -> Self {
        Self {
            id,
            name: format!("Load_node_{}", id.value()),
            bus,
            nominal,
            loss_factor,
            p_set: nominal * (1.0 + loss_factor),
        }
    }
}

/// Source record of a generator, kept so the true curve cost can be reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorRecord {
    pub id: GeneratorId,
    pub name: String,
    pub bus: BusId,
    pub p_max: Megawatts,
    pub p_min: Megawatts,
    pub cost: QuadraticCost,
    pub segments: usize,
    pub carrier: Carrier,
}

/// The single time instant the model is solved for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub label: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            label: "now".to_string(),
        }
    }
}

/// Mutable collection of entities, filled by the assemblers
#[derive(Debug, Clone, Default)]
pub struct ModelDraft {
    pub buses: Vec<Bus>,
    pub branches: Vec<Branch>,
    pub generators: Vec<GeneratorRecord>,
    pub blocks: Vec<GenerationBlock>,
    pub loads: Vec<Load>,
}

impl ModelDraft {
    /// Validate the draft and freeze it.
    pub fn build(self) -> ModelResult<OptimizationModel> {
        validate::check_draft(&self)?;

        let bus_index = self
            .buses
            .iter()
            .enumerate()
            .map(|(idx, bus)| (bus.id, idx))
            .collect();

        Ok(OptimizationModel {
            buses: self.buses,
            branches: self.branches,
            generators: self.generators,
            blocks: self.blocks,
            loads: self.loads,
            snapshot: Snapshot::default(),
            bus_index,
        })
    }
}

/// Validated, immutable dispatch model for one snapshot
#[derive(Debug, Clone)]
pub struct OptimizationModel {
    buses: Vec<Bus>,
    branches: Vec<Branch>,
    generators: Vec<GeneratorRecord>,
    blocks: Vec<GenerationBlock>,
    loads: Vec<Load>,
    snapshot: Snapshot,
    bus_index: HashMap<BusId, usize>,
}

impl OptimizationModel {
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn generators(&self) -> &[GeneratorRecord] {
        &self.generators
    }

    pub fn blocks(&self) -> &[GenerationBlock] {
        &self.blocks
    }

    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Position of a bus in [`Self::buses`]
    pub fn bus_index(&self, id: BusId) -> Option<usize> {
        self.bus_index.get(&id).copied()
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.bus_index(id).map(|idx| &self.buses[idx])
    }

    pub fn blocks_of(&self, generator: GeneratorId) -> impl Iterator<Item = &GenerationBlock> {
        self.blocks.iter().filter(move |b| match b.kind {
            BlockKind::Dispatchable { generator: g, .. } | BlockKind::Renewable { generator: g } => {
                g == generator
            }
            BlockKind::Shedding => false,
        })
    }

    /// Sum of served demand over all loads
    pub fn total_demand(&self) -> Megawatts {
        self.loads.iter().map(|l| l.p_set).sum()
    }

    /// Installed capacity excluding shedding units
    pub fn total_capacity(&self) -> Megawatts {
        self.blocks
            .iter()
            .filter(|b| !b.is_shedding())
            .map(|b| b.p_nom)
            .sum()
    }

    /// Connected components of the branch graph, see [`graph_utils::find_islands`]
    pub fn islands(&self) -> Vec<Island> {
        graph_utils::find_islands(self)
    }

    pub fn stats(&self) -> ModelStats {
        let mut stats = ModelStats {
            buses: self.buses.len(),
            branches: self.branches.len(),
            generators: self.generators.len(),
            loads: self.loads.len(),
            total_demand_mw: self.total_demand().value(),
            islands: self.islands().len(),
            ..ModelStats::default()
        };

        for block in &self.blocks {
            match block.kind {
                BlockKind::Dispatchable { .. } => stats.dispatchable_blocks += 1,
                BlockKind::Renewable { .. } => stats.renewable_blocks += 1,
                BlockKind::Shedding => {
                    stats.shedding_units += 1;
                    continue;
                }
            }
            stats.total_capacity_mw += block.p_nom.value();
            stats.total_must_run_mw += block.p_min().value();
        }

        stats
    }

    /// Check the model for conditions that usually make the dispatch fail.
    ///
    /// Populates `diag`; never fails. A model with errors here can still be
    /// handed to a solver, which will report the failure precisely.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.buses == 0 {
            diag.add_error("structure", "Model has no buses");
            return;
        }

        if stats.loads == 0 {
            diag.add_warning("structure", "Model has no loads");
        }

        if stats.dispatchable_blocks + stats.renewable_blocks == 0 {
            diag.add_error("structure", "Model has no generation besides shedding");
        }

        if stats.total_capacity_mw < stats.total_demand_mw {
            let message = if stats.shedding_units > 0 {
                format!(
                    "Generation capacity ({:.1} MW) is below demand ({:.1} MW); shedding will be dispatched",
                    stats.total_capacity_mw, stats.total_demand_mw
                )
            } else {
                format!(
                    "Generation capacity ({:.1} MW) is below demand ({:.1} MW) and shedding is disabled",
                    stats.total_capacity_mw, stats.total_demand_mw
                )
            };
            diag.add_warning("capacity", &message);
        }

        if stats.total_must_run_mw > stats.total_demand_mw + 1e-9 {
            diag.add_warning(
                "capacity",
                &format!(
                    "Must-run output ({:.1} MW) exceeds demand ({:.1} MW)",
                    stats.total_must_run_mw, stats.total_demand_mw
                ),
            );
        }

        if stats.branches == 0 && stats.buses > 1 {
            diag.add_error("structure", "Model has multiple buses but no branches");
        } else if stats.islands > 1 {
            diag.add_warning(
                "structure",
                &format!("Branch graph splits into {} islands", stats.islands),
            );
        }

        for branch in &self.branches {
            if branch.from_bus == branch.to_bus {
                diag.add_warning_with_entity(
                    "structure",
                    "Branch connects a bus to itself",
                    &branch.name,
                );
            }
            if branch.s_nom.value() <= 0.0 {
                diag.add_warning_with_entity(
                    "capacity",
                    "Branch thermal limit is not positive; no flow possible",
                    &branch.name,
                );
            }
        }
    }
}

/// Size and capacity summary of a model
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelStats {
    pub buses: usize,
    pub branches: usize,
    pub generators: usize,
    pub dispatchable_blocks: usize,
    pub renewable_blocks: usize,
    pub shedding_units: usize,
    pub loads: usize,
    pub islands: usize,
    pub total_demand_mw: f64,
    /// Excludes shedding units
    pub total_capacity_mw: f64,
    pub total_must_run_mw: f64,
}

impl std::fmt::Display for ModelStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} branches, {} blocks ({:.0} MW), {} loads ({:.0} MW)",
            self.buses,
            self.branches,
            self.dispatchable_blocks + self.renewable_blocks,
            self.total_capacity_mw,
            self.loads,
            self.total_demand_mw
        )
    }
}
