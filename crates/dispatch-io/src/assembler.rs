//! Turns coerced case tables into an [`OptimizationModel`].
//!
//! [`ModelAssembler`] owns the id counters and naming rules so the order
//! entities are added in fully determines the model: running the same case
//! twice yields identical ids and names.
//!
//! # Example
//! ```
//! use dispatch_core::SingleSegmentCost;
//! use dispatch_io::assembler::ModelAssembler;
//! use dispatch_io::tables::{BusSpec, GeneratorSpec, LoadSpec};
//! use dispatch_core::QuadraticCost;
//!
//! let mut asm = ModelAssembler::new();
//! asm.add_bus(&BusSpec { number: 1, v_nom: 220.0 });
//! asm.add_generator(
//!     &GeneratorSpec {
//!         row: 1,
//!         bus: 1,
//!         p_max: 100.0,
//!         p_min: 20.0,
//!         cost: QuadraticCost::new(0.01, 5.0, 0.0),
//!         segments: 2,
//!     },
//!     SingleSegmentCost::LinearTerm,
//! );
//! asm.add_load(&LoadSpec { row: 1, bus: 1, demand: 50.0, loss_factor: 0.0 });
//! let model = asm.finish().unwrap();
//! assert_eq!(model.blocks().len(), 2);
//! ```

use std::collections::{HashMap, HashSet};

use dispatch_core::{
    BlockId, Branch, BranchId, Bus, BusId, CaseDiagnostics, Carrier, CostPerMwh, GenerationBlock,
    GeneratorId, GeneratorRecord, Kilovolts, Load, LoadId, Megawatts, ModelDraft, ModelResult,
    OptimizationModel, SingleSegmentCost,
};

use crate::settings::SystemSettings;
use crate::tables::{BranchSpec, BusSpec, CaseTables, GeneratorSpec, LoadSpec, RenewableSpec};

/// Result of adding an element to the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    Added,
    /// Nothing was created (e.g. a generator with no usable rating)
    Skipped,
}

/// Builder for a [`ModelDraft`] with sequential ids.
pub struct ModelAssembler<'a> {
    draft: ModelDraft,
    diag: Option<&'a mut CaseDiagnostics>,
    next_block_id: usize,
    next_branch_id: usize,
    /// Highest thermal row offered so far; renewable ids start past it
    last_thermal_row: usize,
    /// Uses of each base branch name, for `#k` suffixes
    branch_names: HashMap<String, usize>,
    shedding_buses: HashSet<BusId>,
}

impl Default for ModelAssembler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ModelAssembler<'a> {
    pub fn new() -> Self {
        Self {
            draft: ModelDraft::default(),
            diag: None,
            next_block_id: 1,
            next_branch_id: 1,
            last_thermal_row: 0,
            branch_names: HashMap::new(),
            shedding_buses: HashSet::new(),
        }
    }

    /// Record naming collisions in `diag`
    pub fn with_diagnostics(diag: &'a mut CaseDiagnostics) -> Self {
        Self {
            diag: Some(diag),
            ..Self::new()
        }
    }

    fn next_block(&mut self) -> BlockId {
        let id = BlockId::new(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    pub fn add_bus(&mut self, spec: &BusSpec) {
        self.draft
            .buses
            .push(Bus::new(BusId::new(spec.number), Kilovolts(spec.v_nom)));
    }

    /// Add a line named `L<from><to>`, suffixed `#k` when the name repeats
    pub fn add_branch(&mut self, spec: &BranchSpec) {
        let base = format!("L{}{}", spec.from, spec.to);
        let uses = self.branch_names.entry(base.clone()).or_insert(0);
        *uses += 1;
        let name = if *uses == 1 {
            base
        } else {
            let name = format!("{base}#{uses}");
            if let Some(ref mut diag) = self.diag {
                diag.add_warning_with_entity(
                    "naming",
                    &format!("branch name {base} repeats, renamed"),
                    &name,
                );
            }
            name
        };

        let id = BranchId::new(self.next_branch_id);
        self.next_branch_id += 1;
        self.draft.branches.push(Branch::new(
            id,
            name,
            BusId::new(spec.from),
            BusId::new(spec.to),
            spec.reactance,
            Megawatts(spec.s_nom),
        ));
    }

    /// Linearize a thermal generator into blocks at its bus
    pub fn add_generator(&mut self, spec: &GeneratorSpec, single: SingleSegmentCost) -> AddResult {
        self.last_thermal_row = self.last_thermal_row.max(spec.row);
        let p_max = Megawatts(spec.p_max);
        let p_min = Megawatts(spec.p_min);
        let blocks = spec.cost.linearize(p_max, p_min, spec.segments, single);
        if blocks.is_empty() {
            return AddResult::Skipped;
        }

        let generator = GeneratorId::new(spec.row);
        let bus = BusId::new(spec.bus);
        for block in &blocks {
            let id = self.next_block();
            self.draft.blocks.push(GenerationBlock::dispatchable(
                id, generator, spec.row, bus, block,
            ));
        }
        self.draft.generators.push(GeneratorRecord {
            id: generator,
            name: format!("Generator_node_{}", spec.row),
            bus,
            p_max,
            p_min,
            cost: spec.cost,
            segments: blocks.len(),
            carrier: Carrier::Ac,
        });
        AddResult::Added
    }

    /// Renewable units share the generator id space, offset past every
    /// thermal row added before them (skipped ones included).
    pub fn add_renewable(&mut self, spec: &RenewableSpec) -> AddResult {
        if spec.p_max.is_nan() {
            return AddResult::Skipped;
        }
        let generator = GeneratorId::new(self.last_thermal_row + spec.row);
        let bus = BusId::new(spec.bus);
        let p_max = Megawatts(spec.p_max);

        let id = self.next_block();
        self.draft
            .blocks
            .push(GenerationBlock::renewable(id, generator, spec.row, bus, p_max));
        self.draft.generators.push(GeneratorRecord {
            id: generator,
            name: format!("Renewable_node_{}", spec.row),
            bus,
            p_max,
            p_min: Megawatts(0.0),
            cost: Default::default(),
            segments: 1,
            carrier: Carrier::Renewable,
        });
        AddResult::Added
    }

    pub fn add_load(&mut self, spec: &LoadSpec) {
        self.draft.loads.push(Load::new(
            LoadId::new(spec.row),
            BusId::new(spec.bus),
            Megawatts(spec.demand),
            spec.loss_factor,
        ));
    }

    /// Add a shedding unit at `bus` unless one is already there
    pub fn add_shedding(&mut self, bus: BusId, voll: CostPerMwh) -> AddResult {
        if !self.shedding_buses.insert(bus) {
            return AddResult::Skipped;
        }
        let id = self.next_block();
        self.draft
            .blocks
            .push(GenerationBlock::shedding(id, bus, voll));
        AddResult::Added
    }

    /// Validate and freeze the draft
    pub fn finish(self) -> ModelResult<OptimizationModel> {
        self.draft.build()
    }
}

/// Assemble a whole case.
///
/// Creation order: buses, thermal generators, renewables, loads (each
/// followed by its bus's shedding unit when enabled), branches.
pub fn assemble(
    tables: &CaseTables,
    settings: &SystemSettings,
    diag: &mut CaseDiagnostics,
) -> ModelResult<OptimizationModel> {
    let single = settings.linearization.single_segment;
    let shedding = settings.system.shedding_enabled;
    let voll = settings.voll();

    let mut asm = ModelAssembler::with_diagnostics(diag);

    for bus in &tables.buses {
        asm.add_bus(bus);
    }
    for generator in &tables.generators {
        if asm.add_generator(generator, single) == AddResult::Skipped {
            tracing::debug!(row = generator.row, "generator produced no blocks");
        }
    }
    for renewable in &tables.renewables {
        asm.add_renewable(renewable);
    }
    for load in &tables.loads {
        asm.add_load(load);
        if shedding {
            asm.add_shedding(BusId::new(load.bus), voll);
        }
    }
    for branch in &tables.branches {
        asm.add_branch(branch);
    }

    let model = asm.finish()?;
    tracing::info!("assembled model: {}", model.stats());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{BlockKind, ModelError, QuadraticCost};

    fn tables() -> CaseTables {
        CaseTables {
            buses: vec![
                BusSpec {
                    number: 1,
                    v_nom: 220.0,
                },
                BusSpec {
                    number: 2,
                    v_nom: 220.0,
                },
            ],
            branches: vec![BranchSpec {
                from: 1,
                to: 2,
                reactance: 0.1,
                s_nom: 100.0,
            }],
            loads: vec![
                LoadSpec {
                    row: 2,
                    bus: 2,
                    demand: 80.0,
                    loss_factor: 0.05,
                },
                LoadSpec {
                    row: 3,
                    bus: 2,
                    demand: 10.0,
                    loss_factor: 0.0,
                },
            ],
            generators: vec![GeneratorSpec {
                row: 1,
                bus: 1,
                p_max: 100.0,
                p_min: 20.0,
                cost: QuadraticCost::new(0.01, 5.0, 0.0),
                segments: 2,
            }],
            renewables: vec![RenewableSpec {
                row: 1,
                bus: 2,
                p_max: 30.0,
            }],
        }
    }

    fn shedding_settings() -> SystemSettings {
        let mut settings = SystemSettings::default();
        settings.system.shedding_enabled = true;
        settings.system.value_of_lost_load = 3000.0;
        settings
    }

    #[test]
    fn assembles_named_entities_in_order() {
        let mut diag = CaseDiagnostics::new();
        let model = assemble(&tables(), &SystemSettings::default(), &mut diag).unwrap();

        let names: Vec<&str> = model.blocks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Generator_node_1_seg1",
                "Generator_node_1_seg2",
                "Renewable_node_1"
            ]
        );
        let ids: Vec<usize> = model.blocks().iter().map(|b| b.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(model.branches()[0].name, "L12");
        assert_eq!(model.loads()[0].name, "Load_node_2");
        assert!((model.loads()[0].p_set.value() - 84.0).abs() < 1e-9);
    }

    #[test]
    fn renewable_block_is_free_and_flexible() {
        let mut diag = CaseDiagnostics::new();
        let model = assemble(&tables(), &SystemSettings::default(), &mut diag).unwrap();
        let renewable = &model.blocks()[2];

        assert_eq!(renewable.carrier, Carrier::Renewable);
        assert_eq!(renewable.marginal_cost, CostPerMwh(0.0));
        assert_eq!(renewable.p_min_pu.value(), 0.0);
        assert!(matches!(
            renewable.kind,
            BlockKind::Renewable { generator } if generator.value() == 2
        ));
    }

    #[test]
    fn one_shedding_unit_per_load_bus() {
        let mut diag = CaseDiagnostics::new();
        let model = assemble(&tables(), &shedding_settings(), &mut diag).unwrap();

        let shedding: Vec<_> = model.blocks().iter().filter(|b| b.is_shedding()).collect();
        assert_eq!(shedding.len(), 1);
        assert_eq!(shedding[0].name, "shedding_gen_node_2");
        assert_eq!(shedding[0].marginal_cost, CostPerMwh(3000.0));
        assert_eq!(shedding[0].p_nom.value(), 1e6);
    }

    #[test]
    fn no_shedding_when_disabled() {
        let mut diag = CaseDiagnostics::new();
        let model = assemble(&tables(), &SystemSettings::default(), &mut diag).unwrap();
        assert!(model.blocks().iter().all(|b| !b.is_shedding()));
    }

    #[test]
    fn repeated_branch_names_get_suffix() {
        let mut case = tables();
        case.branches.push(case.branches[0].clone());
        let mut diag = CaseDiagnostics::new();
        let model = assemble(&case, &SystemSettings::default(), &mut diag).unwrap();

        let names: Vec<&str> = model.branches().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["L12", "L12#2"]);
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn generator_on_unknown_bus_fails_build() {
        let mut case = tables();
        case.generators[0].bus = 7;
        let mut diag = CaseDiagnostics::new();

        let err = assemble(&case, &SystemSettings::default(), &mut diag).unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownBusReference {
                entity: "Generator_node_1".to_string(),
                bus: 7,
            }
        );
    }

    #[test]
    fn renewable_ids_start_past_the_last_thermal_row() {
        let mut case = tables();
        let mut second = case.generators[0].clone();
        second.row = 4;
        // A unit with no rating is skipped but still reserves its row
        second.p_max = f64::NAN;
        case.generators.push(second);
        let mut diag = CaseDiagnostics::new();
        let model = assemble(&case, &SystemSettings::default(), &mut diag).unwrap();

        let renewable = model
            .generators()
            .iter()
            .find(|g| g.carrier == Carrier::Renewable)
            .unwrap();
        assert_eq!(renewable.name, "Renewable_node_1");
        assert_eq!(renewable.id, GeneratorId::new(5));
    }

    #[test]
    fn renewables_without_thermal_units_use_their_row() {
        let mut asm = ModelAssembler::new();
        let spec = RenewableSpec {
            row: 2,
            bus: 1,
            p_max: 10.0,
        };
        assert_eq!(asm.add_renewable(&spec), AddResult::Added);
        assert_eq!(asm.draft.generators[0].id, GeneratorId::new(2));
    }

    #[test]
    fn assembly_is_deterministic() {
        let settings = shedding_settings();
        let mut first = CaseDiagnostics::new();
        let mut second = CaseDiagnostics::new();
        let a = assemble(&tables(), &settings, &mut first).unwrap();
        let b = assemble(&tables(), &settings, &mut second).unwrap();

        assert_eq!(a.blocks(), b.blocks());
        assert_eq!(a.branches(), b.branches());
        assert_eq!(a.loads(), b.loads());
    }
}
