//! Implementation of `SolutionExport` for solved dispatches.
//!
//! The trait and the sheet writers live in dispatch-io; this module maps a
//! [`Dispatch`] back onto the entities of its model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dispatch_core::{BusId, Carrier, Megawatts, OptimizationModel};
use dispatch_io::export::{
    write_json, write_sheet, COST_SHEET, DISPATCH_SHEET, LINE_FLOWS_SHEET, LOADS_SHEET,
    SUMMARY_FILE,
};
use dispatch_io::SolutionExport;
use serde::Serialize;

use crate::solver::Dispatch;

/// Loading (|flow| / s_nom) above which a branch counts as binding
const BINDING_LOADING: f64 = 1.0 - 1e-6;

/// A dispatch together with the model it was solved for
#[derive(Debug, Clone, Copy)]
pub struct DispatchReport<'a> {
    pub model: &'a OptimizationModel,
    pub dispatch: &'a Dispatch,
}

#[derive(Debug, Serialize)]
struct DispatchRow<'a> {
    snapshot: &'a str,
    name: &'a str,
    bus: usize,
    carrier: &'a str,
    p_nom: f64,
    p_min_pu: f64,
    marginal_cost: f64,
    p: f64,
}

#[derive(Debug, Serialize)]
struct LineFlowRow<'a> {
    snapshot: &'a str,
    name: &'a str,
    bus0: usize,
    bus1: usize,
    s_nom: f64,
    p0: f64,
    loading: f64,
}

#[derive(Debug, Serialize)]
struct LoadRow<'a> {
    snapshot: &'a str,
    name: &'a str,
    bus: usize,
    p_set: f64,
    served: f64,
}

#[derive(Debug, Serialize)]
struct CostRow<'a> {
    snapshot: &'a str,
    #[serde(rename = "Total_Cost")]
    total_cost: f64,
    #[serde(rename = "Curve_Cost")]
    curve_cost: f64,
}

/// Contents of `summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub backend: String,
    pub snapshot: String,
    /// Linearized objective `Σ marginal_cost · p`
    pub objective: f64,
    /// Quadratic curves evaluated at the dispatched output, plus shedding at VOLL
    pub curve_cost: f64,
    pub total_demand_mw: f64,
    pub total_generation_mw: f64,
    pub shed_mw: f64,
    pub binding_branches: Vec<String>,
    /// Output per generator, summed over its blocks
    pub generators: Vec<GeneratorOutput>,
    /// Output per bus number, excluding shedding
    pub generation_by_bus_mw: BTreeMap<usize, f64>,
    pub solve_time_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorOutput {
    pub name: String,
    pub bus: usize,
    pub p: f64,
}

impl<'a> DispatchReport<'a> {
    pub fn new(model: &'a OptimizationModel, dispatch: &'a Dispatch) -> Self {
        Self { model, dispatch }
    }

    /// Output served by shedding units (MW)
    pub fn shed_mw(&self) -> f64 {
        self.model
            .blocks()
            .iter()
            .filter(|b| b.is_shedding())
            .map(|b| self.dispatch.block(b.id))
            .sum()
    }

    /// Cost of the dispatch on the unlinearized curves.
    ///
    /// Every thermal generator pays its fixed term `c`, dispatched or not.
    pub fn curve_cost(&self) -> f64 {
        let mut total = 0.0;
        for generator in self.model.generators() {
            if generator.carrier != Carrier::Ac {
                continue;
            }
            let output: f64 = self
                .model
                .blocks_of(generator.id)
                .map(|b| self.dispatch.block(b.id))
                .sum();
            total += generator.cost.evaluate(Megawatts(output));
        }
        for block in self.model.blocks().iter().filter(|b| b.is_shedding()) {
            total += block.marginal_cost.value() * self.dispatch.block(block.id);
        }
        total
    }

    /// Branches loaded at their thermal limit
    pub fn binding_branches(&self) -> Vec<String> {
        self.model
            .branches()
            .iter()
            .filter(|br| {
                let s_nom = br.s_nom.value();
                s_nom > 0.0 && self.dispatch.flow(br.id).abs() / s_nom >= BINDING_LOADING
            })
            .map(|br| br.name.clone())
            .collect()
    }

    pub fn summary(&self) -> DispatchSummary {
        let total_generation_mw = self
            .model
            .blocks()
            .iter()
            .filter(|b| !b.is_shedding())
            .map(|b| self.dispatch.block(b.id))
            .sum();

        DispatchSummary {
            backend: self.dispatch.backend.clone(),
            snapshot: self.model.snapshot().label.clone(),
            objective: self.dispatch.objective,
            curve_cost: self.curve_cost(),
            total_demand_mw: self.model.total_demand().value(),
            total_generation_mw,
            shed_mw: self.shed_mw(),
            binding_branches: self.binding_branches(),
            generators: generator_output(self.model, self.dispatch),
            generation_by_bus_mw: generation_by_bus(self.model, self.dispatch)
                .into_iter()
                .map(|(bus, p)| (bus.value(), p))
                .collect(),
            solve_time_ms: self.dispatch.solve_time_ms,
        }
    }

    fn dispatch_rows(&self) -> impl Iterator<Item = DispatchRow<'a>> + 'a {
        let (model, dispatch) = (self.model, self.dispatch);
        let snapshot = model.snapshot().label.as_str();
        model.blocks().iter().map(move |b| DispatchRow {
            snapshot,
            name: &b.name,
            bus: b.bus.value(),
            carrier: b.carrier.as_str(),
            p_nom: b.p_nom.value(),
            p_min_pu: b.p_min_pu.value(),
            marginal_cost: b.marginal_cost.value(),
            p: dispatch.block(b.id),
        })
    }

    fn line_flow_rows(&self) -> impl Iterator<Item = LineFlowRow<'a>> + 'a {
        let (model, dispatch) = (self.model, self.dispatch);
        let snapshot = model.snapshot().label.as_str();
        model.branches().iter().map(move |br| {
            let p0 = dispatch.flow(br.id);
            let s_nom = br.s_nom.value();
            LineFlowRow {
                snapshot,
                name: &br.name,
                bus0: br.from_bus.value(),
                bus1: br.to_bus.value(),
                s_nom,
                p0,
                loading: if s_nom > 0.0 { p0.abs() / s_nom } else { 0.0 },
            }
        })
    }

    fn load_rows(&self) -> impl Iterator<Item = LoadRow<'a>> + 'a {
        let (model, dispatch) = (self.model, self.dispatch);
        let snapshot = model.snapshot().label.as_str();
        model.loads().iter().map(move |l| LoadRow {
            snapshot,
            name: &l.name,
            bus: l.bus.value(),
            p_set: l.p_set.value(),
            served: dispatch.served(l.id),
        })
    }
}

impl SolutionExport for DispatchReport<'_> {
    fn to_csv_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;

        let dispatch_path = dir.join(DISPATCH_SHEET);
        write_sheet(&dispatch_path, self.dispatch_rows())?;

        let flows_path = dir.join(LINE_FLOWS_SHEET);
        write_sheet(&flows_path, self.line_flow_rows())?;

        let loads_path = dir.join(LOADS_SHEET);
        write_sheet(&loads_path, self.load_rows())?;

        let cost_path = dir.join(COST_SHEET);
        let total_cost: f64 = self
            .model
            .blocks()
            .iter()
            .map(|b| b.marginal_cost.value() * self.dispatch.block(b.id))
            .sum();
        write_sheet(
            &cost_path,
            [CostRow {
                snapshot: &self.model.snapshot().label,
                total_cost,
                curve_cost: self.curve_cost(),
            }],
        )?;

        let summary_path = dir.join(SUMMARY_FILE);
        self.to_json(&summary_path)?;

        tracing::debug!(dir = %dir.display(), "wrote result sheets");
        Ok(vec![
            dispatch_path,
            flows_path,
            loads_path,
            cost_path,
            summary_path,
        ])
    }

    fn to_json(&self, path: &Path) -> Result<()> {
        write_json(path, &self.summary())
    }

    fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self.summary()).context("converting dispatch summary to JSON value")
    }
}

/// Dispatched output of each generator, summed over its blocks
pub fn generator_output(model: &OptimizationModel, dispatch: &Dispatch) -> Vec<GeneratorOutput> {
    model
        .generators()
        .iter()
        .map(|g| GeneratorOutput {
            name: g.name.clone(),
            bus: g.bus.value(),
            p: model.blocks_of(g.id).map(|b| dispatch.block(b.id)).sum(),
        })
        .collect()
}

/// Non-shedding block output grouped by bus
pub fn generation_by_bus(model: &OptimizationModel, dispatch: &Dispatch) -> BTreeMap<BusId, f64> {
    let mut out = BTreeMap::new();
    for block in model.blocks().iter().filter(|b| !b.is_shedding()) {
        *out.entry(block.bus).or_insert(0.0) += dispatch.block(block.id);
    }
    out
}
