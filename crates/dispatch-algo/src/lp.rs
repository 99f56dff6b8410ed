//! DC optimal power flow over generation blocks.
//!
//! Linear program for one snapshot:
//! - one variable per block, `p_nom·p_min_pu ≤ p ≤ p_nom`
//! - one angle variable per bus; the first bus of each island is the
//!   angle reference and is fixed at zero (not a variable)
//! - one flow variable per branch, `|f| ≤ s_nom`, tied to angles by
//!   `f = base_mva · (θ_from − θ_to) / x`
//! - power balance per bus: `Σ p − demand = Σ f_out − Σ f_in`
//!
//! Objective: `min Σ marginal_cost · p`.

use std::collections::HashSet;
use std::time::Instant;

use dispatch_core::{BusId, OptimizationModel};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, variables, Constraint, Expression, Solution, SolverModel, Variable,
};

use crate::solver::{Dispatch, DispatchSolver, LpSolverKind, SolveFailure};

/// Slack allowed when pre-checking capacity against demand (MW)
const CAPACITY_TOLERANCE_MW: f64 = 1e-6;

/// DC-OPF backend built on `good_lp`
#[derive(Debug, Clone)]
pub struct DcDispatch {
    lp_solver: LpSolverKind,
    base_mva: f64,
    id: String,
}

impl Default for DcDispatch {
    fn default() -> Self {
        Self::new(LpSolverKind::default(), 100.0)
    }
}

impl DcDispatch {
    pub fn new(lp_solver: LpSolverKind, base_mva: f64) -> Self {
        Self {
            lp_solver,
            base_mva,
            id: format!("dc-opf/{}", lp_solver.as_str()),
        }
    }

    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }
}

/// Reject models no dispatch can satisfy before building the LP.
///
/// Covers whole-system shortfalls only; a shortage confined to one island
/// is left for the solver to report.
fn precheck(model: &OptimizationModel) -> Result<(), SolveFailure> {
    let demand: f64 = model.loads().iter().map(|l| l.p_set.value()).sum();
    let capacity: f64 = model.blocks().iter().map(|b| b.p_nom.value()).sum();
    let must_run: f64 = model.blocks().iter().map(|b| b.p_min().value()).sum();

    if capacity + CAPACITY_TOLERANCE_MW < demand {
        tracing::warn!(
            capacity_mw = capacity,
            demand_mw = demand,
            "capacity below demand"
        );
        return Err(SolveFailure::Infeasible);
    }
    if must_run > demand + CAPACITY_TOLERANCE_MW {
        tracing::warn!(
            must_run_mw = must_run,
            demand_mw = demand,
            "must-run output above demand"
        );
        return Err(SolveFailure::Infeasible);
    }
    Ok(())
}

impl DispatchSolver for DcDispatch {
    fn id(&self) -> &str {
        &self.id
    }

    fn solve(&self, model: &OptimizationModel) -> Result<Dispatch, SolveFailure> {
        let start = Instant::now();
        precheck(model)?;

        let mut vars = variables!();

        // Block outputs and objective
        let mut block_vars: Vec<Variable> = Vec::with_capacity(model.blocks().len());
        let mut cost_expr = Expression::from(0.0);
        for block in model.blocks() {
            let p = vars.add(
                variable()
                    .min(block.p_min().value())
                    .max(block.p_nom.value()),
            );
            cost_expr += block.marginal_cost.value() * p;
            block_vars.push(p);
        }

        // Bus angles; island references stay out of the problem
        let references: HashSet<BusId> = model.islands().iter().map(|i| i.reference()).collect();
        let theta_vars: Vec<Option<Variable>> = model
            .buses()
            .iter()
            .map(|bus| {
                if references.contains(&bus.id) {
                    None
                } else {
                    Some(vars.add(variable()))
                }
            })
            .collect();

        // Branch flows
        let mut flow_vars: Vec<Variable> = Vec::with_capacity(model.branches().len());
        let mut constraints: Vec<Constraint> = Vec::new();
        for branch in model.branches() {
            let limit = branch.s_nom.value();
            let f = vars.add(variable().min(-limit).max(limit));
            flow_vars.push(f);

            let k = self.base_mva / branch.reactance;
            let mut angle_term = Expression::from(0.0);
            if let Some(theta) = endpoint_angle(model, &theta_vars, branch.from_bus) {
                angle_term += k * theta;
            }
            if let Some(theta) = endpoint_angle(model, &theta_vars, branch.to_bus) {
                angle_term -= k * theta;
            }
            constraints.push(constraint!(f - angle_term == 0.0));
        }

        // Power balance per bus
        let mut net: Vec<Expression> = vec![Expression::from(0.0); model.buses().len()];
        let mut demand = vec![0.0; model.buses().len()];
        for (block, p) in model.blocks().iter().zip(&block_vars) {
            if let Some(idx) = model.bus_index(block.bus) {
                net[idx] += *p;
            }
        }
        for load in model.loads() {
            if let Some(idx) = model.bus_index(load.bus) {
                demand[idx] += load.p_set.value();
            }
        }
        for (branch, f) in model.branches().iter().zip(&flow_vars) {
            if let Some(idx) = model.bus_index(branch.from_bus) {
                net[idx] -= *f;
            }
            if let Some(idx) = model.bus_index(branch.to_bus) {
                net[idx] += *f;
            }
        }
        for (balance, d) in net.into_iter().zip(demand) {
            constraints.push(constraint!(balance == d));
        }

        tracing::debug!(
            blocks = block_vars.len(),
            branches = flow_vars.len(),
            constraints = constraints.len(),
            solver = self.lp_solver.as_str(),
            "solving dispatch LP"
        );

        let problem = vars.minimise(cost_expr);
        let solution: Box<dyn Solution> = match self.lp_solver {
            LpSolverKind::Clarabel => {
                let mut model = problem.using(clarabel);
                for c in constraints {
                    model = model.with(c);
                }
                Box::new(model.solve()?)
            }
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => {
                let mut model = problem.using(good_lp::solvers::highs::highs);
                for c in constraints {
                    model = model.with(c);
                }
                Box::new(model.solve()?)
            }
        };

        let mut dispatch = Dispatch {
            backend: self.id.clone(),
            ..Dispatch::default()
        };

        for (block, p) in model.blocks().iter().zip(&block_vars) {
            let mw = solution.value(*p);
            dispatch.objective += block.marginal_cost.value() * mw;
            dispatch.block_mw.insert(block.id, mw);
        }
        for (branch, f) in model.branches().iter().zip(&flow_vars) {
            dispatch.branch_flow_mw.insert(branch.id, solution.value(*f));
        }
        for (bus, theta) in model.buses().iter().zip(&theta_vars) {
            let angle = theta.map(|v| solution.value(v)).unwrap_or(0.0);
            dispatch.bus_angle_rad.insert(bus.id, angle);
        }
        // demand is fixed; any shortfall shows up as shedding output
        for load in model.loads() {
            dispatch.load_served_mw.insert(load.id, load.p_set.value());
        }

        dispatch.solve_time_ms = start.elapsed().as_millis();
        tracing::info!(
            objective = dispatch.objective,
            time_ms = dispatch.solve_time_ms as u64,
            "dispatch solved"
        );
        Ok(dispatch)
    }
}

fn endpoint_angle(
    model: &OptimizationModel,
    theta_vars: &[Option<Variable>],
    bus: BusId,
) -> Option<Variable> {
    model.bus_index(bus).and_then(|idx| theta_vars[idx])
}
