//! Read -> assemble -> solve -> export, on CSV cases written to disk.

use std::fs;
use std::path::{Path, PathBuf};

use dispatch_algo::{DcDispatch, Dispatch, DispatchReport, DispatchSolver, SolveFailure};
use dispatch_core::{BlockId, BranchId, OptimizationModel};
use dispatch_io::{assemble, read_case, SolutionExport, SystemSettings};
use tempfile::tempdir;

const TOL: f64 = 1e-3;

fn demo_case() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/three_bus")
}

fn write_two_bus(dir: &Path, demand: f64, settings: Option<&str>) {
    fs::write(dir.join("buses.csv"), "Bus rated voltage (kV)\n220\n220\n").unwrap();
    fs::write(
        dir.join("branches.csv"),
        "From,To,Reactance (p.u),Thermal limit (MW)\n1,2,0.1,100\n",
    )
    .unwrap();
    fs::write(
        dir.join("loads.csv"),
        format!("Active power demand (MW),Loss factor (%),Bus\n{demand},0.05,2\n"),
    )
    .unwrap();
    fs::write(
        dir.join("generators.csv"),
        "Rated active power (MW),Pmin (MW),a (€/MW²h),b (€/MWh),c (€),pwl segments\n100,20,0.01,5,0,2\n",
    )
    .unwrap();
    if let Some(toml) = settings {
        fs::write(dir.join("settings.toml"), toml).unwrap();
    }
}

fn solve_dir(dir: &Path) -> (OptimizationModel, Result<Dispatch, SolveFailure>) {
    let mut case = read_case(dir).unwrap();
    let settings = SystemSettings::from_case_dir(dir).unwrap();
    let model = assemble(&case.tables, &settings, &mut case.diagnostics).unwrap();
    let solver = DcDispatch::new(
        settings.solver.lp_solver.parse().unwrap(),
        settings.solver.base_mva,
    );
    let result = solver.solve(&model);
    (model, result)
}

#[test]
fn two_bus_case_fills_cheapest_block_first() {
    let dir = tempdir().unwrap();
    write_two_bus(dir.path(), 80.0, None);

    let (model, result) = solve_dir(dir.path());
    let dispatch = result.unwrap();

    assert!((model.total_demand().value() - 84.0).abs() < 1e-9);
    assert!((dispatch.block(BlockId::new(1)) - 50.0).abs() < TOL);
    assert!((dispatch.block(BlockId::new(2)) - 34.0).abs() < TOL);
    assert!((dispatch.flow(BranchId::new(1)) - 84.0).abs() < TOL);
    assert!((dispatch.objective - (50.0 * 5.5 + 34.0 * 6.5)).abs() < 1e-2);
}

#[test]
fn shortage_is_a_typed_failure_without_shedding() {
    let dir = tempdir().unwrap();
    write_two_bus(dir.path(), 120.0, None);

    let (_, result) = solve_dir(dir.path());
    assert_eq!(result.unwrap_err(), SolveFailure::Infeasible);
}

#[test]
fn shedding_from_settings_absorbs_shortage() {
    let dir = tempdir().unwrap();
    write_two_bus(
        dir.path(),
        120.0,
        Some("[system]\nshedding_enabled = true\nvalue_of_lost_load = 500.0\n"),
    );

    let (model, result) = solve_dir(dir.path());
    let dispatch = result.unwrap();
    let report = DispatchReport::new(&model, &dispatch);

    // 126 MW demand, line limited to 100 MW
    assert!((report.shed_mw() - 26.0).abs() < TOL);
    assert_eq!(report.binding_branches(), vec!["L12".to_string()]);
}

#[test]
fn demo_case_balances_and_respects_limits() {
    let (model, result) = solve_dir(&demo_case());
    let dispatch = result.unwrap();

    let supplied: f64 = model.blocks().iter().map(|b| dispatch.block(b.id)).sum();
    assert!((supplied - model.total_demand().value()).abs() < 1e-2);

    for branch in model.branches() {
        assert!(
            dispatch.flow(branch.id).abs() <= branch.s_nom.value() + TOL,
            "{} over its limit",
            branch.name
        );
    }
    for block in model.blocks() {
        let p = dispatch.block(block.id);
        assert!(p >= block.p_min().value() - TOL, "{} below minimum", block.name);
        assert!(p <= block.p_nom.value() + TOL, "{} above capacity", block.name);
    }
}

#[test]
fn demo_case_exports_result_sheets() {
    let (model, result) = solve_dir(&demo_case());
    let dispatch = result.unwrap();
    let out = tempdir().unwrap();

    let written = DispatchReport::new(&model, &dispatch)
        .to_csv_dir(out.path())
        .unwrap();
    assert_eq!(written.len(), 5);

    let flows = fs::read_to_string(out.path().join("line_flows.csv")).unwrap();
    assert_eq!(flows.lines().count(), 1 + model.branches().len());
    assert!(flows.contains("L12"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["snapshot"], "now");

    // Two thermal units and one renewable
    let generators = summary["generators"].as_array().unwrap();
    assert_eq!(generators.len(), 3);
    let per_generator: f64 = generators.iter().map(|g| g["p"].as_f64().unwrap()).sum();
    let total = summary["total_generation_mw"].as_f64().unwrap();
    assert!((per_generator - total).abs() < 1e-6);
}
