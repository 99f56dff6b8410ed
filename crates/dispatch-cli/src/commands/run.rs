use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use dispatch_algo::{DcDispatch, DispatchReport, DispatchSolver, LpSolverKind};
use dispatch_cli::manifest::{read_manifest, record_manifest};
use dispatch_core::Diagnostics;
use dispatch_io::SolutionExport;
use tracing::{info, warn};

use super::case::{load_case, SettingsOverrides};

pub struct RunArgs<'a> {
    pub case: &'a Path,
    pub out: &'a Path,
    pub settings: Option<&'a Path>,
    pub overrides: SettingsOverrides,
    pub json: bool,
}

pub fn handle(args: RunArgs<'_>) -> Result<()> {
    let start = Instant::now();
    let loaded = load_case(args.case, args.settings, &args.overrides)?;
    let model = &loaded.model;

    let mut structural = Diagnostics::new();
    model.validate_into(&mut structural);
    for issue in &structural.issues {
        warn!("{issue}");
    }
    if structural.has_errors() {
        bail!(
            "case {} is not solvable: {}",
            args.case.display(),
            structural.summary()
        );
    }

    let lp_solver: LpSolverKind = loaded.settings.solver.lp_solver.parse()?;
    let solver = DcDispatch::new(lp_solver, loaded.settings.solver.base_mva);
    info!(
        "Dispatching {} with {} ({})",
        args.case.display(),
        solver.id(),
        model.stats()
    );
    let dispatch = solver
        .solve(model)
        .with_context(|| format!("dispatching {}", args.case.display()))?;

    let report = DispatchReport::new(model, &dispatch);
    let mut outputs: Vec<PathBuf> = report.to_csv_dir(args.out)?;

    let voll = loaded.settings.system.value_of_lost_load.to_string();
    let shedding = loaded.settings.system.shedding_enabled.to_string();
    let base_mva = loaded.settings.solver.base_mva.to_string();
    let manifest = record_manifest(
        args.out,
        "run",
        args.case,
        &outputs,
        &[
            ("voll", voll.as_str()),
            ("shedding", shedding.as_str()),
            ("lp_solver", lp_solver.as_str()),
            ("base_mva", base_mva.as_str()),
        ],
    )?;
    let entry = read_manifest(&manifest)?;
    info!(run_id = %entry.run_id, "recorded {}", manifest.display());
    outputs.push(manifest);

    let summary = report.summary();
    if args.json {
        serde_json::to_writer_pretty(std::io::stdout(), &report.to_json_value()?)
            .context("writing summary to stdout")?;
        println!();
    } else {
        println!(
            "Objective: {:.2} (curve cost {:.2})",
            summary.objective, summary.curve_cost
        );
        println!(
            "Demand {:.2} MW, generation {:.2} MW, shed {:.2} MW",
            summary.total_demand_mw, summary.total_generation_mw, summary.shed_mw
        );
        if !summary.binding_branches.is_empty() {
            println!("Binding branches: {}", summary.binding_branches.join(", "));
        }
        println!("Wrote {} files to {}", outputs.len(), args.out.display());
        println!("Run id: {}", entry.run_id);
    }

    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(())
}
