//! Model inspection: statistics and the generation block table.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use dispatch_cli::OutputFormat;
use dispatch_core::{ModelStats, OptimizationModel};
use serde::Serialize;
use tabwriter::TabWriter;

use super::case::{load_case, SettingsOverrides};

#[derive(Serialize)]
struct BlockRow<'a> {
    name: &'a str,
    bus: usize,
    carrier: &'a str,
    p_nom: f64,
    p_min_pu: f64,
    marginal_cost: f64,
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    stats: ModelStats,
    coerced_cells: usize,
    skipped_rows: usize,
    blocks: Vec<BlockRow<'a>>,
}

fn block_rows(model: &OptimizationModel) -> Vec<BlockRow<'_>> {
    model
        .blocks()
        .iter()
        .map(|b| BlockRow {
            name: &b.name,
            bus: b.bus.value(),
            carrier: b.carrier.as_str(),
            p_nom: b.p_nom.value(),
            p_min_pu: b.p_min_pu.value(),
            marginal_cost: b.marginal_cost.value(),
        })
        .collect()
}

pub fn handle(case: &Path, settings: Option<&Path>, format: OutputFormat) -> Result<()> {
    let loaded = load_case(case, settings, &SettingsOverrides::default())?;
    let model = &loaded.model;

    match format {
        OutputFormat::Json => {
            let output = InspectOutput {
                stats: model.stats(),
                coerced_cells: loaded.diagnostics.stats.coerced_cells,
                skipped_rows: loaded.diagnostics.stats.skipped_rows,
                blocks: block_rows(model),
            };
            serde_json::to_writer_pretty(io::stdout(), &output)
                .context("serializing inspection to JSON")?;
            println!();
        }
        OutputFormat::Table => {
            println!("Case {}", case.display());
            println!("  {}", model.stats());
            println!("  {}", loaded.diagnostics.summary());
            println!();

            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "NAME\tBUS\tCARRIER\tP_NOM\tP_MIN_PU\tMARGINAL_COST")?;
            for row in block_rows(model) {
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{:.3}\t{:.4}\t{:.4}",
                    row.name, row.bus, row.carrier, row.p_nom, row.p_min_pu, row.marginal_cost
                )?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
