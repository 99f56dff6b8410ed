//! Reads a case directory: one CSV per sheet.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim};
use dispatch_core::CaseDiagnostics;
use serde::de::DeserializeOwned;

use crate::tables::{
    parse_branches, parse_buses, parse_generators, parse_loads, parse_renewables, BranchRow,
    BusRow, CaseTables, GeneratorRow, LoadRow, RenewableRow, BRANCHES_SHEET, BUSES_SHEET,
    GENERATORS_SHEET, LOADS_SHEET, RENEWABLES_SHEET,
};

/// Parsed sheets plus everything the reader had to repair
#[derive(Debug, Clone)]
pub struct CaseImport {
    pub tables: CaseTables,
    pub diagnostics: CaseDiagnostics,
}

fn read_sheet<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {label} CSV {}", path.display()))?;
    let mut out = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("parsing {label} CSV record"))?;
        out.push(record);
    }
    Ok(out)
}

fn read_optional_sheet<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Vec<T>> {
    if path.exists() {
        read_sheet(path, label)
    } else {
        Ok(Vec::new())
    }
}

/// Read and coerce every sheet of the case in `dir`.
///
/// `buses.csv`, `branches.csv`, `loads.csv` and `generators.csv` are
/// required; `renewables.csv` is optional.
pub fn read_case(dir: &Path) -> Result<CaseImport> {
    if !dir.is_dir() {
        return Err(anyhow!("case directory {} does not exist", dir.display()));
    }

    let bus_rows: Vec<BusRow> = read_sheet(&dir.join(BUSES_SHEET), "bus")?;
    let branch_rows: Vec<BranchRow> = read_sheet(&dir.join(BRANCHES_SHEET), "branch")?;
    let load_rows: Vec<LoadRow> = read_sheet(&dir.join(LOADS_SHEET), "load")?;
    let generator_rows: Vec<GeneratorRow> =
        read_sheet(&dir.join(GENERATORS_SHEET), "generator")?;
    let renewable_rows: Vec<RenewableRow> =
        read_optional_sheet(&dir.join(RENEWABLES_SHEET), "renewable")?;

    let mut diagnostics = CaseDiagnostics::new();
    let tables = CaseTables {
        buses: parse_buses(&bus_rows, &mut diagnostics),
        branches: parse_branches(&branch_rows, &mut diagnostics),
        loads: parse_loads(&load_rows, &mut diagnostics),
        generators: parse_generators(&generator_rows, &mut diagnostics),
        renewables: parse_renewables(&renewable_rows, &mut diagnostics),
    };

    tracing::info!(case = %dir.display(), "{}", diagnostics.summary());
    for issue in &diagnostics.issues {
        tracing::warn!("{issue}");
    }

    Ok(CaseImport {
        tables,
        diagnostics,
    })
}
