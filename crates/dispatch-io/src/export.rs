//! Uniform export trait for solved dispatches, plus the sheet writers.
//!
//! The trait lives here so the CLI can depend on it without knowing the
//! solver; the implementation for the solver's report type is in
//! `dispatch-algo` (`src/export.rs`), which depends on this crate.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DISPATCH_SHEET: &str = "dispatch.csv";
pub const LINE_FLOWS_SHEET: &str = "line_flows.csv";
pub const LOADS_SHEET: &str = "loads.csv";
pub const COST_SHEET: &str = "cost.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Trait for writing a solved dispatch to disk
pub trait SolutionExport {
    /// Write the result sheets into `dir`, returning the files written
    fn to_csv_dir(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Write the JSON summary
    fn to_json(&self, path: &Path) -> Result<()>;

    /// Convert to JSON value (for stdout)
    fn to_json_value(&self) -> Result<serde_json::Value>;
}

/// Write serializable rows as one CSV sheet with a header row
pub fn write_sheet<R, I>(path: &Path, rows: I) -> Result<()>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("writing CSV record to {}", path.display()))?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing to JSON")?;
    std::fs::write(path, json).with_context(|| format!("writing JSON to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Row<'a> {
        name: &'a str,
        p_mw: f64,
    }

    #[test]
    fn write_sheet_emits_header_and_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DISPATCH_SHEET);

        write_sheet(
            &path,
            [
                Row {
                    name: "Generator_node_1_seg1",
                    p_mw: 50.0,
                },
                Row {
                    name: "Generator_node_1_seg2",
                    p_mw: 34.0,
                },
            ],
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "name,p_mw");
        assert_eq!(lines[2], "Generator_node_1_seg2,34.0");
    }

    #[test]
    fn write_json_is_pretty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(SUMMARY_FILE);
        write_json(&path, &serde_json::json!({ "objective": 1.5 })).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"objective\": 1.5"));
    }

    #[test]
    fn write_sheet_reports_bad_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join(COST_SHEET);
        let err = write_sheet(&path, Vec::<Row>::new()).unwrap_err();
        assert!(err.to_string().contains("creating CSV writer"));
    }
}
