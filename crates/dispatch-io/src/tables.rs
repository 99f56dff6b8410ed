//! Row types for the case sheets and the cell coercion rules.
//!
//! CSV rows are deserialized with every cell as an optional string, then
//! turned into typed specs here. The rules follow what spreadsheet users
//! expect from a lenient importer:
//!
//! | cell | optional column | key column |
//! |---|---|---|
//! | empty | default value | row skipped |
//! | not a number | default value + warning | row skipped + warning |
//!
//! Key columns are the ones that decide whether a row exists at all: bus
//! voltage, generator and renewable rating, load demand, branch ends.

use dispatch_core::cost::normalize_segments;
use dispatch_core::{CaseDiagnostics, QuadraticCost};
use serde::Deserialize;

pub const BUSES_SHEET: &str = "buses.csv";
pub const BRANCHES_SHEET: &str = "branches.csv";
pub const LOADS_SHEET: &str = "loads.csv";
pub const GENERATORS_SHEET: &str = "generators.csv";
pub const RENEWABLES_SHEET: &str = "renewables.csv";

const COL_VOLTAGE: &str = "Bus rated voltage (kV)";
const COL_FROM: &str = "From";
const COL_TO: &str = "To";
const COL_REACTANCE: &str = "Reactance (p.u)";
const COL_THERMAL: &str = "Thermal limit (MW)";
const COL_DEMAND: &str = "Active power demand (MW)";
const COL_LOSS: &str = "Loss factor (%)";
const COL_RATED: &str = "Rated active power (MW)";
const COL_PMIN: &str = "Pmin (MW)";
const COL_A: &str = "a (€/MW²h)";
const COL_B: &str = "b (€/MWh)";
const COL_C: &str = "c (€)";
const COL_SEGMENTS: &str = "pwl segments";
const COL_BUS: &str = "Bus";

#[derive(Debug, Clone, Deserialize)]
pub struct BusRow {
    #[serde(rename = "Bus rated voltage (kV)", default)]
    pub voltage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRow {
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "To", default)]
    pub to: Option<String>,
    #[serde(rename = "Reactance (p.u)", default)]
    pub reactance: Option<String>,
    #[serde(rename = "Thermal limit (MW)", default)]
    pub thermal_limit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadRow {
    #[serde(rename = "Active power demand (MW)", default)]
    pub demand: Option<String>,
    #[serde(rename = "Loss factor (%)", default)]
    pub loss_factor: Option<String>,
    #[serde(rename = "Bus", default)]
    pub bus: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorRow {
    #[serde(rename = "Rated active power (MW)", default)]
    pub rated: Option<String>,
    #[serde(rename = "Pmin (MW)", default)]
    pub pmin: Option<String>,
    #[serde(rename = "a (€/MW²h)", default)]
    pub a: Option<String>,
    #[serde(rename = "b (€/MWh)", default)]
    pub b: Option<String>,
    #[serde(rename = "c (€)", default)]
    pub c: Option<String>,
    #[serde(rename = "pwl segments", default)]
    pub segments: Option<String>,
    #[serde(rename = "Bus", default)]
    pub bus: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenewableRow {
    #[serde(rename = "Rated active power (MW)", default)]
    pub rated: Option<String>,
    #[serde(rename = "Bus", default)]
    pub bus: Option<String>,
}

/// A bus row with a usable voltage
#[derive(Debug, Clone, PartialEq)]
pub struct BusSpec {
    /// 1-based position among bus rows with a voltage
    pub number: usize,
    pub v_nom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchSpec {
    pub from: usize,
    pub to: usize,
    pub reactance: f64,
    pub s_nom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSpec {
    /// 1-based data row in the sheet
    pub row: usize,
    pub bus: usize,
    pub demand: f64,
    /// Fraction, e.g. 0.05
    pub loss_factor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSpec {
    pub row: usize,
    pub bus: usize,
    pub p_max: f64,
    pub p_min: f64,
    pub cost: QuadraticCost,
    pub segments: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenewableSpec {
    pub row: usize,
    pub bus: usize,
    pub p_max: f64,
}

/// Every sheet of a case after coercion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseTables {
    pub buses: Vec<BusSpec>,
    pub branches: Vec<BranchSpec>,
    pub loads: Vec<LoadSpec>,
    pub generators: Vec<GeneratorSpec>,
    pub renewables: Vec<RenewableSpec>,
}

/// Classification of one raw cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Missing,
    Number(f64),
    Malformed(&'a str),
}

impl<'a> Cell<'a> {
    pub fn read(raw: &'a Option<String>) -> Self {
        match raw.as_deref().map(str::trim) {
            None | Some("") => Cell::Missing,
            Some(text) => match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Cell::Number(value),
                _ => Cell::Malformed(text),
            },
        }
    }
}

/// Positive whole number usable as a bus reference
fn bus_number(value: f64) -> Option<usize> {
    if value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value <= usize::MAX as f64 {
        Some(value as usize)
    } else {
        None
    }
}

/// Coercion context for one row of one sheet
struct RowReader<'d> {
    sheet: &'static str,
    line: usize,
    diag: &'d mut CaseDiagnostics,
}

impl<'d> RowReader<'d> {
    fn new(sheet: &'static str, index: usize, diag: &'d mut CaseDiagnostics) -> Self {
        // header is line 1
        Self {
            sheet,
            line: index + 2,
            diag,
        }
    }

    /// Key value: `None` means the row does not exist
    fn required(&mut self, column: &str, raw: &Option<String>) -> Option<f64> {
        match Cell::read(raw) {
            Cell::Number(value) => Some(value),
            Cell::Missing => {
                self.diag.record_skipped();
                None
            }
            Cell::Malformed(text) => {
                self.diag
                    .record_unreadable_row(self.sheet, self.line, column, text);
                None
            }
        }
    }

    fn optional(&mut self, column: &str, raw: &Option<String>, fallback: f64) -> f64 {
        match Cell::read(raw) {
            Cell::Number(value) => value,
            Cell::Missing => fallback,
            Cell::Malformed(text) => {
                self.diag
                    .record_coerced(self.sheet, self.line, column, text, fallback);
                fallback
            }
        }
    }

    fn required_bus(&mut self, column: &str, raw: &Option<String>) -> Option<usize> {
        let value = self.required(column, raw)?;
        match bus_number(value) {
            Some(bus) => Some(bus),
            None => {
                self.diag
                    .record_unreadable_row(self.sheet, self.line, column, &value.to_string());
                None
            }
        }
    }

    /// Explicit `Bus` column, or the row's own position
    fn placement(&mut self, raw: &Option<String>, row: usize) -> usize {
        match Cell::read(raw) {
            Cell::Missing => row,
            Cell::Number(value) => match bus_number(value) {
                Some(bus) => bus,
                None => {
                    self.diag.record_coerced(
                        self.sheet,
                        self.line,
                        COL_BUS,
                        &value.to_string(),
                        row as f64,
                    );
                    row
                }
            },
            Cell::Malformed(text) => {
                self.diag
                    .record_coerced(self.sheet, self.line, COL_BUS, text, row as f64);
                row
            }
        }
    }
}

pub fn parse_buses(rows: &[BusRow], diag: &mut CaseDiagnostics) -> Vec<BusSpec> {
    let mut buses = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let mut reader = RowReader::new(BUSES_SHEET, index, diag);
        if let Some(v_nom) = reader.required(COL_VOLTAGE, &row.voltage) {
            buses.push(BusSpec {
                number: buses.len() + 1,
                v_nom,
            });
        }
    }
    diag.stats.buses = buses.len();
    buses
}

pub fn parse_branches(rows: &[BranchRow], diag: &mut CaseDiagnostics) -> Vec<BranchSpec> {
    let mut branches = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let mut reader = RowReader::new(BRANCHES_SHEET, index, diag);
        let Some(from) = reader.required_bus(COL_FROM, &row.from) else {
            continue;
        };
        let Some(to) = reader.required_bus(COL_TO, &row.to) else {
            continue;
        };
        let reactance = reader.optional(COL_REACTANCE, &row.reactance, 0.0);
        let s_nom = reader.optional(COL_THERMAL, &row.thermal_limit, 0.0);
        branches.push(BranchSpec {
            from,
            to,
            reactance,
            s_nom,
        });
    }
    diag.stats.branches = branches.len();
    branches
}

pub fn parse_loads(rows: &[LoadRow], diag: &mut CaseDiagnostics) -> Vec<LoadSpec> {
    let mut loads = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let mut reader = RowReader::new(LOADS_SHEET, index, diag);
        let Some(demand) = reader.required(COL_DEMAND, &row.demand) else {
            continue;
        };
        let loss_factor = reader.optional(COL_LOSS, &row.loss_factor, 0.0);
        let bus = reader.placement(&row.bus, index + 1);
        loads.push(LoadSpec {
            row: index + 1,
            bus,
            demand,
            loss_factor,
        });
    }
    diag.stats.loads = loads.len();
    loads
}

pub fn parse_generators(rows: &[GeneratorRow], diag: &mut CaseDiagnostics) -> Vec<GeneratorSpec> {
    let mut generators = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let mut reader = RowReader::new(GENERATORS_SHEET, index, diag);
        let Some(p_max) = reader.required(COL_RATED, &row.rated) else {
            continue;
        };
        let p_min = reader.optional(COL_PMIN, &row.pmin, 0.0);
        let cost = QuadraticCost::new(
            reader.optional(COL_A, &row.a, 0.0),
            reader.optional(COL_B, &row.b, 0.0),
            reader.optional(COL_C, &row.c, 0.0),
        );
        let segments = normalize_segments(reader.optional(COL_SEGMENTS, &row.segments, 1.0));
        let bus = reader.placement(&row.bus, index + 1);
        generators.push(GeneratorSpec {
            row: index + 1,
            bus,
            p_max,
            p_min,
            cost,
            segments,
        });
    }
    diag.stats.generators = generators.len();
    generators
}

pub fn parse_renewables(rows: &[RenewableRow], diag: &mut CaseDiagnostics) -> Vec<RenewableSpec> {
    let mut renewables = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let mut reader = RowReader::new(RENEWABLES_SHEET, index, diag);
        let Some(p_max) = reader.required(COL_RATED, &row.rated) else {
            continue;
        };
        let bus = reader.placement(&row.bus, index + 1);
        renewables.push(RenewableSpec {
            row: index + 1,
            bus,
            p_max,
        });
    }
    diag.stats.renewables = renewables.len();
    renewables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    fn generator_row(rated: &str, pmin: &str, segments: &str) -> GeneratorRow {
        GeneratorRow {
            rated: cell(rated),
            pmin: cell(pmin),
            a: cell("0.01"),
            b: cell("5"),
            c: cell("100"),
            segments: cell(segments),
            bus: None,
        }
    }

    #[test]
    fn cell_classification() {
        assert_eq!(Cell::read(&None), Cell::Missing);
        assert_eq!(Cell::read(&cell("  ")), Cell::Missing);
        assert_eq!(Cell::read(&cell(" 42.5 ")), Cell::Number(42.5));
        assert_eq!(Cell::read(&cell("n/a")), Cell::Malformed("n/a"));
        assert_eq!(Cell::read(&cell("NaN")), Cell::Malformed("NaN"));
        assert_eq!(Cell::read(&cell("inf")), Cell::Malformed("inf"));
    }

    #[test]
    fn buses_are_numbered_among_present_rows() {
        let rows = vec![
            BusRow { voltage: cell("220") },
            BusRow { voltage: None },
            BusRow { voltage: cell("132") },
        ];
        let mut diag = CaseDiagnostics::new();
        let buses = parse_buses(&rows, &mut diag);

        assert_eq!(
            buses,
            vec![
                BusSpec {
                    number: 1,
                    v_nom: 220.0
                },
                BusSpec {
                    number: 2,
                    v_nom: 132.0
                },
            ]
        );
        assert_eq!(diag.stats.skipped_rows, 1);
        assert!(!diag.has_issues());
    }

    #[test]
    fn malformed_generator_cells_are_coerced() {
        let mut row = generator_row("100", "lots", "two");
        row.a = cell("?");
        let mut diag = CaseDiagnostics::new();
        let generators = parse_generators(&[row], &mut diag);

        assert_eq!(generators.len(), 1);
        let gen = &generators[0];
        assert_eq!(gen.p_min, 0.0);
        assert_eq!(gen.cost.a, 0.0);
        assert_eq!(gen.cost.b, 5.0);
        assert_eq!(gen.cost.c, 100.0);
        assert_eq!(gen.segments, 1);
        assert_eq!(gen.bus, 1);
        assert_eq!(diag.stats.coerced_cells, 3);
        assert_eq!(diag.warning_count(), 3);
        assert!(diag.issues.iter().all(|i| i.line == Some(2)));
    }

    #[test]
    fn generator_without_rating_is_skipped() {
        let rows = vec![
            generator_row("", "10", "2"),
            generator_row("80", "10", "2"),
        ];
        let mut diag = CaseDiagnostics::new();
        let generators = parse_generators(&rows, &mut diag);

        assert_eq!(generators.len(), 1);
        assert_eq!(generators[0].row, 2);
        assert_eq!(generators[0].bus, 2);
        assert_eq!(diag.stats.generators, 1);
        assert_eq!(diag.stats.skipped_rows, 1);
    }

    #[test]
    fn explicit_bus_column_overrides_row_position() {
        let rows = vec![
            LoadRow {
                demand: cell("80"),
                loss_factor: cell("0.05"),
                bus: cell("3"),
            },
            LoadRow {
                demand: cell("20"),
                loss_factor: None,
                bus: cell("1.5"),
            },
        ];
        let mut diag = CaseDiagnostics::new();
        let loads = parse_loads(&rows, &mut diag);

        assert_eq!(loads[0].bus, 3);
        assert_eq!(loads[0].loss_factor, 0.05);
        assert_eq!(loads[1].bus, 2);
        assert_eq!(loads[1].loss_factor, 0.0);
        assert_eq!(diag.stats.coerced_cells, 1);
    }

    #[test]
    fn branch_with_bad_endpoint_is_skipped_with_warning() {
        let rows = vec![
            BranchRow {
                from: cell("1"),
                to: cell("two"),
                reactance: cell("0.1"),
                thermal_limit: cell("100"),
            },
            BranchRow {
                from: cell("1.0"),
                to: cell("2"),
                reactance: cell("0.1"),
                thermal_limit: None,
            },
        ];
        let mut diag = CaseDiagnostics::new();
        let branches = parse_branches(&rows, &mut diag);

        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].from, 1);
        assert_eq!(branches[0].s_nom, 0.0);
        assert_eq!(diag.stats.skipped_rows, 1);
        assert_eq!(diag.issues.len(), 1);
    }
}
