use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::fs::File;
#[cfg(feature = "markdown")]
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use heck::ToSnakeCase;
use itertools::Itertools;
#[cfg(feature = "markdown")]
use json2markdown::MarkdownRenderer;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use strum_macros::Display;
use tracing::{info, trace};

use crate::dispense::{DispenseKind, RejectionReason};
use crate::inventory::{Inventory, Substance};
use crate::issue::{sort_issues, IssueKind, IssueSeverity, ReportIssue};
use crate::plate::{Plate, WellAddress};
use crate::requirements::{propagate, Requirements};

/// µL
const VOLUME_DECIMAL_PLACES: u32 = 6;
/// mol/L
const CONCENTRATION_DECIMAL_PLACES: u32 = 9;

#[derive(Clone, serde::Serialize, Debug, Default, PartialEq)]
pub struct PlateReport {
    pub name: String,
    pub plate: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub max_volume_per_well: Decimal,
    pub stock_preparations: Vec<StockPreparationItem>,
    /// µL
    pub volumes: Matrix,
    /// mol/L, one matrix per reagent on the plate
    pub concentrations: Vec<ConcentrationMatrix>,
    pub requirements: Requirements,
    pub dispensing_order: Vec<DispensingOrderItem>,
    pub rejected_dispenses: Vec<RejectedDispenseItem>,
    pub issues: Vec<ReportIssue>,
}

/// Rows x columns, in the plate's row and column order.
#[derive(Clone, serde::Serialize, Debug, Default, PartialEq)]
pub struct Matrix {
    pub cells: Vec<Vec<Cell>>,
}

impl Matrix {
    pub fn cell(&self, address: WellAddress) -> Option<&Cell> {
        self.cells
            .get(address.row)
            .and_then(|row| row.get(address.column))
    }
}

#[derive(Clone, serde::Serialize, Debug, Default, PartialEq)]
pub struct Cell {
    /// `None` for empty wells
    pub value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<CellMarker>,
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(value) = self.value {
            write!(f, "{}", value)?;
        }
        if let Some(marker) = self.marker {
            if self.value.is_some() {
                f.write_str(" ")?;
            }
            write!(f, "[{}]", marker)?;
        }
        Ok(())
    }
}

/// Marks wells where a dispense was rejected.
#[derive(Clone, Copy, serde::Serialize, Debug, PartialEq, Eq, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CellMarker {
    OverVolume,
    NegativeVolume,
}

impl From<RejectionReason> for CellMarker {
    fn from(value: RejectionReason) -> Self {
        match value {
            RejectionReason::OverVolume => Self::OverVolume,
            RejectionReason::NegativeVolume => Self::NegativeVolume,
        }
    }
}

#[derive(Clone, serde::Serialize, Debug, PartialEq)]
pub struct ConcentrationMatrix {
    pub reagent: String,
    pub matrix: Matrix,
}

#[derive(Clone, serde::Serialize, Debug, PartialEq)]
pub struct StockPreparationItem {
    pub stock: String,
    /// mol/L
    pub concentration: Decimal,
    /// mL
    pub volume: Decimal,
    pub instructions: String,
}

#[derive(Clone, serde::Serialize, Debug, PartialEq)]
pub struct DispensingOrderItem {
    pub step: usize,
    pub what: String,
    pub kind: DispenseKind,
    pub well: String,
    /// µL
    pub volume: Decimal,
}

#[derive(Clone, serde::Serialize, Debug, PartialEq)]
pub struct RejectedDispenseItem {
    pub what: String,
    pub kind: DispenseKind,
    pub reason: RejectionReason,
    pub wells: Vec<String>,
}

/// Projects the plate's final state into report tables.
///
/// Never fails, problems with the plan are added to the issue set and marked in the tables.
pub fn generate_report(inventory: &Inventory, plate: &Plate, issue_set: &mut BTreeSet<ReportIssue>) -> PlateReport {
    let mut report = PlateReport {
        name: plate.name().to_string(),
        plate: plate.to_string(),
        rows: plate.template().rows().to_vec(),
        columns: plate.template().columns().to_vec(),
        max_volume_per_well: plate.max_volume_per_well(),
        ..PlateReport::default()
    };

    if plate.events().is_empty() {
        issue_set.insert(ReportIssue {
            message: "No dispenses have been applied to the plate.".to_string(),
            severity: IssueSeverity::Warning,
            kind: IssueKind::NoDispenses,
        });
    }

    report.stock_preparations = inventory
        .stocks()
        .map(|(key, stock)| StockPreparationItem {
            stock: inventory.display_stock(key).to_string(),
            concentration: stock.concentration(),
            volume: stock.volume(),
            instructions: inventory.instructions(key).to_string(),
        })
        .collect();

    let markers = rejection_markers(inventory, plate, issue_set);

    report.volumes = build_matrix(plate, &markers, |address| {
        plate
            .well(address)
            .filter(|well| !well.is_empty())
            .map(|well| round(well.volume(), VOLUME_DECIMAL_PLACES))
    });

    let reagents_on_plate: Vec<Substance> = plate
        .wells()
        .flat_map(|(_, well)| well.contents().keys().copied())
        .filter(|substance| matches!(substance, Substance::Reagent(_)))
        .unique()
        .collect();

    report.concentrations = inventory
        .reagents()
        .map(|(key, _)| Substance::Reagent(key))
        .filter(|substance| reagents_on_plate.contains(substance))
        .map(|substance| ConcentrationMatrix {
            reagent: inventory.substance_name(substance),
            matrix: build_matrix(plate, &markers, |address| {
                plate
                    .well(address)
                    .and_then(|well| well.concentration_of(substance))
                    .map(|concentration| round(concentration, CONCENTRATION_DECIMAL_PLACES))
            }),
        })
        .collect();

    report.requirements = propagate(inventory, plate, issue_set);

    report.dispensing_order = plate
        .events()
        .iter()
        .flat_map(|event| {
            let what = inventory.dispensable_name(event.what);
            event
                .dispenses
                .iter()
                .map(move |(address, volume)| DispensingOrderItem {
                    step: event.sequence,
                    what: what.clone(),
                    kind: event.kind,
                    well: plate.label(*address),
                    volume: round(*volume, VOLUME_DECIMAL_PLACES),
                })
        })
        .collect();

    report.rejected_dispenses = plate
        .rejections()
        .iter()
        .map(|rejection| RejectedDispenseItem {
            what: inventory.dispensable_name(rejection.what),
            kind: rejection.kind,
            reason: rejection.reason,
            wells: rejection
                .wells
                .iter()
                .map(|address| plate.label(*address))
                .collect(),
        })
        .collect();

    let mut issues: Vec<ReportIssue> = issue_set.iter().cloned().collect();

    sort_issues(&mut issues);

    for issue in issues.iter() {
        info!(
            "Issue detected. severity: {:?}, message: '{}', kind: {:?}",
            issue.severity, issue.message, issue.kind
        );
    }

    report.issues = issues;

    report
}

fn rejection_markers(
    inventory: &Inventory,
    plate: &Plate,
    issue_set: &mut BTreeSet<ReportIssue>,
) -> HashMap<WellAddress, CellMarker> {
    let mut markers: HashMap<WellAddress, CellMarker> = HashMap::new();

    for rejection in plate.rejections() {
        let what = inventory.dispensable_name(rejection.what);
        for address in rejection.wells.iter() {
            markers
                .entry(*address)
                .or_insert(rejection.reason.into());

            let well = plate.label(*address);
            let (message, kind) = match rejection.reason {
                RejectionReason::OverVolume => (
                    format!(
                        "Dispense rejected, well volume would exceed the maximum. what: '{}', kind: {}",
                        what, rejection.kind
                    ),
                    IssueKind::OverVolume {
                        well,
                    },
                ),
                RejectionReason::NegativeVolume => (
                    format!(
                        "Dispense rejected, negative volume. what: '{}', kind: {}",
                        what, rejection.kind
                    ),
                    IssueKind::NegativeVolume {
                        well,
                    },
                ),
            };
            issue_set.insert(ReportIssue {
                message,
                severity: IssueSeverity::Severe,
                kind,
            });
        }
    }

    markers
}

fn build_matrix(
    plate: &Plate,
    markers: &HashMap<WellAddress, CellMarker>,
    value_of: impl Fn(WellAddress) -> Option<Decimal>,
) -> Matrix {
    let cells = (0..plate.row_count())
        .map(|row| {
            (0..plate.column_count())
                .map(|column| {
                    let address = WellAddress::new(row, column);
                    Cell {
                        value: value_of(address),
                        marker: markers.get(&address).copied(),
                    }
                })
                .collect()
        })
        .collect();

    Matrix {
        cells,
    }
}

fn round(value: Decimal, places: u32) -> Decimal {
    value
        .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Csv,
    /// Generated from the JSON report, requires the `markdown` feature.
    Markdown,
}

/// Writes the report in each of the formats, returns the paths of the files written.
pub fn write_report(report: &PlateReport, directory: &Path, formats: &[ReportFormat]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = vec![];

    let wants_markdown = formats.contains(&ReportFormat::Markdown);
    if formats.contains(&ReportFormat::Json) || wants_markdown {
        let report_file_path = build_report_file_path(&report.name, directory);
        save_as_json(report, &report_file_path)
            .with_context(|| format!("Saving JSON report. path: {:?}", report_file_path))?;
        paths.push(report_file_path.clone());

        if wants_markdown {
            paths.push(json_report_to_markdown(&report_file_path)?);
        }
    }

    if formats.contains(&ReportFormat::Csv) {
        paths.extend(save_as_csv(report, directory)?);
    }

    Ok(paths)
}

pub fn build_report_file_path(name: &str, directory: &Path) -> PathBuf {
    let mut report_file_path: PathBuf = PathBuf::from(directory);
    report_file_path.push(format!("{}_report.json", file_stem(name)));
    report_file_path
}

pub fn save_as_json(report: &PlateReport, report_file_path: &PathBuf) -> anyhow::Result<()> {
    let report_file = File::create(report_file_path)?;
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(report_file, formatter);
    report.serialize(&mut ser)?;

    let mut report_file = ser.into_inner();
    let _written = report_file.write(b"\n")?;

    info!("Generated JSON report. path: {:?}", report_file_path);

    Ok(())
}

#[cfg(feature = "markdown")]
fn json_report_to_markdown(json_report_file_name: &PathBuf) -> anyhow::Result<PathBuf> {
    let json_string = fs::read_to_string(json_report_file_name)?;

    let json = serde_json::from_str(&json_string)?;

    let renderer = MarkdownRenderer::default();
    let markdown = renderer.render(&json);

    let markdown_file_name = json_report_file_name.with_extension("md");
    fs::write(&markdown_file_name, markdown)?;

    info!("Generated Markdown report. path: {:?}", markdown_file_name);

    Ok(markdown_file_name)
}

#[cfg(not(feature = "markdown"))]
fn json_report_to_markdown(_json_report_file_name: &PathBuf) -> anyhow::Result<PathBuf> {
    anyhow::bail!("Markdown reports are not available, the 'markdown' feature is not enabled.")
}

#[derive(serde::Serialize)]
struct RequirementRecord<'a> {
    kind: &'a str,
    name: &'a str,
    prepared_ml: Decimal,
    direct_ml: Decimal,
    dilutions_ml: Option<Decimal>,
    required_ml: Decimal,
    recipe_solvent_ml: Decimal,
    shortfall_ml: Decimal,
    status: &'a str,
}

/// A file-name safe form of a name, e.g. `Screen 1/a` => `screen_1_a`.
fn file_stem(name: &str) -> String {
    match name.to_snake_case() {
        stem if stem.is_empty() => "unnamed".to_string(),
        stem => stem,
    }
}

/// File stems in the order of the names, a repeated stem gets the first free `_2`, `_3`, ... suffix.
fn unique_stems<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut used: BTreeSet<String> = BTreeSet::new();
    names
        .map(|name| {
            let stem = file_stem(name);
            let unique = std::iter::once(stem.clone())
                .chain((2..).map(|n| format!("{}_{}", stem, n)))
                .find(|candidate| !used.contains(candidate))
                .unwrap_or(stem);
            used.insert(unique.clone());
            unique
        })
        .collect()
}

/// One file per table, returns the paths of the files written.
pub fn save_as_csv(report: &PlateReport, directory: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = vec![];
    let stem = file_stem(&report.name);

    let volumes_path = directory.join(format!("{}_volumes.csv", stem));
    save_matrix_as_csv(report, &report.volumes, &volumes_path)?;
    paths.push(volumes_path);

    let reagent_stems = unique_stems(
        report
            .concentrations
            .iter()
            .map(|concentration| concentration.reagent.as_str()),
    );
    for (concentration, reagent_stem) in report.concentrations.iter().zip(reagent_stems) {
        let path = directory.join(format!("{}_concentration_{}.csv", stem, reagent_stem));
        save_matrix_as_csv(report, &concentration.matrix, &path)?;
        paths.push(path);
    }

    let requirements_path = directory.join(format!("{}_requirements.csv", stem));
    save_requirements_as_csv(&report.requirements, &requirements_path)
        .with_context(|| format!("Saving requirements. path: {:?}", requirements_path))?;
    paths.push(requirements_path);

    let dispensing_order_path = directory.join(format!("{}_dispensing_order.csv", stem));
    save_dispensing_order_as_csv(&report.dispensing_order, &dispensing_order_path)
        .with_context(|| format!("Saving dispensing order. path: {:?}", dispensing_order_path))?;
    paths.push(dispensing_order_path);

    for path in paths.iter() {
        info!("Generated CSV report. path: {:?}", path);
    }

    Ok(paths)
}

fn save_matrix_as_csv(report: &PlateReport, matrix: &Matrix, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Creating CSV file. path: {:?}", path))?;

    writer.write_record(std::iter::once("").chain(report.columns.iter().map(String::as_str)))?;
    for (label, row) in report.rows.iter().zip(matrix.cells.iter()) {
        let cells: Vec<String> = row.iter().map(Cell::to_string).collect();
        trace!("Matrix row. label: {}, cells: {:?}", label, cells);
        writer.write_record(std::iter::once(label.clone()).chain(cells))?;
    }

    writer.flush()?;

    Ok(())
}

fn save_requirements_as_csv(requirements: &Requirements, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new().from_path(path)?;

    fn status(is_short: bool) -> &'static str {
        match is_short {
            true => "shortfall",
            false => "ok",
        }
    }

    for requirement in requirements.stocks.iter() {
        writer.serialize(RequirementRecord {
            kind: "stock",
            name: &requirement.name,
            prepared_ml: requirement.prepared,
            direct_ml: requirement.direct,
            dilutions_ml: Some(requirement.dilutions),
            required_ml: requirement.required,
            recipe_solvent_ml: requirement.recipe_solvent,
            shortfall_ml: requirement.shortfall,
            status: status(requirement.is_short()),
        })?;
    }
    for requirement in requirements.solvents.iter() {
        writer.serialize(RequirementRecord {
            kind: "solvent",
            name: &requirement.name,
            prepared_ml: requirement.available,
            direct_ml: requirement.direct,
            dilutions_ml: None,
            required_ml: requirement.required,
            recipe_solvent_ml: requirement.recipe_usage,
            shortfall_ml: requirement.shortfall,
            status: status(requirement.is_short()),
        })?;
    }

    writer.flush()?;

    Ok(())
}

fn save_dispensing_order_as_csv(items: &[DispensingOrderItem], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new().from_path(path)?;

    if items.is_empty() {
        writer.write_record(["step", "what", "kind", "well", "volume"])?;
    }
    for item in items {
        writer.serialize(item)?;
    }

    writer.flush()?;

    Ok(())
}
