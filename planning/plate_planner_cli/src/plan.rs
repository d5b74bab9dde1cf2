use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use anyhow::{bail, Context};
use chem::reagent::Reagent;
use chem::solvent::Solvent;
use indexmap::IndexMap;
use plate_planning::dispense::{DispenseError, GradientOrder};
use plate_planning::inventory::{Dispensable, Inventory, ReagentKey, SolventKey, StockKey};
use plate_planning::location::{AxisSelection, AxisToken};
use plate_planning::plate::{AxisLabels, Plate, PlateTemplate};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_with::formats::PreferMany;
use serde_with::{serde_as, OneOrMany};
use tracing::{info, warn, Level};
use util::source::FileSource;

/// A plate design, the substances it needs and the ordered dispense steps.
///
/// Volumes of solvents and stock solutions are in mL, concentrations in mol/L, dispense volumes in µL.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    pub name: String,
    #[serde(default)]
    pub reagents: Vec<ReagentRecord>,
    #[serde(default)]
    pub solvents: Vec<SolventRecord>,
    #[serde(default)]
    pub stocks: Vec<StockRecord>,
    pub plate: PlateRecord,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReagentRecord {
    /// Defaults to the name
    pub id: Option<String>,
    pub name: String,
    /// g/mol
    pub molecular_weight: Decimal,
    #[serde(default)]
    pub form: ReagentFormRecord,
    /// g/mL, liquids only
    pub density: Option<Decimal>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReagentFormRecord {
    #[default]
    Solid,
    Liquid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolventRecord {
    pub name: String,
    /// mL available
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct StockRecord {
    pub id: String,
    #[serde(flatten)]
    pub source: StockSourceRecord,
    pub concentration: Decimal,
    pub solvent: String,
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StockSourceRecord {
    Reagent { reagent: String },
    Parent { parent: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum PlateRecord {
    #[serde(rename = "generic_96_well")]
    Generic96Well { max_volume_per_well: Decimal },
    #[serde(rename = "generic_384_well")]
    Generic384Well { max_volume_per_well: Decimal },
    Custom {
        make: String,
        rows: AxisLabelsRecord,
        columns: AxisLabelsRecord,
        max_volume_per_well: Decimal,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AxisLabelsRecord {
    Count(usize),
    Labels(Vec<String>),
}

impl From<AxisLabelsRecord> for AxisLabels {
    fn from(value: AxisLabelsRecord) -> Self {
        match value {
            AxisLabelsRecord::Count(count) => AxisLabels::Count(count),
            AxisLabelsRecord::Labels(labels) => AxisLabels::Labels(labels),
        }
    }
}

/// A row or column, either a 1-based ordinal (`1`, `"1"`) or a label (`"B"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AxisTokenRecord {
    Ordinal(usize),
    Label(String),
}

impl From<&AxisTokenRecord> for AxisToken {
    fn from(value: &AxisTokenRecord) -> Self {
        match value {
            AxisTokenRecord::Ordinal(ordinal) => AxisToken::Ordinal(*ordinal),
            AxisTokenRecord::Label(label) => AxisToken::from(label.as_str()),
        }
    }
}

/// `what` names a stock solution by id or display name, or a solvent by name.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepRecord {
    Wells {
        what: String,
        volume: Decimal,
        #[serde_as(as = "OneOrMany<_, PreferMany>")]
        wells: Vec<String>,
    },
    Custom {
        what: String,
        volumes: IndexMap<String, Decimal>,
    },
    Rows {
        what: String,
        volume: Decimal,
        #[serde_as(as = "OneOrMany<_, PreferMany>")]
        rows: Vec<AxisTokenRecord>,
    },
    Columns {
        what: String,
        volume: Decimal,
        #[serde_as(as = "OneOrMany<_, PreferMany>")]
        columns: Vec<AxisTokenRecord>,
    },
    GradientRow {
        what: String,
        start: String,
        end: String,
        lo_volume: Decimal,
        hi_volume: Decimal,
        #[serde(default)]
        order: GradientOrder,
    },
    GradientColumn {
        what: String,
        start: String,
        end: String,
        lo_volume: Decimal,
        hi_volume: Decimal,
        #[serde(default)]
        order: GradientOrder,
    },
    Block {
        what: String,
        volume: Decimal,
        upper_left: String,
        bottom_right: String,
    },
    FillToVolume {
        what: String,
        target_volume: Decimal,
        upper_left: String,
        bottom_right: String,
    },
}

impl StepRecord {
    pub fn what(&self) -> &str {
        match self {
            StepRecord::Wells {
                what, ..
            }
            | StepRecord::Custom {
                what, ..
            }
            | StepRecord::Rows {
                what, ..
            }
            | StepRecord::Columns {
                what, ..
            }
            | StepRecord::GradientRow {
                what, ..
            }
            | StepRecord::GradientColumn {
                what, ..
            }
            | StepRecord::Block {
                what, ..
            }
            | StepRecord::FillToVolume {
                what, ..
            } => what,
        }
    }
}

#[tracing::instrument(level = Level::DEBUG)]
pub fn load_plan(plan_source: &FileSource) -> anyhow::Result<PlanFile> {
    info!("Loading plan. source: '{}'", plan_source);

    let plan_source = FileSource::try_from_path(plan_source.path().to_path_buf())?;
    let file = File::open(plan_source.path()).with_context(|| format!("Error opening plan. file: {}", plan_source))?;
    let reader = BufReader::new(file);

    let plan: PlanFile =
        serde_json::from_reader(reader).with_context(|| format!("Error parsing plan. file: {}", plan_source))?;

    info!(
        "Loaded plan. name: '{}', reagents: {}, solvents: {}, stocks: {}, steps: {}",
        plan.name,
        plan.reagents.len(),
        plan.solvents.len(),
        plan.stocks.len(),
        plan.steps.len()
    );

    Ok(plan)
}

/// The inventory and the empty plate built from a plan, ready for the steps to be replayed.
pub struct Workspace {
    pub inventory: Inventory,
    pub plate: Plate,
    stocks: HashMap<String, StockKey>,
    solvents: HashMap<String, SolventKey>,
}

impl Workspace {
    pub fn build(plan: &PlanFile) -> anyhow::Result<Self> {
        let mut inventory = Inventory::new();

        let mut reagents: HashMap<String, ReagentKey> = HashMap::new();
        for record in plan.reagents.iter() {
            let reagent = match (record.form, record.density) {
                (ReagentFormRecord::Solid, None) => Reagent::new_solid(&record.name, record.molecular_weight),
                (ReagentFormRecord::Liquid, Some(density)) => {
                    Reagent::new_liquid(&record.name, record.molecular_weight, density)
                }
                (ReagentFormRecord::Solid, Some(_)) => bail!("Solid reagent with a density. reagent: '{}'", record.name),
                (ReagentFormRecord::Liquid, None) => bail!("Liquid reagent without a density. reagent: '{}'", record.name),
            }
            .with_context(|| format!("Invalid reagent. reagent: '{}'", record.name))?;

            let id = record
                .id
                .clone()
                .unwrap_or_else(|| record.name.clone());
            if reagents.contains_key(&id) {
                bail!("Duplicate reagent. id: '{}'", id);
            }
            reagents.insert(id, inventory.add_reagent(reagent));
        }

        let mut solvents: HashMap<String, SolventKey> = HashMap::new();
        for record in plan.solvents.iter() {
            let solvent = Solvent::new(&record.name, record.volume)
                .with_context(|| format!("Invalid solvent. solvent: '{}'", record.name))?;
            if solvents.contains_key(&record.name) {
                bail!("Duplicate solvent. name: '{}'", record.name);
            }
            solvents.insert(record.name.clone(), inventory.add_solvent(solvent));
        }

        let mut stocks: HashMap<String, StockKey> = HashMap::new();
        for record in plan.stocks.iter() {
            if stocks.contains_key(&record.id) {
                bail!("Duplicate stock. id: '{}'", record.id);
            }
            let solvent = *solvents
                .get(&record.solvent)
                .with_context(|| format!("Unknown solvent. stock: '{}', solvent: '{}'", record.id, record.solvent))?;

            let stock = match &record.source {
                StockSourceRecord::Reagent {
                    reagent,
                } => {
                    let reagent = *reagents
                        .get(reagent)
                        .with_context(|| format!("Unknown reagent. stock: '{}', reagent: '{}'", record.id, reagent))?;
                    inventory.create_from_reagent(reagent, record.concentration, solvent, record.volume)
                }
                // parents must be declared first, so the plan order is always a valid preparation order
                StockSourceRecord::Parent {
                    parent,
                } => {
                    let parent = *stocks
                        .get(parent)
                        .with_context(|| format!("Unknown parent stock. stock: '{}', parent: '{}'", record.id, parent))?;
                    inventory.create_by_dilution(parent, record.concentration, solvent, record.volume)
                }
            }
            .with_context(|| format!("Invalid stock. stock: '{}'", record.id))?;

            stocks.insert(record.id.clone(), stock);
        }

        let template = match &plan.plate {
            PlateRecord::Generic96Well {
                max_volume_per_well,
            } => PlateTemplate::generic_96_well(*max_volume_per_well),
            PlateRecord::Generic384Well {
                max_volume_per_well,
            } => PlateTemplate::generic_384_well(*max_volume_per_well),
            PlateRecord::Custom {
                make,
                rows,
                columns,
                max_volume_per_well,
            } => PlateTemplate::new(
                make,
                AxisLabels::from(rows.clone()),
                AxisLabels::from(columns.clone()),
                *max_volume_per_well,
            ),
        }
        .context("Invalid plate template")?;

        let plate = Plate::new(&plan.name, template).context("Invalid plate")?;

        Ok(Self {
            inventory,
            plate,
            stocks,
            solvents,
        })
    }

    /// Stock ids first, then stock display names, then solvent names.
    pub fn resolve_dispensable(&self, what: &str) -> Option<Dispensable> {
        if let Some(stock) = self.stocks.get(what) {
            return Some(Dispensable::Stock(*stock));
        }

        let by_display_name = self
            .inventory
            .stocks()
            .find(|(key, _stock)| {
                self.inventory
                    .display_stock(*key)
                    .to_string()
                    .eq(what)
            })
            .map(|(key, _stock)| Dispensable::Stock(key));
        if by_display_name.is_some() {
            return by_display_name;
        }

        self.solvents
            .get(what)
            .map(|solvent| Dispensable::Solvent(*solvent))
    }

    pub fn apply(&mut self, step: &StepRecord) -> anyhow::Result<Result<(), DispenseError>> {
        let what = self
            .resolve_dispensable(step.what())
            .with_context(|| format!("Unknown stock solution or solvent. what: '{}'", step.what()))?;

        let inventory = &self.inventory;
        let plate = &mut self.plate;

        let result = match step {
            StepRecord::Wells {
                volume,
                wells,
                ..
            } => plate.add_to_wells(inventory, what, *volume, wells),
            StepRecord::Custom {
                volumes, ..
            } => plate.add_custom(
                inventory,
                what,
                volumes
                    .iter()
                    .map(|(well, volume)| (well, *volume)),
            ),
            StepRecord::Rows {
                volume,
                rows,
                ..
            } => plate.add_to_rows(inventory, what, *volume, selection(rows)),
            StepRecord::Columns {
                volume,
                columns,
                ..
            } => plate.add_to_columns(inventory, what, *volume, selection(columns)),
            StepRecord::GradientRow {
                start,
                end,
                lo_volume,
                hi_volume,
                order,
                ..
            } => plate.add_gradient_to_row(inventory, what, start, end, *lo_volume, *hi_volume, *order),
            StepRecord::GradientColumn {
                start,
                end,
                lo_volume,
                hi_volume,
                order,
                ..
            } => plate.add_gradient_to_column(inventory, what, start, end, *lo_volume, *hi_volume, *order),
            StepRecord::Block {
                volume,
                upper_left,
                bottom_right,
                ..
            } => plate.add_to_block(inventory, what, *volume, upper_left, bottom_right),
            StepRecord::FillToVolume {
                target_volume,
                upper_left,
                bottom_right,
                ..
            } => plate.fill_block_up_to_volume(inventory, what, *target_volume, upper_left, bottom_right),
        };

        Ok(result)
    }

    /// Applies each step in order.
    ///
    /// Over-volume and negative-volume failures are recorded on the plate and do not stop the replay, any other
    /// failure does.
    pub fn replay(&mut self, steps: &[StepRecord]) -> anyhow::Result<()> {
        for (index, step) in steps.iter().enumerate() {
            let step_number = index + 1;
            match self.apply(step)? {
                Ok(()) => {}
                Err(error @ (DispenseError::OverVolume {
                    ..
                }
                | DispenseError::NegativeVolume {
                    ..
                })) => {
                    warn!("Step rejected. step: {}, what: '{}', error: {}", step_number, step.what(), error);
                }
                Err(error) => {
                    return Err(error).with_context(|| format!("Error applying step. step: {}", step_number));
                }
            }
        }

        info!(
            "Replayed plan. steps: {}, applied: {}, rejected: {}",
            steps.len(),
            self.plate.events().len(),
            self.plate.rejections().len()
        );

        Ok(())
    }
}

fn selection(tokens: &[AxisTokenRecord]) -> AxisSelection {
    AxisSelection(
        tokens
            .iter()
            .map(AxisToken::from)
            .collect(),
    )
}
