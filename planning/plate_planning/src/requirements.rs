use std::collections::{BTreeSet, HashMap};

use chem::units::microlitres_to_millilitres;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};
use util::decimal::format_fixed;

use crate::inventory::{Dispensable, Inventory, SolventKey, StockKey};
use crate::issue::{IssueKind, IssueSeverity, ReportIssue};
use crate::plate::Plate;

/// How much of a stock solution the plate needs, all volumes in mL.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize)]
pub struct StockRequirement {
    #[serde(skip)]
    pub stock: StockKey,
    pub name: String,
    pub prepared: Decimal,
    /// dispensed directly into wells
    pub direct: Decimal,
    /// consumed when preparing the stock solutions diluted from this one
    pub dilutions: Decimal,
    pub required: Decimal,
    /// solvent used by this stock's own recipe
    pub recipe_solvent: Decimal,
    pub shortfall: Decimal,
}

impl StockRequirement {
    pub fn is_short(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

/// Solvent use, all volumes in mL.
///
/// The requirement only counts solvent dispensed directly into wells, solvent used to prepare stock solutions is
/// accounted for in each stock's recipe and summarised in `recipe_usage`.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize)]
pub struct SolventRequirement {
    #[serde(skip)]
    pub solvent: SolventKey,
    pub name: String,
    pub available: Decimal,
    pub direct: Decimal,
    pub required: Decimal,
    pub recipe_usage: Decimal,
    pub shortfall: Decimal,
}

impl SolventRequirement {
    pub fn is_short(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[derive(serde::Serialize)]
pub struct Requirements {
    /// in creation order
    pub stocks: Vec<StockRequirement>,
    pub solvents: Vec<SolventRequirement>,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Insufficient stock, required volume exceeds the volume available. shortfalls: {shortfalls:?}")]
pub struct InsufficientStockError {
    pub shortfalls: Vec<String>,
}

impl Requirements {
    pub fn stock(&self, key: StockKey) -> Option<&StockRequirement> {
        self.stocks
            .iter()
            .find(|requirement| requirement.stock == key)
    }

    pub fn solvent(&self, key: SolventKey) -> Option<&SolventRequirement> {
        self.solvents
            .iter()
            .find(|requirement| requirement.solvent == key)
    }

    /// For callers that want a shortfall to be a hard stop instead of a report issue.
    pub fn ensure_sufficient(&self) -> Result<(), InsufficientStockError> {
        let shortfalls: Vec<String> = self
            .stocks
            .iter()
            .filter(|requirement| requirement.is_short())
            .map(|requirement| requirement.name.clone())
            .chain(
                self.solvents
                    .iter()
                    .filter(|requirement| requirement.is_short())
                    .map(|requirement| requirement.name.clone()),
            )
            .collect();

        match shortfalls.is_empty() {
            true => Ok(()),
            false => Err(InsufficientStockError {
                shortfalls,
            }),
        }
    }
}

/// Works out how much of each stock solution and solvent is required.
///
/// Stock solutions are visited children first, so that the volume each child consumes from its parent is known by
/// the time the parent is visited. Shortfalls are added to the issue set.
pub fn propagate(inventory: &Inventory, plate: &Plate, issue_set: &mut BTreeSet<ReportIssue>) -> Requirements {
    let mut direct: HashMap<Dispensable, Decimal> = HashMap::new();
    for event in plate.events() {
        *direct.entry(event.what).or_default() += event.total_volume();
    }
    let direct_millilitres =
        |what: Dispensable| microlitres_to_millilitres(direct.get(&what).copied().unwrap_or_default());

    let mut consumed_by_children: HashMap<StockKey, Decimal> = HashMap::new();
    let mut stocks: Vec<StockRequirement> = vec![];

    for (key, stock) in inventory.stocks().rev() {
        let direct = direct_millilitres(Dispensable::Stock(key));
        let dilutions = consumed_by_children
            .get(&key)
            .copied()
            .unwrap_or_default();
        let required = direct + dilutions;

        if let Some(parent) = stock.parent() {
            *consumed_by_children
                .entry(parent)
                .or_default() += stock.parent_volume();
        }

        let requirement = StockRequirement {
            stock: key,
            name: inventory.display_stock(key).to_string(),
            prepared: stock.volume(),
            direct,
            dilutions,
            required,
            recipe_solvent: stock.recipe().solvent_volume,
            shortfall: (required - stock.volume()).max(Decimal::ZERO),
        };
        debug!("Stock requirement. requirement: {:?}", requirement);

        if requirement.is_short() {
            issue_set.insert(ReportIssue {
                message: format!(
                    "Insufficient stock solution, required volume exceeds prepared volume. required: {} mL, prepared: {} mL",
                    format_fixed(requirement.required, 3),
                    format_fixed(requirement.prepared, 3),
                ),
                severity: IssueSeverity::Warning,
                kind: IssueKind::InsufficientStock {
                    stock: requirement.name.clone(),
                },
            });
        }

        stocks.push(requirement);
    }
    stocks.reverse();

    let solvents: Vec<SolventRequirement> = inventory
        .solvents()
        .map(|(key, solvent)| {
            let direct = direct_millilitres(Dispensable::Solvent(key));
            let recipe_usage = inventory
                .stocks()
                .filter(|(_, stock)| stock.solvent() == key)
                .map(|(_, stock)| stock.recipe().solvent_volume)
                .sum();

            SolventRequirement {
                solvent: key,
                name: solvent.name().to_string(),
                available: solvent.volume(),
                direct,
                required: direct,
                recipe_usage,
                shortfall: (direct - solvent.volume()).max(Decimal::ZERO),
            }
        })
        .collect();

    for requirement in solvents
        .iter()
        .filter(|requirement| requirement.is_short())
    {
        issue_set.insert(ReportIssue {
            message: format!(
                "Insufficient solvent, required volume exceeds available volume. required: {} mL, available: {} mL",
                format_fixed(requirement.required, 3),
                format_fixed(requirement.available, 3),
            ),
            severity: IssueSeverity::Warning,
            kind: IssueKind::InsufficientSolvent {
                solvent: requirement.name.clone(),
            },
        });
    }

    let requirements = Requirements {
        stocks,
        solvents,
    };
    info!(
        "Propagated requirements. stocks: {}, solvents: {}, sufficient: {}",
        requirements.stocks.len(),
        requirements.solvents.len(),
        requirements.ensure_sufficient().is_ok()
    );

    requirements
}
