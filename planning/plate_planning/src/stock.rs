use std::fmt::{Display, Formatter};

use chem::units::{millilitres_to_microlitres, moles_in};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use util::decimal::format_fixed;

use crate::inventory::{Inventory, ReagentKey, SolventKey, StockKey};

/// A prepared solution at a known concentration and volume.
///
/// Nodes of the stock solution graph, a node made by dilution refers to its parent by key.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSolution {
    /// mol/L
    concentration: Decimal,
    /// mL, the total volume prepared
    volume: Decimal,
    recipe: Recipe,
}

/// What goes into preparing a stock solution, distinct from how much of it is used afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    pub input: RecipeInput,
    pub solvent: SolventKey,
    /// mL
    pub solvent_volume: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecipeInput {
    Solute {
        reagent: ReagentKey,
        /// mol
        moles: Decimal,
    },
    Parent {
        stock: StockKey,
        /// mL of the parent consumed
        volume: Decimal,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum StockError {
    #[error(
        "Invalid dilution, concentration exceeds the parent concentration. parent: '{parent}', parent_concentration: {parent_concentration}, concentration: {concentration}"
    )]
    InvalidDilution {
        parent: String,
        parent_concentration: Decimal,
        concentration: Decimal,
    },

    #[error("Invalid {quantity}, must be > 0. value: {value}")]
    InvalidQuantity { quantity: &'static str, value: Decimal },

    #[error("Unknown reagent. key: {0:?}")]
    UnknownReagent(ReagentKey),
    #[error("Unknown solvent. key: {0:?}")]
    UnknownSolvent(SolventKey),
    #[error("Unknown stock solution. key: {0:?}")]
    UnknownStock(StockKey),
}

impl StockSolution {
    pub(crate) fn from_reagent(
        reagent: ReagentKey,
        concentration: Decimal,
        solvent: SolventKey,
        volume: Decimal,
    ) -> Result<Self, StockError> {
        ensure_positive("concentration", concentration)?;
        ensure_positive("volume", volume)?;

        Ok(Self {
            concentration,
            volume,
            recipe: Recipe {
                input: RecipeInput::Solute {
                    reagent,
                    moles: moles_in(concentration, volume),
                },
                solvent,
                solvent_volume: volume,
            },
        })
    }

    /// `parent_concentration` must be the concentration of `parent`.
    pub(crate) fn from_parent(
        parent: StockKey,
        parent_concentration: Decimal,
        concentration: Decimal,
        solvent: SolventKey,
        volume: Decimal,
    ) -> Result<Self, StockError> {
        ensure_positive("concentration", concentration)?;
        ensure_positive("volume", volume)?;

        let parent_volume = concentration * volume / parent_concentration;

        Ok(Self {
            concentration,
            volume,
            recipe: Recipe {
                input: RecipeInput::Parent {
                    stock: parent,
                    volume: parent_volume,
                },
                solvent,
                solvent_volume: volume - parent_volume,
            },
        })
    }

    pub fn concentration(&self) -> Decimal {
        self.concentration
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn solvent(&self) -> SolventKey {
        self.recipe.solvent
    }

    pub fn parent(&self) -> Option<StockKey> {
        match self.recipe.input {
            RecipeInput::Parent {
                stock, ..
            } => Some(stock),
            RecipeInput::Solute {
                ..
            } => None,
        }
    }

    /// mL of the parent consumed when preparing this stock, zero for stocks made from a reagent.
    pub fn parent_volume(&self) -> Decimal {
        match self.recipe.input {
            RecipeInput::Parent {
                volume, ..
            } => volume,
            RecipeInput::Solute {
                ..
            } => Decimal::ZERO,
        }
    }
}

fn ensure_positive(quantity: &'static str, value: Decimal) -> Result<(), StockError> {
    if value <= Decimal::ZERO {
        return Err(StockError::InvalidQuantity {
            quantity,
            value,
        });
    }
    Ok(())
}

/// e.g. `sodium sulfate (0.50 M in water)`, `triethylamine (10.0 mM in DMSO)`
pub struct StockDisplay<'a> {
    pub(crate) inventory: &'a Inventory,
    pub(crate) key: StockKey,
}

impl<'a> Display for StockDisplay<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some(stock) = self.inventory.stock(self.key) else {
            return write!(f, "<unknown stock {:?}>", self.key);
        };

        let reagent = self
            .inventory
            .ultimate_reagent(self.key)
            .and_then(|key| self.inventory.reagent(key))
            .map(|reagent| reagent.name())
            .unwrap_or("?");
        let solvent = self
            .inventory
            .solvent(stock.solvent())
            .map(|solvent| solvent.name())
            .unwrap_or("?");

        let concentration = stock.concentration();
        if concentration > dec!(0.1) {
            write!(f, "{} ({} M in {})", reagent, format_fixed(concentration, 2), solvent)
        } else {
            write!(
                f,
                "{} ({} mM in {})",
                reagent,
                format_fixed(concentration * dec!(1000), 1),
                solvent
            )
        }
    }
}

/// Bench instructions for preparing a stock solution.
pub struct StockInstructions<'a> {
    pub(crate) inventory: &'a Inventory,
    pub(crate) key: StockKey,
}

impl<'a> Display for StockInstructions<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some(stock) = self.inventory.stock(self.key) else {
            return write!(f, "<unknown stock {:?}>", self.key);
        };
        let recipe = stock.recipe();
        let solvent = self
            .inventory
            .solvent(recipe.solvent)
            .map(|solvent| solvent.name())
            .unwrap_or("?");

        match recipe.input {
            RecipeInput::Solute {
                reagent,
                moles,
            } => {
                let Some(reagent) = self.inventory.reagent(reagent) else {
                    return write!(f, "<unknown reagent {:?}>", reagent);
                };
                let grams = reagent.mass_of(moles);

                match reagent.neat_volume_of(moles) {
                    None if grams < Decimal::ONE => write!(
                        f,
                        "Add {} mg of {} to {} mL of {}.",
                        format_fixed(grams * dec!(1000), 1),
                        reagent.name(),
                        format_fixed(stock.volume(), 2),
                        solvent
                    ),
                    None => write!(
                        f,
                        "Add {} g of {} to {} mL of {}.",
                        format_fixed(grams, 3),
                        reagent.name(),
                        format_fixed(stock.volume(), 2),
                        solvent
                    ),
                    Some(millilitres) => {
                        if millilitres < Decimal::ONE {
                            write!(
                                f,
                                "Add {} uL of {} to {} mL of {}.",
                                format_fixed(millilitres_to_microlitres(millilitres), 3),
                                reagent.name(),
                                format_fixed(stock.volume(), 3),
                                solvent
                            )
                        } else {
                            write!(
                                f,
                                "Add {} mL of {} to {} mL of {}.",
                                format_fixed(millilitres, 3),
                                reagent.name(),
                                format_fixed(stock.volume(), 3),
                                solvent
                            )
                        }
                    }
                }
            }
            RecipeInput::Parent {
                stock: parent,
                volume,
            } => write!(
                f,
                "Add {} mL of {} to {} mL of {}.",
                format_fixed(volume, 3),
                self.inventory.display_stock(parent),
                format_fixed(recipe.solvent_volume, 3),
                solvent
            ),
        }
    }
}
