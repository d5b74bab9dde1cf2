use chem::reagent::Reagent;
use chem::solvent::Solvent;
use rust_decimal::Decimal;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info};

use crate::stock::{RecipeInput, StockDisplay, StockError, StockInstructions, StockSolution};

new_key_type! {
    pub struct ReagentKey;
    pub struct SolventKey;
    pub struct StockKey;
}

/// Something that can be dispensed into a well, bare reagents cannot be dispensed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dispensable {
    Stock(StockKey),
    Solvent(SolventKey),
}

impl From<StockKey> for Dispensable {
    fn from(value: StockKey) -> Self {
        Self::Stock(value)
    }
}

impl From<SolventKey> for Dispensable {
    fn from(value: SolventKey) -> Self {
        Self::Solvent(value)
    }
}

/// What accumulates in a well, amounts are µmol for reagents and µL for solvents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Substance {
    Reagent(ReagentKey),
    Solvent(SolventKey),
}

/// What a dispense of `what` adds to a well, per µL dispensed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub substance: Substance,
    pub amount_per_microlitre: Decimal,
}

/// The substance registry and the stock solution graph.
///
/// Stock solutions can only refer to stock solutions that were created before them, so the creation order
/// is also a dependency order and the graph cannot contain cycles.
#[derive(Debug, Default)]
pub struct Inventory {
    reagents: SlotMap<ReagentKey, Reagent>,
    solvents: SlotMap<SolventKey, Solvent>,
    stocks: SlotMap<StockKey, StockSolution>,
    stock_order: Vec<StockKey>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reagent(&mut self, reagent: Reagent) -> ReagentKey {
        info!("Added reagent. reagent: {}", reagent);
        self.reagents.insert(reagent)
    }

    pub fn add_solvent(&mut self, solvent: Solvent) -> SolventKey {
        info!("Added solvent. solvent: '{}'", solvent);
        self.solvents.insert(solvent)
    }

    /// concentration in mol/L, volume in mL
    pub fn create_from_reagent(
        &mut self,
        reagent: ReagentKey,
        concentration: Decimal,
        solvent: SolventKey,
        volume: Decimal,
    ) -> Result<StockKey, StockError> {
        if !self.reagents.contains_key(reagent) {
            return Err(StockError::UnknownReagent(reagent));
        }
        if !self.solvents.contains_key(solvent) {
            return Err(StockError::UnknownSolvent(solvent));
        }

        let stock = StockSolution::from_reagent(reagent, concentration, solvent, volume)?;

        Ok(self.insert_stock(stock))
    }

    /// Fails if the concentration is higher than the parent's, stock solutions can only be diluted.
    pub fn create_by_dilution(
        &mut self,
        parent: StockKey,
        concentration: Decimal,
        solvent: SolventKey,
        volume: Decimal,
    ) -> Result<StockKey, StockError> {
        let parent_concentration = self
            .stocks
            .get(parent)
            .ok_or(StockError::UnknownStock(parent))?
            .concentration();
        if !self.solvents.contains_key(solvent) {
            return Err(StockError::UnknownSolvent(solvent));
        }

        if concentration > parent_concentration {
            return Err(StockError::InvalidDilution {
                parent: self.display_stock(parent).to_string(),
                parent_concentration,
                concentration,
            });
        }

        let stock = StockSolution::from_parent(parent, parent_concentration, concentration, solvent, volume)?;

        Ok(self.insert_stock(stock))
    }

    fn insert_stock(&mut self, stock: StockSolution) -> StockKey {
        let key = self.stocks.insert(stock);
        self.stock_order.push(key);

        info!(
            "Created stock solution. stock: '{}', instructions: '{}'",
            self.display_stock(key),
            self.instructions(key)
        );
        debug!("Stock solution recipe. recipe: {:?}", self.stocks[key].recipe());

        key
    }

    pub fn reagent(&self, key: ReagentKey) -> Option<&Reagent> {
        self.reagents.get(key)
    }

    pub fn solvent(&self, key: SolventKey) -> Option<&Solvent> {
        self.solvents.get(key)
    }

    pub fn stock(&self, key: StockKey) -> Option<&StockSolution> {
        self.stocks.get(key)
    }

    pub fn reagents(&self) -> impl Iterator<Item = (ReagentKey, &Reagent)> {
        self.reagents.iter()
    }

    pub fn solvents(&self) -> impl Iterator<Item = (SolventKey, &Solvent)> {
        self.solvents.iter()
    }

    /// In creation order, parents always precede their children.
    pub fn stocks(&self) -> impl DoubleEndedIterator<Item = (StockKey, &StockSolution)> {
        self.stock_order
            .iter()
            .map(|key| (*key, &self.stocks[*key]))
    }

    /// Stock keys in a topological order, parents before children.
    pub fn dependency_order(&self) -> &[StockKey] {
        &self.stock_order
    }

    /// Follows the parent links back to the reagent the stock was originally made from.
    pub fn ultimate_reagent(&self, key: StockKey) -> Option<ReagentKey> {
        let mut current = self.stocks.get(key)?;
        loop {
            match current.parent() {
                Some(parent) => current = self.stocks.get(parent)?,
                None => {
                    return match current.recipe().input {
                        RecipeInput::Solute {
                            reagent, ..
                        } => Some(reagent),
                        RecipeInput::Parent {
                            ..
                        } => None,
                    };
                }
            }
        }
    }

    pub fn contribution(&self, what: Dispensable) -> Option<Contribution> {
        match what {
            Dispensable::Stock(key) => {
                let stock = self.stocks.get(key)?;
                let reagent = self.ultimate_reagent(key)?;
                Some(Contribution {
                    substance: Substance::Reagent(reagent),
                    // mol/L × µL = µmol
                    amount_per_microlitre: stock.concentration(),
                })
            }
            Dispensable::Solvent(key) => {
                self.solvents.get(key)?;
                Some(Contribution {
                    substance: Substance::Solvent(key),
                    amount_per_microlitre: Decimal::ONE,
                })
            }
        }
    }

    pub fn display_stock(&self, key: StockKey) -> StockDisplay<'_> {
        StockDisplay {
            inventory: self,
            key,
        }
    }

    pub fn instructions(&self, key: StockKey) -> StockInstructions<'_> {
        StockInstructions {
            inventory: self,
            key,
        }
    }

    pub fn dispensable_name(&self, what: Dispensable) -> String {
        match what {
            Dispensable::Stock(key) => self.display_stock(key).to_string(),
            Dispensable::Solvent(key) => self
                .solvent(key)
                .map(|solvent| solvent.name().to_string())
                .unwrap_or_else(|| format!("<unknown solvent {:?}>", key)),
        }
    }

    pub fn substance_name(&self, substance: Substance) -> String {
        match substance {
            Substance::Reagent(key) => self
                .reagent(key)
                .map(|reagent| reagent.name().to_string())
                .unwrap_or_else(|| format!("<unknown reagent {:?}>", key)),
            Substance::Solvent(key) => self.dispensable_name(Dispensable::Solvent(key)),
        }
    }
}
