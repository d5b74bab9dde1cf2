use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::inventory::Substance;

/// One reservoir on a plate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Well {
    /// µL
    volume: Decimal,
    /// µmol for reagents, µL for solvents, in order of first arrival
    contents: IndexMap<Substance, Decimal>,
}

impl Well {
    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn is_empty(&self) -> bool {
        self.volume.is_zero()
    }

    pub fn amount_of(&self, substance: Substance) -> Decimal {
        self.contents
            .get(&substance)
            .copied()
            .unwrap_or_default()
    }

    pub fn contents(&self) -> &IndexMap<Substance, Decimal> {
        &self.contents
    }

    /// mol/L, `None` for an empty well.
    pub fn concentration_of(&self, substance: Substance) -> Option<Decimal> {
        if self.is_empty() {
            return None;
        }
        // µmol / µL = mol/L
        Some(self.amount_of(substance) / self.volume)
    }

    pub(crate) fn add(&mut self, substance: Substance, amount: Decimal, volume: Decimal) {
        if volume.is_zero() {
            return;
        }
        self.volume += volume;
        *self
            .contents
            .entry(substance)
            .or_default() += amount;
    }
}
