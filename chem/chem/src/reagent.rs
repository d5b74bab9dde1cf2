use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use thiserror::Error;
use util::decimal::format_fixed;

/// A chemical used as a solute.
///
/// Reagents are immutable once created, use [`Reagent::new_solid`] or [`Reagent::new_liquid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(serde::Serialize)]
pub struct Reagent {
    name: String,
    /// g/mol
    molecular_weight: Decimal,
    form: ReagentForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReagentForm {
    Solid,
    /// density in g/mL
    Liquid { density: Decimal },
}

#[derive(Error, Debug, PartialEq)]
pub enum ReagentError {
    #[error("Reagent name must not be blank.")]
    BlankName,
    #[error("Invalid molecular weight, must be > 0. reagent: '{0}', molecular_weight: {1}")]
    InvalidMolecularWeight(String, Decimal),
    #[error("Invalid density, must be > 0. reagent: '{0}', density: {1}")]
    InvalidDensity(String, Decimal),
}

impl Reagent {
    pub fn new_solid(name: &str, molecular_weight: Decimal) -> Result<Self, ReagentError> {
        Self::new(name, molecular_weight, ReagentForm::Solid)
    }

    pub fn new_liquid(name: &str, molecular_weight: Decimal, density: Decimal) -> Result<Self, ReagentError> {
        Self::new(name, molecular_weight, ReagentForm::Liquid {
            density,
        })
    }

    fn new(name: &str, molecular_weight: Decimal, form: ReagentForm) -> Result<Self, ReagentError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReagentError::BlankName);
        }
        if molecular_weight <= Decimal::ZERO {
            return Err(ReagentError::InvalidMolecularWeight(name.to_string(), molecular_weight));
        }
        if let ReagentForm::Liquid {
            density,
        } = form
        {
            if density <= Decimal::ZERO {
                return Err(ReagentError::InvalidDensity(name.to_string(), density));
            }
        }

        Ok(Self {
            name: name.to_string(),
            molecular_weight,
            form,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn molecular_weight(&self) -> Decimal {
        self.molecular_weight
    }

    pub fn form(&self) -> ReagentForm {
        self.form
    }

    /// mol => g
    pub fn mass_of(&self, moles: Decimal) -> Decimal {
        moles * self.molecular_weight
    }

    /// mol => mL of neat liquid, `None` for solids.
    pub fn neat_volume_of(&self, moles: Decimal) -> Option<Decimal> {
        match self.form {
            ReagentForm::Solid => None,
            ReagentForm::Liquid {
                density,
            } => Some(self.mass_of(moles) / density),
        }
    }
}

impl Display for Reagent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.form {
            ReagentForm::Solid => write!(f, "{} ({} g/mol)", self.name, format_fixed(self.molecular_weight, 2)),
            ReagentForm::Liquid {
                density,
            } => write!(
                f,
                "{} ({} g/mol, {} g/mL)",
                self.name,
                format_fixed(self.molecular_weight, 2),
                format_fixed(density, 3)
            ),
        }
    }
}

#[cfg(feature = "testing")]
impl Default for Reagent {
    fn default() -> Self {
        Self {
            name: "Default Reagent".to_string(),
            molecular_weight: Decimal::ONE_HUNDRED,
            form: ReagentForm::Solid,
        }
    }
}
