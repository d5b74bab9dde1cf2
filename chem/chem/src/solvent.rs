use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use thiserror::Error;

/// A liquid used to dissolve or dilute a reagent, solvents can also be dispensed directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(serde::Serialize)]
pub struct Solvent {
    name: String,
    /// Volume available, in mL.
    volume: Decimal,
}

#[derive(Error, Debug, PartialEq)]
pub enum SolventError {
    #[error("Solvent name must not be blank.")]
    BlankName,
    #[error("Invalid solvent volume, must be >= 0. solvent: '{0}', volume: {1}")]
    InvalidVolume(String, Decimal),
}

impl Solvent {
    pub fn new(name: &str, volume: Decimal) -> Result<Self, SolventError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SolventError::BlankName);
        }
        if volume < Decimal::ZERO {
            return Err(SolventError::InvalidVolume(name.to_string(), volume));
        }

        Ok(Self {
            name: name.to_string(),
            volume,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }
}

impl Display for Solvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
