//! Unit conventions.
//!
//! * concentration: mol/L
//! * stock volumes: mL
//! * well volumes: µL
//! * amount of reagent in a well: µmol, since `mol/L × µL = µmol`
//! * molecular weight: g/mol
//! * density: g/mL

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const MICROLITRES_PER_MILLILITRE: Decimal = dec!(1000);
pub const MILLILITRES_PER_LITRE: Decimal = dec!(1000);

pub fn microlitres_to_millilitres(microlitres: Decimal) -> Decimal {
    microlitres / MICROLITRES_PER_MILLILITRE
}

pub fn millilitres_to_microlitres(millilitres: Decimal) -> Decimal {
    millilitres * MICROLITRES_PER_MILLILITRE
}

/// mol/L × mL => mol
pub fn moles_in(concentration: Decimal, millilitres: Decimal) -> Decimal {
    concentration * millilitres / MILLILITRES_PER_LITRE
}
