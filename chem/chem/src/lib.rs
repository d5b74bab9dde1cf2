pub mod reagent;
pub mod solvent;
pub mod units;
