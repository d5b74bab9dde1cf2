pub mod dispense;
pub mod inventory;
pub mod issue;
pub mod location;
pub mod plate;
pub mod requirements;
pub mod stock;
pub mod well;

pub mod report;
