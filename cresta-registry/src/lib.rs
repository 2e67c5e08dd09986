pub mod registry;
pub mod unit;

pub use registry::{RegistryError, UnitRegistry};
pub use unit::{Unit, UnitStatus, UnitType};
