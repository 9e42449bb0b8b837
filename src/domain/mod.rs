// Domain layer: core models and ports (interfaces). No external dependencies beyond std/serde/chrono.

pub mod ledger;
pub mod model;
pub mod ports;
pub mod preference;
pub mod recovery_date;
