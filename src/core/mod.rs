pub mod allocation;
pub mod coordinator;
pub mod normalizer;
pub mod report;
pub mod submission;

pub use crate::domain::ledger::Ledger;
pub use crate::domain::model::{Assignment, Association, Bike, Recovery};
pub use crate::domain::ports::{RecoveryStore, Storage};
pub use crate::domain::preference::{Preference, Tier};
pub use crate::domain::recovery_date::RecoveryDate;
pub use crate::utils::error::Result;
