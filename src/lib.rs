pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::TomlConfig;

pub use adapters::{DocumentStore, LocalStorage, MemoryStorage};
pub use core::{
    allocation::AllocationEngine,
    coordinator::RunCoordinator,
    submission::{SubmissionOutcome, SubmissionService},
};
pub use utils::error::{AllocError, Result};
