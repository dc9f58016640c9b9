//! Compute module - The quality-diversity search engine.

mod controller;
mod scheduler;

pub mod evolution;

pub use controller::*;
pub use evolution::{ArchiveError, EliteArchive, EliteOptimizer, TunerRng};
pub use scheduler::*;
