//! Schema module - Profiles, individuals, configuration and result documents.

mod config;
mod individual;
mod profile;
mod results;

pub use config::*;
pub use individual::*;
pub use profile::*;
pub use results::*;
