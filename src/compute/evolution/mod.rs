//! Single-threaded MAP-Elites evolution: archive, randomness and the
//! generation loop.
//!
//! # Overview
//!
//! - **Archive** (`archive`): elitist niche map with nearest-neighbor
//!   fallback and whole-file snapshot persistence
//! - **Randomness** (`rng`): seeded generation and mutation of candidates
//! - **Generation Loop** (`generation`): exploration/exploitation driver
//!   that proposes candidates, evaluates them against sample datasets and
//!   updates the archive
//!
//! All mutation of the archive happens on the caller's thread; the only
//! concurrent phase of the engine lives in [`crate::compute::ScaleScheduler`].

mod archive;
mod generation;
mod rng;

pub use archive::{ArchiveError, EliteArchive};
pub use generation::EliteOptimizer;
pub use rng::TunerRng;
