//! Batch Elites - MAP-Elites quality-diversity search for batch-validation
//! tuning parameters.
//!
//! This crate discovers batch-processing configurations that maximize
//! measured validation throughput, organized by behavioral niches that
//! describe workload shape (field count, constraint complexity, object
//! size). Elite configurations are kept in a sparse archive where a niche
//! occupant is only ever replaced by a strictly fitter candidate.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Profiles, individuals, configuration and result documents
//! - `compute`: The engine (archive, generation loop, scheduler, controller)
//! - `workload`: The trait boundary to the system under test
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batch_elites::{
//!     compute::ScalingController,
//!     schema::{Individual, TunerConfig, WorkloadProfile},
//!     workload::Workload,
//! };
//!
//! struct MyEngine;
//!
//! impl Workload for MyEngine {
//!     type Dataset = Vec<u64>;
//!
//!     fn generate(&self, _profile: &WorkloadProfile, items: usize) -> Vec<u64> {
//!         vec![0; items]
//!     }
//!
//!     fn throughput(&self, _ind: &Individual, _profile: &WorkloadProfile, data: &Vec<u64>) -> f64 {
//!         data.len() as f64
//!     }
//! }
//!
//! let config = TunerConfig {
//!     profiles: vec![WorkloadProfile {
//!         field_count: 3,
//!         avg_string_length: 10.0,
//!         constraint_complexity: 0.0,
//!         object_size_kb: 0.1,
//!     }],
//!     scales: vec![1_000, 10_000],
//!     ..Default::default()
//! };
//!
//! let mut controller = ScalingController::new(config, Arc::new(MyEngine)).unwrap();
//! let outcome = controller.run().unwrap();
//! println!("archive size: {}", outcome.report.archive_size);
//! ```

pub mod compute;
pub mod schema;
pub mod workload;

// Re-export commonly used types
pub use compute::{EliteArchive, EliteOptimizer, ScaleScheduler, ScalingController};
pub use schema::{Individual, NicheCoordinate, ScaleResult, TunerConfig, WorkloadProfile};
pub use workload::Workload;
