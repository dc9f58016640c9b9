//! Trait boundary to the system under test.
//!
//! The tuner never touches the validation engine directly. Everything it
//! needs - dataset generation, timed evaluation, and an optional baseline
//! comparator for ratio reporting - crosses this trait.

use crate::schema::{Individual, WorkloadProfile};

/// The system under test, seen through the tuner's eyes.
///
/// Implementations must be safe to call from multiple worker threads at
/// once; the scheduler shares one instance across its pool. Tasks never
/// share datasets: each worker generates its own via [`Workload::generate`].
///
/// # Contract
///
/// `throughput` and `baseline` return a non-negative items-per-second
/// measure. Implementations must catch their own internal failures and
/// return `0.0` rather than propagate; the engine additionally treats any
/// non-finite or negative value as a failed measurement worth zero.
pub trait Workload: Send + Sync {
    /// Materialized test data for one profile at one sample size.
    type Dataset: Send + Sync;

    /// Generate `items` records matching the given profile.
    fn generate(&self, profile: &WorkloadProfile, items: usize) -> Self::Dataset;

    /// Measure validation throughput for one configuration, in items/s.
    fn throughput(
        &self,
        individual: &Individual,
        profile: &WorkloadProfile,
        dataset: &Self::Dataset,
    ) -> f64;

    /// Measure the baseline comparator's throughput on the same data.
    ///
    /// Used only for ratio reporting. The default of `0.0` means "no
    /// baseline available"; ratios are then reported as 0 and the tuner's
    /// own evaluation proceeds unaffected.
    fn baseline(&self, _profile: &WorkloadProfile, _dataset: &Self::Dataset) -> f64 {
        0.0
    }
}
