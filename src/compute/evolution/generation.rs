//! Exploration/exploitation generation loop driving the archive.

use std::collections::HashMap;
use std::time::Instant;

use crate::schema::{Individual, SearchConfig, WorkloadProfile};
use crate::workload::Workload;

use super::archive::EliteArchive;
use super::rng::TunerRng;

/// Single-threaded MAP-Elites driver.
///
/// Owns the archive and the search RNG. One [`run_generation`] call
/// advances the archive by exactly one generation.
///
/// [`run_generation`]: EliteOptimizer::run_generation
pub struct EliteOptimizer {
    archive: EliteArchive,
    rng: TunerRng,
    search: SearchConfig,
}

impl EliteOptimizer {
    /// Create with an empty archive.
    pub fn new(search: SearchConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => TunerRng::new(seed),
            None => TunerRng::from_entropy(),
        };
        Self {
            archive: EliteArchive::new(),
            rng,
            search,
        }
    }

    /// Replace the archive, e.g. with one restored from a checkpoint.
    pub fn set_archive(&mut self, archive: EliteArchive) {
        self.archive = archive;
    }

    /// Read access to the archive.
    pub fn archive(&self) -> &EliteArchive {
        &self.archive
    }

    /// Best known configuration for a profile.
    ///
    /// Exact niche hit, else nearest occupied niche, else a fresh random
    /// configuration; extraction never mutates the archive.
    pub fn best_config(&mut self, profile: &WorkloadProfile) -> Individual {
        self.archive
            .lookup(profile.behavioral_descriptor(), &mut self.rng)
    }

    /// Advance the archive by one generation.
    ///
    /// Candidates are evaluated against every profile's pre-generated
    /// sample dataset; a candidate's fitness is its maximum across
    /// profiles. Evaluator failures score zero for that pairing and never
    /// abort the generation.
    pub fn run_generation<W: Workload>(
        &mut self,
        workload: &W,
        profiles: &[WorkloadProfile],
        datasets: &HashMap<String, W::Dataset>,
    ) {
        self.archive.advance_generation();

        let candidates = self.propose_candidates();
        let total_evals = candidates.len() * profiles.len();
        let mut eval_count = 0usize;
        let mut next_report = 0.1f64;
        let start = Instant::now();

        for mut candidate in candidates {
            for profile in profiles {
                let Some(dataset) = datasets.get(&profile.key()) else {
                    log::warn!("no sample dataset for profile {profile}, skipping");
                    continue;
                };

                let fitness = sanitize_fitness(
                    workload.throughput(&candidate, profile, dataset),
                    profile,
                );
                candidate.fitness = candidate.fitness.max(fitness);

                self.archive.insert(
                    profile.behavioral_descriptor(),
                    candidate.clone(),
                );

                eval_count += 1;
                if total_evals > 0 {
                    let progress = eval_count as f64 / total_evals as f64;
                    if progress >= next_report || eval_count == total_evals {
                        let elapsed = start.elapsed().as_secs_f64();
                        let rate = eval_count as f64 / elapsed.max(1e-9);
                        let eta = (total_evals - eval_count) as f64 / rate.max(1e-9);
                        log::debug!(
                            "gen {} progress: {:5.1}% | evals {}/{} | ETA {:6.1}s",
                            self.archive.generation(),
                            progress * 100.0,
                            eval_count,
                            total_evals,
                            eta
                        );
                        next_report += 0.1;
                    }
                }
            }
        }

        log::info!(
            "generation {}: archive size={}, best fitness={:.0} items/s",
            self.archive.generation(),
            self.archive.len(),
            self.archive.best_fitness()
        );
    }

    /// Propose this generation's candidates.
    ///
    /// Pure exploration while coverage is below the threshold; afterwards
    /// mostly mutated children of uniformly sampled elites, plus a small
    /// fixed random batch so exploration never fully stops.
    fn propose_candidates(&mut self) -> Vec<Individual> {
        if self.archive.len() < self.search.coverage_threshold {
            return (0..self.search.random_batch)
                .map(|_| self.rng.random_individual())
                .collect();
        }

        let parents: Vec<Individual> = self
            .archive
            .occupants()
            .into_iter()
            .cloned()
            .collect();

        let mut candidates = Vec::with_capacity(self.search.mutation_batch + self.search.explore_batch);
        for _ in 0..self.search.mutation_batch {
            if let Some(parent) = self.rng.pick(&parents) {
                candidates.push(self.rng.mutate(parent));
            }
        }
        for _ in 0..self.search.explore_batch {
            candidates.push(self.rng.random_individual());
        }
        candidates
    }
}

/// Treat invalid evaluator output as a failed measurement worth zero.
fn sanitize_fitness(raw: f64, profile: &WorkloadProfile) -> f64 {
    if raw.is_finite() && raw >= 0.0 {
        raw
    } else {
        log::warn!("evaluator returned invalid fitness {raw} for profile {profile}; scoring 0");
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NicheCoordinate;

    /// Workload whose throughput depends only on the configuration, so
    /// generations are deterministic and always positive.
    struct StubWorkload;

    impl Workload for StubWorkload {
        type Dataset = usize;

        fn generate(&self, _profile: &WorkloadProfile, items: usize) -> usize {
            items
        }

        fn throughput(
            &self,
            individual: &Individual,
            _profile: &WorkloadProfile,
            items: &usize,
        ) -> f64 {
            // Favor larger batches, scaled by dataset size.
            (*items as f64) + individual.batch_size as f64 / 100.0
        }
    }

    /// Workload that always reports garbage.
    struct BrokenWorkload;

    impl Workload for BrokenWorkload {
        type Dataset = usize;

        fn generate(&self, _profile: &WorkloadProfile, items: usize) -> usize {
            items
        }

        fn throughput(&self, _: &Individual, _: &WorkloadProfile, _: &usize) -> f64 {
            f64::NAN
        }
    }

    fn small_profile() -> WorkloadProfile {
        WorkloadProfile {
            field_count: 3,
            avg_string_length: 10.0,
            constraint_complexity: 0.0,
            object_size_kb: 0.1,
        }
    }

    fn sample_datasets<W: Workload>(
        workload: &W,
        profiles: &[WorkloadProfile],
        items: usize,
    ) -> HashMap<String, W::Dataset> {
        profiles
            .iter()
            .map(|p| (p.key(), workload.generate(p, items)))
            .collect()
    }

    #[test]
    fn test_five_generations_single_profile() {
        let workload = StubWorkload;
        let profiles = vec![small_profile()];
        let datasets = sample_datasets(&workload, &profiles, 1_000);

        let mut optimizer = EliteOptimizer::new(SearchConfig::default(), Some(42));
        for _ in 0..5 {
            optimizer.run_generation(&workload, &profiles, &datasets);
        }

        // One profile maps to exactly one niche.
        let archive = optimizer.archive();
        assert_eq!(archive.generation(), 5);
        assert_eq!(archive.len(), 1);

        let origin = NicheCoordinate {
            field_dim: 0,
            complexity_dim: 0,
            size_dim: 0,
        };
        let elite = archive.cells().find(|(c, _)| **c == origin);
        let (_, elite) = elite.expect("cell (0,0,0) populated");
        assert!(elite.fitness > 0.0);
    }

    #[test]
    fn test_exploitation_after_coverage() {
        let workload = StubWorkload;
        let profiles = vec![small_profile()];
        let datasets = sample_datasets(&workload, &profiles, 100);

        // Coverage threshold of zero switches straight to exploitation;
        // the loop still works with an initially empty parent pool.
        let search = SearchConfig {
            coverage_threshold: 0,
            ..Default::default()
        };
        let mut optimizer = EliteOptimizer::new(search, Some(7));
        optimizer.run_generation(&workload, &profiles, &datasets);
        assert_eq!(optimizer.archive().len(), 1);
    }

    #[test]
    fn test_evaluator_failure_never_aborts() {
        let workload = BrokenWorkload;
        let profiles = vec![small_profile()];
        let datasets = sample_datasets(&workload, &profiles, 100);

        let mut optimizer = EliteOptimizer::new(SearchConfig::default(), Some(3));
        optimizer.run_generation(&workload, &profiles, &datasets);

        // Zero-fitness candidates may occupy an empty cell but the global
        // best stays at "no usable measurement".
        assert_eq!(optimizer.archive().best_fitness(), 0.0);
        assert_eq!(optimizer.archive().generation(), 1);
    }

    #[test]
    fn test_best_config_always_usable() {
        let mut optimizer = EliteOptimizer::new(SearchConfig::default(), Some(11));
        let config = optimizer.best_config(&small_profile());
        assert!(config.batch_size >= crate::schema::MIN_BATCH_SIZE);
    }
}
