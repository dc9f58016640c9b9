//! Result records and summary statistics for full-scale evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Individual, WorkloadProfile};

/// Outcome of one full-scale trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleResult {
    /// Profile the trial ran against.
    pub profile: WorkloadProfile,
    /// Configuration that was evaluated.
    pub individual: Individual,
    /// Measured throughput of this system, items/s.
    pub fitness: f64,
    /// Measured throughput of the baseline comparator, items/s (0 if absent).
    pub baseline: f64,
    /// Number of items in the trial dataset.
    pub items: u64,
    /// `fitness / baseline`, or 0 unless both are strictly positive.
    pub ratio: f64,
}

/// Full results document written at each checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsReport {
    /// Occupied archive cells at write time.
    pub archive_size: usize,
    /// Completed full-scale trials accumulated so far.
    pub total_evaluations: usize,
    /// Trials that failed or timed out; counted, never silently dropped.
    pub failed_evaluations: usize,
    /// Aggregated statistics.
    pub summary: ResultsSummary,
    /// Every completed trial, in completion order.
    pub results: Vec<ScaleResult>,
}

impl ResultsReport {
    /// Build a report from completed trials.
    pub fn new(archive_size: usize, failed_evaluations: usize, results: Vec<ScaleResult>) -> Self {
        Self {
            archive_size,
            total_evaluations: results.len(),
            failed_evaluations,
            summary: ResultsSummary::from_results(&results),
            results,
        }
    }
}

/// Aggregate statistics across scales and profiles.
///
/// All aggregation is commutative: trials arrive out of order and the
/// numbers must not depend on completion order. Ratios are averaged only
/// over trials where both measurements were strictly positive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsSummary {
    /// Statistics grouped by evaluation scale.
    pub by_scale: BTreeMap<u64, ScaleStats>,
    /// Statistics grouped by profile key.
    pub by_profile: BTreeMap<String, ProfileStats>,
    /// Statistics over every trial.
    pub overall: OverallStats,
}

/// Per-scale summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScaleStats {
    pub throughput_mean: f64,
    pub throughput_std: f64,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub ratio_mean: f64,
    pub ratio_std: f64,
    pub samples: usize,
}

/// Per-profile summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStats {
    pub throughput_mean: f64,
    pub ratio_mean: f64,
    pub best_ratio: f64,
    pub samples: usize,
}

/// Whole-run summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_evaluations: usize,
    pub ratio_mean: f64,
    pub best_ratio: f64,
    pub throughput_mean: f64,
    pub throughput_max: f64,
    /// Trials within 10% of the baseline or better.
    pub competitive: usize,
}

impl ResultsSummary {
    /// Aggregate completed trials.
    pub fn from_results(results: &[ScaleResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let mut by_scale: BTreeMap<u64, Vec<&ScaleResult>> = BTreeMap::new();
        let mut by_profile: BTreeMap<String, Vec<&ScaleResult>> = BTreeMap::new();
        for result in results {
            by_scale.entry(result.items).or_default().push(result);
            by_profile
                .entry(result.profile.key())
                .or_default()
                .push(result);
        }

        let by_scale = by_scale
            .into_iter()
            .map(|(scale, group)| {
                let throughput: Vec<f64> = group.iter().map(|r| r.fitness).collect();
                let baseline: Vec<f64> = group.iter().map(|r| r.baseline).collect();
                let ratios = positive_ratios(&group);
                (
                    scale,
                    ScaleStats {
                        throughput_mean: mean(&throughput),
                        throughput_std: std_dev(&throughput),
                        baseline_mean: mean(&baseline),
                        baseline_std: std_dev(&baseline),
                        ratio_mean: mean(&ratios),
                        ratio_std: std_dev(&ratios),
                        samples: group.len(),
                    },
                )
            })
            .collect();

        let by_profile = by_profile
            .into_iter()
            .map(|(key, group)| {
                let throughput: Vec<f64> = group.iter().map(|r| r.fitness).collect();
                let ratios = positive_ratios(&group);
                (
                    key,
                    ProfileStats {
                        throughput_mean: mean(&throughput),
                        ratio_mean: mean(&ratios),
                        best_ratio: max(&ratios),
                        samples: group.len(),
                    },
                )
            })
            .collect();

        let throughput: Vec<f64> = results.iter().map(|r| r.fitness).collect();
        let all_refs: Vec<&ScaleResult> = results.iter().collect();
        let ratios = positive_ratios(&all_refs);
        let overall = OverallStats {
            total_evaluations: results.len(),
            ratio_mean: mean(&ratios),
            best_ratio: max(&ratios),
            throughput_mean: mean(&throughput),
            throughput_max: max(&throughput),
            competitive: ratios.iter().filter(|&&r| r >= 0.9).count(),
        };

        Self {
            by_scale,
            by_profile,
            overall,
        }
    }
}

fn positive_ratios(results: &[&ScaleResult]) -> Vec<f64> {
    results
        .iter()
        .filter(|r| r.ratio > 0.0)
        .map(|r| r.ratio)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}
