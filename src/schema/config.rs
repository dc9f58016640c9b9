//! Tuner configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::WorkloadProfile;

/// Top-level configuration for a progressive-scaling tuning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunerConfig {
    /// Workload profiles to optimize for.
    pub profiles: Vec<WorkloadProfile>,
    /// Ordered (ascending) list of full-scale evaluation sizes.
    pub scales: Vec<u64>,
    /// Generations to evolve per scale.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Explicit sample size for evolution; derived from scale when absent.
    #[serde(default)]
    pub sample_size: Option<usize>,
    /// Checkpoint the archive every N generations (0 = only per scale).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    /// Independent full-scale trials per profile.
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Worker pool size override; derived from available parallelism when absent.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Per-task timeout for full-scale evaluation, in seconds.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
    /// Scales at or below this still run the evolution phase.
    #[serde(default = "default_evolve_threshold")]
    pub evolve_threshold: u64,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Archive checkpoint path.
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,
    /// Prefix for per-scale results files.
    #[serde(default = "default_results_prefix")]
    pub results_prefix: String,
    /// Candidate generation policy.
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            scales: Vec::new(),
            generations: default_generations(),
            sample_size: None,
            checkpoint_interval: default_checkpoint_interval(),
            runs: default_runs(),
            workers: None,
            task_timeout_secs: default_task_timeout_secs(),
            evolve_threshold: default_evolve_threshold(),
            random_seed: None,
            archive_path: default_archive_path(),
            results_prefix: default_results_prefix(),
            search: SearchConfig::default(),
        }
    }
}

fn default_generations() -> usize {
    20
}
fn default_checkpoint_interval() -> usize {
    10
}
fn default_runs() -> usize {
    5
}
fn default_task_timeout_secs() -> u64 {
    300
}
fn default_evolve_threshold() -> u64 {
    5_000_000
}
fn default_archive_path() -> PathBuf {
    PathBuf::from("elite_archive.json")
}
fn default_results_prefix() -> String {
    "scale_results".to_string()
}

/// Candidate generation policy for the generation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Occupied-cell count below which only random candidates are generated.
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: usize,
    /// Random candidates per generation while below the coverage threshold.
    #[serde(default = "default_random_batch")]
    pub random_batch: usize,
    /// Mutated candidates per generation once coverage is reached.
    #[serde(default = "default_mutation_batch")]
    pub mutation_batch: usize,
    /// Fresh random candidates kept per generation after coverage is reached.
    #[serde(default = "default_explore_batch")]
    pub explore_batch: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: default_coverage_threshold(),
            random_batch: default_random_batch(),
            mutation_batch: default_mutation_batch(),
            explore_batch: default_explore_batch(),
        }
    }
}

fn default_coverage_threshold() -> usize {
    100
}
fn default_random_batch() -> usize {
    50
}
fn default_mutation_batch() -> usize {
    30
}
fn default_explore_batch() -> usize {
    10
}

/// Tuner configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one workload profile is required")]
    NoProfiles,
    #[error("Scale list must not be empty")]
    EmptyScales,
    #[error("Scale list must be strictly increasing (found {prev} before {next})")]
    UnsortedScales { prev: u64, next: u64 },
    #[error("Scales must be non-zero")]
    ZeroScale,
    #[error("Generation count must be non-zero")]
    ZeroGenerations,
    #[error("Trial-repeat count must be non-zero")]
    ZeroRuns,
    #[error("Task timeout must be non-zero")]
    ZeroTimeout,
    #[error("Profile {index} is invalid: {reason}")]
    InvalidProfile { index: usize, reason: String },
}

impl TunerConfig {
    /// Validate the configuration surface.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }

        if self.scales.is_empty() {
            return Err(ConfigError::EmptyScales);
        }
        if self.scales.contains(&0) {
            return Err(ConfigError::ZeroScale);
        }
        for pair in self.scales.windows(2) {
            if pair[0] >= pair[1] {
                return Err(ConfigError::UnsortedScales {
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }

        if self.generations == 0 {
            return Err(ConfigError::ZeroGenerations);
        }
        if self.runs == 0 {
            return Err(ConfigError::ZeroRuns);
        }
        if self.task_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        for (index, profile) in self.profiles.iter().enumerate() {
            let invalid = |reason: &str| ConfigError::InvalidProfile {
                index,
                reason: reason.to_string(),
            };
            if profile.field_count < 1 {
                return Err(invalid("field_count must be at least 1"));
            }
            if !(profile.avg_string_length > 0.0) {
                return Err(invalid("avg_string_length must be positive"));
            }
            if !(0.0..=1.0).contains(&profile.constraint_complexity) {
                return Err(invalid("constraint_complexity must be in [0, 1]"));
            }
            if !(profile.object_size_kb > 0.0) {
                return Err(invalid("object_size_kb must be positive"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> TunerConfig {
        TunerConfig {
            profiles: vec![WorkloadProfile {
                field_count: 3,
                avg_string_length: 10.0,
                constraint_complexity: 0.0,
                object_size_kb: 0.1,
            }],
            scales: vec![1_000, 10_000],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_scales_rejected() {
        let mut config = valid_config();
        config.scales.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyScales)));
    }

    #[test]
    fn test_unsorted_scales_rejected() {
        let mut config = valid_config();
        config.scales = vec![10_000, 1_000];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsortedScales { .. })
        ));

        config.scales = vec![1_000, 1_000];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsortedScales { .. })
        ));
    }

    #[test]
    fn test_no_profiles_rejected() {
        let mut config = valid_config();
        config.profiles.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoProfiles)));
    }

    #[test]
    fn test_bad_profile_rejected() {
        let mut config = valid_config();
        config.profiles[0].constraint_complexity = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProfile { index: 0, .. })
        ));
    }

    #[test]
    fn test_defaults_from_minimal_json() {
        let json = r#"{
            "profiles": [{
                "field_count": 3,
                "avg_string_length": 10.0,
                "constraint_complexity": 0.5,
                "object_size_kb": 0.2
            }],
            "scales": [1000]
        }"#;
        let config: TunerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.generations, 20);
        assert_eq!(config.runs, 5);
        assert_eq!(config.task_timeout_secs, 300);
        assert_eq!(config.search.coverage_threshold, 100);
        assert!(config.validate().is_ok());
    }
}
