//! Candidate configurations and their fitness.

use serde::{Deserialize, Serialize};

/// Smallest allowed batch size.
pub const MIN_BATCH_SIZE: u32 = 100;
/// Smallest allowed micro-batch size.
pub const MIN_MICRO_BATCH_SIZE: u32 = 64;
/// Smallest allowed streaming threshold.
pub const MIN_STREAMING_THRESHOLD: u32 = 1_000;

/// One candidate configuration point plus its measured fitness.
///
/// Fitness is a non-negative throughput measure (items/s); `0.0` means "no
/// usable measurement", not an extreme-good score. For archive replacement
/// the identity that matters is the (coordinate, fitness) pair, never value
/// equality of the configuration fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Validator batch size.
    pub batch_size: u32,
    /// Micro-batch size used when chunking input.
    pub micro_batch_size: u32,
    /// Item count above which streaming validation kicks in.
    pub streaming_threshold: u32,
    /// Measured throughput in items/s; 0 until evaluated.
    #[serde(default)]
    pub fitness: f64,
}

impl Individual {
    /// Copy of this configuration with fitness reset to unevaluated.
    pub fn unevaluated(&self) -> Self {
        Self {
            fitness: 0.0,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_defaults_to_zero() {
        let json = r#"{"batch_size": 1000, "micro_batch_size": 128, "streaming_threshold": 5000}"#;
        let ind: Individual = serde_json::from_str(json).unwrap();
        assert_eq!(ind.fitness, 0.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ind = Individual {
            batch_size: 12_000,
            micro_batch_size: 256,
            streaming_threshold: 20_000,
            fitness: 123_456.5,
        };
        let json = serde_json::to_string(&ind).unwrap();
        let parsed: Individual = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ind);
    }

    #[test]
    fn test_unevaluated_keeps_config() {
        let ind = Individual {
            batch_size: 5_000,
            micro_batch_size: 512,
            streaming_threshold: 10_000,
            fitness: 99.0,
        };
        let fresh = ind.unevaluated();
        assert_eq!(fresh.batch_size, ind.batch_size);
        assert_eq!(fresh.micro_batch_size, ind.micro_batch_size);
        assert_eq!(fresh.streaming_threshold, ind.streaming_threshold);
        assert_eq!(fresh.fitness, 0.0);
    }
}
