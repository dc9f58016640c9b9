//! Workload profiles and their behavioral descriptors.
//!
//! A profile characterizes the shape of a validation workload; its
//! behavioral descriptor buckets that shape into a fixed discrete grid so
//! the archive can keep one elite configuration per niche.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of bins along the field-count axis.
pub const FIELD_BINS: u8 = 15;
/// Number of bins along the constraint-complexity axis.
pub const COMPLEXITY_BINS: u8 = 10;
/// Number of bins along the object-size axis.
pub const SIZE_BINS: u8 = 10;

/// Shape of a validation workload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkloadProfile {
    /// Number of fields per object (at least 1).
    pub field_count: u32,
    /// Average string field length in characters.
    pub avg_string_length: f64,
    /// Constraint complexity: 0.0 = bare type checks, 1.0 = full constraints.
    pub constraint_complexity: f64,
    /// Average object size in KB.
    pub object_size_kb: f64,
}

impl WorkloadProfile {
    /// Map this profile to its discrete niche coordinate.
    ///
    /// Bucketing is deterministic and always lands inside the fixed grid:
    /// every component is clamped, so inputs at or past nominal bounds
    /// (complexity exactly 1.0, floating error slightly above it, a zero
    /// object size) still produce a valid coordinate.
    pub fn behavioral_descriptor(&self) -> NicheCoordinate {
        // Field count: bins of 3, capped (1-3 fields -> 0, 4-6 -> 1, ...).
        let field_dim = ((self.field_count.max(1) - 1) / 3).min(FIELD_BINS as u32 - 1) as u8;

        // Complexity: tenths, clamped to [0, 9].
        let complexity_dim =
            ((self.constraint_complexity * 10.0).floor() as i64).clamp(0, COMPLEXITY_BINS as i64 - 1) as u8;

        // Object size: 0.5 KB resolution, clamped to [0, 9].
        let size_dim =
            ((self.object_size_kb * 2.0).floor() as i64).clamp(0, SIZE_BINS as i64 - 1) as u8;

        NicheCoordinate {
            field_dim,
            complexity_dim,
            size_dim,
        }
    }

    /// Key used to index pre-generated sample datasets.
    pub fn key(&self) -> String {
        format!("{}f-{:.1}c", self.field_count, self.constraint_complexity)
    }
}

impl fmt::Display for WorkloadProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fields, {:.1} complexity, {:.2} KB",
            self.field_count, self.constraint_complexity, self.object_size_kb
        )
    }
}

/// Discrete coordinate of a behavioral niche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NicheCoordinate {
    /// Field-count bin, in `[0, FIELD_BINS)`.
    pub field_dim: u8,
    /// Constraint-complexity bin, in `[0, COMPLEXITY_BINS)`.
    pub complexity_dim: u8,
    /// Object-size bin, in `[0, SIZE_BINS)`.
    pub size_dim: u8,
}

impl NicheCoordinate {
    /// Fixed-delimiter key used in archive files (`"f-c-s"`).
    pub fn to_key(self) -> String {
        format!("{}-{}-{}", self.field_dim, self.complexity_dim, self.size_dim)
    }

    /// Parse an archive file key.
    ///
    /// Accepts exactly three dash-separated integers, each inside its bin
    /// bounds. Persisted keys are never interpreted any other way.
    pub fn from_key(key: &str) -> Result<Self, CoordinateKeyError> {
        let mut parts = key.split('-');
        let mut next = |bins: u8| -> Result<u8, CoordinateKeyError> {
            let part = parts
                .next()
                .ok_or_else(|| CoordinateKeyError::new(key))?;
            let value: u8 = part.trim().parse().map_err(|_| CoordinateKeyError::new(key))?;
            if value >= bins {
                return Err(CoordinateKeyError::new(key));
            }
            Ok(value)
        };

        let field_dim = next(FIELD_BINS)?;
        let complexity_dim = next(COMPLEXITY_BINS)?;
        let size_dim = next(SIZE_BINS)?;

        if parts.next().is_some() {
            return Err(CoordinateKeyError::new(key));
        }

        Ok(Self {
            field_dim,
            complexity_dim,
            size_dim,
        })
    }

    /// Euclidean distance to another coordinate.
    ///
    /// Axes are intentionally left unnormalized even though their bin
    /// scales differ; nearest-neighbor fallback preserves this behavior.
    pub fn distance(&self, other: &NicheCoordinate) -> f64 {
        let df = self.field_dim as f64 - other.field_dim as f64;
        let dc = self.complexity_dim as f64 - other.complexity_dim as f64;
        let ds = self.size_dim as f64 - other.size_dim as f64;
        (df * df + dc * dc + ds * ds).sqrt()
    }
}

impl fmt::Display for NicheCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.field_dim, self.complexity_dim, self.size_dim
        )
    }
}

/// Invalid persisted coordinate key.
#[derive(Debug, thiserror::Error)]
#[error("invalid niche coordinate key {key:?}: expected three in-range dash-separated integers")]
pub struct CoordinateKeyError {
    key: String,
}

impl CoordinateKeyError {
    fn new(key: &str) -> Self {
        Self { key: key.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(field_count: u32, complexity: f64, size_kb: f64) -> WorkloadProfile {
        WorkloadProfile {
            field_count,
            avg_string_length: 10.0,
            constraint_complexity: complexity,
            object_size_kb: size_kb,
        }
    }

    #[test]
    fn test_descriptor_basic() {
        let bd = profile(3, 0.0, 0.1).behavioral_descriptor();
        assert_eq!(
            bd,
            NicheCoordinate {
                field_dim: 0,
                complexity_dim: 0,
                size_dim: 0
            }
        );

        let bd = profile(8, 0.4, 0.35).behavioral_descriptor();
        assert_eq!(bd.field_dim, 2);
        assert_eq!(bd.complexity_dim, 4);
        assert_eq!(bd.size_dim, 0);
    }

    #[test]
    fn test_descriptor_boundaries() {
        // Minimum field count.
        assert_eq!(profile(1, 0.5, 0.5).behavioral_descriptor().field_dim, 0);

        // Complexity endpoints, including exactly 1.0 and floating error above.
        assert_eq!(profile(3, 0.0, 0.5).behavioral_descriptor().complexity_dim, 0);
        assert_eq!(profile(3, 1.0, 0.5).behavioral_descriptor().complexity_dim, 9);
        assert_eq!(
            profile(3, 1.0 + 1e-9, 0.5).behavioral_descriptor().complexity_dim,
            9
        );

        // Zero object size.
        assert_eq!(profile(3, 0.5, 0.0).behavioral_descriptor().size_dim, 0);
    }

    #[test]
    fn test_descriptor_always_in_grid() {
        let extremes = [
            profile(1, 0.0, 0.0),
            profile(1_000, 1.0, 100.0),
            profile(u32::MAX, 5.0, 1e9),
        ];
        for p in extremes {
            let bd = p.behavioral_descriptor();
            assert!(bd.field_dim < FIELD_BINS);
            assert!(bd.complexity_dim < COMPLEXITY_BINS);
            assert!(bd.size_dim < SIZE_BINS);
        }
    }

    #[test]
    fn test_key_roundtrip() {
        let coord = NicheCoordinate {
            field_dim: 14,
            complexity_dim: 0,
            size_dim: 9,
        };
        assert_eq!(NicheCoordinate::from_key(&coord.to_key()).unwrap(), coord);
    }

    #[test]
    fn test_key_rejects_garbage() {
        assert!(NicheCoordinate::from_key("").is_err());
        assert!(NicheCoordinate::from_key("1-2").is_err());
        assert!(NicheCoordinate::from_key("1-2-3-4").is_err());
        assert!(NicheCoordinate::from_key("a-2-3").is_err());
        assert!(NicheCoordinate::from_key("(1, 2, 3)").is_err());
        // Out of bin bounds.
        assert!(NicheCoordinate::from_key("15-0-0").is_err());
        assert!(NicheCoordinate::from_key("0-10-0").is_err());
    }

    #[test]
    fn test_distance() {
        let a = NicheCoordinate {
            field_dim: 0,
            complexity_dim: 0,
            size_dim: 0,
        };
        let b = NicheCoordinate {
            field_dim: 3,
            complexity_dim: 4,
            size_dim: 0,
        };
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_profile_key() {
        assert_eq!(profile(8, 0.4, 0.35).key(), "8f-0.4c");
        assert_eq!(profile(3, 0.0, 0.1).key(), "3f-0.0c");
    }
}
