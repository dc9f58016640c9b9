//! Elitist archive mapping behavioral niches to their best configuration.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::schema::{Individual, NicheCoordinate};

use super::rng::TunerRng;

/// Sparse quality-diversity map from niche coordinate to elite individual.
///
/// Coverage grows monotonically; a cell's occupant is only ever replaced by
/// a strictly higher-fitness individual. The archive is owned and mutated
/// by a single thread - elitist replacement needs no locking.
#[derive(Debug, Default)]
pub struct EliteArchive {
    cells: HashMap<NicheCoordinate, Individual>,
    generation: u64,
    best_fitness: f64,
}

/// Archive persistence errors.
///
/// A missing checkpoint is not an error: `load` returns an empty archive
/// and logs it. A file that exists but cannot be decoded is fatal for the
/// load call; a half-valid archive is never produced.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode archive: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("archive file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("archive file {path} holds an invalid cell key {key:?}")]
    InvalidKey { path: PathBuf, key: String },
}

/// On-disk document shape. Cell keys are the coordinate's fixed-delimiter
/// form; a BTreeMap keeps output stable across saves.
#[derive(Debug, Serialize, Deserialize)]
struct ArchiveSnapshot {
    generation: u64,
    best_fitness: f64,
    archive: BTreeMap<String, Individual>,
}

impl EliteArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Generations run so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Best fitness observed across all cells.
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Advance the generation counter by one.
    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Iterate over occupied cells.
    pub fn cells(&self) -> impl Iterator<Item = (&NicheCoordinate, &Individual)> {
        self.cells.iter()
    }

    /// Current occupants, for parent sampling.
    pub fn occupants(&self) -> Vec<&Individual> {
        self.cells.values().collect()
    }

    /// Offer an individual to a cell.
    ///
    /// Replaces the occupant only on strictly higher fitness; ties and
    /// lower fitness are discarded, which keeps noise-level differences
    /// from churning the archive. Returns whether the cell changed.
    pub fn insert(&mut self, coord: NicheCoordinate, individual: Individual) -> bool {
        match self.cells.get(&coord) {
            Some(existing) if individual.fitness <= existing.fitness => false,
            _ => {
                if individual.fitness > self.best_fitness {
                    self.best_fitness = individual.fitness;
                }
                self.cells.insert(coord, individual);
                true
            }
        }
    }

    /// Fetch the best known configuration for a coordinate.
    ///
    /// Exact hit returns the stored individual; a miss falls back to the
    /// nearest occupied cell by Euclidean distance; an empty archive yields
    /// a fresh random individual. Every query returns a usable config.
    pub fn lookup(&self, coord: NicheCoordinate, rng: &mut TunerRng) -> Individual {
        if let Some(individual) = self.cells.get(&coord) {
            return individual.clone();
        }

        self.cells
            .iter()
            .min_by(|(a, _), (b, _)| {
                coord
                    .distance(a)
                    .partial_cmp(&coord.distance(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(_, individual)| individual.clone())
            .unwrap_or_else(|| rng.random_individual())
    }

    /// Write a whole-file snapshot.
    ///
    /// The document is rendered fully in memory and written in one shot;
    /// a crash leaves either the prior file or a truncated one, never a
    /// mixed-state file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArchiveError> {
        let snapshot = ArchiveSnapshot {
            generation: self.generation,
            best_fitness: self.best_fitness,
            archive: self
                .cells
                .iter()
                .map(|(coord, individual)| (coord.to_key(), individual.clone()))
                .collect(),
        };

        let json = serde_json::to_string_pretty(&snapshot).map_err(ArchiveError::Encode)?;
        fs::write(path.as_ref(), json)?;

        log::debug!(
            "saved archive to {} ({} cells, generation {})",
            path.as_ref().display(),
            self.cells.len(),
            self.generation
        );
        Ok(())
    }

    /// Restore an archive from a snapshot file.
    ///
    /// A missing file starts fresh (informational, never fatal). A present
    /// but undecodable file fails fast with a diagnostic.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "archive file {} not found, starting fresh",
                    path.display()
                );
                return Ok(Self::new());
            }
            Err(e) => return Err(ArchiveError::Io(e)),
        };

        let snapshot: ArchiveSnapshot =
            serde_json::from_str(&content).map_err(|source| ArchiveError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let mut cells = HashMap::with_capacity(snapshot.archive.len());
        for (key, individual) in snapshot.archive {
            let coord = NicheCoordinate::from_key(&key).map_err(|_| ArchiveError::InvalidKey {
                path: path.to_path_buf(),
                key,
            })?;
            cells.insert(coord, individual);
        }

        log::info!(
            "loaded archive from {} ({} cells, generation {})",
            path.display(),
            cells.len(),
            snapshot.generation
        );

        Ok(Self {
            cells,
            generation: snapshot.generation,
            best_fitness: snapshot.best_fitness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(f: u8, c: u8, s: u8) -> NicheCoordinate {
        NicheCoordinate {
            field_dim: f,
            complexity_dim: c,
            size_dim: s,
        }
    }

    fn individual(fitness: f64) -> Individual {
        Individual {
            batch_size: 10_000,
            micro_batch_size: 256,
            streaming_threshold: 10_000,
            fitness,
        }
    }

    #[test]
    fn test_insert_empty_cell() {
        let mut archive = EliteArchive::new();
        assert!(archive.insert(coord(0, 0, 0), individual(10.0)));
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.best_fitness(), 10.0);
    }

    #[test]
    fn test_insert_strict_elitism() {
        let mut archive = EliteArchive::new();
        archive.insert(coord(1, 2, 3), individual(10.0));

        // Lower and equal fitness never replace.
        assert!(!archive.insert(coord(1, 2, 3), individual(5.0)));
        assert!(!archive.insert(coord(1, 2, 3), individual(10.0)));
        assert_eq!(archive.cells[&coord(1, 2, 3)].fitness, 10.0);

        // Strictly higher always replaces.
        assert!(archive.insert(coord(1, 2, 3), individual(10.5)));
        assert_eq!(archive.cells[&coord(1, 2, 3)].fitness, 10.5);
        assert_eq!(archive.best_fitness(), 10.5);
    }

    #[test]
    fn test_insert_idempotent() {
        let mut archive = EliteArchive::new();
        archive.insert(coord(2, 2, 2), individual(7.0));
        archive.insert(coord(2, 2, 2), individual(7.0));
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.best_fitness(), 7.0);
        assert_eq!(archive.cells[&coord(2, 2, 2)], individual(7.0));
    }

    #[test]
    fn test_lookup_exact_hit() {
        let mut archive = EliteArchive::new();
        let mut rng = TunerRng::new(1);
        archive.insert(coord(3, 3, 3), individual(42.0));
        let found = archive.lookup(coord(3, 3, 3), &mut rng);
        assert_eq!(found.fitness, 42.0);
    }

    #[test]
    fn test_lookup_nearest_neighbor() {
        let mut archive = EliteArchive::new();
        let mut rng = TunerRng::new(1);
        archive.insert(coord(0, 0, 0), individual(1.0));
        archive.insert(coord(9, 9, 9), individual(2.0));

        let near_origin = archive.lookup(coord(1, 1, 0), &mut rng);
        assert_eq!(near_origin.fitness, 1.0);

        let near_far = archive.lookup(coord(8, 9, 9), &mut rng);
        assert_eq!(near_far.fitness, 2.0);
    }

    #[test]
    fn test_lookup_empty_returns_usable_config() {
        let archive = EliteArchive::new();
        let mut rng = TunerRng::new(5);
        let found = archive.lookup(coord(0, 0, 0), &mut rng);
        assert!(found.batch_size >= crate::schema::MIN_BATCH_SIZE);
        assert_eq!(found.fitness, 0.0);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.json");

        let mut archive = EliteArchive::new();
        archive.insert(coord(0, 0, 0), individual(10.0));
        archive.insert(coord(14, 9, 9), individual(20.0));
        archive.insert(coord(5, 3, 1), individual(15.0));
        archive.advance_generation();
        archive.advance_generation();

        archive.save(&path).unwrap();
        let restored = EliteArchive::load(&path).unwrap();

        assert_eq!(restored.generation(), 2);
        assert_eq!(restored.best_fitness(), 20.0);
        assert_eq!(restored.len(), 3);
        for (c, ind) in archive.cells() {
            assert_eq!(&restored.cells[c], ind);
        }
    }

    #[test]
    fn test_load_missing_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let archive = EliteArchive::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(archive.generation(), 0);
        assert_eq!(archive.best_fitness(), 0.0);
        assert!(archive.is_empty());
    }

    #[test]
    fn test_load_corrupt_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            EliteArchive::load(&path),
            Err(ArchiveError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_load_bad_key_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.json");
        let doc = r#"{
            "generation": 1,
            "best_fitness": 5.0,
            "archive": {
                "(0, 0, 0)": {
                    "batch_size": 1000,
                    "micro_batch_size": 128,
                    "streaming_threshold": 5000,
                    "fitness": 5.0
                }
            }
        }"#;
        fs::write(&path, doc).unwrap();
        assert!(matches!(
            EliteArchive::load(&path),
            Err(ArchiveError::InvalidKey { .. })
        ));
    }
}
