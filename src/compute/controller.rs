//! Progressive scaling controller: evolve small, evaluate big, checkpoint.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::schema::{ResultsReport, ScaleResult, TunerConfig, WorkloadProfile};
use crate::workload::Workload;

use super::evolution::{ArchiveError, EliteArchive, EliteOptimizer};
use super::scheduler::{EvaluationTask, ScaleScheduler, SchedulerError};

/// Where the controller currently is in its scale cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePhase {
    /// Not started.
    Idle,
    /// Evolving the archive with sample datasets.
    Evolving { scale: u64 },
    /// Running full-scale parallel evaluation.
    Evaluating { scale: u64 },
    /// Results and archive written for this scale.
    Checkpointed { scale: u64 },
    /// All scales completed.
    Done,
    /// Cancelled externally; current progress checkpointed best-effort.
    Interrupted,
}

/// Controller errors surfaced to the caller.
///
/// Evaluation failures and task timeouts are contained inside the
/// generation loop and scheduler; only invalid configuration, checkpoint
/// corruption and checkpoint write failures reach this level.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] crate::schema::ConfigError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("failed to encode results: {0}")]
    EncodeResults(#[from] serde_json::Error),
    #[error("failed to write results file {path}: {source}")]
    WriteResults {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a finished (or interrupted) run produced.
#[derive(Debug)]
pub struct ScalingOutcome {
    /// Terminal phase: `Done` or `Interrupted`.
    pub phase: ScalePhase,
    /// Final accumulated results document.
    pub report: ResultsReport,
}

/// Orchestrates repeated (evolve at sample scale -> evaluate at full scale
/// -> checkpoint) cycles across an ordered list of scales.
///
/// The controller exclusively owns the archive and all checkpoint files;
/// workers only ever see immutable task snapshots.
pub struct ScalingController<W: Workload> {
    config: TunerConfig,
    workload: Arc<W>,
    optimizer: EliteOptimizer,
    scheduler: ScaleScheduler,
    results: Vec<ScaleResult>,
    failures: usize,
    phase: ScalePhase,
    cancelled: Arc<AtomicBool>,
}

impl<W: Workload + 'static> ScalingController<W> {
    /// Create a controller. Fails on invalid configuration.
    pub fn new(config: TunerConfig, workload: Arc<W>) -> Result<Self, ControllerError> {
        config.validate()?;

        let scheduler = ScaleScheduler::new(
            config.workers,
            Duration::from_secs(config.task_timeout_secs),
        )?;
        let optimizer = EliteOptimizer::new(config.search.clone(), config.random_seed);

        Ok(Self {
            config,
            workload,
            optimizer,
            scheduler,
            results: Vec::new(),
            failures: 0,
            phase: ScalePhase::Idle,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for requesting cancellation from another thread (e.g. a
    /// signal handler). The controller checkpoints before returning.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current phase.
    pub fn phase(&self) -> ScalePhase {
        self.phase
    }

    /// Run the full progressive-scaling cycle.
    pub fn run(&mut self) -> Result<ScalingOutcome, ControllerError> {
        self.optimizer
            .set_archive(EliteArchive::load(&self.config.archive_path)?);

        let scales = self.config.scales.clone();
        for &scale in &scales {
            if self.cancelled.load(Ordering::Relaxed) {
                return Ok(self.interrupt());
            }

            log::info!("running at {scale} items scale");

            if scale <= self.config.evolve_threshold {
                self.phase = ScalePhase::Evolving { scale };
                if !self.evolve_at_scale(scale)? {
                    return Ok(self.interrupt());
                }
            }

            self.phase = ScalePhase::Evaluating { scale };
            self.evaluate_at_scale(scale);

            self.checkpoint(&self.results_path(&scale.to_string()))?;
            self.phase = ScalePhase::Checkpointed { scale };
            log::info!("completed {scale} items scale");
        }

        self.checkpoint_suffixed("final")?;
        self.phase = ScalePhase::Done;

        Ok(ScalingOutcome {
            phase: self.phase,
            report: self.report(),
        })
    }

    /// Evolve the archive against bounded sample datasets.
    ///
    /// Returns `false` when cancelled mid-phase.
    fn evolve_at_scale(&mut self, scale: u64) -> Result<bool, ControllerError> {
        let sample = self
            .config
            .sample_size
            .unwrap_or_else(|| (scale / 10).min(100_000).max(1) as usize);

        log::info!("evolving archive with {sample} item samples");
        let datasets: HashMap<String, W::Dataset> = self
            .config
            .profiles
            .iter()
            .map(|p| (p.key(), self.workload.generate(p, sample)))
            .collect();

        for generation in 0..self.config.generations {
            if self.cancelled.load(Ordering::Relaxed) {
                return Ok(false);
            }

            self.optimizer
                .run_generation(self.workload.as_ref(), &self.config.profiles, &datasets);

            let interval = self.config.checkpoint_interval;
            if interval > 0 && (generation + 1) % interval == 0 {
                self.optimizer.archive().save(&self.config.archive_path)?;
                log::info!(
                    "checkpointed archive at generation {}",
                    self.optimizer.archive().generation()
                );
            }
        }

        Ok(true)
    }

    /// Evaluate each profile's best configuration at full scale.
    fn evaluate_at_scale(&mut self, scale: u64) {
        log::info!(
            "evaluating at {scale} items with {} workers",
            self.scheduler.workers()
        );

        let profiles: Vec<WorkloadProfile> = self.config.profiles.clone();
        let mut tasks = Vec::with_capacity(profiles.len() * self.config.runs);
        for profile in &profiles {
            let best = self.optimizer.best_config(profile);
            // Repeated independent trials for statistical significance.
            for _ in 0..self.config.runs {
                tasks.push(EvaluationTask {
                    profile: *profile,
                    individual: best.clone(),
                    items: scale,
                });
            }
        }

        let outcome = self
            .scheduler
            .evaluate_batch(Arc::clone(&self.workload), tasks);
        if outcome.failures > 0 {
            log::warn!(
                "{} of {} tasks failed at {scale} items scale",
                outcome.failures,
                outcome.failures + outcome.results.len()
            );
        }

        self.failures += outcome.failures;
        self.results.extend(outcome.results);
    }

    /// Write the accumulated results and the archive.
    fn checkpoint(&self, results_path: &Path) -> Result<(), ControllerError> {
        let report = self.report();
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(results_path, json).map_err(|source| ControllerError::WriteResults {
            path: results_path.to_path_buf(),
            source,
        })?;
        log::info!("results saved to {}", results_path.display());

        self.optimizer.archive().save(&self.config.archive_path)?;
        Ok(())
    }

    /// Checkpoint with a suffixed archive variant (`_final`, `_interrupted`).
    fn checkpoint_suffixed(&self, suffix: &str) -> Result<(), ControllerError> {
        self.checkpoint(&self.results_path(suffix))?;
        self.optimizer
            .archive()
            .save(with_suffix(&self.config.archive_path, suffix))?;
        Ok(())
    }

    /// Best-effort checkpoint on cancellation; completed scales are never
    /// lost even if one of the writes fails here.
    fn interrupt(&mut self) -> ScalingOutcome {
        log::warn!("cancellation requested, saving current progress");
        if let Err(e) = self.checkpoint_suffixed("interrupted") {
            log::error!("interrupt checkpoint failed: {e}");
        }
        self.phase = ScalePhase::Interrupted;
        ScalingOutcome {
            phase: self.phase,
            report: self.report(),
        }
    }

    fn results_path(&self, tag: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}.json", self.config.results_prefix, tag))
    }

    /// Snapshot of the accumulated results document.
    pub fn report(&self) -> ResultsReport {
        ResultsReport::new(
            self.optimizer.archive().len(),
            self.failures,
            self.results.clone(),
        )
    }
}

/// `foo.json` + `_final` -> `foo_final.json`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("archive");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}
