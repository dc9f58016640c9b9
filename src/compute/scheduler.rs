//! Bounded parallel scheduler for full-scale evaluation trials.
//!
//! Each task carries its own profile/configuration snapshot, regenerates
//! its dataset inside the worker and times both this system and the
//! baseline comparator. Results are collected as tasks finish; a per-task
//! timeout bounds the worst-case wait and partial failures never abort the
//! batch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::schema::{Individual, ScaleResult, WorkloadProfile};
use crate::workload::Workload;

/// Hard cap on derived worker count; bounds peak memory from concurrently
/// materialized datasets.
const MAX_DERIVED_WORKERS: usize = 8;

/// Self-contained unit of full-scale evaluation work.
///
/// Owned snapshots only - nothing shared or mutable crosses the worker
/// boundary.
#[derive(Debug, Clone)]
pub struct EvaluationTask {
    /// Profile snapshot.
    pub profile: WorkloadProfile,
    /// Configuration snapshot.
    pub individual: Individual,
    /// Dataset size for this trial.
    pub items: u64,
}

/// Everything a batch produced: completed trials plus a failure count.
///
/// Failed or timed-out tasks are counted and logged, never silently
/// dropped from summaries.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Trials that completed, in completion order.
    pub results: Vec<ScaleResult>,
    /// Tasks that panicked or exceeded the timeout.
    pub failures: usize,
}

/// Scheduler construction errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Bounded worker pool with out-of-order completion and per-task timeout.
pub struct ScaleScheduler {
    pool: rayon::ThreadPool,
    workers: usize,
    timeout: Duration,
}

impl ScaleScheduler {
    /// Create a scheduler.
    ///
    /// `workers` overrides the pool size; otherwise it is the smaller of
    /// available parallelism and a hard cap of 8.
    pub fn new(workers: Option<usize>, timeout: Duration) -> Result<Self, SchedulerError> {
        let workers = workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(MAX_DERIVED_WORKERS)
        });
        Ok(Self {
            pool: build_pool(workers)?,
            workers,
            timeout,
        })
    }

    /// Configured worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run a batch of tasks and collect whatever completes.
    ///
    /// Collection blocks only while awaiting the next completed task. If a
    /// full timeout window passes with nothing arriving, every outstanding
    /// task is recorded as failed and collection stops - the wait is never
    /// serialized per task, and a late result is simply discarded.
    ///
    /// Abandoned tasks keep running on their worker threads; the scheduler
    /// retires that pool and starts the next batch on a fresh one, so a
    /// prior batch's stragglers never delay a later one.
    pub fn evaluate_batch<W>(&mut self, workload: Arc<W>, tasks: Vec<EvaluationTask>) -> BatchOutcome
    where
        W: Workload + 'static,
    {
        let total = tasks.len();
        if total == 0 {
            return BatchOutcome::default();
        }

        let (tx, rx) = mpsc::channel::<Result<ScaleResult, String>>();

        for task in tasks {
            let workload = Arc::clone(&workload);
            let tx = tx.clone();
            self.pool.spawn(move || {
                let outcome = run_task(workload.as_ref(), &task);
                // The receiver may be gone if the batch already gave up.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut outcome = BatchOutcome::default();
        let mut received = 0usize;
        let mut next_report = 0.1f64;
        let start = Instant::now();

        while received < total {
            match rx.recv_timeout(self.timeout) {
                Ok(Ok(result)) => {
                    received += 1;
                    log::debug!(
                        "task done ({}): {:.0} items/s, ratio {:.2}",
                        result.profile.key(),
                        result.fitness,
                        result.ratio
                    );
                    outcome.results.push(result);
                }
                Ok(Err(reason)) => {
                    received += 1;
                    outcome.failures += 1;
                    log::warn!("evaluation task failed: {reason}");
                }
                Err(RecvTimeoutError::Timeout) => {
                    let abandoned = total - received;
                    outcome.failures += abandoned;
                    log::warn!(
                        "no task completed within {:?}; abandoning {abandoned} outstanding task(s)",
                        self.timeout
                    );
                    self.retire_pool();
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let lost = total - received;
                    outcome.failures += lost;
                    log::warn!("worker pool disconnected with {lost} task(s) unaccounted for");
                    break;
                }
            }

            let progress = received as f64 / total as f64;
            if progress >= next_report || received == total {
                let elapsed = start.elapsed().as_secs_f64();
                let rate = received as f64 / elapsed.max(1e-9);
                let eta = (total - received) as f64 / rate.max(1e-9);
                log::debug!(
                    "batch progress: {:5.1}% | tasks {received}/{total} | ETA {eta:6.1}s",
                    progress * 100.0
                );
                next_report += 0.1;
            }
        }

        outcome
    }

    /// Swap in a fresh pool after abandoning tasks. Dropping the stale
    /// pool joins its threads, which would block on the very stragglers
    /// being abandoned, so it is released on a detached thread instead.
    fn retire_pool(&mut self) {
        match build_pool(self.workers) {
            Ok(fresh) => {
                let stale = std::mem::replace(&mut self.pool, fresh);
                std::thread::spawn(move || drop(stale));
            }
            Err(e) => log::warn!("could not replace worker pool after timeout: {e}"),
        }
    }
}

fn build_pool(workers: usize) -> Result<rayon::ThreadPool, SchedulerError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("scale-eval-{i}"))
        .build()?)
}

/// Run one trial inside a worker. Panics are contained here so a single
/// bad evaluation never takes down the batch.
fn run_task<W: Workload>(workload: &W, task: &EvaluationTask) -> Result<ScaleResult, String> {
    let evaluation = panic::catch_unwind(AssertUnwindSafe(|| {
        let dataset = workload.generate(&task.profile, task.items as usize);
        let fitness = sanitize(workload.throughput(&task.individual, &task.profile, &dataset));
        let baseline = sanitize(workload.baseline(&task.profile, &dataset));
        (fitness, baseline)
    }));

    match evaluation {
        Ok((fitness, baseline)) => {
            // Ratio only from strictly positive measurements.
            let ratio = if fitness > 0.0 && baseline > 0.0 {
                fitness / baseline
            } else {
                0.0
            };
            Ok(ScaleResult {
                profile: task.profile,
                individual: task.individual.clone(),
                fitness,
                baseline,
                items: task.items,
                ratio,
            })
        }
        Err(_) => Err(format!(
            "worker panicked evaluating profile {} at {} items",
            task.profile.key(),
            task.items
        )),
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        0.0
    }
}
