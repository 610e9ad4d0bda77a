//! Queue processor — the public entry point the operator UI drives.
//!
//! Takes a list of (dealership, mode) jobs and runs each through the
//! resolver and the emitter. Jobs execute sequentially; a job failure is
//! captured in its result and never aborts its peers. Each job walks
//! `PENDING → IN_PROGRESS → (COMPLETED | FAILED)` and every transition is
//! reported to the optional observer. A cooperative cancel flag is checked
//! between jobs and between the resolve and emit steps.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use diesel::SqliteConnection;

use crate::dealer;
use crate::emitter::{self, EmitOptions, TemplateType};
use crate::error::{EngineError, EngineResult};
use crate::resolver::{self, Decision, OrderMode};

/// One queued job.
#[derive(Debug, Clone)]
pub struct QueueJob {
    /// Target dealership.
    pub dealership: String,
    /// CAO or LIST.
    pub mode: OrderMode,
    /// Template override; `None` uses the dealership's configured template.
    pub template: Option<TemplateType>,
    /// LIST mode: the operator-supplied VIN set. Ignored for CAO.
    pub vins: Vec<String>,
}

/// Observable job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Queued, not yet started.
    Pending,
    /// Resolver/emitter running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error (see the job result).
    Failed,
}

/// One observed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTransition {
    /// Index of the job in the submitted list.
    pub index: usize,
    /// The job's dealership.
    pub dealership: String,
    /// The state entered.
    pub state: JobState,
}

/// Per-job outcome returned to the caller.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// The job's dealership.
    pub dealership: String,
    /// Whether the job completed.
    pub success: bool,
    /// Vehicles included in the order.
    pub included: usize,
    /// Candidates skipped by the resolver.
    pub skipped: usize,
    /// Emitted CSV path on success.
    pub csv_path: Option<PathBuf>,
    /// Human-readable failure reason.
    pub error: Option<String>,
}

/// Options applying to a whole queue submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueOptions {
    /// Route every job through the emitter's dry mode: artifacts under
    /// `dry/`, no VIN-log entries, no order-run records.
    pub skip_vin_logging: bool,
}

/// Observer callback for job transitions.
pub type TransitionObserver = Box<dyn Fn(&JobTransition) + Send + Sync>;

/// Drives queued jobs through the resolver and emitter.
#[derive(Default)]
pub struct QueueProcessor {
    cancel: Arc<AtomicBool>,
    observer: Option<TransitionObserver>,
}

impl QueueProcessor {
    /// A processor with no observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transition observer.
    pub fn on_transition(mut self, observer: TransitionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// A handle that cancels the in-progress submission when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn notify(&self, index: usize, dealership: &str, state: JobState) {
        if let Some(observer) = &self.observer {
            observer(&JobTransition {
                index,
                dealership: dealership.to_string(),
                state,
            });
        }
    }

    /// Processes `jobs` in order, returning one result per job.
    pub fn process(
        &self,
        conn: &mut SqliteConnection,
        jobs: &[QueueJob],
        opts: QueueOptions,
    ) -> Vec<JobResult> {
        for (index, job) in jobs.iter().enumerate() {
            self.notify(index, &job.dealership, JobState::Pending);
        }

        let mut results = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                self.notify(index, &job.dealership, JobState::Failed);
                results.push(JobResult {
                    dealership: job.dealership.clone(),
                    success: false,
                    included: 0,
                    skipped: 0,
                    csv_path: None,
                    error: Some(EngineError::Cancelled.to_string()),
                });
                continue;
            }

            self.notify(index, &job.dealership, JobState::InProgress);
            match self.run_job(conn, job, opts) {
                Ok(result) => {
                    self.notify(index, &job.dealership, JobState::Completed);
                    results.push(result);
                }
                Err(e) => {
                    tracing::warn!(dealership = %job.dealership, error = %e, "queue job failed");
                    self.notify(index, &job.dealership, JobState::Failed);
                    results.push(JobResult {
                        dealership: job.dealership.clone(),
                        success: false,
                        included: 0,
                        skipped: 0,
                        csv_path: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        results
    }

    fn run_job(
        &self,
        conn: &mut SqliteConnection,
        job: &QueueJob,
        opts: QueueOptions,
    ) -> EngineResult<JobResult> {
        let now = Utc::now();
        let resolution = match job.mode {
            OrderMode::Cao => resolver::resolve_cao(conn, &job.dealership, now)?,
            OrderMode::List => resolver::resolve_list(conn, &job.dealership, &job.vins, now)?,
        };

        if self.cancel.load(Ordering::SeqCst) {
            return Err(EngineError::Cancelled);
        }

        let mut cfg = dealer::load_dealer(conn, &job.dealership)?;
        if let Some(template) = job.template {
            cfg.output_rules.template = template;
        }

        let outcome = emitter::emit(
            conn,
            &resolution,
            &cfg,
            EmitOptions {
                skip_vin_logging: opts.skip_vin_logging,
            },
            now,
        )?;

        let skipped = resolution
            .classifications
            .iter()
            .filter(|c| c.decision == Decision::Skip)
            .count();

        Ok(JobResult {
            dealership: job.dealership.clone(),
            success: true,
            included: outcome.vehicle_count,
            skipped,
            csv_path: Some(outcome.csv_path),
            error: None,
        })
    }
}
