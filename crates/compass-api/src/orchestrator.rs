//! # Analysis Orchestrator
//!
//! Owns the `pending → running → completed/failed` execution of analysis
//! jobs, decoupled from the HTTP requests that trigger them.
//!
//! ## Architecture
//!
//! Rather than detaching an unawaited future from the request handler, the
//! asynchronous boundary is an explicit queue: handlers call
//! [`AnalysisQueue::submit`], and a dispatcher task started by
//! [`start_workers`] pulls jobs off the channel and spawns one task per job.
//! A semaphore bounds how many analyses execute concurrently
//! (`AppConfig::analysis_concurrency`); different frameworks and repeated
//! runs proceed in parallel up to that bound, and nothing else serializes
//! them — each job writes only its own record.
//!
//! ## Failure Contract
//!
//! Every error inside a job — framework missing, unscorable framework,
//! any computation fault — is caught here and lands in the record via
//! `fail()`, so no job ever leaves a record in `running` after it ends and
//! every failure is inspectable. Terminal writes go through the record
//! state machine, which rejects a second terminal write outright.
//! Notification recording and the database mirror are best-effort: their
//! failures are logged and never alter the record's terminal state.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};

use compass_core::AnalysisId;
use compass_engine::{AnalysisOutcome, AnalysisRecord};

use crate::state::{AppState, NotificationKind};

// ── Queue ────────────────────────────────────────────────────────────

/// A unit of analysis work. The record already exists in `pending`; the
/// job carries only its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisJob {
    /// The record to drive to a terminal state.
    pub analysis_id: AnalysisId,
}

/// Error submitting a job to the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// [`start_workers`] has not been called yet.
    #[error("analysis queue is not running")]
    NotRunning,
    /// The dispatcher has shut down and the channel is closed.
    #[error("analysis queue is closed")]
    Closed,
}

/// Cloneable handle for submitting analysis jobs.
///
/// The handle starts disconnected; [`start_workers`] installs the sending
/// end. Submitting before then is an error the triggering endpoint surfaces,
/// mirroring how other optional backends in this service degrade.
#[derive(Debug, Clone, Default)]
pub struct AnalysisQueue {
    sender: Arc<RwLock<Option<mpsc::UnboundedSender<AnalysisJob>>>>,
}

impl AnalysisQueue {
    /// Create a disconnected queue handle.
    pub fn new() -> Self {
        Self {
            sender: Arc::new(RwLock::new(None)),
        }
    }

    /// Enqueue a job for execution.
    pub fn submit(&self, job: AnalysisJob) -> Result<(), QueueError> {
        let guard = self.sender.read();
        let sender = guard.as_ref().ok_or(QueueError::NotRunning)?;
        sender.send(job).map_err(|_| QueueError::Closed)
    }

    /// Whether a dispatcher is attached.
    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    fn install(&self, sender: mpsc::UnboundedSender<AnalysisJob>) {
        *self.sender.write() = Some(sender);
    }
}

/// Start the analysis dispatcher for this application state.
///
/// Installs the queue's sending end and spawns the dispatcher task, which
/// runs until every queue handle is dropped. Returns the dispatcher's join
/// handle; callers normally let it run for the process lifetime.
pub fn start_workers(state: AppState) -> tokio::task::JoinHandle<()> {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    state.analysis_queue.install(sender);

    let limit = state.config.analysis_concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));

    tokio::spawn(async move {
        tracing::info!(concurrency = limit, "analysis dispatcher started");
        while let Some(job) = receiver.recv().await {
            // acquire_owned fails only if the semaphore is closed, which
            // never happens here.
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let job_state = state.clone();
            tokio::spawn(async move {
                let _permit = permit;
                execute_analysis(&job_state, job.analysis_id).await;
            });
        }
        tracing::info!("analysis dispatcher stopped");
    })
}

// ── Job execution ────────────────────────────────────────────────────

/// Drive one analysis record from `pending` to a terminal state.
///
/// Stages run strictly in sequence: transition to running, load framework
/// and mappings, run the engine pipeline, commit the terminal write, then
/// mirror and notify. The scoring stages are synchronous over in-memory
/// snapshots; the only awaits are the optional database writes.
pub async fn execute_analysis(state: &AppState, analysis_id: AnalysisId) {
    // pending → running. A missing record or an illegal transition means
    // someone else already handled (or is handling) this job.
    match state.analyses.try_update(&analysis_id, AnalysisRecord::start) {
        None => {
            tracing::warn!(analysis = %analysis_id, "analysis record vanished before start");
            return;
        }
        Some(Err(err)) => {
            tracing::warn!(analysis = %analysis_id, error = %err, "refusing to run analysis");
            return;
        }
        Some(Ok(())) => {}
    }
    mirror_record(state, analysis_id).await;

    match compute_outcome(state, analysis_id) {
        Ok(outcome) => {
            let score = outcome.overall_score;
            match state
                .analyses
                .try_update(&analysis_id, |record| record.complete(outcome))
            {
                Some(Ok(())) => {
                    tracing::info!(analysis = %analysis_id, score, "analysis completed");
                    mirror_record(state, analysis_id).await;
                    notify_terminal(state, analysis_id);
                }
                Some(Err(err)) => {
                    tracing::warn!(analysis = %analysis_id, error = %err, "terminal write rejected");
                }
                None => {
                    tracing::warn!(analysis = %analysis_id, "analysis record vanished before commit");
                }
            }
        }
        Err(message) => {
            tracing::error!(analysis = %analysis_id, error = %message, "analysis failed");
            match state
                .analyses
                .try_update(&analysis_id, |record| record.fail(&message))
            {
                Some(Ok(())) => {
                    mirror_record(state, analysis_id).await;
                    notify_terminal(state, analysis_id);
                }
                Some(Err(err)) => {
                    tracing::warn!(analysis = %analysis_id, error = %err, "terminal write rejected");
                }
                None => {
                    tracing::warn!(analysis = %analysis_id, "analysis record vanished before failure write");
                }
            }
        }
    }
}

/// Load the framework and mapping snapshot, then run the scoring pipeline.
///
/// Returns the failure message to store on the record when any stage
/// errors.
fn compute_outcome(state: &AppState, analysis_id: AnalysisId) -> Result<AnalysisOutcome, String> {
    let record = state
        .analyses
        .get(&analysis_id)
        .ok_or_else(|| format!("analysis {analysis_id} not found"))?;

    let framework_record = state
        .frameworks
        .get(&record.framework_id)
        .ok_or_else(|| format!("framework {} not found", record.framework_id))?;

    let framework = framework_record
        .model()
        .map_err(|err| format!("framework {} failed to load: {err}", record.framework_id))?;

    let mappings = state.mappings_for_framework(record.framework_id);

    compass_engine::analyze(&framework, &mappings).map_err(|err| err.to_string())
}

/// Record a terminal-status notification for the triggering user.
fn notify_terminal(state: &AppState, analysis_id: AnalysisId) {
    let Some(record) = state.analyses.get(&analysis_id) else {
        return;
    };
    let framework_code = state
        .frameworks
        .get(&record.framework_id)
        .map(|f| f.code)
        .unwrap_or_else(|| record.framework_id.to_string());
    let link = Some(format!("/analyses/{}", record.id.as_uuid()));

    match record.status {
        compass_engine::AnalysisStatus::Completed => state.notify(
            record.triggered_by,
            NotificationKind::AnalysisCompleted,
            "Compliance analysis completed",
            &format!(
                "Analysis of {framework_code} finished with an overall score of {:.1}",
                record.overall_score.unwrap_or(0.0)
            ),
            link,
        ),
        compass_engine::AnalysisStatus::Failed => state.notify(
            record.triggered_by,
            NotificationKind::AnalysisFailed,
            "Compliance analysis failed",
            &format!(
                "Analysis of {framework_code} failed: {}",
                record.error_message.as_deref().unwrap_or("unknown error")
            ),
            link,
        ),
        _ => {}
    }
}

/// Mirror the current record to Postgres when a pool is configured.
///
/// The in-memory store is the system of record; a mirror failure is logged
/// and never propagated into the job's outcome.
async fn mirror_record(state: &AppState, analysis_id: AnalysisId) {
    let Some(pool) = &state.db_pool else {
        return;
    };
    let Some(record) = state.analyses.get(&analysis_id) else {
        return;
    };
    if let Err(err) = crate::db::analyses::upsert(pool, &record).await {
        tracing::warn!(analysis = %analysis_id, error = %err, "analysis mirror write failed");
    }
}
