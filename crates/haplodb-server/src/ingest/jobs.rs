//! In-memory job tracking for upload pipelines.
//!
//! Every accepted upload gets a registry entry keyed by a fresh job id. The
//! background task owns the entry's transitions (Processing to Completed or
//! Failed); polling handlers read it; a periodic sweeper drops terminal
//! entries once they outlive the retention window. Nothing here is
//! persisted, so a restart forgets in-flight job status. The committed
//! database rows remain the source of truth.
//!
//! The registry is a cloneable handle around shared state. The inner lock is
//! held only for map operations and never across an await.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

// ============================================================================
// Types
// ============================================================================

/// Lifecycle state of one upload job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }

    /// Terminal entries are eligible for sweeping; Processing entries never
    /// are.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Which pipeline a job belongs to. Status endpoints filter on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Madc,
    Pav,
    Supplemental,
}

impl JobKind {
    /// Stable lowercase name, also used as the `file_uploads.upload_type`
    /// value.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Madc => "madc",
            JobKind::Pav => "pav",
            JobKind::Supplemental => "supplemental",
        }
    }
}

/// Counters collected while processing one upload.
///
/// All pipelines share this shape; counters a pipeline does not produce stay
/// zero. MADC fills total/new/existing/presence_added. PAV fills total,
/// rows_skipped_missing (whole rows with unknown alleles), presence_skipped
/// (pairs already recorded), presence_added (pairs inserted). Supplemental
/// fills total, annotations_updated, rows_skipped_missing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadStats {
    /// Data rows read from the file
    pub total_rows: u64,
    /// Sequences created by this upload
    pub new_sequences: u64,
    /// Sequences that already existed for the species
    pub existing_sequences: u64,
    /// Presence links inserted
    pub presence_added: u64,
    /// Presence links skipped as already recorded
    pub presence_skipped: u64,
    /// Rows skipped because the allele is unknown
    pub rows_skipped_missing: u64,
    /// Annotation rows overwritten
    pub annotations_updated: u64,
}

/// One registry entry. Cloned out to readers; mutated only through the
/// registry methods.
#[derive(Debug, Clone)]
pub struct JobState {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub submission_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    pub file_name: String,
    pub error: Option<String>,
    pub summary: Option<UploadStats>,
    pub missing_allele_ids: Option<Vec<String>>,
    /// Processed-CSV echo served by the download endpoint
    pub processed_csv: Option<String>,
}

// ============================================================================
// Registry
// ============================================================================

/// Cloneable handle to the process-wide job map.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobState>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<Uuid, JobState>> {
        // A poisoned lock only means a panic elsewhere; the map itself is
        // still usable
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, JobState>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly accepted upload and return its job id.
    pub fn create(&self, kind: JobKind, file_name: &str) -> Uuid {
        let job_id = Uuid::new_v4();
        let state = JobState {
            job_id,
            kind,
            status: JobStatus::Processing,
            submission_time: Utc::now(),
            completion_time: None,
            file_name: file_name.to_string(),
            error: None,
            summary: None,
            missing_allele_ids: None,
            processed_csv: None,
        };
        self.write_jobs().insert(job_id, state);
        job_id
    }

    /// Transition a job to Completed with its summary and optional outputs.
    pub fn mark_completed(
        &self,
        job_id: Uuid,
        summary: UploadStats,
        processed_csv: Option<String>,
        missing_allele_ids: Option<Vec<String>>,
    ) {
        let mut jobs = self.write_jobs();
        if let Some(state) = jobs.get_mut(&job_id) {
            state.status = JobStatus::Completed;
            state.completion_time = Some(Utc::now());
            state.summary = Some(summary);
            state.processed_csv = processed_csv;
            state.missing_allele_ids = missing_allele_ids;
        }
    }

    /// Transition a job to Failed with an error message.
    pub fn mark_failed(&self, job_id: Uuid, error: impl Into<String>) {
        let mut jobs = self.write_jobs();
        if let Some(state) = jobs.get_mut(&job_id) {
            state.status = JobStatus::Failed;
            state.completion_time = Some(Utc::now());
            state.error = Some(error.into());
        }
    }

    /// Snapshot of one job, if it still exists.
    pub fn get(&self, job_id: Uuid) -> Option<JobState> {
        self.read_jobs().get(&job_id).cloned()
    }

    /// Snapshot of every job of one kind, newest first.
    pub fn list(&self, kind: JobKind) -> Vec<JobState> {
        let mut jobs: Vec<JobState> = self
            .read_jobs()
            .values()
            .filter(|state| state.kind == kind)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.submission_time.cmp(&a.submission_time));
        jobs
    }

    /// Drop terminal entries whose completion time is older than the
    /// retention window. Returns how many were removed.
    pub fn sweep(&self, retention: Duration) -> usize {
        self.sweep_at(Utc::now(), retention)
    }

    fn sweep_at(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let cutoff = now - retention;
        let mut jobs = self.write_jobs();
        let before = jobs.len();
        jobs.retain(|_, state| {
            !(state.status.is_terminal()
                && state.completion_time.is_some_and(|done| done < cutoff))
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.read_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_jobs().is_empty()
    }
}

/// Start the periodic sweeper for this registry.
///
/// Runs until the process exits; the returned handle is only used to keep
/// the task owned by main.
pub fn spawn_sweeper(
    registry: JobRegistry,
    interval: std::time::Duration,
    retention: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(
        interval_secs = interval.as_secs(),
        retention_minutes = retention.num_minutes(),
        "Starting job registry sweeper"
    );
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = registry.sweep(retention);
            if removed > 0 {
                debug!(removed, "Swept expired job entries");
            }
        }
    })
}
