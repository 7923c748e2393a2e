//! Recurring task scheduler with single-flight collection cycles.
//!
//! The cron timer layer (`tokio-cron-scheduler`) only fires triggers;
//! the guard, statistics, and run history live in `CycleExecutor`, which
//! is driven identically by timer triggers and manual `run_once` calls.
//! That split keeps the single-flight guarantee testable without real
//! timers.

mod cycle;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::models::{TaskError, TaskRun, TaskStatus};

pub use cycle::{CycleReport, CycleTask, GameOutcome, ScrapeCycle};

/// Runs retained in the in-memory history.
const HISTORY_LIMIT: usize = 50;

/// Cumulative scheduler statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    /// Triggers skipped because a cycle was already in flight.
    pub skipped_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub average_execution_ms: f64,
}

/// Snapshot of one registered job.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub cron: String,
    pub timezone: String,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

/// Pure read of scheduler state; no side effects.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub jobs: HashMap<String, JobInfo>,
    pub stats: SchedulerStats,
    pub recent_runs: Vec<TaskRun>,
}

/// Resets the running flag when dropped, so the flag clears on every
/// exit path including panics.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Owns the single-flight guard, statistics, and run history.
pub struct CycleExecutor {
    task: Arc<dyn CycleTask>,
    running: AtomicBool,
    stats: Mutex<SchedulerStats>,
    history: Mutex<Vec<TaskRun>>,
}

impl CycleExecutor {
    pub fn new(task: Arc<dyn CycleTask>) -> Self {
        Self {
            task,
            running: AtomicBool::new(false),
            stats: Mutex::new(SchedulerStats::default()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.stats.lock().await.clone()
    }

    pub async fn recent_runs(&self) -> Vec<TaskRun> {
        self.history.lock().await.clone()
    }

    /// Execute one cycle under the single-flight guard.
    ///
    /// Returns `None` when a cycle was already in flight: the trigger is
    /// skipped and counted, and no second cycle starts.
    pub async fn execute(&self, task_name: &str) -> Option<TaskRun> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(task = task_name, "cycle already in flight, skipping trigger");
            self.stats.lock().await.skipped_runs += 1;
            return None;
        }
        let _guard = RunningGuard {
            flag: &self.running,
        };

        let mut run = TaskRun::start(task_name);
        {
            let mut stats = self.stats.lock().await;
            stats.total_runs += 1;
            stats.last_run = Some(run.started_at);
        }

        let report = self.task.run().await;

        run.processed_items = report.records();
        run.succeeded_jobs = report.succeeded();
        run.failed_jobs = report.failed();

        let failures: Vec<String> = report
            .outcomes
            .iter()
            .filter_map(|o| {
                o.result
                    .as_ref()
                    .err()
                    .map(|e| format!("{}: {e}", o.key))
            })
            .collect();

        // A cycle with any surviving scraper is a (possibly partial)
        // success; only an all-failed fan-out is an error.
        let all_failed = !report.outcomes.is_empty() && report.succeeded() == 0;
        let (status, error) = if all_failed {
            (
                TaskStatus::Error,
                Some(TaskError {
                    message: failures.join("; "),
                    code: "CYCLE_FAILED".to_string(),
                }),
            )
        } else if !failures.is_empty() {
            (
                TaskStatus::Success,
                Some(TaskError {
                    message: failures.join("; "),
                    code: "PARTIAL_FAILURES".to_string(),
                }),
            )
        } else {
            (TaskStatus::Success, None)
        };
        run.finish(status, error);

        {
            let mut stats = self.stats.lock().await;
            match run.status {
                TaskStatus::Success => {
                    stats.successful_runs += 1;
                    stats.last_success = run.completed_at;
                }
                _ => {
                    stats.failed_runs += 1;
                    stats.last_error = run.error.as_ref().map(|e| e.message.clone());
                }
            }
            let completed = (stats.successful_runs + stats.failed_runs) as f64;
            let duration = run.duration_ms.unwrap_or(0) as f64;
            stats.average_execution_ms += (duration - stats.average_execution_ms) / completed;
        }

        {
            let mut history = self.history.lock().await;
            history.push(run.clone());
            if history.len() > HISTORY_LIMIT {
                let excess = history.len() - HISTORY_LIMIT;
                history.drain(..excess);
            }
        }

        info!(
            task = task_name,
            status = run.status.as_str(),
            records = run.processed_items,
            succeeded = run.succeeded_jobs,
            failed = run.failed_jobs,
            duration_ms = run.duration_ms,
            "cycle finished"
        );
        Some(run)
    }
}

struct JobEntry {
    id: Uuid,
    cron: String,
    timezone: String,
    last_run: Arc<std::sync::Mutex<Option<DateTime<Utc>>>>,
}

/// Recurring scheduler exposed to outer layers:
/// `create_job` / `run_once` / `stop_job` / `stop_all` / `status`.
pub struct TaskScheduler {
    executor: Arc<CycleExecutor>,
    scheduler: Mutex<JobScheduler>,
    jobs: Mutex<HashMap<String, JobEntry>>,
}

/// Accept a five-field cron expression and produce the six-field form
/// the timer crate expects. Six/seven-field expressions pass through.
pub fn normalize_cron(expr: &str) -> anyhow::Result<String> {
    let fields = expr.split_whitespace().count();
    match fields {
        5 => Ok(format!("0 {}", expr.trim())),
        6 | 7 => Ok(expr.trim().to_string()),
        _ => anyhow::bail!("invalid cron expression '{expr}': expected 5 fields, got {fields}"),
    }
}

impl TaskScheduler {
    pub async fn new(task: Arc<dyn CycleTask>) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow::anyhow!("failed to create scheduler: {e}"))?;
        Ok(Self {
            executor: Arc::new(CycleExecutor::new(task)),
            scheduler: Mutex::new(scheduler),
            jobs: Mutex::new(HashMap::new()),
        })
    }

    /// The guard/stats core, shared with manual triggers.
    pub fn executor(&self) -> Arc<CycleExecutor> {
        self.executor.clone()
    }

    /// Register a recurring job. Re-registering a name replaces the
    /// prior trigger.
    pub async fn create_job(&self, name: &str, trigger: &ScheduleConfig) -> anyhow::Result<()> {
        let expr = normalize_cron(&trigger.cron)?;
        let timezone: chrono_tz::Tz = trigger
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown timezone '{}'", trigger.timezone))?;

        // Replace any prior registration under this name.
        if let Some(old) = self.jobs.lock().await.remove(name) {
            if let Err(e) = self.scheduler.lock().await.remove(&old.id).await {
                warn!(job = name, "failed to remove replaced job: {e}");
            }
        }

        let last_run = Arc::new(std::sync::Mutex::new(None));
        let executor = self.executor.clone();
        let task_name = name.to_string();
        let job_last_run = last_run.clone();

        let job = Job::new_async_tz(expr.as_str(), timezone, move |_uuid, mut _l| {
            let executor = executor.clone();
            let task_name = task_name.clone();
            let last_run = job_last_run.clone();
            Box::pin(async move {
                if let Ok(mut stamp) = last_run.lock() {
                    *stamp = Some(Utc::now());
                }
                let _ = executor.execute(&task_name).await;
            })
        })
        .map_err(|e| anyhow::anyhow!("invalid cron expression '{}': {e}", trigger.cron))?;

        let id = self
            .scheduler
            .lock()
            .await
            .add(job)
            .await
            .map_err(|e| anyhow::anyhow!("failed to register job '{name}': {e}"))?;

        self.jobs.lock().await.insert(
            name.to_string(),
            JobEntry {
                id,
                cron: trigger.cron.clone(),
                timezone: trigger.timezone.clone(),
                last_run,
            },
        );
        info!(job = name, cron = %trigger.cron, timezone = %trigger.timezone, "job registered");

        if trigger.run_on_init {
            let executor = self.executor.clone();
            let task_name = name.to_string();
            tokio::spawn(async move {
                let _ = executor.execute(&task_name).await;
            });
        }

        Ok(())
    }

    /// Manual out-of-band trigger, subject to the identical guard.
    pub async fn run_once(&self, name: &str) -> Option<TaskRun> {
        if let Some(entry) = self.jobs.lock().await.get(name) {
            if let Ok(mut stamp) = entry.last_run.lock() {
                *stamp = Some(Utc::now());
            }
        }
        self.executor.execute(name).await
    }

    /// Cancel a job's trigger registration. Does not affect an
    /// in-flight cycle.
    pub async fn stop_job(&self, name: &str) -> bool {
        let Some(entry) = self.jobs.lock().await.remove(name) else {
            return false;
        };
        if let Err(e) = self.scheduler.lock().await.remove(&entry.id).await {
            warn!(job = name, "failed to remove job trigger: {e}");
        }
        info!(job = name, "job stopped");
        true
    }

    /// Cancel every registered job.
    pub async fn stop_all(&self) {
        let names: Vec<String> = self.jobs.lock().await.keys().cloned().collect();
        for name in names {
            self.stop_job(&name).await;
        }
    }

    /// Snapshot of jobs, stats, and recent runs.
    pub async fn status(&self) -> SchedulerStatus {
        let mut jobs = HashMap::new();
        {
            let entries = self.jobs.lock().await;
            let mut scheduler = self.scheduler.lock().await;
            for (name, entry) in entries.iter() {
                let next_run = scheduler
                    .next_tick_for_job(entry.id)
                    .await
                    .ok()
                    .flatten();
                let last_run = entry.last_run.lock().map(|v| *v).unwrap_or(None);
                jobs.insert(
                    name.clone(),
                    JobInfo {
                        cron: entry.cron.clone(),
                        timezone: entry.timezone.clone(),
                        last_run,
                        next_run,
                    },
                );
            }
        }

        SchedulerStatus {
            is_running: self.executor.is_running(),
            jobs,
            stats: self.executor.stats().await,
            recent_runs: self.executor.recent_runs().await,
        }
    }

    /// Start firing registered triggers.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start scheduler: {e}"))
    }

    /// Stop the timer layer entirely.
    pub async fn shutdown(&self) {
        if let Err(e) = self.scheduler.lock().await.shutdown().await {
            warn!("scheduler shutdown failed: {e}");
        }
    }
}
