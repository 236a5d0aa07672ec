// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::JobContext;
use crate::error::{JobError, Result};
use crate::health::{
	determine_health_state, HealthState, JobHealthStatus, JobHistory, JobsHealthStatus, LastRunInfo,
};
use crate::job::Job;
use crate::schedule::JobSchedule;
use crate::types::{JobOutput, JobStatus, TriggerSource};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

struct JobState {
	running: AtomicBool,
	history: std::sync::Mutex<JobHistory>,
}

impl JobState {
	fn new() -> Self {
		Self {
			running: AtomicBool::new(false),
			history: std::sync::Mutex::new(JobHistory::default()),
		}
	}

	fn history(&self) -> MutexGuard<'_, JobHistory> {
		self.history.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}
}

/// Marks a job as running until dropped, including when the run panics or
/// its task is aborted.
struct RunGuard {
	state: Arc<JobState>,
}

impl RunGuard {
	fn try_acquire(state: &Arc<JobState>) -> Option<Self> {
		state
			.running
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| Self {
				state: Arc::clone(state),
			})
	}
}

impl Drop for RunGuard {
	fn drop(&mut self) {
		self.state.running.store(false, Ordering::Release);
	}
}

struct RegisteredJob {
	job: Arc<dyn Job>,
	schedule: JobSchedule,
	state: Arc<JobState>,
}

/// Runs registered jobs on their schedules.
///
/// A job never runs concurrently with itself: a firing that arrives while the
/// previous run is still going is skipped and counted, not queued. A failing
/// or panicking run is recorded and the job keeps its schedule.
pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
	started: AtomicBool,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl JobScheduler {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
			started: AtomicBool::new(false),
		}
	}

	/// Registers `job` under its id with a schedule expression.
	///
	/// # Errors
	/// `InvalidSchedule` if the expression does not parse, `Duplicate` if the
	/// id is taken, `AlreadyStarted` once [`JobScheduler::start`] has run.
	pub fn register(&mut self, job: Arc<dyn Job>, expression: &str) -> Result<()> {
		let schedule = JobSchedule::parse(expression)?;
		self.register_periodic(job, schedule)
	}

	pub fn register_periodic(&mut self, job: Arc<dyn Job>, schedule: JobSchedule) -> Result<()> {
		if self.started.load(Ordering::SeqCst) {
			return Err(JobError::AlreadyStarted);
		}

		let id = job.id().to_string();
		if self.jobs.contains_key(&id) {
			return Err(JobError::Duplicate(id));
		}

		info!(job_id = %id, schedule = %schedule, "Registered periodic job");
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				schedule,
				state: Arc::new(JobState::new()),
			},
		);
		Ok(())
	}

	/// Starts one timer per registered job. Calling it again is a no-op.
	#[instrument(skip(self))]
	pub async fn start(&self) {
		if self.started.swap(true, Ordering::SeqCst) {
			debug!("Job scheduler already started");
			return;
		}

		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let job = Arc::clone(&registered.job);
			let state = Arc::clone(&registered.state);
			let schedule = registered.schedule.clone();
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let job_id = job_id.clone();

			let handle = tokio::spawn(async move {
				let mut ticker = schedule.ticker();
				loop {
					tokio::select! {
						biased;
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "Shutting down periodic job");
							break;
						}
						more = ticker.tick() => {
							if !more {
								warn!(job_id = %job_id, "Schedule has no future firings");
								break;
							}
							fire(&job, &state);
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "Job scheduler started");
	}

	/// Runs a job now, outside its schedule.
	///
	/// # Errors
	/// `NotFound` for an unknown id, `AlreadyRunning` if a run is in progress,
	/// otherwise whatever the job itself returns.
	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str) -> Result<JobOutput> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		let guard = RunGuard::try_acquire(&registered.state)
			.ok_or_else(|| JobError::AlreadyRunning(job_id.to_string()))?;

		execute(Arc::clone(&registered.job), guard, TriggerSource::Manual).await
	}

	/// Stops all timers. Runs already in progress finish on their own; no new
	/// run starts after this returns.
	#[instrument(skip(self))]
	pub async fn stop(&self) {
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("Job scheduler stopped");
	}

	pub fn job_ids(&self) -> Vec<String> {
		self.jobs.keys().cloned().collect()
	}

	pub fn is_running(&self, job_id: &str) -> Option<bool> {
		self.jobs.get(job_id).map(|r| r.state.is_running())
	}

	pub fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		let registered = self.jobs.get(job_id)?;
		let history = registered.state.history().clone();

		Some(JobHealthStatus {
			job_id: job_id.to_string(),
			name: registered.job.name().to_string(),
			schedule: registered.schedule.to_string(),
			status: determine_health_state(history.last_run.as_ref(), history.consecutive_failures),
			running: registered.state.is_running(),
			next_run: registered.schedule.next_after(Utc::now()),
			last_run: history.last_run,
			consecutive_failures: history.consecutive_failures,
			skipped_firings: history.skipped_firings,
		})
	}

	pub fn health_status(&self) -> JobsHealthStatus {
		let mut job_ids = self.job_ids();
		job_ids.sort();

		let jobs: Vec<JobHealthStatus> = job_ids
			.iter()
			.filter_map(|id| self.job_status(id))
			.collect();
		let status = jobs
			.iter()
			.map(|j| j.status)
			.max()
			.unwrap_or(HealthState::Healthy);

		JobsHealthStatus { status, jobs }
	}
}

fn fire(job: &Arc<dyn Job>, state: &Arc<JobState>) {
	let Some(guard) = RunGuard::try_acquire(state) else {
		let skipped = {
			let mut history = state.history();
			history.record_skip();
			history.skipped_firings
		};
		warn!(job_id = %job.id(), skipped, "Previous run still in progress, skipping firing");
		return;
	};

	let job = Arc::clone(job);
	tokio::spawn(async move {
		let _ = execute(job, guard, TriggerSource::Schedule).await;
	});
}

async fn execute(job: Arc<dyn Job>, guard: RunGuard, triggered_by: TriggerSource) -> Result<JobOutput> {
	let run_id = uuid::Uuid::new_v4().to_string();
	let ctx = JobContext {
		run_id: run_id.clone(),
		triggered_by,
	};
	let started_at = Utc::now();
	let timer = std::time::Instant::now();

	debug!(job_id = %job.id(), run_id = %run_id, trigger = triggered_by.as_str(), "Job started");

	// Run on its own task so a panic surfaces as a JoinError instead of
	// unwinding through the scheduler.
	let task_job = Arc::clone(&job);
	let result = match tokio::spawn(async move { task_job.run(&ctx).await }).await {
		Ok(result) => result,
		Err(e) if e.is_panic() => Err(JobError::Failed {
			message: "job panicked".to_string(),
			retryable: false,
		}),
		Err(e) => Err(JobError::Internal(format!("job task failed: {e}"))),
	};

	let duration_ms = i64::try_from(timer.elapsed().as_millis()).unwrap_or(i64::MAX);
	let (status, error) = match &result {
		Ok(_) => (JobStatus::Succeeded, None),
		Err(e) => (JobStatus::Failed, Some(e.to_string())),
	};

	guard.state.history().record(LastRunInfo {
		run_id: run_id.clone(),
		status,
		triggered_by,
		started_at,
		duration_ms,
		error,
	});

	match &result {
		Ok(output) => {
			info!(job_id = %job.id(), run_id = %run_id, duration_ms, message = %output.message, "Job completed successfully")
		}
		Err(e) => warn!(job_id = %job.id(), run_id = %run_id, duration_ms, error = %e, "Job failed"),
	}

	drop(guard);
	result
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::AtomicUsize;
	use std::time::Duration;

	#[derive(Default)]
	struct Counters {
		runs: AtomicUsize,
		current: AtomicUsize,
		max_concurrent: AtomicUsize,
	}

	#[derive(Clone, Copy)]
	enum Behavior {
		Succeed,
		Fail,
		Panic,
	}

	struct MockJob {
		id: String,
		delay: Duration,
		behavior: Behavior,
		counters: Arc<Counters>,
	}

	impl MockJob {
		fn new(id: &str) -> Self {
			Self {
				id: id.to_string(),
				delay: Duration::ZERO,
				behavior: Behavior::Succeed,
				counters: Arc::new(Counters::default()),
			}
		}

		fn with_delay(mut self, delay: Duration) -> Self {
			self.delay = delay;
			self
		}

		fn with_behavior(mut self, behavior: Behavior) -> Self {
			self.behavior = behavior;
			self
		}
	}

	#[async_trait]
	impl Job for MockJob {
		fn id(&self) -> &str {
			&self.id
		}

		fn name(&self) -> &str {
			"Mock Job"
		}

		fn description(&self) -> &str {
			"A mock job for testing"
		}

		async fn run(&self, _ctx: &JobContext) -> std::result::Result<JobOutput, JobError> {
			let c = &self.counters;
			c.runs.fetch_add(1, Ordering::SeqCst);
			let now = c.current.fetch_add(1, Ordering::SeqCst) + 1;
			c.max_concurrent.fetch_max(now, Ordering::SeqCst);

			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}
			c.current.fetch_sub(1, Ordering::SeqCst);

			match self.behavior {
				Behavior::Succeed => Ok(JobOutput {
					message: "Mock job completed".to_string(),
					metadata: None,
				}),
				Behavior::Fail => Err(JobError::Failed {
					message: "boom".to_string(),
					retryable: true,
				}),
				Behavior::Panic => panic!("mock job panicked"),
			}
		}
	}

	fn register(scheduler: &mut JobScheduler, job: MockJob, expr: &str) -> Arc<Counters> {
		let counters = Arc::clone(&job.counters);
		scheduler.register(Arc::new(job), expr).unwrap();
		counters
	}

	#[test]
	fn test_duplicate_registration_is_rejected() {
		let mut scheduler = JobScheduler::new();
		scheduler
			.register(Arc::new(MockJob::new("job-1")), "*/30 * * * *")
			.unwrap();

		let result = scheduler.register(Arc::new(MockJob::new("job-1")), "@every 1m");
		assert!(matches!(result, Err(JobError::Duplicate(id)) if id == "job-1"));
		assert_eq!(scheduler.job_ids(), vec!["job-1".to_string()]);
	}

	#[test]
	fn test_invalid_schedule_is_rejected() {
		let mut scheduler = JobScheduler::new();
		let result = scheduler.register(Arc::new(MockJob::new("job-1")), "every tuesday");
		assert!(matches!(result, Err(JobError::InvalidSchedule(_))));
		assert!(scheduler.job_ids().is_empty());
	}

	#[tokio::test]
	async fn test_register_after_start_is_rejected() {
		let mut scheduler = JobScheduler::new();
		scheduler.start().await;

		let result = scheduler.register(Arc::new(MockJob::new("late")), "@every 1m");
		assert!(matches!(result, Err(JobError::AlreadyStarted)));
		scheduler.stop().await;
	}

	#[tokio::test]
	async fn test_trigger_nonexistent_job_returns_not_found() {
		let scheduler = JobScheduler::new();
		match scheduler.trigger_job("nonexistent-job").await.unwrap_err() {
			JobError::NotFound(id) => assert_eq!(id, "nonexistent-job"),
			e => panic!("Expected NotFound error, got: {:?}", e),
		}
	}

	#[tokio::test]
	async fn test_trigger_job_records_manual_run() {
		let mut scheduler = JobScheduler::new();
		let counters = register(&mut scheduler, MockJob::new("job-1"), "@every 1h");

		let output = scheduler.trigger_job("job-1").await.unwrap();
		assert_eq!(output.message, "Mock job completed");
		assert_eq!(counters.runs.load(Ordering::SeqCst), 1);

		let status = scheduler.job_status("job-1").unwrap();
		assert_eq!(status.status, HealthState::Healthy);
		assert!(!status.running);
		let last_run = status.last_run.unwrap();
		assert_eq!(last_run.status, JobStatus::Succeeded);
		assert_eq!(last_run.triggered_by, TriggerSource::Manual);
		assert!(status.next_run.is_some());
	}

	#[tokio::test]
	async fn test_consecutive_failures_degrade_health() {
		let mut scheduler = JobScheduler::new();
		register(
			&mut scheduler,
			MockJob::new("failing").with_behavior(Behavior::Fail),
			"@every 1h",
		);
		register(&mut scheduler, MockJob::new("fine"), "@every 1h");

		assert!(scheduler.trigger_job("failing").await.is_err());
		assert_eq!(scheduler.health_status().status, HealthState::Degraded);

		assert!(scheduler.trigger_job("failing").await.is_err());
		assert!(scheduler.trigger_job("failing").await.is_err());
		let health = scheduler.health_status();
		assert_eq!(health.status, HealthState::Unhealthy);
		assert_eq!(health.jobs.len(), 2);

		let failing = scheduler.job_status("failing").unwrap();
		assert_eq!(failing.consecutive_failures, 3);
		assert_eq!(failing.last_run.unwrap().error.as_deref(), Some("Job failed: boom"));
	}

	#[tokio::test]
	async fn test_panicking_job_is_recorded_and_released() {
		let mut scheduler = JobScheduler::new();
		let counters = register(
			&mut scheduler,
			MockJob::new("panics").with_behavior(Behavior::Panic),
			"@every 1h",
		);

		let err = scheduler.trigger_job("panics").await.unwrap_err();
		assert!(matches!(err, JobError::Failed { .. }));
		assert_eq!(scheduler.is_running("panics"), Some(false));

		assert!(scheduler.trigger_job("panics").await.is_err());
		assert_eq!(counters.runs.load(Ordering::SeqCst), 2);
		assert_eq!(scheduler.job_status("panics").unwrap().consecutive_failures, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_trigger_while_running_is_rejected() {
		let mut scheduler = JobScheduler::new();
		register(
			&mut scheduler,
			MockJob::new("slow").with_delay(Duration::from_secs(5)),
			"@every 1h",
		);
		let scheduler = Arc::new(scheduler);

		let first = {
			let scheduler = Arc::clone(&scheduler);
			tokio::spawn(async move { scheduler.trigger_job("slow").await })
		};
		tokio::time::sleep(Duration::from_secs(1)).await;

		assert_eq!(scheduler.is_running("slow"), Some(true));
		let second = scheduler.trigger_job("slow").await;
		assert!(matches!(second, Err(JobError::AlreadyRunning(_))));

		first.await.unwrap().unwrap();
		assert_eq!(scheduler.is_running("slow"), Some(false));
	}

	#[tokio::test(start_paused = true)]
	async fn test_overlapping_firings_are_skipped() {
		let mut scheduler = JobScheduler::new();
		let counters = register(
			&mut scheduler,
			MockJob::new("slow").with_delay(Duration::from_millis(2500)),
			"@every 1s",
		);

		scheduler.start().await;
		// Firings at 1s..5s. Runs start at 1s and 4s; 2s, 3s and 5s overlap.
		tokio::time::sleep(Duration::from_millis(5500)).await;
		scheduler.stop().await;

		assert_eq!(counters.max_concurrent.load(Ordering::SeqCst), 1);
		assert_eq!(counters.runs.load(Ordering::SeqCst), 2);
		assert_eq!(scheduler.job_status("slow").unwrap().skipped_firings, 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failures_do_not_stop_the_schedule() {
		let mut scheduler = JobScheduler::new();
		let counters = register(
			&mut scheduler,
			MockJob::new("failing").with_behavior(Behavior::Fail),
			"@every 1s",
		);

		scheduler.start().await;
		tokio::time::sleep(Duration::from_millis(3500)).await;
		scheduler.stop().await;

		assert_eq!(counters.runs.load(Ordering::SeqCst), 3);
		assert_eq!(scheduler.job_status("failing").unwrap().consecutive_failures, 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_start_twice_is_a_noop() {
		let mut scheduler = JobScheduler::new();
		let counters = register(&mut scheduler, MockJob::new("job-1"), "@every 1s");

		scheduler.start().await;
		scheduler.start().await;
		tokio::time::sleep(Duration::from_millis(3500)).await;
		scheduler.stop().await;

		assert_eq!(counters.runs.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_no_firings_after_stop() {
		let mut scheduler = JobScheduler::new();
		let counters = register(&mut scheduler, MockJob::new("job-1"), "@every 1s");

		scheduler.start().await;
		tokio::time::sleep(Duration::from_millis(1500)).await;
		scheduler.stop().await;
		tokio::time::sleep(Duration::from_secs(5)).await;

		assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
	}
}
