// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::{JobStatus, TriggerSource};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct JobHealthStatus {
	pub job_id: String,
	pub name: String,
	pub schedule: String,
	pub status: HealthState,
	pub running: bool,
	pub last_run: Option<LastRunInfo>,
	pub next_run: Option<DateTime<Utc>>,
	pub consecutive_failures: u32,
	pub skipped_firings: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastRunInfo {
	pub run_id: String,
	pub status: JobStatus,
	pub triggered_by: TriggerSource,
	pub started_at: DateTime<Utc>,
	pub duration_ms: i64,
	pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsHealthStatus {
	pub status: HealthState,
	pub jobs: Vec<JobHealthStatus>,
}

/// In-memory record of a job's recent runs.
#[derive(Debug, Default, Clone)]
pub(crate) struct JobHistory {
	pub last_run: Option<LastRunInfo>,
	pub consecutive_failures: u32,
	pub skipped_firings: u64,
	pub total_runs: u64,
}

impl JobHistory {
	pub fn record(&mut self, run: LastRunInfo) {
		match run.status {
			JobStatus::Succeeded => self.consecutive_failures = 0,
			JobStatus::Failed => self.consecutive_failures = self.consecutive_failures.saturating_add(1),
		}
		self.total_runs += 1;
		self.last_run = Some(run);
	}

	pub fn record_skip(&mut self) {
		self.skipped_firings += 1;
	}
}

pub(crate) fn determine_health_state(
	last_run: Option<&LastRunInfo>,
	consecutive_failures: u32,
) -> HealthState {
	match last_run {
		None => HealthState::Healthy,
		Some(run) => match run.status {
			JobStatus::Succeeded => HealthState::Healthy,
			JobStatus::Failed => {
				if consecutive_failures >= 3 {
					HealthState::Unhealthy
				} else if consecutive_failures >= 1 {
					HealthState::Degraded
				} else {
					HealthState::Healthy
				}
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn run(status: JobStatus) -> LastRunInfo {
		LastRunInfo {
			run_id: "run-1".to_string(),
			status,
			triggered_by: TriggerSource::Schedule,
			started_at: Utc::now(),
			duration_ms: 100,
			error: match status {
				JobStatus::Failed => Some("Error".to_string()),
				JobStatus::Succeeded => None,
			},
		}
	}

	#[test]
	fn test_determine_health_state_no_last_run() {
		assert_eq!(determine_health_state(None, 0), HealthState::Healthy);
	}

	#[test]
	fn test_determine_health_state_succeeded() {
		let run = run(JobStatus::Succeeded);
		assert_eq!(determine_health_state(Some(&run), 0), HealthState::Healthy);
	}

	#[test]
	fn test_determine_health_state_failures() {
		let run = run(JobStatus::Failed);
		assert_eq!(determine_health_state(Some(&run), 0), HealthState::Healthy);
		assert_eq!(determine_health_state(Some(&run), 1), HealthState::Degraded);
		assert_eq!(determine_health_state(Some(&run), 2), HealthState::Degraded);
		assert_eq!(determine_health_state(Some(&run), 3), HealthState::Unhealthy);
		assert_eq!(determine_health_state(Some(&run), 5), HealthState::Unhealthy);
	}

	#[test]
	fn test_history_resets_failures_on_success() {
		let mut history = JobHistory::default();
		history.record(run(JobStatus::Failed));
		history.record(run(JobStatus::Failed));
		assert_eq!(history.consecutive_failures, 2);

		history.record(run(JobStatus::Succeeded));
		assert_eq!(history.consecutive_failures, 0);
		assert_eq!(history.total_runs, 3);
	}

	#[test]
	fn test_history_counts_skips() {
		let mut history = JobHistory::default();
		history.record_skip();
		history.record_skip();
		assert_eq!(history.skipped_firings, 2);
		assert!(history.last_run.is_none());
	}

	#[test]
	fn test_health_state_ordering() {
		assert!(HealthState::Unhealthy > HealthState::Degraded);
		assert!(HealthState::Degraded > HealthState::Healthy);
	}
}
