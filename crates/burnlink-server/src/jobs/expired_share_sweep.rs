// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use burnlink_server_db::ShareStore;
use burnlink_server_jobs::{Job, JobContext, JobError, JobOutput};
use chrono::Utc;
use tracing::instrument;

pub const EXPIRED_SHARE_SWEEP_JOB_ID: &str = "clean-expired-shares";

/// Deletes every share whose expiry has passed.
pub struct ExpiredShareSweepJob {
	store: Arc<dyn ShareStore>,
}

impl ExpiredShareSweepJob {
	pub fn new(store: Arc<dyn ShareStore>) -> Self {
		Self { store }
	}
}

#[async_trait]
impl Job for ExpiredShareSweepJob {
	fn id(&self) -> &str {
		EXPIRED_SHARE_SWEEP_JOB_ID
	}

	fn name(&self) -> &str {
		"Expired Share Sweep"
	}

	fn description(&self) -> &str {
		"Remove shares that expired without being retrieved"
	}

	#[instrument(skip(self, ctx), fields(job_id = EXPIRED_SHARE_SWEEP_JOB_ID, run_id = %ctx.run_id))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		let deleted = self
			.store
			.delete_expired_before(Utc::now())
			.await
			.map_err(|e| JobError::Failed {
				message: format!("failed to delete expired shares: {e}"),
				retryable: true,
			})?;

		tracing::info!(deleted_count = deleted, "expired share sweep completed");

		Ok(JobOutput {
			message: format!("Deleted {deleted} expired shares"),
			metadata: Some(serde_json::json!({ "deleted_count": deleted })),
		})
	}
}
