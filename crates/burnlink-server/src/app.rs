// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use burnlink_server_config::ServerConfig;
use burnlink_server_db::{create_pool, run_migrations, ShareRepository, ShareStore};
use burnlink_server_jobs::{JobOutput, JobScheduler};
use burnlink_shares::{CryptoPool, CryptoWorker, ShareService};
use burnlink_worker_pool::WorkerPool;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;
use crate::jobs::{ExpiredShareSweepJob, EXPIRED_SHARE_SWEEP_JOB_ID};

/// Every long-lived component of a running server.
pub struct App {
	pub config: ServerConfig,
	pub db: SqlitePool,
	pub crypto: Arc<CryptoPool>,
	pub shares: Arc<ShareService>,
	pub scheduler: JobScheduler,
}

impl App {
	/// Opens the database, applies migrations and starts the worker pool. The
	/// sweep job is registered but the scheduler is not started.
	pub async fn build(config: ServerConfig) -> Result<Self> {
		let db = create_pool(&config.database.url).await?;
		run_migrations(&db).await?;

		let store: Arc<dyn ShareStore> = Arc::new(ShareRepository::new(db.clone()));

		let crypto = Arc::new(WorkerPool::new(
			"crypto",
			CryptoWorker::rsa(config.workers.rsa_key_bits),
			config.workers.pool_size,
		)?);

		let shares = Arc::new(ShareService::new(
			Arc::clone(&store),
			Arc::clone(&crypto),
			config.shares.settings(),
		));

		let mut scheduler = JobScheduler::new();
		scheduler.register(
			Arc::new(ExpiredShareSweepJob::new(store)),
			&config.scheduler.sweep_schedule,
		)?;

		Ok(Self {
			config,
			db,
			crypto,
			shares,
			scheduler,
		})
	}

	/// Starts periodic jobs if this process is configured to run them.
	pub async fn start_scheduler(&self) {
		if self.config.scheduler.enabled {
			self.scheduler.start().await;
			info!(
				schedule = %self.config.scheduler.sweep_schedule,
				"scheduler started"
			);
		} else {
			info!("scheduler disabled, expired shares will not be swept by this process");
		}
	}

	/// Runs the expiration sweep once, outside the schedule.
	pub async fn sweep_now(&self) -> Result<JobOutput> {
		Ok(self.scheduler.trigger_job(EXPIRED_SHARE_SWEEP_JOB_ID).await?)
	}

	/// Stops the scheduler, drains the worker pool and closes the database.
	pub async fn shutdown(&self) {
		self.scheduler.stop().await;
		self.crypto.close().await;
		self.db.close().await;
		info!("shutdown complete");
	}
}
