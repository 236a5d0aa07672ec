// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use burnlink_server_config::ConfigError;
use burnlink_server_db::DbError;
use burnlink_server_jobs::JobError;
use burnlink_shares::CryptoPoolError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("database error: {0}")]
	Database(#[from] DbError),

	#[error("worker pool error: {0}")]
	WorkerPool(#[from] CryptoPoolError),

	#[error("job error: {0}")]
	Job(#[from] JobError),
}
