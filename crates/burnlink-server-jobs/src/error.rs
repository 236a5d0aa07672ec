// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
	#[error("Job failed: {message}")]
	Failed { message: String, retryable: bool },

	#[error("Job not found: {0}")]
	NotFound(String),

	#[error("Job already registered: {0}")]
	Duplicate(String),

	#[error("Job is already running: {0}")]
	AlreadyRunning(String),

	#[error("Scheduler already started")]
	AlreadyStarted,

	#[error("Invalid schedule: {0}")]
	InvalidSchedule(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, JobError>;
