// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors returned by [`crate::WorkerPool`].
///
/// `Operation` carries the handler's own error for ordinary failures. The
/// remaining variants describe the pool itself.
#[derive(Debug, Error)]
pub enum PoolError<E>
where
	E: std::error::Error + 'static,
{
	#[error(transparent)]
	Operation(E),

	/// The execution unit died while running the task. The pool has already
	/// started a replacement.
	#[error("execution unit faulted while running the task")]
	UnitFault,

	#[error("worker pool is closed")]
	Closed,

	#[error("failed to start execution unit: {0}")]
	Spawn(#[from] std::io::Error),
}
