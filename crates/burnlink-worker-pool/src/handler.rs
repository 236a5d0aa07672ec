// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Work executed by the units of a [`crate::WorkerPool`].
///
/// A single handler instance is shared by every unit, so `handle` must be safe
/// to call from several threads at once. A panic inside `handle` kills the unit
/// that was running it.
pub trait TaskHandler: Send + Sync + 'static {
	type Request: Send + 'static;
	type Response: Send + 'static;
	type Error: std::error::Error + Send + 'static;

	/// Name of the operation a request asks for, used for logging.
	fn operation(request: &Self::Request) -> &'static str;

	fn handle(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}
