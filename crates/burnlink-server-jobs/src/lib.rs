// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic job scheduler for burnlink server.
//!
//! Jobs run on cron or fixed-interval schedules. Each job is guarded against
//! overlapping with itself, and its recent runs are kept in memory for health
//! reporting.

pub mod context;
pub mod error;
pub mod health;
pub mod job;
pub mod schedule;
pub mod scheduler;
pub mod types;

pub use context::JobContext;
pub use error::{JobError, Result};
pub use health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use job::Job;
pub use schedule::JobSchedule;
pub use scheduler::JobScheduler;
pub use types::{JobOutput, JobStatus, TriggerSource};
