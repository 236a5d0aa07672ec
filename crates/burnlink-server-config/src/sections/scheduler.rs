// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduler configuration section.

use serde::{Deserialize, Serialize};

/// Every thirty minutes.
pub const DEFAULT_SWEEP_SCHEDULE: &str = "*/30 * * * *";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfigLayer {
	pub enabled: Option<bool>,
	pub sweep_schedule: Option<String>,
}

impl SchedulerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.sweep_schedule.is_some() {
			self.sweep_schedule = other.sweep_schedule;
		}
	}

	pub fn finalize(self) -> SchedulerConfig {
		SchedulerConfig {
			enabled: self.enabled.unwrap_or(false),
			sweep_schedule: self
				.sweep_schedule
				.unwrap_or_else(|| DEFAULT_SWEEP_SCHEDULE.to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
	/// Off unless explicitly enabled; only one process should sweep.
	pub enabled: bool,
	pub sweep_schedule: String,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		SchedulerConfigLayer::default().finalize()
	}
}
