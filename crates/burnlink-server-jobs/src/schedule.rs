// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schedule expressions for periodic jobs.
//!
//! Two forms are accepted, both evaluated in UTC:
//! - cron: standard 5-field Unix (`*/30 * * * *`), or the 6/7-field form with
//!   seconds (and year) understood by the `cron` crate
//! - fixed interval: `@every 30s`, `@every 5m`, `@every 2h`

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::error::{JobError, Result};

/// Convert a standard 5-field Unix cron expression to the 7-field format
/// expected by the `cron` crate.
///
/// 5-field format: minute hour day-of-month month day-of-week
/// 7-field format: second minute hour day-of-month month day-of-week year
fn convert_to_cron_crate_format(expression: &str) -> String {
	let field_count = expression.split_whitespace().count();
	if field_count == 5 {
		format!("0 {} *", expression)
	} else {
		expression.to_string()
	}
}

/// Longest accepted `@every` interval: 365 days.
const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 3600);

fn parse_interval(interval: &str) -> Result<Duration> {
	let interval = interval.trim();
	let invalid = || JobError::InvalidSchedule(format!("invalid interval: @every {interval}"));

	let (split, _) = interval.char_indices().last().ok_or_else(invalid)?;
	let (amount, unit) = interval.split_at(split);
	let amount: u64 = amount.trim().parse().map_err(|_| invalid())?;
	if amount == 0 {
		return Err(invalid());
	}

	let secs = match unit {
		"s" => Some(amount),
		"m" => amount.checked_mul(60),
		"h" => amount.checked_mul(3600),
		_ => None,
	}
	.ok_or_else(invalid)?;
	if secs > MAX_INTERVAL.as_secs() {
		return Err(JobError::InvalidSchedule(format!(
			"interval too long (max {}s): @every {interval}",
			MAX_INTERVAL.as_secs()
		)));
	}

	Ok(Duration::from_secs(secs))
}

#[derive(Debug, Clone)]
pub enum JobSchedule {
	Cron {
		expression: String,
		schedule: Box<Schedule>,
	},
	Every(Duration),
}

impl JobSchedule {
	pub fn parse(expression: &str) -> Result<Self> {
		let expression = expression.trim();

		if let Some(interval) = expression.strip_prefix("@every ") {
			return parse_interval(interval).map(JobSchedule::Every);
		}

		let field_count = expression.split_whitespace().count();
		if !(5..=7).contains(&field_count) {
			return Err(JobError::InvalidSchedule(format!(
				"expected 5, 6 or 7 cron fields, got {field_count}: {expression}"
			)));
		}

		let schedule = Schedule::from_str(&convert_to_cron_crate_format(expression))
			.map_err(|e| JobError::InvalidSchedule(format!("{expression}: {e}")))?;

		Ok(JobSchedule::Cron {
			expression: expression.to_string(),
			schedule: Box::new(schedule),
		})
	}

	/// Next firing strictly after `after`, if the schedule has one.
	pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
		match self {
			JobSchedule::Cron { schedule, .. } => schedule.after(&after).next(),
			JobSchedule::Every(interval) => {
				let step = chrono::Duration::from_std(*interval).ok()?;
				after.checked_add_signed(step)
			}
		}
	}

	pub(crate) fn ticker(&self) -> ScheduleTicker {
		match self {
			JobSchedule::Cron { schedule, .. } => ScheduleTicker::Cron {
				schedule: schedule.as_ref().clone(),
				last_fired: None,
			},
			JobSchedule::Every(interval) => {
				let mut ticker = tokio::time::interval_at(Instant::now() + *interval, *interval);
				ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
				ScheduleTicker::Every(ticker)
			}
		}
	}
}

impl FromStr for JobSchedule {
	type Err = JobError;

	fn from_str(s: &str) -> Result<Self> {
		JobSchedule::parse(s)
	}
}

impl fmt::Display for JobSchedule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JobSchedule::Cron { expression, .. } => f.write_str(expression),
			JobSchedule::Every(interval) => write!(f, "@every {}s", interval.as_secs()),
		}
	}
}

/// Waits for successive firings of a schedule.
pub(crate) enum ScheduleTicker {
	Cron {
		schedule: Schedule,
		last_fired: Option<DateTime<Utc>>,
	},
	Every(Interval),
}

/// Next cron slot after both `now` and the last slot already fired.
fn next_cron_slot(
	schedule: &Schedule,
	now: DateTime<Utc>,
	last_fired: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
	let from = last_fired.map_or(now, |last| last.max(now));
	schedule.after(&from).next()
}

impl ScheduleTicker {
	/// Sleeps until the next firing. Returns false if there is none.
	pub async fn tick(&mut self) -> bool {
		match self {
			ScheduleTicker::Cron {
				schedule,
				last_fired,
			} => {
				let now = Utc::now();
				let Some(next) = next_cron_slot(schedule, now, *last_fired) else {
					return false;
				};
				let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
				tokio::time::sleep(delay).await;
				*last_fired = Some(next);
				true
			}
			ScheduleTicker::Every(interval) => {
				interval.tick().await;
				true
			}
		}
	}
}
