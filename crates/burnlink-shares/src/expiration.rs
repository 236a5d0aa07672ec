// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How long a share stays retrievable. Only these four lifetimes exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expiration {
	#[serde(rename = "5m")]
	FiveMinutes,
	#[default]
	#[serde(rename = "1h")]
	OneHour,
	#[serde(rename = "1d")]
	OneDay,
	#[serde(rename = "7d")]
	SevenDays,
}

impl Expiration {
	pub const ALL: [Expiration; 4] = [
		Expiration::FiveMinutes,
		Expiration::OneHour,
		Expiration::OneDay,
		Expiration::SevenDays,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Expiration::FiveMinutes => "5m",
			Expiration::OneHour => "1h",
			Expiration::OneDay => "1d",
			Expiration::SevenDays => "7d",
		}
	}

	pub fn duration(&self) -> Duration {
		match self {
			Expiration::FiveMinutes => Duration::minutes(5),
			Expiration::OneHour => Duration::hours(1),
			Expiration::OneDay => Duration::days(1),
			Expiration::SevenDays => Duration::days(7),
		}
	}

	pub fn expires_at(&self, from: DateTime<Utc>) -> DateTime<Utc> {
		from + self.duration()
	}

	/// Parses `value`, falling back to `fallback` for anything unrecognised.
	pub fn parse_or(value: &str, fallback: Expiration) -> Expiration {
		value.parse().unwrap_or_else(|_| {
			tracing::warn!(
				requested = %value,
				fallback = %fallback,
				"unrecognised expiration, using fallback"
			);
			fallback
		})
	}
}

impl fmt::Display for Expiration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown expiration {0:?}, expected one of 5m, 1h, 1d, 7d")]
pub struct UnknownExpiration(pub String);

impl FromStr for Expiration {
	type Err = UnknownExpiration;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Expiration::ALL
			.into_iter()
			.find(|e| e.as_str() == s.trim())
			.ok_or_else(|| UnknownExpiration(s.to_string()))
	}
}
