// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Share lifecycle configuration section.

use burnlink_shares::{Expiration, ShareSettings, DEFAULT_MAX_PLAINTEXT_BYTES};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SharesConfigLayer {
	pub default_expiration: Option<Expiration>,
	pub max_plaintext_bytes: Option<usize>,
}

impl SharesConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.default_expiration.is_some() {
			self.default_expiration = other.default_expiration;
		}
		if other.max_plaintext_bytes.is_some() {
			self.max_plaintext_bytes = other.max_plaintext_bytes;
		}
	}

	pub fn finalize(self) -> SharesConfig {
		SharesConfig {
			default_expiration: self.default_expiration.unwrap_or_default(),
			max_plaintext_bytes: self
				.max_plaintext_bytes
				.unwrap_or(DEFAULT_MAX_PLAINTEXT_BYTES),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharesConfig {
	pub default_expiration: Expiration,
	pub max_plaintext_bytes: usize,
}

impl Default for SharesConfig {
	fn default() -> Self {
		SharesConfigLayer::default().finalize()
	}
}

impl SharesConfig {
	pub fn settings(&self) -> ShareSettings {
		ShareSettings {
			default_expiration: self.default_expiration,
			max_plaintext_bytes: self.max_plaintext_bytes,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = SharesConfig::default();
		assert_eq!(config.default_expiration, Expiration::OneHour);
		assert_eq!(config.max_plaintext_bytes, 65536);
	}

	#[test]
	fn test_deserialize_expiration() {
		let layer: SharesConfigLayer = toml::from_str(r#"default_expiration = "7d""#).unwrap();
		assert_eq!(layer.default_expiration, Some(Expiration::SevenDays));
	}

	#[test]
	fn test_deserialize_rejects_unknown_expiration() {
		let result: Result<SharesConfigLayer, _> = toml::from_str(r#"default_expiration = "2w""#);
		assert!(result.is_err());
	}

	#[test]
	fn test_settings() {
		let config = SharesConfig {
			default_expiration: Expiration::OneDay,
			max_plaintext_bytes: 10,
		};
		let settings = config.settings();
		assert_eq!(settings.default_expiration, Expiration::OneDay);
		assert_eq!(settings.max_plaintext_bytes, 10);
	}
}
