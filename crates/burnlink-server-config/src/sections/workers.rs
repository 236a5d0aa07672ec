// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crypto worker pool configuration section.

use burnlink_worker_pool::default_pool_size;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RSA_KEY_BITS: usize = 2048;

pub const SUPPORTED_RSA_KEY_BITS: [usize; 4] = [1024, 2048, 3072, 4096];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkersConfigLayer {
	pub pool_size: Option<usize>,
	pub rsa_key_bits: Option<usize>,
}

impl WorkersConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.pool_size.is_some() {
			self.pool_size = other.pool_size;
		}
		if other.rsa_key_bits.is_some() {
			self.rsa_key_bits = other.rsa_key_bits;
		}
	}

	pub fn finalize(self) -> WorkersConfig {
		WorkersConfig {
			pool_size: self.pool_size.unwrap_or_else(default_pool_size),
			rsa_key_bits: self.rsa_key_bits.unwrap_or(DEFAULT_RSA_KEY_BITS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkersConfig {
	pub pool_size: usize,
	pub rsa_key_bits: usize,
}

impl Default for WorkersConfig {
	fn default() -> Self {
		WorkersConfigLayer::default().finalize()
	}
}
