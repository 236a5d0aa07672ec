// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::TriggerSource;

#[derive(Debug, Clone)]
pub struct JobContext {
	pub run_id: String,
	pub triggered_by: TriggerSource,
}
