// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod expired_share_sweep;

pub use expired_share_sweep::{ExpiredShareSweepJob, EXPIRED_SHARE_SWEEP_JOB_ID};
