// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for burnlink shares.

pub mod error;
pub mod pool;
pub mod share;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use share::{NewShare, ShareRecord, ShareRepository, ShareStore};
