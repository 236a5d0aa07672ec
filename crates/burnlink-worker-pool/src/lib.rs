// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded pool of OS threads for CPU-bound work, driven from async code.
//!
//! A dispatcher task owns the units and a FIFO queue of pending tasks. Each
//! unit runs one task at a time on its own thread. A unit that panics is
//! replaced and only the task it was running fails.

mod dispatcher;
pub mod error;
pub mod handler;
pub mod pool;
mod unit;

pub use error::PoolError;
pub use handler::TaskHandler;
pub use pool::{default_pool_size, PoolStats, WorkerPool};
