// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process host for burnlink: wires configuration, storage, the crypto worker
//! pool, the share service and the expiration sweeper together.

pub mod app;
pub mod error;
pub mod jobs;

pub use app::App;
pub use error::{Result, ServerError};
