// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for burnlink-server.

pub mod database;
pub mod logging;
pub mod scheduler;
pub mod shares;
pub mod workers;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use scheduler::{SchedulerConfig, SchedulerConfigLayer, DEFAULT_SWEEP_SCHEDULE};
pub use shares::{SharesConfig, SharesConfigLayer};
pub use workers::{WorkersConfig, WorkersConfigLayer, SUPPORTED_RSA_KEY_BITS};
