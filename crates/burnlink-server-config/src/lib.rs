// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for burnlink server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`BURNLINK_*`)
//!
//! # Usage
//!
//! ```ignore
//! use burnlink_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Sweeping on {}", config.scheduler.sweep_schedule);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use burnlink_server_jobs::JobSchedule;
use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub workers: WorkersConfig,
	pub scheduler: SchedulerConfig,
	pub shares: SharesConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`BURNLINK_*`)
/// 2. Config file (`/etc/burnlink/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_config_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_config_from_sources(sources)
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_config_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		database: layer.database.unwrap_or_default().finalize(),
		workers: layer.workers.unwrap_or_default().finalize(),
		scheduler: layer.scheduler.unwrap_or_default().finalize(),
		shares: layer.shares.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		database = %config.database.url,
		pool_size = config.workers.pool_size,
		rsa_key_bits = config.workers.rsa_key_bits,
		scheduler_enabled = config.scheduler.enabled,
		sweep_schedule = %config.scheduler.sweep_schedule,
		default_expiration = %config.shares.default_expiration,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.workers.pool_size == 0 {
		return Err(ConfigError::Validation(
			"workers.pool_size must be at least 1".to_string(),
		));
	}

	if !SUPPORTED_RSA_KEY_BITS.contains(&config.workers.rsa_key_bits) {
		return Err(ConfigError::Validation(format!(
			"workers.rsa_key_bits must be one of {SUPPORTED_RSA_KEY_BITS:?}, got {}",
			config.workers.rsa_key_bits
		)));
	}

	if config.shares.max_plaintext_bytes == 0 {
		return Err(ConfigError::Validation(
			"shares.max_plaintext_bytes must be greater than 0".to_string(),
		));
	}

	JobSchedule::parse(&config.scheduler.sweep_schedule).map_err(|e| {
		ConfigError::Validation(format!(
			"scheduler.sweep_schedule {:?} is invalid: {e}",
			config.scheduler.sweep_schedule
		))
	})?;

	Ok(())
}
