// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use burnlink_shares::Expiration;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, LoggingConfigLayer, SchedulerConfigLayer, SharesConfigLayer,
	WorkersConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/burnlink/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: BURNLINK_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(load_database_from_env()),
			workers: Some(load_workers_from_env()?),
			scheduler: Some(load_scheduler_from_env()),
			shares: Some(load_shares_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	env_parse(name, "unsigned integer")
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("BURNLINK_DATABASE_URL"),
	}
}

fn load_workers_from_env() -> Result<WorkersConfigLayer, ConfigError> {
	Ok(WorkersConfigLayer {
		pool_size: env_usize("BURNLINK_WORKER_POOL_SIZE")?,
		rsa_key_bits: env_usize("BURNLINK_RSA_KEY_BITS")?,
	})
}

fn load_scheduler_from_env() -> SchedulerConfigLayer {
	SchedulerConfigLayer {
		enabled: env_bool("BURNLINK_SCHEDULER_ENABLED").or_else(|| env_bool("START_SCHEDULER")),
		sweep_schedule: env_var("BURNLINK_SWEEP_SCHEDULE"),
	}
}

fn load_shares_from_env() -> Result<SharesConfigLayer, ConfigError> {
	Ok(SharesConfigLayer {
		default_expiration: env_parse::<Expiration>("BURNLINK_DEFAULT_EXPIRATION", "expiration")?,
		max_plaintext_bytes: env_usize("BURNLINK_MAX_PLAINTEXT_BYTES")?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("BURNLINK_LOG_LEVEL"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_toml_file_is_empty_layer() {
		let layer = TomlSource::new("/nonexistent/burnlink/server.toml")
			.load()
			.unwrap();
		assert!(layer.database.is_none());
		assert!(layer.scheduler.is_none());
	}

	#[test]
	fn test_toml_source_parses_sections() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[database]
url = "sqlite:/tmp/shares.db"

[scheduler]
enabled = true
sweep_schedule = "@every 10m"

[shares]
default_expiration = "5m"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:/tmp/shares.db")
		);
		let scheduler = layer.scheduler.unwrap();
		assert_eq!(scheduler.enabled, Some(true));
		assert_eq!(scheduler.sweep_schedule.as_deref(), Some("@every 10m"));
		assert_eq!(
			layer.shares.unwrap().default_expiration,
			Some(Expiration::FiveMinutes)
		);
	}

	#[test]
	fn test_invalid_toml_reports_path() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "[workers\npool_size = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { ref path, .. } if path == file.path()));
	}

	#[test]
	fn test_env_bool() {
		std::env::set_var("BURNLINK_TEST_ENV_BOOL_TRUE", "TRUE");
		std::env::set_var("BURNLINK_TEST_ENV_BOOL_ONE", "1");
		std::env::set_var("BURNLINK_TEST_ENV_BOOL_NO", "no");
		assert_eq!(env_bool("BURNLINK_TEST_ENV_BOOL_TRUE"), Some(true));
		assert_eq!(env_bool("BURNLINK_TEST_ENV_BOOL_ONE"), Some(true));
		assert_eq!(env_bool("BURNLINK_TEST_ENV_BOOL_NO"), Some(false));
		assert_eq!(env_bool("BURNLINK_TEST_ENV_BOOL_UNSET"), None);
	}

	#[test]
	fn test_env_usize_rejects_garbage() {
		std::env::set_var("BURNLINK_TEST_ENV_USIZE_BAD", "lots");
		let err = env_usize("BURNLINK_TEST_ENV_USIZE_BAD").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "BURNLINK_TEST_ENV_USIZE_BAD"));

		std::env::set_var("BURNLINK_TEST_ENV_USIZE_OK", " 12 ");
		assert_eq!(env_usize("BURNLINK_TEST_ENV_USIZE_OK").unwrap(), Some(12));
	}

	#[test]
	fn test_env_expiration() {
		std::env::set_var("BURNLINK_TEST_ENV_EXPIRATION", "1d");
		assert_eq!(
			env_parse::<Expiration>("BURNLINK_TEST_ENV_EXPIRATION", "expiration").unwrap(),
			Some(Expiration::OneDay)
		);

		std::env::set_var("BURNLINK_TEST_ENV_EXPIRATION_BAD", "forever");
		assert!(env_parse::<Expiration>("BURNLINK_TEST_ENV_EXPIRATION_BAD", "expiration").is_err());
	}
}
