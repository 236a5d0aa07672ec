// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"create_shares",
		r#"
		CREATE TABLE IF NOT EXISTS shares (
			access_id TEXT PRIMARY KEY NOT NULL,
			ciphertext TEXT NOT NULL,
			password_hash TEXT,
			expires_at TEXT NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	),
	(
		"index_shares_expires_at",
		"CREATE INDEX IF NOT EXISTS idx_shares_expires_at ON shares(expires_at)",
	),
];

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./burnlink.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

/// Creates the share schema. Safe to run on every start.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		sqlx::query(sql).execute(pool).await.map_err(|e| {
			tracing::error!(migration = name, error = %e, "migration failed");
			DbError::Sqlx(e)
		})?;
	}

	tracing::info!(count = MIGRATIONS.len(), "database migrations applied");
	Ok(())
}
