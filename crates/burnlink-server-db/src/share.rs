// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};

/// Fields of a share at the moment it is written.
#[derive(Clone)]
pub struct NewShare {
	pub access_id: String,
	pub ciphertext: String,
	pub password_hash: Option<String>,
	pub expires_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

/// A stored share as read back from the database.
#[derive(Clone)]
pub struct ShareRecord {
	pub access_id: String,
	pub ciphertext: String,
	pub password_hash: Option<String>,
	pub expires_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

impl ShareRecord {
	pub fn requires_password(&self) -> bool {
		self.password_hash.is_some()
	}
}

impl std::fmt::Debug for ShareRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ShareRecord")
			.field("access_id", &self.access_id)
			.field("requires_password", &self.requires_password())
			.field("expires_at", &self.expires_at)
			.field("created_at", &self.created_at)
			.finish_non_exhaustive()
	}
}

impl std::fmt::Debug for NewShare {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NewShare")
			.field("access_id", &self.access_id)
			.field("requires_password", &self.password_hash.is_some())
			.field("expires_at", &self.expires_at)
			.finish_non_exhaustive()
	}
}

/// Fixed-width UTC timestamps so that text comparison in SQL matches
/// chronological order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|ts| ts.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} timestamp {value:?}: {e}")))
}

type ShareRow = (String, String, Option<String>, String, String);

fn share_from_row(row: ShareRow) -> Result<ShareRecord> {
	let (access_id, ciphertext, password_hash, expires_at, created_at) = row;
	Ok(ShareRecord {
		expires_at: parse_timestamp("expires_at", &expires_at)?,
		created_at: parse_timestamp("created_at", &created_at)?,
		access_id,
		ciphertext,
		password_hash,
	})
}

#[derive(Clone)]
pub struct ShareRepository {
	pool: SqlitePool,
}

impl ShareRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Writes the complete share in one statement and returns its access id.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the access id already exists.
	#[tracing::instrument(skip(self, share), fields(expires_at = %share.expires_at))]
	pub async fn create(&self, share: &NewShare) -> Result<String> {
		let result = sqlx::query(
			r#"
			INSERT INTO shares (access_id, ciphertext, password_hash, expires_at, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(&share.access_id)
		.bind(&share.ciphertext)
		.bind(&share.password_hash)
		.bind(format_timestamp(share.expires_at))
		.bind(format_timestamp(share.created_at))
		.execute(&self.pool)
		.await;

		match result {
			Ok(_) => Ok(share.access_id.clone()),
			Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
				Err(DbError::Conflict("share access id already exists".to_string()))
			}
			Err(e) => Err(e.into()),
		}
	}

	/// Looks up a share that has not expired as of `now`. Expired rows are
	/// reported the same as missing ones.
	#[tracing::instrument(skip(self, access_id))]
	pub async fn find_active(&self, access_id: &str, now: DateTime<Utc>) -> Result<Option<ShareRecord>> {
		let row = sqlx::query_as::<_, ShareRow>(
			r#"
			SELECT access_id, ciphertext, password_hash, expires_at, created_at
			FROM shares
			WHERE access_id = ? AND expires_at > ?
			"#,
		)
		.bind(access_id)
		.bind(format_timestamp(now))
		.fetch_optional(&self.pool)
		.await?;

		row.map(share_from_row).transpose()
	}

	/// Removes a share that is still live as of `now`. Returns true iff this
	/// call removed the row; an expired row is left for the sweep.
	#[tracing::instrument(skip(self, access_id))]
	pub async fn delete_by_id(&self, access_id: &str, now: DateTime<Utc>) -> Result<bool> {
		let result = sqlx::query("DELETE FROM shares WHERE access_id = ? AND expires_at > ?")
			.bind(access_id)
			.bind(format_timestamp(now))
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Removes every share whose `expires_at` is strictly before `before`.
	#[tracing::instrument(skip(self))]
	pub async fn delete_expired_before(&self, before: DateTime<Utc>) -> Result<u64> {
		let result = sqlx::query("DELETE FROM shares WHERE expires_at < ?")
			.bind(format_timestamp(before))
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected())
	}
}

#[async_trait]
pub trait ShareStore: Send + Sync {
	async fn create(&self, share: &NewShare) -> Result<String>;
	async fn find_active(&self, access_id: &str, now: DateTime<Utc>) -> Result<Option<ShareRecord>>;
	async fn delete_by_id(&self, access_id: &str, now: DateTime<Utc>) -> Result<bool>;
	async fn delete_expired_before(&self, before: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
impl ShareStore for ShareRepository {
	async fn create(&self, share: &NewShare) -> Result<String> {
		self.create(share).await
	}

	async fn find_active(&self, access_id: &str, now: DateTime<Utc>) -> Result<Option<ShareRecord>> {
		self.find_active(access_id, now).await
	}

	async fn delete_by_id(&self, access_id: &str, now: DateTime<Utc>) -> Result<bool> {
		self.delete_by_id(access_id, now).await
	}

	async fn delete_expired_before(&self, before: DateTime<Utc>) -> Result<u64> {
		self.delete_expired_before(before).await
	}
}
