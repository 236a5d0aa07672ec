// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use burnlink_codec::CodecError;
use burnlink_server_db::{NewShare, ShareStore};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use zeroize::Zeroizing;

use crate::access_id::{generate_access_id, is_well_formed};
use crate::error::{Result, ShareError};
use crate::expiration::Expiration;
use crate::worker::{CryptoError, CryptoPool, CryptoPoolError, CryptoRequest, CryptoResponse};

/// Default cap on plaintext size.
pub const DEFAULT_MAX_PLAINTEXT_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ShareSettings {
	/// Used when a caller asks for an unrecognised expiration.
	pub default_expiration: Expiration,
	pub max_plaintext_bytes: usize,
}

impl Default for ShareSettings {
	fn default() -> Self {
		Self {
			default_expiration: Expiration::default(),
			max_plaintext_bytes: DEFAULT_MAX_PLAINTEXT_BYTES,
		}
	}
}

/// Result of creating a share. The key fragment is the only copy of the
/// private key and must travel with the retrieval link.
pub struct CreatedShare {
	pub access_id: String,
	pub expires_at: DateTime<Utc>,
	pub expiration: Expiration,
	pub key_fragment: Zeroizing<String>,
}

impl std::fmt::Debug for CreatedShare {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CreatedShare")
			.field("expires_at", &self.expires_at)
			.field("expiration", &self.expiration)
			.finish_non_exhaustive()
	}
}

/// What a reader may learn about a share before consuming it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharePreview {
	pub expires_at: DateTime<Utc>,
	pub requires_password: bool,
}

/// Owns the share lifecycle: created, retrievable, then consumed or expired.
///
/// Retrieval exclusivity rests on the store: whichever caller's delete removes
/// the row wins, everyone else sees [`ShareError::Gone`].
pub struct ShareService {
	store: Arc<dyn ShareStore>,
	pool: Arc<CryptoPool>,
	settings: ShareSettings,
}

impl ShareService {
	pub fn new(store: Arc<dyn ShareStore>, pool: Arc<CryptoPool>, settings: ShareSettings) -> Self {
		Self {
			store,
			pool,
			settings,
		}
	}

	pub fn settings(&self) -> &ShareSettings {
		&self.settings
	}

	/// Encrypts and stores a new share.
	///
	/// Unrecognised `expiration` values fall back to the configured default.
	/// An empty password is treated as no password. The row is written in a
	/// single insert after all crypto work has succeeded.
	#[instrument(skip(self, plaintext, password), fields(len = plaintext.len()))]
	pub async fn create_share(
		&self,
		plaintext: &[u8],
		expiration: &str,
		password: Option<&str>,
	) -> Result<CreatedShare> {
		if plaintext.is_empty() {
			return Err(ShareError::Validation("plaintext must not be empty".to_string()));
		}
		if plaintext.len() > self.settings.max_plaintext_bytes {
			return Err(ShareError::Validation(format!(
				"plaintext exceeds {} bytes",
				self.settings.max_plaintext_bytes
			)));
		}

		let expiration = Expiration::parse_or(expiration, self.settings.default_expiration);

		let sealed = self
			.pool
			.execute(CryptoRequest::Seal {
				plaintext: Zeroizing::new(plaintext.to_vec()),
			})
			.await
			.map_err(crypto_failure)?;
		let CryptoResponse::Sealed {
			ciphertext,
			key_fragment,
		} = sealed
		else {
			return Err(unexpected_response("seal"));
		};

		let password_hash = match password.filter(|p| !p.is_empty()) {
			Some(password) => Some(self.hash_password(password).await?),
			None => None,
		};

		// Stored timestamps carry microsecond precision.
		let created_at = Utc::now().trunc_subsecs(6);
		let share = NewShare {
			access_id: generate_access_id(),
			ciphertext,
			password_hash,
			expires_at: expiration.expires_at(created_at),
			created_at,
		};
		let access_id = self.store.create(&share).await?;

		info!(
			expiration = %expiration,
			expires_at = %share.expires_at,
			protected = share.password_hash.is_some(),
			"share created"
		);

		Ok(CreatedShare {
			access_id,
			expires_at: share.expires_at,
			expiration,
			key_fragment,
		})
	}

	/// Opens a share and destroys it.
	///
	/// Steps run in order: lookup (expired counts as missing), password check,
	/// decrypt, delete. Nothing is deleted unless decryption succeeds, and the
	/// plaintext is only returned once the delete has gone through. The delete
	/// re-checks expiry, so a share that lapses mid-decrypt is reported gone.
	#[instrument(skip_all)]
	pub async fn retrieve_share(
		&self,
		access_id: &str,
		password: Option<&str>,
		key_fragment: &str,
	) -> Result<Zeroizing<Vec<u8>>> {
		if !is_well_formed(access_id) {
			return Err(ShareError::Gone);
		}

		let record = self
			.store
			.find_active(access_id, Utc::now())
			.await?
			.ok_or(ShareError::Gone)?;

		if let Some(hash) = record.password_hash.as_deref() {
			let Some(password) = password.filter(|p| !p.is_empty()) else {
				return Err(ShareError::Unauthorized);
			};
			if !self.verify_password(password, hash).await? {
				return Err(ShareError::Unauthorized);
			}
		}

		let opened = self
			.pool
			.execute(CryptoRequest::Open {
				ciphertext: record.ciphertext,
				key_fragment: Zeroizing::new(key_fragment.to_string()),
			})
			.await
			.map_err(open_failure)?;
		let CryptoResponse::Opened(plaintext) = opened else {
			return Err(unexpected_response("open"));
		};

		if !self.store.delete_by_id(access_id, Utc::now()).await? {
			// Consumed by another reader, or expired, since the lookup.
			warn!("share consumed or expired before delete, discarding plaintext");
			return Err(ShareError::Gone);
		}

		info!("share consumed");
		Ok(plaintext)
	}

	/// Looks at a share without consuming it.
	#[instrument(skip_all)]
	pub async fn describe_share(&self, access_id: &str) -> Result<SharePreview> {
		if !is_well_formed(access_id) {
			return Err(ShareError::Gone);
		}

		let record = self
			.store
			.find_active(access_id, Utc::now())
			.await?
			.ok_or(ShareError::Gone)?;

		Ok(SharePreview {
			expires_at: record.expires_at,
			requires_password: record.requires_password(),
		})
	}

	async fn hash_password(&self, password: &str) -> Result<String> {
		let response = self
			.pool
			.execute(CryptoRequest::HashPassword {
				password: Zeroizing::new(password.to_string()),
			})
			.await
			.map_err(crypto_failure)?;

		match response {
			CryptoResponse::PasswordHash(hash) => Ok(hash),
			_ => Err(unexpected_response("hash_password")),
		}
	}

	async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
		let response = self
			.pool
			.execute(CryptoRequest::VerifyPassword {
				password: Zeroizing::new(password.to_string()),
				hash: hash.to_string(),
			})
			.await
			.map_err(crypto_failure)?;

		match response {
			CryptoResponse::PasswordVerified(ok) => Ok(ok),
			_ => Err(unexpected_response("verify_password")),
		}
	}
}

fn unexpected_response(operation: &'static str) -> ShareError {
	ShareError::Crypto(format!("unexpected worker response for {operation}"))
}

fn crypto_failure(err: CryptoPoolError) -> ShareError {
	warn!(error = %err, "crypto operation failed");
	ShareError::Crypto(err.to_string())
}

/// Decrypt-side failures caused by the supplied key or ciphertext are the
/// reader's problem; pool trouble is ours.
fn open_failure(err: CryptoPoolError) -> ShareError {
	match err {
		CryptoPoolError::Operation(CryptoError::Codec(
			CodecError::Decrypt(_) | CodecError::Decompress(_) | CodecError::InvalidKey(_),
		)) => ShareError::BadKey,
		other => crypto_failure(other),
	}
}
