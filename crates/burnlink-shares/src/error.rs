// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use burnlink_server_db::DbError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShareError>;

/// Failures of the share lifecycle, as seen by the transport layer.
#[derive(Debug, Error)]
pub enum ShareError {
	#[error("invalid request: {0}")]
	Validation(String),

	#[error("cryptographic operation failed: {0}")]
	Crypto(String),

	/// Missing and expired shares are deliberately indistinguishable.
	#[error("share not found or expired")]
	Gone,

	#[error("invalid password")]
	Unauthorized,

	#[error("invalid key or corrupted data")]
	BadKey,

	#[error("storage error: {0}")]
	Store(#[from] DbError),
}

impl ShareError {
	/// True for errors caused by the request rather than the server. The
	/// others are transient and the whole call may be retried.
	pub fn is_client_error(&self) -> bool {
		matches!(
			self,
			ShareError::Validation(_) | ShareError::Gone | ShareError::Unauthorized | ShareError::BadKey
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_client_errors() {
		assert!(ShareError::Validation("empty".into()).is_client_error());
		assert!(ShareError::Gone.is_client_error());
		assert!(ShareError::Unauthorized.is_client_error());
		assert!(ShareError::BadKey.is_client_error());

		assert!(!ShareError::Crypto("unit fault".into()).is_client_error());
		assert!(!ShareError::Store(DbError::Internal("down".into())).is_client_error());
	}
}
