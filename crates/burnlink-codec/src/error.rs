// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for codec operations.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Errors raised by key generation, encryption and key fragment encoding.
#[derive(Debug, Error)]
pub enum CodecError {
	#[error("key generation failed: {0}")]
	KeyGeneration(String),

	#[error("invalid key: {0}")]
	InvalidKey(String),

	#[error("encryption failed: {0}")]
	Encryption(String),

	/// The key does not match the ciphertext, or the ciphertext is corrupted.
	#[error("decryption failed: {0}")]
	Decrypt(String),

	#[error("compression failed: {0}")]
	Compression(String),

	/// The token is not valid base64url or not a valid zlib stream.
	#[error("malformed compressed token: {0}")]
	Decompress(String),
}
