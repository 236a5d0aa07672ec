// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argon2id hashing for share passwords.
//!
//! Hashes are PHC strings with a random salt. Unit tests use reduced-cost
//! parameters; every other build uses the crate defaults
//! (19 MiB, 2 iterations, parallelism 1).

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
#[cfg(test)]
use argon2::{Algorithm, Params, Version};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
	#[error("failed to hash password: {0}")]
	Hash(String),

	#[error("stored password hash is malformed: {0}")]
	MalformedHash(String),
}

#[inline]
fn argon2_instance() -> Argon2<'static> {
	#[cfg(test)]
	{
		// Fast, insecure parameters for tests ONLY.
		let params = Params::new(1024, 1, 1, None).expect("valid Argon2 params for tests");
		Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
	}

	#[cfg(not(test))]
	{
		Argon2::default()
	}
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
	let salt = SaltString::generate(&mut OsRng);

	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Checks `password` against a stored PHC hash. A mismatch is `Ok(false)`;
/// only an unparseable hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
	let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

	Ok(argon2_instance()
		.verify_password(password.as_bytes(), &parsed)
		.is_ok())
}
