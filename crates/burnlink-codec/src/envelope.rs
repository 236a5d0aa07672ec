// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hybrid envelope encryption for share payloads.
//!
//! RSA-OAEP (SHA-256) wraps a fresh AES-256-GCM data key per payload. The sealed
//! layout is `wrapped_key || nonce || ciphertext`, where `wrapped_key` is exactly
//! the RSA modulus size.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CodecError, CodecResult};

/// Size of the data key in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// Generate a random data key.
fn generate_data_key() -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	OsRng.fill_bytes(key.as_mut());
	key
}

/// Generate a random nonce.
///
/// Every data key encrypts exactly one payload, so random nonces never repeat
/// under the same key.
fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

/// Seal `plaintext` to `public_key`.
pub fn seal(public_key: &RsaPublicKey, plaintext: &[u8]) -> CodecResult<Vec<u8>> {
	let dek = generate_data_key();

	let wrapped_key = public_key
		.encrypt(&mut OsRng, Oaep::new::<Sha256>(), dek.as_slice())
		.map_err(|e| CodecError::Encryption(format!("data key wrapping failed: {e}")))?;

	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(dek.as_slice()));
	let nonce_bytes = generate_nonce();
	let ciphertext = cipher
		.encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
		.map_err(|e| CodecError::Encryption(format!("payload encryption failed: {e}")))?;

	let mut sealed = Vec::with_capacity(wrapped_key.len() + NONCE_SIZE + ciphertext.len());
	sealed.extend_from_slice(&wrapped_key);
	sealed.extend_from_slice(&nonce_bytes);
	sealed.extend_from_slice(&ciphertext);
	Ok(sealed)
}

/// Open a payload produced by [`seal`].
///
/// Every failure (wrong key, truncated or tampered data) is reported as
/// [`CodecError::Decrypt`].
pub fn open(private_key: &RsaPrivateKey, sealed: &[u8]) -> CodecResult<Zeroizing<Vec<u8>>> {
	let wrapped_len = private_key.size();
	if sealed.len() < wrapped_len + NONCE_SIZE + TAG_SIZE {
		return Err(CodecError::Decrypt(format!(
			"sealed payload too short ({} bytes)",
			sealed.len()
		)));
	}

	let (wrapped_key, rest) = sealed.split_at(wrapped_len);
	let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

	let dek = Zeroizing::new(
		private_key
			.decrypt(Oaep::new::<Sha256>(), wrapped_key)
			.map_err(|e| CodecError::Decrypt(format!("data key unwrapping failed: {e}")))?,
	);
	if dek.len() != KEY_SIZE {
		return Err(CodecError::Decrypt(format!(
			"unwrapped data key has {} bytes, expected {KEY_SIZE}",
			dek.len()
		)));
	}

	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(dek.as_slice()));
	let plaintext = cipher
		.decrypt(Nonce::from_slice(nonce), ciphertext)
		.map_err(|e| CodecError::Decrypt(format!("payload decryption failed: {e}")))?;

	Ok(Zeroizing::new(plaintext))
}
