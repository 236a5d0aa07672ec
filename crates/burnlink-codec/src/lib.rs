// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cryptographic codec for burnlink shares.
//!
//! Every share gets its own RSA keypair. The payload is sealed to the public key
//! and the private key leaves the server only as a compressed fragment inside the
//! retrieval link, so the server cannot open a share unless a reader hands the
//! fragment back.
//!
//! All operations here are CPU-bound and synchronous; callers are expected to
//! run them off the async executor.

pub mod compression;
pub mod envelope;
pub mod error;
pub mod rsa_codec;

pub use compression::expand_private_key;
pub use error::{CodecError, CodecResult};
pub use rsa_codec::{RsaCodec, DEFAULT_KEY_BITS};

use zeroize::Zeroizing;

/// A freshly generated keypair in PEM form.
pub struct KeyPair {
	pub public_key_pem: String,
	pub private_key_pem: Zeroizing<String>,
}

impl std::fmt::Debug for KeyPair {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KeyPair")
			.field("public_key_pem", &self.public_key_pem)
			.field("private_key_pem", &"[REDACTED]")
			.finish()
	}
}

/// Contract between the share lifecycle and the underlying cipher and codec.
pub trait ShareCodec: Send + Sync {
	fn generate_keypair(&self) -> CodecResult<KeyPair>;

	/// Seal `plaintext` to a PEM public key, returning base64 ciphertext.
	fn encrypt(&self, plaintext: &[u8], public_key_pem: &str) -> CodecResult<String>;

	/// Fails with [`CodecError::Decrypt`] on a wrong key or corrupted ciphertext.
	fn decrypt(&self, ciphertext: &str, private_key_pem: &str) -> CodecResult<Zeroizing<Vec<u8>>>;

	fn compress(&self, bytes: &[u8]) -> CodecResult<String>;

	/// Fails with [`CodecError::Decompress`] on malformed input.
	fn decompress(&self, token: &str) -> CodecResult<Vec<u8>>;
}
