// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rsa::pkcs1::{
	DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding,
};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::instrument;
use zeroize::Zeroizing;

use crate::error::{CodecError, CodecResult};
use crate::{compression, envelope, KeyPair, ShareCodec};

/// Default modulus size for per-share keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// [`ShareCodec`] backed by PKCS#1 RSA keys and the hybrid envelope.
#[derive(Debug, Clone)]
pub struct RsaCodec {
	key_bits: usize,
}

impl RsaCodec {
	pub fn new(key_bits: usize) -> Self {
		Self { key_bits }
	}

	pub fn key_bits(&self) -> usize {
		self.key_bits
	}
}

impl Default for RsaCodec {
	fn default() -> Self {
		Self::new(DEFAULT_KEY_BITS)
	}
}

impl ShareCodec for RsaCodec {
	#[instrument(skip(self), fields(bits = self.key_bits))]
	fn generate_keypair(&self) -> CodecResult<KeyPair> {
		let private_key = RsaPrivateKey::new(&mut OsRng, self.key_bits)
			.map_err(|e| CodecError::KeyGeneration(e.to_string()))?;
		let public_key = RsaPublicKey::from(&private_key);

		let private_key_pem = private_key
			.to_pkcs1_pem(LineEnding::LF)
			.map_err(|e| CodecError::KeyGeneration(format!("private key encoding failed: {e}")))?;
		let public_key_pem = public_key
			.to_pkcs1_pem(LineEnding::LF)
			.map_err(|e| CodecError::KeyGeneration(format!("public key encoding failed: {e}")))?;

		Ok(KeyPair {
			public_key_pem,
			private_key_pem,
		})
	}

	fn encrypt(&self, plaintext: &[u8], public_key_pem: &str) -> CodecResult<String> {
		let public_key = RsaPublicKey::from_pkcs1_pem(public_key_pem)
			.map_err(|e| CodecError::InvalidKey(format!("public key: {e}")))?;

		let sealed = envelope::seal(&public_key, plaintext)?;
		Ok(STANDARD.encode(sealed))
	}

	fn decrypt(&self, ciphertext: &str, private_key_pem: &str) -> CodecResult<Zeroizing<Vec<u8>>> {
		// A key that does not parse is indistinguishable from a wrong key to the caller.
		let private_key = RsaPrivateKey::from_pkcs1_pem(private_key_pem)
			.map_err(|e| CodecError::Decrypt(format!("private key: {e}")))?;
		let sealed = STANDARD
			.decode(ciphertext)
			.map_err(|e| CodecError::Decrypt(format!("ciphertext is not base64: {e}")))?;

		envelope::open(&private_key, &sealed)
	}

	fn compress(&self, bytes: &[u8]) -> CodecResult<String> {
		compression::compress(bytes)
	}

	fn decompress(&self, token: &str) -> CodecResult<Vec<u8>> {
		compression::decompress(token)
	}
}
