// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CPU-bound share operations, executed on the worker pool.

use std::sync::Arc;

use burnlink_codec::{expand_private_key, CodecError, RsaCodec, ShareCodec};
use burnlink_worker_pool::{PoolError, TaskHandler, WorkerPool};
use zeroize::Zeroizing;

use crate::password::{self, PasswordError};

pub type CryptoPool = WorkerPool<CryptoWorker>;

pub enum CryptoRequest {
	/// Generate a keypair, encrypt `plaintext` and return the compressed
	/// private key as the key fragment.
	Seal { plaintext: Zeroizing<Vec<u8>> },
	Open {
		ciphertext: String,
		key_fragment: Zeroizing<String>,
	},
	HashPassword { password: Zeroizing<String> },
	VerifyPassword {
		password: Zeroizing<String>,
		hash: String,
	},
}

pub enum CryptoResponse {
	Sealed {
		ciphertext: String,
		key_fragment: Zeroizing<String>,
	},
	Opened(Zeroizing<Vec<u8>>),
	PasswordHash(String),
	PasswordVerified(bool),
}

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
	#[error(transparent)]
	Codec(#[from] CodecError),

	#[error(transparent)]
	Password(#[from] PasswordError),
}

pub type CryptoPoolError = PoolError<CryptoError>;

/// [`TaskHandler`] that runs share cryptography against a [`ShareCodec`].
pub struct CryptoWorker {
	codec: Arc<dyn ShareCodec>,
}

impl CryptoWorker {
	pub fn new(codec: Arc<dyn ShareCodec>) -> Self {
		Self { codec }
	}

	pub fn rsa(key_bits: usize) -> Self {
		Self::new(Arc::new(RsaCodec::new(key_bits)))
	}

	fn seal(&self, plaintext: &[u8]) -> Result<CryptoResponse, CryptoError> {
		let keys = self.codec.generate_keypair()?;
		let ciphertext = self.codec.encrypt(plaintext, &keys.public_key_pem)?;
		let key_fragment = Zeroizing::new(self.codec.compress(keys.private_key_pem.as_bytes())?);

		Ok(CryptoResponse::Sealed {
			ciphertext,
			key_fragment,
		})
	}

	fn open(&self, ciphertext: &str, key_fragment: &str) -> Result<CryptoResponse, CryptoError> {
		let private_key_pem = expand_private_key(key_fragment);
		let plaintext = self.codec.decrypt(ciphertext, &private_key_pem)?;
		Ok(CryptoResponse::Opened(plaintext))
	}
}

impl TaskHandler for CryptoWorker {
	type Request = CryptoRequest;
	type Response = CryptoResponse;
	type Error = CryptoError;

	fn operation(request: &CryptoRequest) -> &'static str {
		match request {
			CryptoRequest::Seal { .. } => "seal",
			CryptoRequest::Open { .. } => "open",
			CryptoRequest::HashPassword { .. } => "hash_password",
			CryptoRequest::VerifyPassword { .. } => "verify_password",
		}
	}

	fn handle(&self, request: CryptoRequest) -> Result<CryptoResponse, CryptoError> {
		match request {
			CryptoRequest::Seal { plaintext } => self.seal(&plaintext),
			CryptoRequest::Open {
				ciphertext,
				key_fragment,
			} => self.open(&ciphertext, &key_fragment),
			CryptoRequest::HashPassword { password } => {
				Ok(CryptoResponse::PasswordHash(password::hash_password(&password)?))
			}
			CryptoRequest::VerifyPassword { password, hash } => Ok(CryptoResponse::PasswordVerified(
				password::verify_password(&password, &hash)?,
			)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn worker() -> CryptoWorker {
		CryptoWorker::rsa(1024)
	}

	#[test]
	fn seal_then_open() {
		let worker = worker();
		let CryptoResponse::Sealed {
			ciphertext,
			key_fragment,
		} = worker
			.handle(CryptoRequest::Seal {
				plaintext: Zeroizing::new(b"hello".to_vec()),
			})
			.unwrap()
		else {
			panic!("expected Sealed");
		};

		assert!(!key_fragment.contains("BEGIN"));
		assert!(!key_fragment.contains('='));

		let CryptoResponse::Opened(plaintext) = worker
			.handle(CryptoRequest::Open {
				ciphertext,
				key_fragment,
			})
			.unwrap()
		else {
			panic!("expected Opened");
		};
		assert_eq!(plaintext.as_slice(), b"hello");
	}

	#[test]
	fn open_accepts_uncompressed_pem() {
		let codec = RsaCodec::new(1024);
		let keys = codec.generate_keypair().unwrap();
		let ciphertext = codec.encrypt(b"legacy", &keys.public_key_pem).unwrap();

		let response = worker()
			.handle(CryptoRequest::Open {
				ciphertext,
				key_fragment: keys.private_key_pem.clone(),
			})
			.unwrap();
		assert!(matches!(response, CryptoResponse::Opened(p) if p.as_slice() == b"legacy"));
	}

	#[test]
	fn open_with_garbage_fragment_is_a_codec_error() {
		let codec = RsaCodec::new(1024);
		let keys = codec.generate_keypair().unwrap();
		let ciphertext = codec.encrypt(b"x", &keys.public_key_pem).unwrap();

		let result = worker().handle(CryptoRequest::Open {
			ciphertext,
			key_fragment: Zeroizing::new("not-a-key".to_string()),
		});
		assert!(matches!(result, Err(CryptoError::Codec(CodecError::Decrypt(_)))));
	}

	#[test]
	fn password_roundtrip() {
		let worker = worker();
		let CryptoResponse::PasswordHash(hash) = worker
			.handle(CryptoRequest::HashPassword {
				password: Zeroizing::new("pw123".to_string()),
			})
			.unwrap()
		else {
			panic!("expected PasswordHash");
		};

		let verified = worker
			.handle(CryptoRequest::VerifyPassword {
				password: Zeroizing::new("pw123".to_string()),
				hash: hash.clone(),
			})
			.unwrap();
		assert!(matches!(verified, CryptoResponse::PasswordVerified(true)));

		let rejected = worker
			.handle(CryptoRequest::VerifyPassword {
				password: Zeroizing::new("wrong".to_string()),
				hash,
			})
			.unwrap();
		assert!(matches!(rejected, CryptoResponse::PasswordVerified(false)));
	}

	#[test]
	fn operation_names() {
		let seal = CryptoRequest::Seal {
			plaintext: Zeroizing::new(Vec::new()),
		};
		assert_eq!(CryptoWorker::operation(&seal), "seal");
		let verify = CryptoRequest::VerifyPassword {
			password: Zeroizing::new(String::new()),
			hash: String::new(),
		};
		assert_eq!(CryptoWorker::operation(&verify), "verify_password");
	}
}
