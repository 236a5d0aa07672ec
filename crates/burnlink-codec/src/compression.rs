// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Url-safe compressed tokens for private keys carried in retrieval links.
//!
//! Tokens are zlib streams encoded as base64url. Encoding never pads; decoding
//! accepts padded and unpadded input.

use std::io::{Read, Write};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use zeroize::Zeroizing;

use crate::error::{CodecError, CodecResult};

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const PEM_MARKER: &str = "-----BEGIN";

/// Deflate `bytes` and encode the result as an unpadded base64url token.
pub fn compress(bytes: &[u8]) -> CodecResult<String> {
	let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
	encoder
		.write_all(bytes)
		.map_err(|e| CodecError::Compression(e.to_string()))?;
	let compressed = encoder
		.finish()
		.map_err(|e| CodecError::Compression(e.to_string()))?;

	Ok(TOKEN_ENGINE.encode(compressed))
}

/// Reverse [`compress`].
pub fn decompress(token: &str) -> CodecResult<Vec<u8>> {
	let compressed = TOKEN_ENGINE
		.decode(token.trim())
		.map_err(|e| CodecError::Decompress(format!("invalid base64url: {e}")))?;

	let mut decoder = ZlibDecoder::new(compressed.as_slice());
	let mut bytes = Vec::new();
	decoder
		.read_to_end(&mut bytes)
		.map_err(|e| CodecError::Decompress(format!("invalid zlib stream: {e}")))?;

	Ok(bytes)
}

/// Turn a key fragment from a retrieval link back into PEM text.
///
/// Links issued before keys were compressed carry the PEM directly. Anything
/// that is not a PEM and fails to decompress into UTF-8 is passed through
/// unchanged and left for the decrypt step to reject.
pub fn expand_private_key(fragment: &str) -> Zeroizing<String> {
	if fragment.contains(PEM_MARKER) {
		return Zeroizing::new(fragment.to_string());
	}

	match decompress(fragment).map(String::from_utf8) {
		Ok(Ok(pem)) => Zeroizing::new(pem),
		Ok(Err(_)) | Err(_) => {
			tracing::debug!("key fragment is not compressed, using it as-is");
			Zeroizing::new(fragment.to_string())
		}
	}
}
