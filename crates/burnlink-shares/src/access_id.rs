// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes behind each access id (256 bits).
pub const ACCESS_ID_BYTES: usize = 32;

/// Generates a fresh access id: 32 bytes from the OS CSPRNG, lowercase hex.
pub fn generate_access_id() -> String {
	let mut bytes = [0u8; ACCESS_ID_BYTES];
	OsRng.fill_bytes(&mut bytes);
	hex::encode(bytes)
}

/// True if `id` has the shape of a generated access id.
pub fn is_well_formed(id: &str) -> bool {
	id.len() == ACCESS_ID_BYTES * 2 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
