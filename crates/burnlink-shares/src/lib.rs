// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-time secret shares.
//!
//! A share is created encrypted under a fresh keypair, can be retrieved
//! exactly once by whoever holds the key fragment (and the password, if one
//! was set), and is destroyed on retrieval or when it expires.

pub mod access_id;
pub mod error;
pub mod expiration;
pub mod password;
pub mod service;
pub mod worker;

pub use access_id::{generate_access_id, ACCESS_ID_BYTES};
pub use error::{Result, ShareError};
pub use expiration::{Expiration, UnknownExpiration};
pub use service::{CreatedShare, SharePreview, ShareService, ShareSettings, DEFAULT_MAX_PLAINTEXT_BYTES};
pub use worker::{CryptoError, CryptoPool, CryptoPoolError, CryptoRequest, CryptoResponse, CryptoWorker};
