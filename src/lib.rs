//! Verification of Telegram Mini App launch data (`initData`).
//!
//! A payload is accepted only when its HMAC-SHA256 signature matches the key
//! derived from the bot token, its `auth_date` is within the allowed age, and
//! its `user` field decodes into an [`Identity`].

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::time::Duration;

pub use crate::error::{Error, Result, VerifyError};
pub use crate::models::chat::ChatContext;
pub use crate::models::launch::{SessionInfo, VerifiedLaunch};
pub use crate::models::user::Identity;
pub use crate::services::verification_service::{VerificationResult, VerificationService};
pub use crate::utils::crypto::{KeyCache, SecretKey};
pub use crate::utils::query::DuplicateKeyPolicy;

use crate::services::verification_service::verify_with_key;
use crate::utils::time::{Clock, SystemClock};

/// Verifies `raw` for `bot_token` against the system clock.
///
/// The key is derived on every call; long-lived callers should hold a
/// [`VerificationService`] instead.
pub fn verify(raw: &str, bot_token: &str, max_age: Duration) -> VerificationResult {
    verify_at(raw, bot_token, max_age, SystemClock.now_unix())
}

/// Same as [`verify`] with `now` given in Unix seconds.
pub fn verify_at(raw: &str, bot_token: &str, max_age: Duration, now: i64) -> VerificationResult {
    verify_with_key(
        raw,
        &SecretKey::derive(bot_token),
        max_age,
        now,
        DuplicateKeyPolicy::default(),
    )
}
