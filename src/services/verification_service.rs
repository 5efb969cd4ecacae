use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::VerifyError;
use crate::models::launch::VerifiedLaunch;
use crate::services::freshness_service::check_freshness;
use crate::utils::crypto::SecretKey;
use crate::utils::query::{parse_query, DuplicateKeyPolicy};
use crate::utils::telegram_auth::{data_check_string, verify_signature};
use crate::utils::time::{Clock, SystemClock};

pub type VerificationResult = Result<VerifiedLaunch, VerifyError>;

/// Verifies launch payloads for a single bot. The signing key is derived once
/// at construction; afterwards the service is immutable and cheap to clone.
#[derive(Clone)]
pub struct VerificationService {
    key: SecretKey,
    max_age: Duration,
    duplicate_keys: DuplicateKeyPolicy,
    clock: Arc<dyn Clock>,
}

impl VerificationService {
    pub fn new(bot_token: &str, max_age: Duration) -> Self {
        Self::from_key(SecretKey::derive(bot_token), max_age)
    }

    pub fn from_key(key: SecretKey, max_age: Duration) -> Self {
        Self {
            key,
            max_age,
            duplicate_keys: DuplicateKeyPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn verify(&self, raw: &str) -> VerificationResult {
        self.verify_at(raw, self.clock.now_unix())
    }

    /// Runs the whole pipeline against an explicit `now` (Unix seconds).
    pub fn verify_at(&self, raw: &str, now: i64) -> VerificationResult {
        let outcome = verify_with_key(raw, &self.key, self.max_age, now, self.duplicate_keys);
        match &outcome {
            Ok(launch) => tracing::debug!(user_id = launch.user_id(), "launch data verified"),
            Err(e) => tracing::warn!(reason = e.reason(), "launch data rejected: {}", e),
        }
        outcome
    }
}

impl fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationService")
            .field("max_age", &self.max_age)
            .field("duplicate_keys", &self.duplicate_keys)
            .finish_non_exhaustive()
    }
}

/// Parse, check the signature, check freshness, then decode the identity.
/// The first failing step decides the outcome.
pub fn verify_with_key(
    raw: &str,
    key: &SecretKey,
    max_age: Duration,
    now: i64,
    duplicate_keys: DuplicateKeyPolicy,
) -> VerificationResult {
    let mut fields = parse_query(raw, duplicate_keys)?;
    let supplied = fields.take_signature().ok_or(VerifyError::MissingSignature)?;

    let check_string = data_check_string(&fields);
    verify_signature(&check_string, key, &supplied)?;

    let auth_date = check_freshness(&fields, now, max_age)?;
    VerifiedLaunch::from_fields(&fields, auth_date)
}
