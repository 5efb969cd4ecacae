use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

pub type HmacSha256 = Hmac<Sha256>;

/// Domain-separation constant of the Web App signing scheme. It identifies the
/// protocol version, so it is deliberately not configurable.
const WEB_APP_KEY_CONSTANT: &[u8] = b"WebAppData";

pub const SECRET_KEY_LEN: usize = 32;

/// Key material derived from a bot token. Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; SECRET_KEY_LEN]);

impl SecretKey {
    /// `HMAC-SHA256(key = "WebAppData", message = bot_token)`.
    pub fn derive(bot_token: &str) -> Self {
        let mut mac = keyed_mac(WEB_APP_KEY_CONSTANT);
        mac.update(bot_token.as_bytes());
        let mut key = [0u8; SECRET_KEY_LEN];
        key.copy_from_slice(&mac.finalize().into_bytes());
        Self(key)
    }

    pub(crate) fn mac(&self) -> HmacSha256 {
        keyed_mac(&self.0)
    }
}

/// HMAC pads keys shorter than the hash block with zeros, so filling a
/// zeroed block gives the same MAC as keying with the raw slice. Both callers
/// pass keys shorter than the 64-byte SHA-256 block.
fn keyed_mac(key: &[u8]) -> HmacSha256 {
    let mut block = Key::<HmacSha256>::default();
    block[..key.len()].copy_from_slice(key);
    <HmacSha256 as KeyInit>::new(&block)
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Derived keys per bot token, for services that verify launches for more
/// than one bot. Reads take a shared lock; a miss derives once and stores.
#[derive(Clone, Default)]
pub struct KeyCache {
    keys: Arc<RwLock<HashMap<String, SecretKey>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_derive(&self, bot_token: &str) -> SecretKey {
        {
            let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
            if let Some(key) = keys.get(bot_token) {
                return key.clone();
            }
        }

        let key = SecretKey::derive(bot_token);
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.entry(bot_token.to_string())
            .or_insert_with(|| key.clone())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCache").field("entries", &self.len()).finish()
    }
}
