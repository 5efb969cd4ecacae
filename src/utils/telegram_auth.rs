use hmac::Mac;
use subtle::ConstantTimeEq;

use crate::error::VerifyError;
use crate::utils::crypto::{SecretKey, SECRET_KEY_LEN};
use crate::utils::query::{FieldMap, HASH_FIELD};

/// Builds the data-check string: every field except `hash`, sorted by key,
/// rendered as `key=value` and joined with `\n`.
pub fn data_check_string(fields: &FieldMap) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != HASH_FIELD)
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase hex HMAC-SHA256 of `check_string` under `key`.
pub fn compute_signature(check_string: &str, key: &SecretKey) -> String {
    hex::encode(signature_bytes(check_string, key))
}

fn signature_bytes(check_string: &str, key: &SecretKey) -> [u8; SECRET_KEY_LEN] {
    let mut mac = key.mac();
    mac.update(check_string.as_bytes());
    let mut out = [0u8; SECRET_KEY_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Recomputes the signature and compares it with `supplied` in constant time.
///
/// The platform emits exactly 64 lowercase hex digits; any other spelling,
/// including uppercase hex, is a mismatch.
pub fn verify_signature(
    check_string: &str,
    key: &SecretKey,
    supplied: &str,
) -> Result<(), VerifyError> {
    let expected = compute_signature(check_string, key);
    if bool::from(expected.as_bytes().ct_eq(supplied.as_bytes())) {
        Ok(())
    } else {
        Err(VerifyError::SignatureMismatch)
    }
}

/// Signs `fields` the way the platform does and returns the hex signature.
/// An existing `hash` entry is ignored.
pub fn sign_fields(fields: &FieldMap, key: &SecretKey) -> String {
    compute_signature(&data_check_string(fields), key)
}

/// Produces a complete, form-urlencoded launch payload for `pairs`, with the
/// `hash` field appended last.
pub fn sign_query<'a, I>(pairs: I, bot_token: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
    let fields: FieldMap = pairs.iter().copied().collect();
    let hash = sign_fields(&fields, &SecretKey::derive(bot_token));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs.iter().filter(|(key, _)| *key != HASH_FIELD) {
        serializer.append_pair(key, value);
    }
    serializer.append_pair(HASH_FIELD, &hash);
    serializer.finish()
}
