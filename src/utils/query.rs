use std::collections::btree_map::{self, BTreeMap};

use percent_encoding::percent_decode;

use crate::error::VerifyError;

/// Name of the field carrying the platform signature.
pub const HASH_FIELD: &str = "hash";

/// What to do when a field name occurs more than once in a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateKeyPolicy {
    #[default]
    LastWins,
    Reject,
}

impl std::str::FromStr for DuplicateKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_wins" | "last-wins" => Ok(Self::LastWins),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown duplicate key policy '{}'", other)),
        }
    }
}

/// Decoded launch-data fields, ordered by the byte order of their keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: BTreeMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Removes the signature entry, leaving only the signed fields behind.
    pub fn take_signature(&mut self) -> Option<String> {
        self.fields.remove(HASH_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Parses a raw `initData` query string.
///
/// Segments are split on `&`, then on the first `=` only. Keys and values are
/// decoded once with form-urlencoded rules (`+` is a space) and must be UTF-8.
/// Blank values are kept.
pub fn parse_query(raw: &str, policy: DuplicateKeyPolicy) -> Result<FieldMap, VerifyError> {
    if raw.is_empty() {
        return Err(VerifyError::MalformedPayload("payload is empty".into()));
    }

    let mut map = FieldMap::new();
    for segment in raw.split('&') {
        let Some((key, value)) = segment.split_once('=') else {
            return Err(VerifyError::MalformedPayload(format!(
                "segment without '=' at offset {}",
                offset_of(raw, segment)
            )));
        };
        let key = decode_component(key)?;
        let value = decode_component(value)?;

        if map.insert(key.clone(), value).is_some() && policy == DuplicateKeyPolicy::Reject {
            return Err(VerifyError::MalformedPayload(format!("duplicate field '{}'", key)));
        }
    }

    Ok(map)
}

fn decode_component(component: &str) -> Result<String, VerifyError> {
    let bytes = component.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(VerifyError::MalformedPayload(
                    "invalid percent escape".into(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = component.replace('+', " ");
    percent_decode(spaced.as_bytes())
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| VerifyError::MalformedPayload("decoded field is not valid UTF-8".into()))
}

fn offset_of(raw: &str, segment: &str) -> usize {
    segment.as_ptr() as usize - raw.as_ptr() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_keys_and_values_once() {
        let map = parse_query(
            "user=%7B%22id%22%3A1%7D&start_param=a%253Db",
            DuplicateKeyPolicy::LastWins,
        )
        .unwrap();
        assert_eq!(map.get("user"), Some(r#"{"id":1}"#));
        // %25 decodes to a literal '%', which must not be decoded again
        assert_eq!(map.get("start_param"), Some("a%3Db"));
    }

    #[test]
    fn splits_on_first_equals_only() {
        let map = parse_query("start_param=ref=42&x==", DuplicateKeyPolicy::LastWins).unwrap();
        assert_eq!(map.get("start_param"), Some("ref=42"));
        assert_eq!(map.get("x"), Some("="));
    }

    #[test]
    fn keeps_blank_values() {
        let map = parse_query("query_id=&auth_date=1", DuplicateKeyPolicy::LastWins).unwrap();
        assert_eq!(map.get("query_id"), Some(""));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn plus_decodes_to_space() {
        let map = parse_query("title=Rust+Learners%2B", DuplicateKeyPolicy::LastWins).unwrap();
        assert_eq!(map.get("title"), Some("Rust Learners+"));
    }

    #[test]
    fn rejects_empty_payload() {
        let err = parse_query("", DuplicateKeyPolicy::LastWins).unwrap_err();
        assert!(matches!(err, VerifyError::MalformedPayload(_)));
    }

    #[test]
    fn rejects_segment_without_equals() {
        for raw in ["auth_date=1&hash", "auth_date=1&&hash=ab", "garbage"] {
            let err = parse_query(raw, DuplicateKeyPolicy::LastWins).unwrap_err();
            assert!(matches!(err, VerifyError::MalformedPayload(_)), "{}", raw);
        }
    }

    #[test]
    fn rejects_bad_percent_escapes() {
        for raw in ["a=%", "a=%2", "a=%zz", "%g1=b"] {
            let err = parse_query(raw, DuplicateKeyPolicy::LastWins).unwrap_err();
            assert!(matches!(err, VerifyError::MalformedPayload(_)), "{}", raw);
        }
    }

    #[test]
    fn rejects_non_utf8_after_decoding() {
        let err = parse_query("name=%FF%FE", DuplicateKeyPolicy::LastWins).unwrap_err();
        assert!(matches!(err, VerifyError::MalformedPayload(_)));
    }

    #[test]
    fn duplicate_keys_follow_policy() {
        let raw = "auth_date=1&auth_date=2";
        let map = parse_query(raw, DuplicateKeyPolicy::LastWins).unwrap();
        assert_eq!(map.get("auth_date"), Some("2"));

        let err = parse_query(raw, DuplicateKeyPolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            VerifyError::MalformedPayload("duplicate field 'auth_date'".into())
        );
    }

    #[test]
    fn take_signature_removes_hash() {
        let mut map = parse_query("a=1&hash=abc", DuplicateKeyPolicy::LastWins).unwrap();
        assert_eq!(map.take_signature().as_deref(), Some("abc"));
        assert!(!map.contains_key(HASH_FIELD));
        assert_eq!(map.take_signature(), None);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("last_wins".parse::<DuplicateKeyPolicy>(), Ok(DuplicateKeyPolicy::LastWins));
        assert_eq!("REJECT".parse::<DuplicateKeyPolicy>(), Ok(DuplicateKeyPolicy::Reject));
        assert!("first_wins".parse::<DuplicateKeyPolicy>().is_err());
    }
}
