//! Deterministic cache key derivation

use crate::RenderRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a hex encoded cache key
pub const KEY_LEN: usize = 64;

/// A SHA-256 digest identifying a rendered artifact, as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Parse a key from its hex form
    ///
    /// Returns `None` unless the string is exactly [`KEY_LEN`] lowercase hex
    /// digits.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = hex.len() == KEY_LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(hex.to_string()))
    }

    /// Get the hex representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives cache keys from requests under a fixed salt
///
/// The salt identifies the rendering logic. Changing it changes every key,
/// which orphans artifacts rendered by older logic instead of serving them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    salt: String,
}

impl KeyDeriver {
    /// Create a deriver with the given salt
    #[must_use]
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// The salt mixed into every key
    #[must_use]
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Compute the key for a request
    #[must_use]
    pub fn derive(&self, request: &RenderRequest) -> CacheKey {
        let canonical = self.envelope(request).to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        CacheKey(hex::encode(digest))
    }

    /// The canonical envelope a key is computed from
    #[must_use]
    pub fn envelope<'a>(&'a self, request: &'a RenderRequest) -> Envelope<'a> {
        Envelope {
            count: request.count(),
            date: request.canonical_date(),
            label: request.label(),
            salt: &self.salt,
        }
    }
}

/// The hashed form of a request
///
/// Field order is part of the key: reordering these fields changes every key.
/// `Display` renders compact JSON, which is the exact text that is hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope<'a> {
    /// Number of days plotted
    pub count: u32,
    /// First plotted day as `YYYY-MM-DD`
    pub date: String,
    /// Chart label
    pub label: &'a str,
    /// Key salt
    pub salt: &'a str,
}

impl fmt::Display for Envelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Strings are JSON quoted, so adjacent fields cannot run together
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn baseline() -> RenderRequest {
        RenderRequest::new(10, "Cookie production", date(2024, 1, 1))
    }

    #[test]
    fn key_is_fixed_length_hex() {
        let key = KeyDeriver::new("v1").derive(&baseline());
        assert_eq!(key.as_str().len(), KEY_LEN);
        assert_eq!(CacheKey::from_hex(key.as_str()), Some(key));
    }

    #[test]
    fn key_is_deterministic() {
        let deriver = KeyDeriver::new("v1");
        assert_eq!(deriver.derive(&baseline()), deriver.derive(&baseline()));
        assert_eq!(
            deriver.derive(&baseline()),
            KeyDeriver::new("v1").derive(&baseline())
        );
    }

    #[test]
    fn key_changes_with_each_field() {
        let deriver = KeyDeriver::new("v1");
        let base = deriver.derive(&baseline());

        let count = RenderRequest::new(11, "Cookie production", date(2024, 1, 1));
        let label = RenderRequest::new(10, "Cookie production!", date(2024, 1, 1));
        let day = RenderRequest::new(10, "Cookie production", date(2024, 1, 2));

        assert_ne!(base, deriver.derive(&count), "count must be keyed");
        assert_ne!(base, deriver.derive(&label), "label must be keyed");
        assert_ne!(base, deriver.derive(&day), "date must be keyed");
    }

    #[test]
    fn key_changes_with_salt() {
        let req = baseline();
        assert_ne!(
            KeyDeriver::new("chart-v1").derive(&req),
            KeyDeriver::new("chart-v2").derive(&req)
        );
        assert_ne!(KeyDeriver::new("").derive(&req), KeyDeriver::new("x").derive(&req));
    }

    #[test]
    fn adjacent_fields_do_not_run_together() {
        let deriver = KeyDeriver::new("");
        let a = RenderRequest::new(1, "23", date(2024, 1, 1));
        let b = RenderRequest::new(12, "3", date(2024, 1, 1));
        assert_ne!(deriver.derive(&a), deriver.derive(&b));
    }

    #[test]
    fn label_cannot_forge_salt() {
        // A label containing JSON punctuation stays inside its own string
        let plain = KeyDeriver::new("s").derive(&RenderRequest::new(1, "a", date(2024, 1, 1)));
        let forged = KeyDeriver::new("").derive(&RenderRequest::new(
            1,
            "a\",\"salt\":\"s",
            date(2024, 1, 1),
        ));
        assert_ne!(plain, forged);
    }

    #[test]
    fn envelope_uses_canonical_date() {
        let deriver = KeyDeriver::new("v1");
        let req = baseline();
        let env = deriver.envelope(&req);
        assert_eq!(env.date, "2024-01-01");
        assert_eq!(env.count, 10);
        assert_eq!(env.salt, "v1");
    }

    #[test]
    fn envelope_text_has_fixed_field_order() {
        let deriver = KeyDeriver::new("v1");
        let req = baseline();
        assert_eq!(
            deriver.envelope(&req).to_string(),
            r#"{"count":10,"date":"2024-01-01","label":"Cookie production","salt":"v1"}"#
        );
    }

    #[test]
    fn key_is_stable_across_releases() {
        // Changing this value orphans every artifact already on disk
        assert_eq!(
            KeyDeriver::new("v1").derive(&baseline()).as_str(),
            "ed57704a8ebd9759181c2a8183c71aaa545b30782a6add127080f4acbeac95f5"
        );
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(CacheKey::from_hex("abc").is_none());
        assert!(CacheKey::from_hex(&"G".repeat(KEY_LEN)).is_none());
        assert!(CacheKey::from_hex(&"A".repeat(KEY_LEN)).is_none());
        assert!(CacheKey::from_hex(&"a".repeat(KEY_LEN)).is_some());
    }
}
