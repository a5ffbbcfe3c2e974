//! Canonical content hashing.
//!
//! Every document, whatever its origin (raw bytes, UTF-8 text, or base64
//! encoded text), is normalized to a single byte buffer and digested with
//! SHA-256. The resulting [`ContentHash`] is what gets signed, and what gets
//! recomputed from the stored content at verification time.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Content larger than this is rejected before any hashing or signing.
pub const MAX_CONTENT_LEN: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("document content is empty")]
    Empty,
    #[error("document content is {actual} bytes, the limit is {limit}")]
    Oversized { actual: usize, limit: usize },
    #[error("content declared as base64 does not decode")]
    BadBase64(#[from] base64::DecodeError),
}

/// Document content as handed over by the caller.
///
/// The caller states which form it has; [`DocumentContent::as_bytes`]
/// normalizes all three to the byte buffer that gets hashed and embedded.
#[derive(Debug, Clone)]
pub enum DocumentContent {
    Binary(Vec<u8>),
    Text(String),
    /// Base64 encoded text, as produced by browser file uploads.
    Base64(String),
}

impl DocumentContent {
    /// Normalizes the content to raw bytes.
    pub fn as_bytes(&self) -> Result<Cow<'_, [u8]>, InputError> {
        match self {
            DocumentContent::Binary(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
            DocumentContent::Text(text) => Ok(Cow::Borrowed(text.as_bytes())),
            DocumentContent::Base64(encoded) => {
                use base64::Engine;
                let decoded = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
                Ok(Cow::Owned(decoded))
            }
        }
    }

    /// Normalizes to bytes and applies the input size policy.
    pub fn checked_bytes(&self) -> Result<Cow<'_, [u8]>, InputError> {
        let bytes = self.as_bytes()?;
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }
        if bytes.len() > MAX_CONTENT_LEN {
            return Err(InputError::Oversized {
                actual: bytes.len(),
                limit: MAX_CONTENT_LEN,
            });
        }
        Ok(bytes)
    }
}

#[derive(Error, Debug)]
pub enum HashParseError {
    #[error("hash must be 64 hex characters, got {0}")]
    WrongLength(usize),
    #[error("hash contains non-hexadecimal characters")]
    NotHex,
}

/// A lowercase hexadecimal SHA-256 digest, 64 characters.
///
/// The digest algorithm is fixed for the lifetime of the system; input
/// format ambiguity must never change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }

    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        if s.len() != 64 {
            return Err(HashParseError::WrongLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HashParseError::NotHex);
        }
        Ok(ContentHash(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant time equality.
    pub fn ct_eq(&self, other: &ContentHash) -> bool {
        hashes_equal(&self.0, &other.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = HashParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ContentHash::from_hex(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> String {
        hash.0
    }
}

/// Constant time string comparison for hex digests.
///
/// This guards cryptographic integrity, so it must not leak the position of
/// the first differing character.
pub fn hashes_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |diff, (x, y)| diff | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        let a = ContentHash::compute(b"some document content");
        let b = ContentHash::compute(b"some document content");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn single_bit_change_changes_the_hash() {
        let a = ContentHash::compute(b"some document content");
        let b = ContentHash::compute(b"some document conteot");
        assert_ne!(a, b);
    }

    #[test]
    fn base64_input_hashes_like_its_decoded_bytes() {
        use base64::Engine;
        let text = "laporan bulanan";
        let encoded = base64::engine::general_purpose::STANDARD.encode(text);

        let from_text = DocumentContent::Text(text.to_string());
        let from_base64 = DocumentContent::Base64(encoded);
        assert_eq!(
            ContentHash::compute(&from_text.as_bytes().unwrap()),
            ContentHash::compute(&from_base64.as_bytes().unwrap()),
        );
    }

    #[test]
    fn bad_base64_is_rejected_not_coerced() {
        let content = DocumentContent::Base64("not!valid!base64!!".to_string());
        assert!(matches!(content.as_bytes(), Err(InputError::BadBase64(_))));
    }

    #[test]
    fn size_policy() {
        assert!(matches!(
            DocumentContent::Binary(Vec::new()).checked_bytes(),
            Err(InputError::Empty)
        ));
        assert!(matches!(
            DocumentContent::Binary(vec![0u8; MAX_CONTENT_LEN + 1]).checked_bytes(),
            Err(InputError::Oversized { .. })
        ));
        assert!(DocumentContent::Text("x".to_string()).checked_bytes().is_ok());
    }

    #[test]
    fn from_hex_validates_shape() {
        let ok = "a".repeat(64);
        assert!(ContentHash::from_hex(&ok).is_ok());
        assert!(ContentHash::from_hex("abc").is_err());
        assert!(ContentHash::from_hex(&"g".repeat(64)).is_err());

        // Upper case digests from foreign tooling are normalized.
        let upper = ContentHash::from_hex(&"AB".repeat(32)).unwrap();
        assert_eq!(upper.as_str(), "ab".repeat(32));
    }

    #[test]
    fn constant_time_equality_agrees_with_eq() {
        let a = ContentHash::compute(b"a");
        let b = ContentHash::compute(b"b");
        assert!(a.ct_eq(&a.clone()));
        assert!(!a.ct_eq(&b));
        assert!(!hashes_equal("abc", "abcd"));
    }
}
