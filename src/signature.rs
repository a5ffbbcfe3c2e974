//! ECDSA signature verification and key material validation.
//!
//! Formats are fixed for the lifetime of the system. Keys are NIST P-256;
//! public keys travel as hex encoded SEC1 points (compressed or
//! uncompressed) or as SPKI PEM. Signatures are hex encoded ASN.1 DER,
//! with the fixed-width 64 byte `r || s` form also accepted. The signed
//! message is the raw content under ECDSA's standard SHA-256 prehash, so a
//! signature verifies against the same digest the content hasher produces.
//!
//! Verification is fail-closed: malformed input of any kind yields `false`,
//! never an error.

use lazy_static::lazy_static;
use p256::ecdsa::signature::Verifier as _;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use regex::Regex;

/// Decodes a public key from its string form.
fn decode_public_key(public_key: &str) -> Option<VerifyingKey> {
    let trimmed = public_key.trim();
    if trimmed.starts_with("-----BEGIN") {
        return VerifyingKey::from_public_key_pem(trimmed).ok();
    }
    let bytes = hex::decode(trimmed).ok()?;
    VerifyingKey::from_sec1_bytes(&bytes).ok()
}

/// Decodes a signature from its hex string form, DER first.
fn decode_signature(signature: &str) -> Option<Signature> {
    let bytes = hex::decode(signature.trim()).ok()?;
    Signature::from_der(&bytes)
        .or_else(|_| Signature::from_slice(&bytes))
        .ok()
}

/// Checks `signature` over `content` with the claimed public key.
///
/// Any malformed key, malformed signature, or curve mismatch degrades to
/// `false`; corrupt input must never read as valid.
#[tracing::instrument(skip_all, fields(content_len = content.len()))]
pub fn verify_signature(content: &[u8], signature: &str, public_key: &str) -> bool {
    let Some(key) = decode_public_key(public_key) else {
        tracing::debug!("public key did not decode");
        return false;
    };
    let Some(sig) = decode_signature(signature) else {
        tracing::debug!("signature did not decode");
        return false;
    };
    key.verify(content, &sig).is_ok()
}

/// Structural validation of public key material, without a signature to
/// check against.
pub fn validate_public_key(public_key: &str) -> bool {
    decode_public_key(public_key).is_some()
}

/// Verification identifier recovered from unstructured text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedInfo {
    pub verification_id: String,
    /// A 64-hex token found alongside the identifier, if any.
    pub content_hash: Option<String>,
}

lazy_static! {
    static ref LABELLED_ID: Regex =
        Regex::new(r"(?i)verification[ _-]?id\s*[:=]\s*([A-Za-z0-9_-]{4,})").unwrap();
    static ref UUID: Regex = Regex::new(
        r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b"
    )
    .unwrap();
    static ref HEX64: Regex = Regex::new(r"\b[0-9a-f]{64}\b").unwrap();
}

/// Best-effort recovery of a verification identifier from free text.
///
/// Fallback path for QR payloads that are neither a URL nor JSON. Returns
/// `None` rather than erroring when no known pattern matches.
pub fn extract_signature_info(raw_text: &str) -> Option<ExtractedInfo> {
    let verification_id = LABELLED_ID
        .captures(raw_text)
        .map(|caps| caps[1].to_string())
        .or_else(|| UUID.find(raw_text).map(|m| m.as_str().to_string()))?;
    let content_hash = HEX64.find(raw_text).map(|m| m.as_str().to_string());
    Some(ExtractedInfo {
        verification_id,
        content_hash,
    })
}
