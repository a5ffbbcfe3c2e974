//! The signature metadata unit embedded into signed PDFs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Current packet schema version.
///
/// Bumped when the embedded encoding changes shape; extraction keeps
/// accepting every version it knows how to decode.
pub const PACKET_VERSION: u32 = 1;

/// Signature metadata embedded in and recovered from a signed PDF.
///
/// The round-trip contract the codec exists to guarantee: the packet
/// extracted from a PDF equals the packet that was embedded, field for
/// field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePacket {
    /// Hex encoded ECDSA signature over the content (see [`crate::signature`]
    /// for the exact format).
    pub signature: String,
    /// The signer's public key, hex SEC1 or SPKI PEM.
    pub public_key: String,
    /// Hash of the content at signing time.
    pub original_hash: ContentHash,
    pub author: String,
    /// Subject line of the journal entry.
    pub perihal: String,
    pub journal_id: String,
    /// Signing time, RFC 3339 on the wire.
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}
