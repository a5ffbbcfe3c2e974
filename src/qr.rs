//! The logical contract of verification QR payloads.
//!
//! QR image rendering and scanning live outside the core; this module only
//! decides what a decoded payload string means, and what the minimal
//! payload must contain.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::hash::ContentHash;
use crate::signature::{self, ExtractedInfo};

/// Characters of the title carried in the minimal payload.
const TITLE_LIMIT: usize = 20;

/// Minimal QR body: `{"id": ..., "h": ..., "t": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalPayload {
    pub id: String,
    /// Content hash at signing time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<String>,
    /// Truncated title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

/// A decoded QR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrPayload {
    /// Verification URL carrying the document id as a query parameter.
    Url { id: String },
    /// JSON body with at least an `id` field.
    Json(MinimalPayload),
    /// Free text that the fallback scanner recognized.
    Text(ExtractedInfo),
}

impl QrPayload {
    /// The journal id the payload points at.
    pub fn id(&self) -> &str {
        match self {
            QrPayload::Url { id } => id,
            QrPayload::Json(body) => &body.id,
            QrPayload::Text(info) => &info.verification_id,
        }
    }
}

/// Classifies a scanned payload string.
///
/// Tries, in order: an http(s) URL with an `id` query parameter, a JSON
/// object with an `id` field, and finally free text scanning. Returns
/// `None` when nothing matches.
pub fn extract_qr_data(payload: &str) -> Option<QrPayload> {
    let payload = payload.trim();

    if let Ok(parsed) = Url::parse(payload) {
        if matches!(parsed.scheme(), "http" | "https") {
            if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "id") {
                return Some(QrPayload::Url {
                    id: id.into_owned(),
                });
            }
        }
    }

    if let Ok(body) = serde_json::from_str::<MinimalPayload>(payload) {
        if !body.id.is_empty() {
            return Some(QrPayload::Json(body));
        }
    }

    signature::extract_signature_info(payload).map(QrPayload::Text)
}

/// Builds the minimal payload for a journal entry, truncating the title to
/// [`TITLE_LIMIT`] characters.
pub fn minimal_payload(
    id: &str,
    hash: &ContentHash,
    title: &str,
) -> Result<String, serde_json::Error> {
    let truncated: String = title.chars().take(TITLE_LIMIT).collect();
    serde_json::to_string(&MinimalPayload {
        id: id.to_string(),
        h: Some(hash.as_str().to_string()),
        t: Some(truncated),
    })
}
