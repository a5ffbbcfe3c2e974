#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

pub mod codec;
pub mod hash;
pub mod packet;
pub mod qr;
pub mod signature;
pub mod store;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

pub use hash::{hashes_equal, ContentHash, DocumentContent, InputError, MAX_CONTENT_LEN};
pub use packet::{SignaturePacket, PACKET_VERSION};
pub use qr::QrPayload;
pub use store::{DocumentStore, MemoryStore};

#[derive(Error, Debug)]
pub enum Error {
    #[error("QR payload is not a recognized URL, JSON body, or verification text")]
    UnrecognizedQrPayload,
}

/// Terminal classification of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The PDF carries no signature packet.
    Unsigned,
    /// The signature checks out against the currently stored content.
    Valid,
    /// The signature does not check out.
    Invalid,
    /// The PDF could not be parsed.
    Malformed,
}

/// Outcome of a single verification call.
///
/// Produced fresh on every call and never persisted by the core.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    /// Journal identity claimed by the packet, when one was found.
    pub journal_id: Option<String>,
    /// The packet recovered from the PDF, when one was found.
    pub packet: Option<SignaturePacket>,
    /// The recomputed hash of the stored content differs from the hash
    /// recorded at signing time. Informational: the verdict follows the
    /// signature check alone.
    pub integrity_mismatch: bool,
}

impl VerificationReport {
    fn bare(verdict: Verdict) -> Self {
        VerificationReport {
            verdict,
            journal_id: None,
            packet: None,
            integrity_mismatch: false,
        }
    }
}

/// Descriptive fields for a sealing call.
#[derive(Debug, Clone)]
pub struct SealRequest<'a> {
    pub author: &'a str,
    /// Subject line of the journal entry.
    pub perihal: &'a str,
    pub journal_id: &'a str,
    /// Public key matching the external signing call, stored alongside the
    /// signature for later verification.
    pub public_key: &'a str,
}

/// Signs document content and embeds the resulting packet into a PDF.
///
/// The signature itself comes from `sign`, an external call that receives
/// the content hash; the core never holds private keys. Content is
/// normalized and size-checked before any crypto work happens.
#[tracing::instrument(skip_all, fields(journal_id = %request.journal_id))]
pub fn seal<F>(
    content: &DocumentContent,
    request: &SealRequest,
    sign: F,
) -> Result<(Vec<u8>, SignaturePacket)>
where
    F: FnOnce(&ContentHash) -> Result<String>,
{
    let bytes = content.checked_bytes()?;
    let original_hash = ContentHash::compute(&bytes);
    let signature = sign(&original_hash)?;

    let packet = SignaturePacket {
        signature,
        public_key: request.public_key.to_string(),
        original_hash,
        author: request.author.to_string(),
        perihal: request.perihal.to_string(),
        journal_id: request.journal_id.to_string(),
        timestamp: Utc::now(),
        version: PACKET_VERSION,
    };

    let pdf = codec::embed(content, &packet)?;
    tracing::info!(pdf_len = pdf.len(), "document sealed");
    Ok((pdf, packet))
}

/// State machine for a single verification call: extract the packet,
/// recompute the stored content's hash, check the signature.
pub struct Verifier<'a, S: DocumentStore> {
    store: &'a S,
}

impl<'a, S: DocumentStore> Verifier<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Verifier { store }
    }

    /// Verifies a signed PDF.
    ///
    /// Storage failures propagate as errors; everything else lands in the
    /// verdict. An unparseable PDF is reported as [`Verdict::Malformed`]
    /// rather than surfaced as a crash, and is kept distinct from the
    /// unsigned case.
    #[tracing::instrument(skip_all, fields(pdf_len = pdf_bytes.len()))]
    pub fn verify_pdf(&self, pdf_bytes: &[u8]) -> Result<VerificationReport> {
        let packet = match codec::extract(pdf_bytes) {
            Ok(Some(packet)) => packet,
            Ok(None) => return Ok(VerificationReport::bare(Verdict::Unsigned)),
            Err(err) => {
                tracing::debug!(%err, "PDF did not parse, reporting malformed");
                return Ok(VerificationReport::bare(Verdict::Malformed));
            }
        };

        let content = self.store.load_content(&packet.journal_id)?;
        Ok(self.check_packet(packet, &content))
    }

    /// Resolves a QR payload to a stored PDF and verifies it.
    pub fn verify_qr(&self, payload: &str) -> Result<VerificationReport> {
        let payload = qr::extract_qr_data(payload).ok_or(Error::UnrecognizedQrPayload)?;
        let pdf = self.store.load_pdf(payload.id())?;
        self.verify_pdf(&pdf)
    }

    fn check_packet(&self, packet: SignaturePacket, content: &[u8]) -> VerificationReport {
        // The hash recorded in the packet is only a cross check; what gets
        // verified is the content as currently stored.
        let current_hash = ContentHash::compute(content);
        let integrity_mismatch = !current_hash.ct_eq(&packet.original_hash);
        if integrity_mismatch {
            tracing::info!(
                journal_id = %packet.journal_id,
                "stored content hash differs from the hash recorded at signing time"
            );
        }

        let valid = signature::verify_signature(content, &packet.signature, &packet.public_key);
        VerificationReport {
            verdict: if valid { Verdict::Valid } else { Verdict::Invalid },
            journal_id: Some(packet.journal_id.clone()),
            packet: Some(packet),
            integrity_mismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::hazmat::PrehashSigner;
    use p256::ecdsa::{Signature, SigningKey};
    use rand::rngs::OsRng;

    const JOURNAL_ID: &str = "journal-1";

    fn signer_for(key: &SigningKey) -> impl FnOnce(&ContentHash) -> Result<String> + '_ {
        move |hash| {
            let digest = hex::decode(hash.as_str())?;
            let sig: Signature = key.sign_prehash(&digest)?;
            Ok(hex::encode(sig.to_der().as_bytes()))
        }
    }

    fn public_key_hex(key: &SigningKey) -> String {
        hex::encode(key.verifying_key().to_encoded_point(false).as_bytes())
    }

    /// Seals one text document into a store, ready for verification.
    fn sealed_store() -> (MemoryStore, SignaturePacket) {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = public_key_hex(&signing_key);
        let content = DocumentContent::Text("Catatan rapat koordinasi bulanan.".to_string());

        let mut store = MemoryStore::new();
        store.put_content(JOURNAL_ID, content.checked_bytes().unwrap().into_owned());

        let (pdf, packet) = seal(
            &content,
            &SealRequest {
                author: "Budi Santoso",
                perihal: "Catatan rapat",
                journal_id: JOURNAL_ID,
                public_key: &public_key,
            },
            signer_for(&signing_key),
        )
        .unwrap();
        store.save(JOURNAL_ID, pdf, &packet).unwrap();

        (store, packet)
    }

    #[test]
    fn freshly_sealed_document_verifies() {
        let (store, packet) = sealed_store();
        let pdf = store.load_pdf(JOURNAL_ID).unwrap();

        let report = Verifier::new(&store).verify_pdf(&pdf).unwrap();
        assert_eq!(report.verdict, Verdict::Valid);
        assert_eq!(report.journal_id.as_deref(), Some(JOURNAL_ID));
        assert_eq!(report.packet.as_ref(), Some(&packet));
        assert!(!report.integrity_mismatch);
    }

    /// Post-signing tampering is caught by recomputing the hash of what is
    /// stored now, not by trusting the packet's own record.
    #[test]
    fn tampered_content_flips_to_invalid() {
        let (mut store, packet) = sealed_store();
        store.put_content(JOURNAL_ID, b"Catatan yang sudah diubah.".to_vec());
        let pdf = store.load_pdf(JOURNAL_ID).unwrap();

        let report = Verifier::new(&store).verify_pdf(&pdf).unwrap();
        assert_eq!(report.verdict, Verdict::Invalid);
        assert!(report.integrity_mismatch);

        // The embedded packet still matches the original content; only the
        // live recomputation exposes the swap.
        assert_eq!(report.packet.unwrap().original_hash, packet.original_hash);
    }

    #[test]
    fn unsigned_pdf_reports_unsigned() {
        let (store, _) = sealed_store();
        let mut doc = crate::codec::synthesize_pdf("belum ditandatangani").unwrap();
        let mut unsigned = Vec::new();
        doc.save_to(&mut unsigned).unwrap();

        let report = Verifier::new(&store).verify_pdf(&unsigned).unwrap();
        assert_eq!(report.verdict, Verdict::Unsigned);
        assert!(report.packet.is_none());
    }

    #[test]
    fn garbage_bytes_report_malformed() {
        let (store, _) = sealed_store();
        let report = Verifier::new(&store)
            .verify_pdf(b"definitely not a pdf")
            .unwrap();
        assert_eq!(report.verdict, Verdict::Malformed);
        assert!(report.packet.is_none());
    }

    #[test]
    fn signature_by_a_different_key_is_invalid() {
        let signing_key = SigningKey::random(&mut OsRng);
        let other_key = SigningKey::random(&mut OsRng);
        let content = DocumentContent::Text("isi dokumen".to_string());

        let mut store = MemoryStore::new();
        store.put_content(JOURNAL_ID, content.checked_bytes().unwrap().into_owned());

        // Claim one key, sign with another.
        let (pdf, packet) = seal(
            &content,
            &SealRequest {
                author: "x",
                perihal: "y",
                journal_id: JOURNAL_ID,
                public_key: &public_key_hex(&other_key),
            },
            signer_for(&signing_key),
        )
        .unwrap();
        store.save(JOURNAL_ID, pdf, &packet).unwrap();

        let pdf = store.load_pdf(JOURNAL_ID).unwrap();
        let report = Verifier::new(&store).verify_pdf(&pdf).unwrap();
        assert_eq!(report.verdict, Verdict::Invalid);
        // The content was untouched, so this is purely a signature failure.
        assert!(!report.integrity_mismatch);
    }

    #[test]
    fn qr_round_trip() {
        let (store, packet) = sealed_store();
        let payload =
            qr::minimal_payload(JOURNAL_ID, &packet.original_hash, "Catatan rapat").unwrap();

        let report = Verifier::new(&store).verify_qr(&payload).unwrap();
        assert_eq!(report.verdict, Verdict::Valid);

        let url = format!("https://jurnal.example.id/verify?id={JOURNAL_ID}");
        let report = Verifier::new(&store).verify_qr(&url).unwrap();
        assert_eq!(report.verdict, Verdict::Valid);
    }

    #[test]
    fn unrecognized_qr_payload_is_an_input_error() {
        let (store, _) = sealed_store();
        let err = Verifier::new(&store).verify_qr("some scribbles").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnrecognizedQrPayload)
        ));
    }

    #[test]
    fn empty_and_oversized_content_are_rejected_before_signing() {
        let signing_key = SigningKey::random(&mut OsRng);
        let request = SealRequest {
            author: "x",
            perihal: "y",
            journal_id: JOURNAL_ID,
            public_key: "irrelevant",
        };

        let err = seal(
            &DocumentContent::Text(String::new()),
            &request,
            signer_for(&signing_key),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::Empty)
        ));

        let err = seal(
            &DocumentContent::Binary(vec![0u8; MAX_CONTENT_LEN + 1]),
            &request,
            signer_for(&signing_key),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::Oversized { .. })
        ));
    }

    /// Sealing an uploaded PDF keeps it a PDF and signs its bytes.
    #[test]
    fn sealing_an_existing_pdf() {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = public_key_hex(&signing_key);

        let mut doc = crate::codec::synthesize_pdf("dokumen unggahan").unwrap();
        let mut uploaded = Vec::new();
        doc.save_to(&mut uploaded).unwrap();

        let content = DocumentContent::Binary(uploaded);
        let mut store = MemoryStore::new();
        store.put_content(JOURNAL_ID, content.checked_bytes().unwrap().into_owned());

        let (pdf, packet) = seal(
            &content,
            &SealRequest {
                author: "Budi Santoso",
                perihal: "Dokumen unggahan",
                journal_id: JOURNAL_ID,
                public_key: &public_key,
            },
            signer_for(&signing_key),
        )
        .unwrap();
        store.save(JOURNAL_ID, pdf, &packet).unwrap();

        let pdf = store.load_pdf(JOURNAL_ID).unwrap();
        let report = Verifier::new(&store).verify_pdf(&pdf).unwrap();
        assert_eq!(report.verdict, Verdict::Valid);
    }
}
