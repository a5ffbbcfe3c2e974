use anyhow::Result;
use journal_seal::{
    qr, seal, DocumentContent, DocumentStore, MemoryStore, SealRequest, Verifier,
};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};

const JOURNAL_ID: &str = "journal-0042";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Demo key; a deployment keeps its keys in an external key store.
    let signing_key = SigningKey::from_slice(&[0x5a; 32])?;
    let public_key = hex::encode(
        signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes(),
    );

    let content = DocumentContent::Text(
        "Laporan kegiatan minggu ke-32.\nDitandatangani secara digital.".to_string(),
    );
    let mut store = MemoryStore::new();
    store.put_content(JOURNAL_ID, content.checked_bytes()?.into_owned());

    let (pdf, packet) = seal(
        &content,
        &SealRequest {
            author: "Budi Santoso",
            perihal: "Laporan mingguan",
            journal_id: JOURNAL_ID,
            public_key: &public_key,
        },
        |hash| {
            let digest = hex::decode(hash.as_str())?;
            let sig: Signature = signing_key.sign_prehash(&digest)?;
            Ok(hex::encode(sig.to_der().as_bytes()))
        },
    )?;
    store.save(JOURNAL_ID, pdf, &packet)?;

    let payload = qr::minimal_payload(JOURNAL_ID, &packet.original_hash, "Laporan mingguan")?;
    let report = Verifier::new(&store).verify_qr(&payload)?;
    println!("fresh document:    {:?}", report.verdict);

    // Tamper with the stored content and watch the verdict flip.
    store.put_content(JOURNAL_ID, b"Laporan yang sudah diubah.".to_vec());
    let pdf = store.load_pdf(JOURNAL_ID)?;
    let report = Verifier::new(&store).verify_pdf(&pdf)?;
    println!(
        "tampered document: {:?} (integrity mismatch: {})",
        report.verdict, report.integrity_mismatch
    );

    Ok(())
}
