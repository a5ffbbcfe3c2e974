//! Embedding and extraction of signature metadata in PDF files.
//!
//! The packet lives in the PDF's document information dictionary, written
//! twice: once as a structured JSON payload inside a `/Keywords` array, and
//! once as individual namespaced keys. Extraction accepts either encoding,
//! so a document that went through a rewriter which preserved only one of
//! them still verifies. No custom container format is introduced; a signed
//! document opens in any standard viewer.
//!
//! Producers disagree on how the information dictionary is represented
//! (`/Info` as an indirect reference vs. an inline dictionary, keyword
//! lists as arrays vs. delimited strings), so neither the read nor the
//! write path may assume a single concrete object type.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;

use crate::hash::{ContentHash, DocumentContent};
use crate::packet::{SignaturePacket, PACKET_VERSION};

/// First entry of our `/Keywords` array. Rewriters that flatten the array
/// into a single string keep it as a recognizable prefix.
const KEYWORDS_MARKER: &str = "journal-seal/1";

const KEY_SIGNATURE: &str = "JSigSignature";
const KEY_PUBLIC_KEY: &str = "JSigPublicKey";
const KEY_ORIGINAL_HASH: &str = "JSigOriginalHash";
const KEY_AUTHOR: &str = "JSigAuthor";
const KEY_PERIHAL: &str = "JSigPerihal";
const KEY_JOURNAL_ID: &str = "JSigJournalId";
const KEY_TIMESTAMP: &str = "JSigTimestamp";
const KEY_VERSION: &str = "JSigVersion";

/// Lines rendered when synthesizing a PDF from plain text content.
const MAX_RENDERED_LINES: usize = 48;

#[derive(Error, Debug)]
pub enum Error {
    #[error("PDF parsing error")]
    Pdf(#[from] lopdf::Error),
    #[error("packet serialization error")]
    Packet(#[from] serde_json::Error),
    #[error("document information entry is not a dictionary")]
    MalformedInfo,
    #[error(transparent)]
    Input(#[from] crate::hash::InputError),
    #[error("PDF serialization error")]
    Io(#[from] std::io::Error),
}

/// A PDF primitive value destined for a metadata dictionary.
///
/// PDF object models disagree on the concrete representation a dictionary
/// hands back for a given key, and some expose no generic set operation at
/// all. Every codec write therefore funnels through this union and
/// [`set_meta`], the single place where it maps onto `lopdf`'s object
/// model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// A PDF name (`/LikeThis`).
    Name(String),
    /// A literal string.
    Text(String),
    /// An array of literal strings.
    List(Vec<String>),
}

/// Writes one key into a metadata dictionary.
pub fn set_meta(dict: &mut Dictionary, key: &str, value: MetaValue) {
    let object = match value {
        MetaValue::Name(name) => Object::Name(name.into_bytes()),
        MetaValue::Text(text) => Object::String(text.into_bytes(), StringFormat::Literal),
        MetaValue::List(items) => Object::Array(
            items
                .into_iter()
                .map(|item| Object::String(item.into_bytes(), StringFormat::Literal))
                .collect(),
        ),
    };
    dict.set(key, object);
}

/// Embeds a signature packet into PDF bytes.
///
/// Content that is not already a PDF is first rendered into a minimal one
/// page document, so every signed artifact opens in a standard viewer. The
/// input buffer is never mutated; the returned bytes are a fresh
/// serialization.
#[tracing::instrument(skip_all, fields(journal_id = %packet.journal_id))]
pub fn embed(content: &DocumentContent, packet: &SignaturePacket) -> Result<Vec<u8>, Error> {
    let bytes = content.as_bytes()?;
    let mut doc = if bytes.starts_with(b"%PDF-") {
        Document::load_mem(&bytes)?
    } else {
        tracing::debug!("content is not a PDF, synthesizing one");
        synthesize_pdf(&String::from_utf8_lossy(&bytes))?
    };

    write_packet(&mut doc, packet)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Extracts a signature packet from PDF bytes.
///
/// Returns `Ok(None)` when the document carries no recognizable packet (the
/// unsigned case), and `Err` only when the bytes are not a parseable PDF.
#[tracing::instrument(skip_all, fields(pdf_len = pdf_bytes.len()))]
pub fn extract(pdf_bytes: &[u8]) -> Result<Option<SignaturePacket>, Error> {
    let doc = Document::load_mem(pdf_bytes)?;
    let Some(info) = info_dict(&doc) else {
        return Ok(None);
    };

    // The structured Keywords payload wins when both encodings are present.
    if let Some(packet) = packet_from_keywords(info) {
        return Ok(Some(packet));
    }
    Ok(packet_from_fields(info))
}

fn write_packet(doc: &mut Document, packet: &SignaturePacket) -> Result<(), Error> {
    let json = serde_json::to_string(packet)?;
    let info = info_dict_mut(doc)?;

    // Keywords must be the object model's sequence type, not a joined
    // string; readers that expect an array fail on anything else.
    set_meta(
        info,
        "Keywords",
        MetaValue::List(vec![KEYWORDS_MARKER.to_string(), json]),
    );

    set_meta(info, KEY_SIGNATURE, MetaValue::Text(packet.signature.clone()));
    set_meta(info, KEY_PUBLIC_KEY, MetaValue::Text(packet.public_key.clone()));
    set_meta(
        info,
        KEY_ORIGINAL_HASH,
        MetaValue::Text(packet.original_hash.as_str().to_string()),
    );
    set_meta(info, KEY_AUTHOR, MetaValue::Text(packet.author.clone()));
    set_meta(info, KEY_PERIHAL, MetaValue::Text(packet.perihal.clone()));
    set_meta(info, KEY_JOURNAL_ID, MetaValue::Text(packet.journal_id.clone()));
    set_meta(
        info,
        KEY_TIMESTAMP,
        MetaValue::Text(packet.timestamp.to_rfc3339()),
    );
    set_meta(info, KEY_VERSION, MetaValue::Text(packet.version.to_string()));

    // Descriptive entries under the standard keys, for plain PDF viewers.
    set_meta(info, "Title", MetaValue::Text(packet.perihal.clone()));
    set_meta(info, "Author", MetaValue::Text(packet.author.clone()));
    set_meta(info, "Creator", MetaValue::Name("JournalSeal".to_string()));

    Ok(())
}

/// Finds (or creates) the indirect object holding the information
/// dictionary.
///
/// Producers leave `/Info` either as an indirect reference or as an inline
/// dictionary; an inline one is promoted to an indirect object so a single
/// write path covers both forms.
fn info_dict_id(doc: &mut Document) -> Result<ObjectId, Error> {
    match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => {
            let id = *id;
            match doc.get_object(id) {
                Ok(Object::Dictionary(_)) => return Ok(id),
                Ok(_) => return Err(Error::MalformedInfo),
                // Dangling reference; rebuild below.
                Err(_) => {}
            }
        }
        Ok(Object::Dictionary(dict)) => {
            let dict = dict.clone();
            let id = doc.add_object(Object::Dictionary(dict));
            doc.trailer.set("Info", Object::Reference(id));
            return Ok(id);
        }
        Ok(_) => return Err(Error::MalformedInfo),
        // No /Info at all.
        Err(_) => {}
    }

    let id = doc.add_object(Object::Dictionary(Dictionary::new()));
    doc.trailer.set("Info", Object::Reference(id));
    Ok(id)
}

fn info_dict_mut(doc: &mut Document) -> Result<&mut Dictionary, Error> {
    let id = info_dict_id(doc)?;
    Ok(doc.get_object_mut(id)?.as_dict_mut()?)
}

/// Read-only view of the information dictionary, whichever concrete form
/// the producer chose.
fn info_dict(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Decodes the structured `/Keywords` encoding.
fn packet_from_keywords(info: &Dictionary) -> Option<SignaturePacket> {
    match info.get(b"Keywords").ok()? {
        Object::Array(items) => items
            .iter()
            .filter_map(object_text)
            .find_map(|entry| serde_json::from_str(&entry).ok()),
        // Some rewriters flatten keyword arrays into one delimited string;
        // the JSON payload is still in there, after our marker.
        keywords @ Object::String(..) => {
            let joined = object_text(keywords)?;
            if !joined.contains(KEYWORDS_MARKER) {
                return None;
            }
            let start = joined.find('{')?;
            let end = joined.rfind('}')?;
            serde_json::from_str(&joined[start..=end]).ok()
        }
        _ => None,
    }
}

/// Decodes the individual-field encoding, the fallback when the structured
/// Keywords payload is missing or unreadable.
fn packet_from_fields(info: &Dictionary) -> Option<SignaturePacket> {
    let text = |key: &str| info.get(key.as_bytes()).ok().and_then(object_text);

    let signature = text(KEY_SIGNATURE)?;
    let public_key = text(KEY_PUBLIC_KEY)?;
    let original_hash = ContentHash::from_hex(&text(KEY_ORIGINAL_HASH)?).ok()?;
    let journal_id = text(KEY_JOURNAL_ID)?;
    let timestamp = chrono::DateTime::parse_from_rfc3339(&text(KEY_TIMESTAMP)?)
        .ok()?
        .with_timezone(&chrono::Utc);
    let version = text(KEY_VERSION)
        .and_then(|v| v.parse().ok())
        .unwrap_or(PACKET_VERSION);

    Some(SignaturePacket {
        signature,
        public_key,
        original_hash,
        author: text(KEY_AUTHOR).unwrap_or_default(),
        perihal: text(KEY_PERIHAL).unwrap_or_default(),
        journal_id,
        timestamp,
        version,
    })
}

/// Builds a minimal single page PDF rendering `text`, for signing flows
/// that start from plain text rather than an uploaded PDF.
pub(crate) fn synthesize_pdf(text: &str) -> Result<Document, Error> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![50.into(), 780.into()]),
    ];
    for line in text.lines().take(MAX_RENDERED_LINES) {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}
