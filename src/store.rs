//! Storage collaborator boundary.
//!
//! The core never talks to a database; it reads and writes opaque byte
//! blobs through [`DocumentStore`]. [`MemoryStore`] is the implementation
//! used by tests and the demo binary.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::packet::SignaturePacket;

/// External persistence for journal documents and their signed PDFs.
pub trait DocumentStore {
    /// Loads the current content bytes of a journal document.
    fn load_content(&self, id: &str) -> Result<Vec<u8>>;

    /// Loads the signed PDF previously saved for a journal document.
    fn load_pdf(&self, id: &str) -> Result<Vec<u8>>;

    /// Persists a signed PDF together with its packet fields.
    fn save(&mut self, id: &str, pdf_bytes: Vec<u8>, packet: &SignaturePacket) -> Result<()>;
}

/// HashMap-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: HashMap<String, StoredDocument>,
}

#[derive(Debug)]
struct StoredDocument {
    content: Vec<u8>,
    pdf: Option<Vec<u8>>,
    packet: Option<SignaturePacket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overwrites) document content under an id. Any signed
    /// PDF already saved for the id is kept, which is exactly what a
    /// post-signing tamper looks like.
    pub fn put_content(&mut self, id: &str, content: Vec<u8>) {
        match self.documents.get_mut(id) {
            Some(doc) => doc.content = content,
            None => {
                self.documents.insert(
                    id.to_string(),
                    StoredDocument {
                        content,
                        pdf: None,
                        packet: None,
                    },
                );
            }
        }
    }

    /// The packet recorded at save time, if the document was signed.
    pub fn packet(&self, id: &str) -> Option<&SignaturePacket> {
        self.documents.get(id)?.packet.as_ref()
    }
}

impl DocumentStore for MemoryStore {
    fn load_content(&self, id: &str) -> Result<Vec<u8>> {
        match self.documents.get(id) {
            Some(doc) => Ok(doc.content.clone()),
            None => bail!("unknown document: {id}"),
        }
    }

    fn load_pdf(&self, id: &str) -> Result<Vec<u8>> {
        match self.documents.get(id).and_then(|doc| doc.pdf.as_ref()) {
            Some(pdf) => Ok(pdf.clone()),
            None => bail!("no signed PDF stored for document: {id}"),
        }
    }

    fn save(&mut self, id: &str, pdf_bytes: Vec<u8>, packet: &SignaturePacket) -> Result<()> {
        let Some(doc) = self.documents.get_mut(id) else {
            bail!("cannot save a signed PDF for unregistered document: {id}");
        };
        doc.pdf = Some(pdf_bytes);
        doc.packet = Some(packet.clone());
        Ok(())
    }
}
