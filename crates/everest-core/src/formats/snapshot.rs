//! # Binary Snapshot
//!
//! Bit-exact `postcard` serialization of a search index.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [SnapshotHeader (postcard)] [CanonicalIndex (postcard)]
//! ```
//!
//! The header is validated before the payload is decoded, and the payload
//! checksum is verified after.

use crate::EverestError;
use crate::constants::{MAX_INDEX_FILE_SIZE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use crate::search::{DocRefs, ObjName, ObjectEntry, SearchIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum document count accepted in a snapshot header.
pub const MAX_SNAPSHOT_DOCUMENTS: u64 = 1_000_000;

/// Maximum object count accepted in a snapshot header.
pub const MAX_SNAPSHOT_OBJECTS: u64 = 10_000_000;

// =============================================================================
// HEADER
// =============================================================================

/// Header of a binary snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub document_count: u64,
    pub object_count: u64,
    /// Checksum of the payload, see [`CanonicalIndex::checksum`].
    pub checksum: u64,
}

impl SnapshotHeader {
    #[must_use]
    pub fn new(document_count: u64, object_count: u64, checksum: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            document_count,
            object_count,
            checksum,
        }
    }

    pub fn validate(&self) -> Result<(), EverestError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(EverestError::DeserializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(EverestError::DeserializationError(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if self.document_count > MAX_SNAPSHOT_DOCUMENTS {
            return Err(EverestError::DeserializationError(format!(
                "Document count {} exceeds maximum allowed {}",
                self.document_count, MAX_SNAPSHOT_DOCUMENTS
            )));
        }
        if self.object_count > MAX_SNAPSHOT_OBJECTS {
            return Err(EverestError::DeserializationError(format!(
                "Object count {} exceeds maximum allowed {}",
                self.object_count, MAX_SNAPSHOT_OBJECTS
            )));
        }
        Ok(())
    }
}

// =============================================================================
// CANONICAL INDEX
// =============================================================================

/// A term and the documents it refers to, in stored order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalTerm {
    pub key: String,
    /// Stored as a bare index rather than a list.
    pub scalar: bool,
    pub docs: Vec<u64>,
}

/// An object entry, flattened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalObject {
    pub prefix: String,
    pub name: String,
    pub doc: u64,
    pub kind: u32,
    pub priority: i32,
    pub anchor: String,
}

/// An object type with its labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalObjType {
    pub code: u32,
    pub objtype: Option<String>,
    pub objname: Option<(String, String, String)>,
}

/// Search index in a form `postcard` can encode.
///
/// Maps become sorted vectors. `envversion` is kept as JSON text since its
/// shape varies between builders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalIndex {
    pub docnames: Vec<String>,
    pub filenames: Vec<String>,
    pub titles: Vec<String>,
    pub terms: Vec<CanonicalTerm>,
    pub titleterms: Vec<CanonicalTerm>,
    pub objects: Vec<CanonicalObject>,
    pub objtypes: Vec<CanonicalObjType>,
    pub envversion: Option<String>,
}

fn canonical_terms(map: &BTreeMap<String, DocRefs>) -> Vec<CanonicalTerm> {
    map.iter()
        .map(|(key, refs)| CanonicalTerm {
            key: key.clone(),
            scalar: matches!(refs, DocRefs::One(_)),
            docs: refs.as_slice().iter().map(|&d| d as u64).collect(),
        })
        .collect()
}

fn restore_terms(terms: Vec<CanonicalTerm>) -> Result<BTreeMap<String, DocRefs>, EverestError> {
    terms
        .into_iter()
        .map(|t| {
            let mut docs: Vec<usize> = t.docs.into_iter().map(|d| d as usize).collect();
            let refs = match (t.scalar, docs.len()) {
                (false, _) => DocRefs::Many(docs),
                (true, 1) => DocRefs::One(docs.remove(0)),
                (true, n) => {
                    return Err(EverestError::DeserializationError(format!(
                        "term '{}' is marked scalar but has {} documents",
                        t.key, n
                    )));
                }
            };
            Ok((t.key, refs))
        })
        .collect()
}

impl CanonicalIndex {
    #[must_use]
    pub fn from_index(index: &SearchIndex) -> Self {
        let objects = index
            .objects
            .iter()
            .flat_map(|(prefix, names)| {
                names.iter().map(move |(name, entry)| CanonicalObject {
                    prefix: prefix.clone(),
                    name: name.clone(),
                    doc: entry.doc as u64,
                    kind: entry.kind,
                    priority: entry.priority,
                    anchor: entry.anchor.clone(),
                })
            })
            .collect();

        let mut codes: Vec<u32> = index
            .objtypes
            .keys()
            .chain(index.objnames.keys())
            .copied()
            .collect();
        codes.sort_unstable();
        codes.dedup();
        let objtypes = codes
            .into_iter()
            .map(|code| CanonicalObjType {
                code,
                objtype: index.objtypes.get(&code).cloned(),
                objname: index.objnames.get(&code).cloned().map(Into::into),
            })
            .collect();

        Self {
            docnames: index.docnames.clone(),
            filenames: index.filenames.clone(),
            titles: index.titles.clone(),
            terms: canonical_terms(&index.terms),
            titleterms: canonical_terms(&index.titleterms),
            objects,
            objtypes,
            envversion: index.envversion.as_ref().map(ToString::to_string),
        }
    }

    pub fn to_index(self) -> Result<SearchIndex, EverestError> {
        let envversion: Option<serde_json::Value> = self
            .envversion
            .map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(|e| EverestError::DeserializationError(format!("envversion: {}", e)))?;

        let mut index = SearchIndex {
            docnames: self.docnames,
            filenames: self.filenames,
            titles: self.titles,
            terms: restore_terms(self.terms)?,
            titleterms: restore_terms(self.titleterms)?,
            envversion,
            ..SearchIndex::default()
        };
        for object in self.objects {
            index.objects.entry(object.prefix).or_default().insert(
                object.name,
                ObjectEntry {
                    doc: object.doc as usize,
                    kind: object.kind,
                    priority: object.priority,
                    anchor: object.anchor,
                },
            );
        }
        for objtype in self.objtypes {
            if let Some(name) = objtype.objtype {
                index.objtypes.insert(objtype.code, name);
            }
            if let Some(labels) = objtype.objname {
                index.objnames.insert(objtype.code, ObjName::from(labels));
            }
        }
        Ok(index)
    }

    /// Order-sensitive 64-bit checksum of every field.
    ///
    /// Detects accidental corruption; not a cryptographic hash (see
    /// `index_crypto_hash` under the `crypto-hash` feature).
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hash = Checksum::default();
        for list in [&self.docnames, &self.filenames, &self.titles] {
            hash.count(list.len());
            for s in list {
                hash.text(s);
            }
        }
        for terms in [&self.terms, &self.titleterms] {
            hash.count(terms.len());
            for term in terms {
                hash.text(&term.key);
                hash.word(u64::from(term.scalar));
                hash.count(term.docs.len());
                for &doc in &term.docs {
                    hash.word(doc.rotate_left(7));
                }
            }
        }
        hash.count(self.objects.len());
        for object in &self.objects {
            hash.text(&object.prefix);
            hash.text(&object.name);
            hash.word(object.doc.rotate_left(13));
            hash.word(u64::from(object.kind).rotate_left(17));
            hash.word((object.priority as u64).rotate_left(5));
            hash.text(&object.anchor);
        }
        hash.count(self.objtypes.len());
        for objtype in &self.objtypes {
            hash.word(u64::from(objtype.code).rotate_left(11));
            hash.text(objtype.objtype.as_deref().unwrap_or_default());
            if let Some((domain, short, long)) = &objtype.objname {
                hash.text(domain);
                hash.text(short);
                hash.text(long);
            }
        }
        hash.text(self.envversion.as_deref().unwrap_or_default());
        hash.0
    }
}

/// FNV-1a over 64-bit words.
struct Checksum(u64);

impl Default for Checksum {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Checksum {
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn word(&mut self, w: u64) {
        self.0 = (self.0 ^ w).wrapping_mul(Self::PRIME);
    }

    fn count(&mut self, n: usize) {
        self.word(n as u64);
    }

    fn text(&mut self, s: &str) {
        self.count(s.len());
        for byte in s.bytes() {
            self.word(u64::from(byte));
        }
    }
}

// =============================================================================
// SNAPSHOT FUNCTIONS
// =============================================================================

/// Serialize an index to a binary snapshot.
pub fn index_to_bytes(index: &SearchIndex) -> Result<Vec<u8>, EverestError> {
    let canonical = CanonicalIndex::from_index(index);
    let header = SnapshotHeader::new(
        canonical.docnames.len() as u64,
        canonical.objects.len() as u64,
        canonical.checksum(),
    );

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| EverestError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(&canonical)
        .map_err(|e| EverestError::SerializationError(format!("Data: {}", e)))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);

    tracing::debug!(
        "Encoded snapshot: {} bytes, checksum {:016x}",
        result.len(),
        header.checksum
    );
    Ok(result)
}

/// Decode a binary snapshot.
///
/// Rejects oversized input, a bad header, count limits, a checksum mismatch
/// and header counts that disagree with the payload.
pub fn index_from_bytes(data: &[u8]) -> Result<SearchIndex, EverestError> {
    if data.len() > MAX_INDEX_FILE_SIZE {
        return Err(EverestError::DeserializationError(format!(
            "Snapshot of {} bytes exceeds maximum allowed {} bytes",
            data.len(),
            MAX_INDEX_FILE_SIZE
        )));
    }
    let Some((len_bytes, rest)) = data.split_first_chunk::<4>() else {
        return Err(EverestError::DeserializationError(
            "Data too short".to_string(),
        ));
    };
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(EverestError::DeserializationError(
            "Data too short for header".to_string(),
        ));
    }
    let (header_bytes, payload) = rest.split_at(header_len);

    let header: SnapshotHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| EverestError::DeserializationError(format!("Header: {}", e)))?;
    header.validate()?;

    let canonical: CanonicalIndex = postcard::from_bytes(payload)
        .map_err(|e| EverestError::DeserializationError(format!("Data: {}", e)))?;

    let computed = canonical.checksum();
    if computed != header.checksum {
        return Err(EverestError::Integrity(format!(
            "Checksum mismatch: expected {:016x}, got {:016x}",
            header.checksum, computed
        )));
    }
    if canonical.docnames.len() as u64 != header.document_count {
        return Err(EverestError::Integrity(
            "Document count mismatch".to_string(),
        ));
    }
    if canonical.objects.len() as u64 != header.object_count {
        return Err(EverestError::Integrity("Object count mismatch".to_string()));
    }

    canonical.to_index()
}

/// Checksum of an index, as stored in its snapshot header.
#[must_use]
pub fn index_checksum(index: &SearchIndex) -> u64 {
    CanonicalIndex::from_index(index).checksum()
}

/// Whether a snapshot decodes to the same index.
pub fn verify_snapshot(index: &SearchIndex, data: &[u8]) -> Result<bool, EverestError> {
    let restored = index_from_bytes(data)?;
    Ok(CanonicalIndex::from_index(index) == CanonicalIndex::from_index(&restored))
}

// =============================================================================
// CRYPTOGRAPHIC HASH
// =============================================================================

/// BLAKE3 hash of the snapshot of an index, as hex.
#[cfg(feature = "crypto-hash")]
pub fn index_crypto_hash(index: &SearchIndex) -> Result<String, EverestError> {
    Ok(compute_blake3_hash(&index_to_bytes(index)?))
}

/// Whether an index hashes to `expected_hash`.
#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(index: &SearchIndex, expected_hash: &str) -> Result<bool, EverestError> {
    Ok(index_crypto_hash(index)?.eq_ignore_ascii_case(expected_hash))
}

/// BLAKE3 hash of raw bytes, as hex.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
