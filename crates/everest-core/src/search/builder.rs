//! Deterministic construction of a [`SearchIndex`].
//!
//! Documents contribute stemmed words of their text to `terms` and of their
//! title to `titleterms`; objects contribute the `objects` table. Type codes
//! are numbered in order of first appearance over objects sorted by full
//! name, so the same input always yields the same index.

use super::index::{DocRefs, ObjName, ObjectEntry, SearchIndex};
use super::query::is_stopword;
use super::stemmer::stem;
use crate::EverestError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of a documented Python object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Module,
    Data,
    Class,
    Exception,
    Attribute,
    Method,
    ClassMethod,
    StaticMethod,
    Function,
}

impl ObjectKind {
    /// Short label, as used in anchors and `objtypes`.
    #[must_use]
    pub fn short(self) -> &'static str {
        match self {
            ObjectKind::Module => "module",
            ObjectKind::Data => "data",
            ObjectKind::Class => "class",
            ObjectKind::Exception => "exception",
            ObjectKind::Attribute => "attribute",
            ObjectKind::Method => "method",
            ObjectKind::ClassMethod => "classmethod",
            ObjectKind::StaticMethod => "staticmethod",
            ObjectKind::Function => "function",
        }
    }

    #[must_use]
    pub fn long(self) -> &'static str {
        match self {
            ObjectKind::Module => "Python module",
            ObjectKind::Data => "Python data",
            ObjectKind::Class => "Python class",
            ObjectKind::Exception => "Python exception",
            ObjectKind::Attribute => "Python attribute",
            ObjectKind::Method => "Python method",
            ObjectKind::ClassMethod => "Python class method",
            ObjectKind::StaticMethod => "Python static method",
            ObjectKind::Function => "Python function",
        }
    }

    /// Modules rank above everything else.
    #[must_use]
    pub fn default_priority(self) -> i32 {
        match self {
            ObjectKind::Module => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Object domain written to `objnames` and `objtypes`.
pub const DOMAIN: &str = "py";

/// A document to index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    pub filename: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
}

/// A documented object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceObject {
    /// Fully-qualified dotted name.
    pub name: String,
    /// Name of the owning document.
    pub doc: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub priority: Option<i32>,
    /// Explicit anchor; defaults to the full name (modules:
    /// `module-<full name>`).
    #[serde(default)]
    pub anchor: Option<String>,
}

/// JSON input of `everest index build`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexManifest {
    #[serde(default)]
    pub envversion: Option<serde_json::Value>,
    pub documents: Vec<SourceDocument>,
    #[serde(default)]
    pub objects: Vec<SourceObject>,
}

impl IndexManifest {
    pub fn from_json_str(s: &str) -> Result<Self, EverestError> {
        serde_json::from_str(s)
            .map_err(|e| EverestError::DeserializationError(format!("manifest: {}", e)))
    }
}

/// Builds a [`SearchIndex`] from documents and objects.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    documents: Vec<SourceDocument>,
    objects: Vec<SourceObject>,
    envversion: Option<serde_json::Value>,
}

impl IndexBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_manifest(manifest: IndexManifest) -> Self {
        Self {
            documents: manifest.documents,
            objects: manifest.objects,
            envversion: manifest.envversion,
        }
    }

    #[must_use]
    pub fn envversion(mut self, envversion: serde_json::Value) -> Self {
        self.envversion = Some(envversion);
        self
    }

    /// Add a document; documents keep the order they were added in.
    pub fn add_document(
        &mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> &mut Self {
        self.documents.push(SourceDocument {
            name: name.into(),
            filename: filename.into(),
            title: title.into(),
            text: text.into(),
        });
        self
    }

    pub fn add_object(
        &mut self,
        name: impl Into<String>,
        doc: impl Into<String>,
        kind: ObjectKind,
    ) -> &mut Self {
        self.objects.push(SourceObject {
            name: name.into(),
            doc: doc.into(),
            kind,
            priority: None,
            anchor: None,
        });
        self
    }

    pub fn add_source_object(&mut self, object: SourceObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    /// Build the index.
    ///
    /// Fails on duplicate document names, duplicate objects, or objects
    /// naming an unknown document.
    pub fn build(&self) -> Result<SearchIndex, EverestError> {
        let mut index = SearchIndex {
            envversion: self.envversion.clone(),
            ..SearchIndex::default()
        };

        let mut doc_ids: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, doc) in self.documents.iter().enumerate() {
            if doc_ids.insert(doc.name.as_str(), i).is_some() {
                return Err(EverestError::InvalidConfig(format!(
                    "document '{}' added twice",
                    doc.name
                )));
            }
            index.docnames.push(doc.name.clone());
            index.filenames.push(doc.filename.clone());
            index.titles.push(doc.title.clone());
        }

        let (terms, titleterms) = self.term_tables();
        index.terms = terms;
        index.titleterms = titleterms;

        let mut objects: Vec<&SourceObject> = self.objects.iter().collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        let mut codes: BTreeMap<ObjectKind, u32> = BTreeMap::new();
        for object in objects {
            let doc = *doc_ids.get(object.doc.as_str()).ok_or_else(|| {
                EverestError::NotFound(format!(
                    "document '{}' of object '{}'",
                    object.doc, object.name
                ))
            })?;

            let next = codes.len() as u32;
            let code = *codes.entry(object.kind).or_insert(next);
            index.objnames.entry(code).or_insert_with(|| ObjName {
                domain: DOMAIN.to_string(),
                short: object.kind.short().to_string(),
                long: object.kind.long().to_string(),
            });
            index
                .objtypes
                .entry(code)
                .or_insert_with(|| format!("{}:{}", DOMAIN, object.kind.short()));

            let (prefix, name) = match object.name.rsplit_once('.') {
                Some((prefix, name)) => (prefix.to_string(), name.to_string()),
                None => (String::new(), object.name.clone()),
            };
            let entry = ObjectEntry {
                doc,
                kind: code,
                priority: object
                    .priority
                    .unwrap_or_else(|| object.kind.default_priority()),
                anchor: compress_anchor(object),
            };
            if index
                .objects
                .entry(prefix)
                .or_default()
                .insert(name, entry)
                .is_some()
            {
                return Err(EverestError::InvalidConfig(format!(
                    "object '{}' added twice",
                    object.name
                )));
            }
        }

        tracing::info!(
            "Built search index: {} documents, {} terms, {} objects",
            index.document_count(),
            index.terms.len(),
            index.object_count()
        );
        Ok(index)
    }

    /// `terms` and `titleterms`.
    ///
    /// A word already in a document's title is left out of its terms.
    fn term_tables(&self) -> (BTreeMap<String, DocRefs>, BTreeMap<String, DocRefs>) {
        let mut title_map: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        let mut term_map: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for (doc, source) in self.documents.iter().enumerate() {
            for word in split_words(&source.title) {
                if let Some(key) = index_key(word) {
                    title_map.entry(key).or_default().insert(doc);
                }
            }
            for word in split_words(&source.text) {
                let Some(key) = index_key(word) else {
                    continue;
                };
                if title_map.get(&key).is_some_and(|docs| docs.contains(&doc)) {
                    continue;
                }
                term_map.entry(key).or_default().insert(doc);
            }
        }
        (to_refs(term_map), to_refs(title_map))
    }
}

/// The key a word is indexed under: its stem, or the word itself when the
/// stem would be filtered out.
fn index_key(word: &str) -> Option<String> {
    let stemmed = stem(&word.to_lowercase());
    if word_filter(&stemmed) {
        Some(stemmed)
    } else if word_filter(word) {
        Some(word.to_string())
    } else {
        None
    }
}

fn to_refs(map: BTreeMap<String, BTreeSet<usize>>) -> BTreeMap<String, DocRefs> {
    map.into_iter()
        .map(|(key, docs)| (key, DocRefs::from_set(&docs)))
        .collect()
}

/// `""` when the anchor is the full name, `"-"` when it is
/// `<short label>-<full name>`.
fn compress_anchor(object: &SourceObject) -> String {
    let prefixed = format!("{}-{}", object.kind.short(), object.name);
    match &object.anchor {
        None if object.kind == ObjectKind::Module => "-".to_string(),
        None => String::new(),
        Some(anchor) if *anchor == object.name => String::new(),
        Some(anchor) if *anchor == prefixed => "-".to_string(),
        Some(anchor) => anchor.clone(),
    }
}

/// Alphanumeric runs, underscores included.
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Whether a word is worth indexing.
///
/// Short words, stopwords and numbers are dropped unless they start with a
/// character outside Latin-1.
#[must_use]
pub fn word_filter(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    if (first as u32) >= 256 {
        return true;
    }
    !(word.chars().count() < 3 || is_stopword(word) || word.chars().all(|c| c.is_ascii_digit()))
}
