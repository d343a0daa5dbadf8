//! The search index data model.
//!
//! Field names and value shapes follow the `searchindex.js` files written by
//! documentation builders, so an index can be loaded, checked and re-emitted
//! without loss.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Documents referenced by a term: a single index or a sorted list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocRefs {
    One(usize),
    Many(Vec<usize>),
}

impl DocRefs {
    /// Compact form of a set of documents: a bare index when there is one.
    #[must_use]
    pub fn from_set(docs: &BTreeSet<usize>) -> Self {
        DocRefs::from(docs.iter().copied().collect::<Vec<_>>())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        match self {
            DocRefs::One(doc) => std::slice::from_ref(doc),
            DocRefs::Many(docs) => docs,
        }
    }

    #[must_use]
    pub fn contains(&self, doc: usize) -> bool {
        self.as_slice().contains(&doc)
    }
}

impl From<Vec<usize>> for DocRefs {
    fn from(mut docs: Vec<usize>) -> Self {
        docs.sort_unstable();
        docs.dedup();
        match docs.as_slice() {
            [doc] => DocRefs::One(*doc),
            _ => DocRefs::Many(docs),
        }
    }
}

/// `[document, type code, priority, anchor]`.
///
/// An empty anchor stands for the object's full name; `"-"` for
/// `<short type label>-<full name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, u32, i32, String)", into = "(usize, u32, i32, String)")]
pub struct ObjectEntry {
    pub doc: usize,
    pub kind: u32,
    pub priority: i32,
    pub anchor: String,
}

impl From<(usize, u32, i32, String)> for ObjectEntry {
    fn from((doc, kind, priority, anchor): (usize, u32, i32, String)) -> Self {
        Self {
            doc,
            kind,
            priority,
            anchor,
        }
    }
}

impl From<ObjectEntry> for (usize, u32, i32, String) {
    fn from(entry: ObjectEntry) -> Self {
        (entry.doc, entry.kind, entry.priority, entry.anchor)
    }
}

/// `(domain, short label, long label)`, e.g. `("py", "class", "Python class")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String, String)", into = "(String, String, String)")]
pub struct ObjName {
    pub domain: String,
    pub short: String,
    pub long: String,
}

impl From<(String, String, String)> for ObjName {
    fn from((domain, short, long): (String, String, String)) -> Self {
        Self {
            domain,
            short,
            long,
        }
    }
}

impl From<ObjName> for (String, String, String) {
    fn from(name: ObjName) -> Self {
        (name.domain, name.short, name.long)
    }
}

/// A documentation search index.
///
/// `docnames`, `filenames` and `titles` are parallel sequences indexed by
/// document number. Map fields are ordered, so serialization is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub docnames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envversion: Option<serde_json::Value>,
    pub filenames: Vec<String>,
    /// prefix -> name -> entry.
    #[serde(default)]
    pub objects: BTreeMap<String, BTreeMap<String, ObjectEntry>>,
    #[serde(default)]
    pub objnames: BTreeMap<u32, ObjName>,
    /// type code -> `"domain:short"`.
    #[serde(default)]
    pub objtypes: BTreeMap<u32, String>,
    pub terms: BTreeMap<String, DocRefs>,
    pub titles: Vec<String>,
    #[serde(default)]
    pub titleterms: BTreeMap<String, DocRefs>,
}

/// One document of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document<'a> {
    pub index: usize,
    pub name: &'a str,
    pub filename: &'a str,
    pub title: &'a str,
}

/// A documented object with its anchor resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
    pub fullname: String,
    pub doc: usize,
    pub kind: u32,
    pub priority: i32,
    pub anchor: String,
}

/// Counts reported by `everest index stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub terms: usize,
    pub titleterms: usize,
    pub objects: usize,
    pub object_types: usize,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents, {} terms, {} title terms, {} objects, {} object types",
            self.documents, self.terms, self.titleterms, self.objects, self.object_types
        )
    }
}

/// Join an object prefix and name.
#[must_use]
pub fn fullname(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

impl SearchIndex {
    /// Number of documents, taken from `docnames`.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.docnames.len()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.values().map(BTreeMap::len).sum()
    }

    /// Documents in index order. Stops at the shortest of the parallel
    /// sequences.
    pub fn documents(&self) -> impl Iterator<Item = Document<'_>> {
        self.docnames
            .iter()
            .zip(&self.filenames)
            .zip(&self.titles)
            .enumerate()
            .map(|(index, ((name, filename), title))| Document {
                index,
                name,
                filename,
                title,
            })
    }

    #[must_use]
    pub fn document(&self, index: usize) -> Option<Document<'_>> {
        Some(Document {
            index,
            name: self.docnames.get(index)?,
            filename: self.filenames.get(index)?,
            title: self.titles.get(index)?,
        })
    }

    /// Index of the document called `name`.
    #[must_use]
    pub fn doc_index(&self, name: &str) -> Option<usize> {
        self.docnames.iter().position(|d| d == name)
    }

    #[must_use]
    pub fn objname(&self, kind: u32) -> Option<&ObjName> {
        self.objnames.get(&kind)
    }

    /// Resolve the anchor of an object entry.
    #[must_use]
    pub fn resolve_anchor(&self, fullname: &str, entry: &ObjectEntry) -> String {
        match entry.anchor.as_str() {
            "" => fullname.to_string(),
            "-" => match self.objname(entry.kind) {
                Some(objname) => format!("{}-{}", objname.short, fullname),
                None => fullname.to_string(),
            },
            anchor => anchor.to_string(),
        }
    }

    /// Every object, ordered by prefix then name.
    #[must_use]
    pub fn object_entries(&self) -> Vec<ObjectRef<'_>> {
        let mut out = Vec::with_capacity(self.object_count());
        for (prefix, names) in &self.objects {
            for (name, entry) in names {
                let full = fullname(prefix, name);
                let anchor = self.resolve_anchor(&full, entry);
                out.push(ObjectRef {
                    prefix,
                    name,
                    fullname: full,
                    doc: entry.doc,
                    kind: entry.kind,
                    priority: entry.priority,
                    anchor,
                });
            }
        }
        out
    }

    /// Case-insensitive exact lookup in `terms`.
    ///
    /// Keys differing only by case are merged. Unknown terms give an empty
    /// result.
    #[must_use]
    pub fn lookup_term(&self, term: &str) -> Vec<usize> {
        lookup_folded(&self.terms, term)
    }

    /// Case-insensitive exact lookup in `titleterms`.
    #[must_use]
    pub fn lookup_title_term(&self, term: &str) -> Vec<usize> {
        lookup_folded(&self.titleterms, term)
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.document_count(),
            terms: self.terms.len(),
            titleterms: self.titleterms.len(),
            objects: self.object_count(),
            object_types: self.objtypes.len(),
        }
    }
}

fn lookup_folded(table: &BTreeMap<String, DocRefs>, term: &str) -> Vec<usize> {
    let folded = term.to_lowercase();
    let docs: BTreeSet<usize> = table
        .iter()
        .filter(|(key, _)| key.to_lowercase() == folded)
        .flat_map(|(_, refs)| refs.as_slice().iter().copied())
        .collect();
    docs.into_iter().collect()
}

/// Lowercase a term table, merging keys that differ only by case.
pub(crate) fn fold_case(table: &BTreeMap<String, DocRefs>) -> BTreeMap<String, BTreeSet<usize>> {
    let mut folded: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for (key, refs) in table {
        folded
            .entry(key.to_lowercase())
            .or_default()
            .extend(refs.as_slice().iter().copied());
    }
    folded
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> SearchIndex {
        let mut index = SearchIndex {
            docnames: vec!["api".into(), "dvs".into()],
            filenames: vec!["api.rst".into(), "dvs.rst".into()],
            titles: vec!["API".into(), "dvs.py".into()],
            ..SearchIndex::default()
        };
        index.terms.insert("DVS".into(), DocRefs::Many(vec![1]));
        index.terms.insert("dvs".into(), DocRefs::One(0));
        index.terms.insert("layout".into(), DocRefs::One(1));
        index.objnames.insert(
            0,
            ObjName {
                domain: "py".into(),
                short: "module".into(),
                long: "Python module".into(),
            },
        );
        index.objtypes.insert(0, "py:module".into());
        index.objects.entry("everest3".into()).or_default().insert(
            "dvs".into(),
            ObjectEntry {
                doc: 1,
                kind: 0,
                priority: 0,
                anchor: "-".into(),
            },
        );
        index
    }

    #[test]
    fn doc_refs_accept_both_shapes() {
        let one: DocRefs = serde_json::from_str("3").unwrap();
        let many: DocRefs = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(one.as_slice(), &[3]);
        assert_eq!(many.as_slice(), &[1, 2]);
        assert_eq!(DocRefs::from(vec![4, 4]), DocRefs::One(4));
    }

    #[test]
    fn object_entry_is_a_tuple() {
        let entry: ObjectEntry = serde_json::from_str(r#"[2,4,1,""]"#).unwrap();
        assert_eq!(entry.doc, 2);
        assert_eq!(entry.kind, 4);
        assert_eq!(serde_json::to_string(&entry).unwrap(), r#"[2,4,1,""]"#);
    }

    #[test]
    fn lookup_merges_case() {
        let index = sample();
        assert_eq!(index.lookup_term("dvs"), vec![0, 1]);
        assert_eq!(index.lookup_term("Dvs"), vec![0, 1]);
        assert!(index.lookup_term("nothing").is_empty());
    }

    #[test]
    fn module_anchor_uses_short_label() {
        let index = sample();
        let objects = index.object_entries();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].fullname, "everest3.dvs");
        assert_eq!(objects[0].anchor, "module-everest3.dvs");
    }

    #[test]
    fn documents_are_parallel() {
        let index = sample();
        let docs: Vec<_> = index.documents().collect();
        assert_eq!(docs[1].name, "dvs");
        assert_eq!(docs[1].title, "dvs.py");
        assert_eq!(index.doc_index("dvs"), Some(1));
        assert_eq!(index.stats().objects, 1);
    }
}
