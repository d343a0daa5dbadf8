//! Structural integrity checks for a search index.
//!
//! Every violation is fatal except a case collision between term keys, which
//! lookups tolerate by merging the keys.

use super::index::{DocRefs, SearchIndex, fullname};
use crate::EverestError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which term table a violation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TermTable {
    Terms,
    TitleTerms,
}

impl fmt::Display for TermTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermTable::Terms => f.write_str("terms"),
            TermTable::TitleTerms => f.write_str("titleterms"),
        }
    }
}

/// A single integrity violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum IntegrityViolation {
    /// `docnames`, `filenames` and `titles` differ in length.
    LengthMismatch {
        docnames: usize,
        filenames: usize,
        titles: usize,
    },
    /// The same document name appears twice.
    DuplicateDocname { name: String },
    /// A term refers to a document that does not exist.
    DanglingTermRef {
        table: TermTable,
        term: String,
        doc: usize,
    },
    /// An object refers to a document that does not exist.
    DanglingObjectRef { object: String, doc: usize },
    /// An object's type code has no `objtypes` entry.
    UnknownObjType { object: String, kind: u32 },
    /// An object's type code has no `objnames` entry.
    UnknownObjName { object: String, kind: u32 },
    /// Term keys equal up to case refer to different documents.
    CaseCollision {
        table: TermTable,
        keys: Vec<String>,
    },
    /// Distinct objects of one document resolve to the same anchor.
    AnchorCollision {
        doc: usize,
        anchor: String,
        objects: Vec<String>,
    },
}

impl IntegrityViolation {
    /// Whether the violation makes the index unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IntegrityViolation::CaseCollision { .. })
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::LengthMismatch {
                docnames,
                filenames,
                titles,
            } => write!(
                f,
                "docnames ({}), filenames ({}) and titles ({}) are not parallel",
                docnames, filenames, titles
            ),
            IntegrityViolation::DuplicateDocname { name } => {
                write!(f, "document '{}' is listed more than once", name)
            }
            IntegrityViolation::DanglingTermRef { table, term, doc } => {
                write!(f, "{} entry '{}' refers to missing document {}", table, term, doc)
            }
            IntegrityViolation::DanglingObjectRef { object, doc } => {
                write!(f, "object '{}' refers to missing document {}", object, doc)
            }
            IntegrityViolation::UnknownObjType { object, kind } => {
                write!(f, "object '{}' has type {} missing from objtypes", object, kind)
            }
            IntegrityViolation::UnknownObjName { object, kind } => {
                write!(f, "object '{}' has type {} missing from objnames", object, kind)
            }
            IntegrityViolation::CaseCollision { table, keys } => write!(
                f,
                "{} keys {} differ only by case and refer to different documents",
                table,
                keys.join(", ")
            ),
            IntegrityViolation::AnchorCollision {
                doc,
                anchor,
                objects,
            } => write!(
                f,
                "objects {} share anchor '{}' in document {}",
                objects.join(", "),
                anchor,
                doc
            ),
        }
    }
}

/// Result of [`SearchIndex::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.violations.iter().any(IntegrityViolation::is_fatal)
    }

    pub fn fatal(&self) -> impl Iterator<Item = &IntegrityViolation> {
        self.violations.iter().filter(|v| v.is_fatal())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &IntegrityViolation> {
        self.violations.iter().filter(|v| !v.is_fatal())
    }
}

impl SearchIndex {
    /// Run every integrity check.
    #[must_use]
    pub fn check(&self) -> IntegrityReport {
        let mut violations = Vec::new();
        self.check_documents(&mut violations);
        for (table, map) in [
            (TermTable::Terms, &self.terms),
            (TermTable::TitleTerms, &self.titleterms),
        ] {
            self.check_term_refs(table, map, &mut violations);
            check_case_collisions(table, map, &mut violations);
        }
        self.check_objects(&mut violations);
        self.check_anchors(&mut violations);

        for violation in &violations {
            if violation.is_fatal() {
                tracing::debug!("Integrity violation: {}", violation);
            } else {
                tracing::debug!("Integrity warning: {}", violation);
            }
        }
        IntegrityReport { violations }
    }

    /// Fail on the first fatal violation.
    pub fn validate(&self) -> Result<(), EverestError> {
        let report = self.check();
        let fatal: Vec<&IntegrityViolation> = report.fatal().collect();
        match fatal.first() {
            None => Ok(()),
            Some(first) => Err(EverestError::Integrity(format!(
                "{} violation(s), first: {}",
                fatal.len(),
                first
            ))),
        }
    }

    fn check_documents(&self, out: &mut Vec<IntegrityViolation>) {
        let (docnames, filenames, titles) =
            (self.docnames.len(), self.filenames.len(), self.titles.len());
        if docnames != filenames || docnames != titles {
            out.push(IntegrityViolation::LengthMismatch {
                docnames,
                filenames,
                titles,
            });
        }

        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        for name in &self.docnames {
            if !seen.insert(name) && reported.insert(name) {
                out.push(IntegrityViolation::DuplicateDocname { name: name.clone() });
            }
        }
    }

    fn check_term_refs(
        &self,
        table: TermTable,
        map: &BTreeMap<String, DocRefs>,
        out: &mut Vec<IntegrityViolation>,
    ) {
        let count = self.document_count();
        for (term, refs) in map {
            for &doc in refs.as_slice() {
                if doc >= count {
                    out.push(IntegrityViolation::DanglingTermRef {
                        table,
                        term: term.clone(),
                        doc,
                    });
                }
            }
        }
    }

    fn check_objects(&self, out: &mut Vec<IntegrityViolation>) {
        let count = self.document_count();
        for (prefix, names) in &self.objects {
            for (name, entry) in names {
                let object = fullname(prefix, name);
                if entry.doc >= count {
                    out.push(IntegrityViolation::DanglingObjectRef {
                        object: object.clone(),
                        doc: entry.doc,
                    });
                }
                if !self.objtypes.contains_key(&entry.kind) {
                    out.push(IntegrityViolation::UnknownObjType {
                        object: object.clone(),
                        kind: entry.kind,
                    });
                }
                if !self.objnames.contains_key(&entry.kind) {
                    out.push(IntegrityViolation::UnknownObjName {
                        object,
                        kind: entry.kind,
                    });
                }
            }
        }
    }

    fn check_anchors(&self, out: &mut Vec<IntegrityViolation>) {
        let mut anchors: BTreeMap<(usize, String), BTreeSet<String>> = BTreeMap::new();
        for object in self.object_entries() {
            anchors
                .entry((object.doc, object.anchor))
                .or_default()
                .insert(object.fullname);
        }
        for ((doc, anchor), objects) in anchors {
            if objects.len() > 1 {
                out.push(IntegrityViolation::AnchorCollision {
                    doc,
                    anchor,
                    objects: objects.into_iter().collect(),
                });
            }
        }
    }
}

fn check_case_collisions(
    table: TermTable,
    map: &BTreeMap<String, DocRefs>,
    out: &mut Vec<IntegrityViolation>,
) {
    let mut groups: BTreeMap<String, Vec<(&String, &DocRefs)>> = BTreeMap::new();
    for (key, refs) in map {
        groups.entry(key.to_lowercase()).or_default().push((key, refs));
    }
    for group in groups.into_values() {
        if group.len() < 2 {
            continue;
        }
        let first: BTreeSet<usize> = group[0].1.as_slice().iter().copied().collect();
        let conflated = group.iter().skip(1).any(|(_, refs)| {
            refs.as_slice().iter().copied().collect::<BTreeSet<usize>>() != first
        });
        if conflated {
            out.push(IntegrityViolation::CaseCollision {
                table,
                keys: group.into_iter().map(|(key, _)| key.clone()).collect(),
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::{ObjName, ObjectEntry};

    fn clean() -> SearchIndex {
        let mut index = SearchIndex {
            docnames: vec!["k2".into(), "pld".into()],
            filenames: vec!["k2.rst".into(), "pld.rst".into()],
            titles: vec!["k2.py".into(), "pld.py".into()],
            ..SearchIndex::default()
        };
        index.terms.insert("detrend".into(), DocRefs::Many(vec![0, 1]));
        index.titleterms.insert("pld".into(), DocRefs::One(1));
        index.objnames.insert(
            5,
            ObjName {
                domain: "py".into(),
                short: "function".into(),
                long: "Python function".into(),
            },
        );
        index.objtypes.insert(5, "py:function".into());
        index.objects.entry("everest3.pld".into()).or_default().insert(
            "detrend".into(),
            ObjectEntry {
                doc: 1,
                kind: 5,
                priority: 1,
                anchor: String::new(),
            },
        );
        index
    }

    #[test]
    fn clean_index_passes() {
        let index = clean();
        assert!(index.check().is_clean());
        assert!(index.validate().is_ok());
    }

    #[test]
    fn dangling_term_reported() {
        let mut index = clean();
        index.terms.insert("ghost".into(), DocRefs::One(7));
        let report = index.check();
        assert!(report.has_fatal());
        assert!(matches!(
            report.violations[0],
            IntegrityViolation::DanglingTermRef { doc: 7, .. }
        ));
        assert!(matches!(index.validate(), Err(EverestError::Integrity(_))));
    }

    #[test]
    fn length_mismatch_reported() {
        let mut index = clean();
        index.titles.pop();
        assert!(index.check().violations.contains(&IntegrityViolation::LengthMismatch {
            docnames: 2,
            filenames: 2,
            titles: 1,
        }));
    }

    #[test]
    fn unknown_type_code_reported() {
        let mut index = clean();
        index.objtypes.clear();
        let report = index.check();
        assert_eq!(report.fatal().count(), 1);
        assert!(matches!(
            report.violations[0],
            IntegrityViolation::UnknownObjType { kind: 5, .. }
        ));
    }

    #[test]
    fn case_collision_is_a_warning() {
        let mut index = clean();
        index.terms.insert("DETREND".into(), DocRefs::One(0));
        let report = index.check();
        assert!(!report.has_fatal());
        assert_eq!(report.warnings().count(), 1);
        assert!(index.validate().is_ok());
    }

    #[test]
    fn identical_case_variants_are_fine() {
        let mut index = clean();
        index.terms.insert("Detrend".into(), DocRefs::Many(vec![1, 0]));
        assert!(index.check().is_clean());
    }

    #[test]
    fn anchor_collision_reported() {
        let mut index = clean();
        index.objects.entry("everest3.pld".into()).or_default().insert(
            "other".into(),
            ObjectEntry {
                doc: 1,
                kind: 5,
                priority: 1,
                anchor: "everest3.pld.detrend".into(),
            },
        );
        let report = index.check();
        assert_eq!(report.violations.len(), 1);
        assert!(matches!(
            &report.violations[0],
            IntegrityViolation::AnchorCollision { doc: 1, objects, .. } if objects.len() == 2
        ));
    }

    #[test]
    fn duplicate_docname_reported_once() {
        let mut index = clean();
        for _ in 0..2 {
            index.docnames.push("k2".into());
            index.filenames.push("k2.rst".into());
            index.titles.push("k2.py".into());
        }
        let duplicates = index
            .check()
            .violations
            .into_iter()
            .filter(|v| matches!(v, IntegrityViolation::DuplicateDocname { .. }))
            .count();
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn violation_serializes_with_tag_and_fields() {
        let violation = IntegrityViolation::UnknownObjType {
            object: "everest3.k2.K2".into(),
            kind: 9,
        };
        let value = serde_json::to_value(&violation).unwrap();
        assert_eq!(value["violation"], "unknown_obj_type");
        assert_eq!(value["kind"], 9);
        assert_eq!(value["object"], "everest3.k2.K2");

        let report = IntegrityReport {
            violations: vec![violation],
        };
        let text = serde_json::to_string(&report).unwrap();
        assert!(text.contains("\"violation\":\"unknown_obj_type\""));
    }
}
