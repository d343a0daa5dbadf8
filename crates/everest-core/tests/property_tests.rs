//! # Property-Based Tests
//!
//! Determinism and correctness invariants of the search index.

use everest_core::formats::{index_checksum, index_from_bytes, index_to_bytes, parse_literal};
use everest_core::search::stemmer::stem;
use everest_core::search::{DocRefs, IndexBuilder, ObjectKind, Query, SearchIndex, is_stopword};
use proptest::collection::vec;
use proptest::prelude::*;

const VOCABULARY: &[&str] = &[
    "Target", "target", "aperture", "apertures", "pixel", "PLD", "detrending", "light", "curve",
    "the", "DVS", "layout", "cadence", "K2", "campaign", "magnitude", "2017", "of", "scatter",
    "flux", "Fluxes", "model", "time", "series", "über",
];

const KINDS: &[ObjectKind] = &[
    ObjectKind::Module,
    ObjectKind::Class,
    ObjectKind::Attribute,
    ObjectKind::Method,
    ObjectKind::Function,
    ObjectKind::Data,
];

fn words(max: usize) -> impl Strategy<Value = String> {
    vec(prop::sample::select(VOCABULARY), 0..max).prop_map(|w| w.join(" "))
}

/// (title, text, [(object suffix, kind)]) per document.
type DocInput = (String, String, Vec<(String, ObjectKind)>);

fn documents() -> impl Strategy<Value = Vec<DocInput>> {
    vec(
        (
            words(4),
            words(30),
            vec(("[a-z]{1,8}", prop::sample::select(KINDS)), 0..4),
        ),
        1..6,
    )
}

fn build(docs: &[DocInput]) -> SearchIndex {
    let mut builder = IndexBuilder::new();
    for (i, (title, text, objects)) in docs.iter().enumerate() {
        let name = format!("doc{}", i);
        builder.add_document(name.clone(), format!("{}.rst", name), title.clone(), text.clone());
        let mut seen = std::collections::BTreeSet::new();
        for (suffix, kind) in objects {
            if seen.insert(suffix.clone()) {
                builder.add_object(format!("everest3.{}.{}", name, suffix), name.clone(), *kind);
            }
        }
    }
    builder.build().expect("build")
}

/// Term tables in any stored shape: bare indexes, one-element lists,
/// unsorted lists and repeats.
fn term_table() -> impl Strategy<Value = std::collections::BTreeMap<String, DocRefs>> {
    let refs = prop_oneof![
        (0usize..3).prop_map(DocRefs::One),
        vec(0usize..3, 0..5).prop_map(DocRefs::Many),
    ];
    prop::collection::btree_map("[a-zA-Z]{1,6}", refs, 0..12)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Same documents produce an identical index and checksum.
    #[test]
    fn determinism_identical_input_produces_identical_output(docs in documents()) {
        let a = build(&docs);
        let b = build(&docs);
        prop_assert_eq!(index_checksum(&a), index_checksum(&b));
        prop_assert!(a.terms.keys().eq(b.terms.keys()));
        prop_assert_eq!(a, b);
    }

    /// Built indexes never have fatal integrity violations.
    #[test]
    fn built_index_is_valid(docs in documents()) {
        let index = build(&docs);
        prop_assert!(index.validate().is_ok());
        prop_assert_eq!(index.docnames.len(), index.titles.len());
        prop_assert_eq!(index.docnames.len(), index.filenames.len());
    }

    /// Lookup gives the same documents whatever the case of the query.
    #[test]
    fn lookup_is_case_insensitive(docs in documents()) {
        let index = build(&docs);
        for key in index.terms.keys() {
            let lower = index.lookup_term(&key.to_lowercase());
            prop_assert_eq!(&lower, &index.lookup_term(&key.to_uppercase()));
            prop_assert!(!lower.is_empty());
        }
    }

    /// Snapshots decode to the index they were made from.
    #[test]
    fn snapshot_roundtrip(docs in documents()) {
        let index = build(&docs);
        let bytes = index_to_bytes(&index).expect("encode");
        let restored = index_from_bytes(&bytes).expect("decode");
        prop_assert_eq!(&restored, &index);
        prop_assert_eq!(index_to_bytes(&restored).expect("encode"), bytes);
    }

    /// Snapshots keep term tables exactly as stored.
    #[test]
    fn snapshot_preserves_term_shapes(terms in term_table(), titleterms in term_table()) {
        let index = SearchIndex {
            docnames: vec!["a".into(), "b".into(), "c".into()],
            filenames: vec!["a.rst".into(), "b.rst".into(), "c.rst".into()],
            titles: vec!["A".into(), "B".into(), "C".into()],
            terms,
            titleterms,
            ..SearchIndex::default()
        };
        let restored = index_from_bytes(&index_to_bytes(&index).expect("encode")).expect("decode");
        prop_assert_eq!(index_checksum(&restored), index_checksum(&index));
        prop_assert_eq!(restored, index);
    }

    /// Stemming never lengthens a word.
    #[test]
    fn stem_never_lengthens(word in "[a-z_]{0,24}") {
        prop_assert!(stem(&word).len() <= word.len());
    }

    /// Parsed queries carry no stopwords or numbers.
    #[test]
    fn query_words_filtered(text in words(12)) {
        let query = Query::parse(&text);
        for word in query.words.iter().chain(&query.excluded) {
            prop_assert!(!is_stopword(word));
            prop_assert!(!word.chars().all(|c| c.is_ascii_digit()));
        }
    }

    /// The literal parser returns an error instead of panicking.
    #[test]
    fn literal_parser_total(src in ".{0,64}") {
        let _ = parse_literal(&src);
    }
}
