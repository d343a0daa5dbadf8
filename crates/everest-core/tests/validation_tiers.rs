//! # Validation Tier Tests (T0-T3)
//!
//! Run against the `searchindex.js` shipped with the everest3 documentation.
//!
//! ## Tiers
//! - T0: Parsing
//! - T1: Structural Integrity
//! - T2: Lookup and Ranking
//! - T3: Regeneration Stability

use everest_core::formats::{IndexFormat, decode_index, encode_index, searchindex_js};
use everest_core::search::{DocRefs, IntegrityViolation, ObjectEntry, SearchIndex, search};
use everest_core::{EverestError, index_checksum};

const FIXTURE: &str = include_str!("fixtures/searchindex.js");

fn fixture() -> SearchIndex {
    searchindex_js::parse(FIXTURE).expect("fixture parses")
}

// =============================================================================
// TIER T0: PARSING
// =============================================================================

mod t0_parsing {
    use super::*;

    /// T0.1: The shipped index parses with every table populated.
    #[test]
    fn fixture_parses() {
        let index = fixture();
        let stats = index.stats();
        assert_eq!(stats.documents, 8);
        assert_eq!(stats.terms, 218);
        assert_eq!(stats.titleterms, 9);
        assert_eq!(stats.objects, 76);
        assert_eq!(stats.object_types, 6);
        assert_eq!(index.envversion, Some(serde_json::json!(53)));
    }

    /// T0.2: Documents keep their order and parallel fields.
    #[test]
    fn documents_in_order() {
        let index = fixture();
        let names: Vec<&str> = index.documents().map(|d| d.name).collect();
        assert_eq!(
            names,
            ["api", "constants", "containers", "dvs", "index", "k2", "pld", "utils"]
        );
        let pld = index.document(6).expect("pld document");
        assert_eq!(pld.filename, "pld.rst");
        assert_eq!(pld.title, "pld.py");
    }

    /// T0.3: Object entries decode as [doc, type, priority, anchor].
    #[test]
    fn object_entries_decoded() {
        let index = fixture();
        assert_eq!(
            index.objects["everest3.pld"]["detrend"],
            ObjectEntry {
                doc: 6,
                kind: 5,
                priority: 1,
                anchor: String::new(),
            }
        );
        assert_eq!(index.objtypes[&5], "py:function");
        assert_eq!(index.objnames[&0].long, "Python module");
    }

    /// T0.4: Malformed input is a deserialization error.
    #[test]
    fn truncated_fixture_rejected() {
        let truncated = &FIXTURE[..FIXTURE.len() / 2];
        assert!(matches!(
            searchindex_js::parse(truncated),
            Err(EverestError::DeserializationError(_))
        ));
    }
}

// =============================================================================
// TIER T1: STRUCTURAL INTEGRITY
// =============================================================================

mod t1_integrity {
    use super::*;

    /// T1.1: The shipped index has no fatal violations.
    #[test]
    fn fixture_is_valid() {
        let index = fixture();
        assert!(index.validate().is_ok());
        let report = index.check();
        assert!(!report.has_fatal());
    }

    /// T1.2: "DVS" and "dvs" refer to different documents, which lookup
    /// conflates. This is reported as a warning only.
    #[test]
    fn case_collision_warned() {
        let report = fixture().check();
        let warnings: Vec<&IntegrityViolation> = report.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            IntegrityViolation::CaseCollision { keys, .. } if keys == &["DVS", "dvs"]
        ));
    }

    /// T1.3: Every term reference resolves to a document.
    #[test]
    fn dangling_reference_detected() {
        let mut index = fixture();
        index.terms.insert("orphan".into(), DocRefs::Many(vec![1, 8]));
        assert!(matches!(
            index.validate(),
            Err(EverestError::Integrity(_))
        ));
    }

    /// T1.4: docnames, filenames and titles are parallel.
    #[test]
    fn non_parallel_documents_detected() {
        let mut index = fixture();
        index.filenames.pop();
        assert!(index
            .check()
            .fatal()
            .any(|v| matches!(v, IntegrityViolation::LengthMismatch { .. })));
    }

    /// T1.5: Every object type code has an objtypes entry.
    #[test]
    fn missing_objtype_detected() {
        let mut index = fixture();
        index.objtypes.remove(&4);
        let missing = index
            .check()
            .fatal()
            .filter(|v| matches!(v, IntegrityViolation::UnknownObjType { kind: 4, .. }))
            .count();
        // Target.detrend, get_aperture, get_raw_data, plot_dvs in containers and k2,
        // and the five TimeSeries methods.
        assert_eq!(missing, 13);
    }

    /// T1.6: No two objects of a document share an anchor.
    #[test]
    fn anchor_collision_detected() {
        let mut index = fixture();
        if let Some(entry) = index
            .objects
            .get_mut("everest3.containers.Target")
            .and_then(|names| names.get_mut("flux"))
        {
            entry.anchor = "everest3.containers.TimeSeries.flux".into();
        }
        let collisions: Vec<IntegrityViolation> = index
            .check()
            .violations
            .into_iter()
            .filter(|v| matches!(v, IntegrityViolation::AnchorCollision { .. }))
            .collect();
        assert_eq!(collisions.len(), 1);
        assert!(matches!(
            &collisions[0],
            IntegrityViolation::AnchorCollision { doc: 2, .. }
        ));
    }
}

// =============================================================================
// TIER T2: LOOKUP AND RANKING
// =============================================================================

mod t2_lookup {
    use super::*;

    /// T2.1: Term lookup ignores case and merges case variants.
    #[test]
    fn lookup_case_insensitive() {
        let index = fixture();
        assert_eq!(index.lookup_term("dvs"), vec![0, 2, 3, 5]);
        assert_eq!(index.lookup_term("DVS"), index.lookup_term("Dvs"));
        assert_eq!(index.lookup_term("APERTUR"), vec![2, 5]);
        assert!(index.lookup_term("photon").is_empty());
    }

    /// T2.2: Exact object names outrank partial names and documents.
    #[test]
    fn detrend_ranking() {
        let hits = search(&fixture(), "detrend");
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "everest3.containers.Target.detrend",
                "everest3.k2.Target.detrend",
                "everest3.pld.detrend",
                "everest3.dvs.DVS.detrended",
                "containers.py",
                "dvs.py",
                "k2.py",
                "pld.py",
            ]
        );
        let scores: Vec<i32> = hits.iter().map(|h| h.score).collect();
        assert_eq!(scores, [16, 16, 16, 11, 5, 5, 5, 5]);
    }

    /// T2.3: Modules carry the highest priority bonus and a module anchor.
    #[test]
    fn module_hit() {
        let hits = search(&fixture(), "pld");
        assert_eq!(hits[0].title, "everest3.pld");
        assert_eq!(hits[0].score, 26);
        assert_eq!(hits[0].anchor.as_deref(), Some("module-everest3.pld"));
        let doc = hits
            .iter()
            .find(|h| h.anchor.is_none())
            .expect("document hit");
        assert_eq!(doc.docname, "pld");
        assert_eq!(doc.score, 15);
    }

    /// T2.4: Several words narrow object and document matches.
    #[test]
    fn multi_word_query() {
        let hits = search(&fixture(), "target aperture");
        assert!(hits.iter().any(|h| h.title == "everest3.k2.Target.aperture"));
        assert!(hits
            .iter()
            .filter(|h| h.anchor.is_none())
            .all(|h| h.docname == "containers" || h.docname == "k2"));
    }
}

// =============================================================================
// TIER T3: REGENERATION STABILITY
// =============================================================================

mod t3_stability {
    use super::*;

    /// T3.1: Every format reproduces the same index and checksum.
    #[test]
    fn formats_preserve_index() {
        let index = fixture();
        for format in [IndexFormat::Js, IndexFormat::Json, IndexFormat::Binary] {
            let bytes = encode_index(&index, format).expect("encode");
            let restored = decode_index(&bytes, format).expect("decode");
            assert_eq!(restored, index, "{}", format);
            assert_eq!(index_checksum(&restored), index_checksum(&index));
        }
    }

    /// T3.2: Re-emitting is a fixed point.
    #[test]
    fn js_emission_is_stable() {
        let first = searchindex_js::to_js(&fixture()).expect("emit");
        let second = searchindex_js::to_js(&searchindex_js::parse(&first).expect("parse"))
            .expect("emit");
        assert_eq!(first, second);
    }

    /// T3.3: The term key set survives every conversion.
    #[test]
    fn key_set_stable() {
        let index = fixture();
        let bytes = encode_index(&index, IndexFormat::Binary).expect("encode");
        let restored = decode_index(&bytes, IndexFormat::Binary).expect("decode");
        assert!(index.terms.keys().eq(restored.terms.keys()));
        assert!(index.titleterms.keys().eq(restored.titleterms.keys()));
    }
}
