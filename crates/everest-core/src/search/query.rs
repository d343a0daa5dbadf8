//! Query parsing and ranked search over a [`SearchIndex`].

use super::index::{SearchIndex, fold_case, fullname};
use super::stemmer::stem;
use crate::constants::MAX_QUERY_WORDS;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SCORING
// =============================================================================

/// Words never searched for.
pub const STOPWORDS: &[&str] = &[
    "a", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "near", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Object whose full name or last dotted component equals the query word.
pub const SCORE_OBJ_NAME: i32 = 11;
/// Object whose last dotted component contains the query word.
pub const SCORE_OBJ_PARTIAL: i32 = 6;
/// Word found in a document's terms.
pub const SCORE_TERM: i32 = 5;
/// Word found in a document's title terms.
pub const SCORE_TITLE: i32 = 15;
/// Word found inside a longer term.
pub const SCORE_PARTIAL_TERM: i32 = 2;
/// Word found inside a longer title term.
pub const SCORE_PARTIAL_TITLE: i32 = 7;

/// Score adjustment for an object's priority code.
#[must_use]
pub fn priority_bonus(priority: i32) -> i32 {
    match priority {
        0 => 15,
        1 => 5,
        2 => -5,
        _ => 0,
    }
}

#[must_use]
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

// =============================================================================
// QUERY
// =============================================================================

/// A parsed search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Stemmed words every matching document must contain.
    pub words: Vec<String>,
    /// Stemmed words no matching document may contain.
    pub excluded: Vec<String>,
    /// Lowercase tokens matched against object names.
    pub object_terms: Vec<String>,
}

impl Query {
    /// Split on whitespace, lowercase, drop stopwords and numbers, stem.
    ///
    /// A leading `-` excludes a word. Stems shorter than three characters
    /// fall back to the lowercase word when the word itself is longer.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut query = Query::default();
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() > MAX_QUERY_WORDS {
            tracing::debug!(
                "Query has {} words, keeping the first {}",
                tokens.len(),
                MAX_QUERY_WORDS
            );
        }

        for token in tokens.into_iter().take(MAX_QUERY_WORDS) {
            let lower = token.to_lowercase();
            let (negated, word) = match lower.strip_prefix('-') {
                Some(rest) if !rest.is_empty() => (true, rest.to_string()),
                _ => (false, lower),
            };
            if !negated && !query.object_terms.contains(&word) {
                query.object_terms.push(word.clone());
            }
            if is_stopword(&word) || word.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }

            let mut stemmed = stem(&word);
            if stemmed.chars().count() < 3 && word.chars().count() >= 3 {
                stemmed = word;
            }
            let target = if negated {
                &mut query.excluded
            } else {
                &mut query.words
            };
            if !target.contains(&stemmed) {
                target.push(stemmed);
            }
        }
        query
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.object_terms.is_empty()
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub docname: String,
    pub filename: String,
    /// Full object name, or the document title.
    pub title: String,
    /// Anchor within the document, for objects.
    pub anchor: Option<String>,
    /// `"<kind>, in <document title>"`, for objects.
    pub description: Option<String>,
    pub score: i32,
}

/// Run a query against an index.
///
/// Objects and documents are ranked together by score, highest first, ties
/// broken by title. An object found by several query words is reported once
/// with its best score.
#[must_use]
pub fn search(index: &SearchIndex, text: &str) -> Vec<SearchHit> {
    let query = Query::parse(text);
    if query.is_empty() {
        return Vec::new();
    }

    let mut hits = object_hits(index, &query);
    hits.extend(document_hits(index, &query));
    hits.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then_with(|| a.anchor.cmp(&b.anchor))
    });

    tracing::debug!("Query '{}' matched {} results", text, hits.len());
    hits
}

fn object_hits(index: &SearchIndex, query: &Query) -> Vec<SearchHit> {
    let mut best: BTreeMap<(String, usize), SearchHit> = BTreeMap::new();

    for (i, term) in query.object_terms.iter().enumerate() {
        let others: Vec<&String> = query
            .object_terms
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, t)| t)
            .collect();

        for (prefix, names) in &index.objects {
            for (name, entry) in names {
                let full = fullname(prefix, name);
                let full_lower = full.to_lowercase();
                if !full_lower.contains(term.as_str()) {
                    continue;
                }
                let last = full_lower.rsplit('.').next().unwrap_or(full_lower.as_str());

                let mut score = 0;
                if full_lower == *term || last == term.as_str() {
                    score += SCORE_OBJ_NAME;
                } else if last.contains(term.as_str()) {
                    score += SCORE_OBJ_PARTIAL;
                }

                let objname = index
                    .objname(entry.kind)
                    .map(|o| o.long.as_str())
                    .unwrap_or_default();
                let title = index
                    .titles
                    .get(entry.doc)
                    .map(String::as_str)
                    .unwrap_or_default();
                if !others.is_empty() {
                    let haystack =
                        format!("{} {} {} {}", prefix, name, objname, title).to_lowercase();
                    if !others.iter().all(|o| haystack.contains(o.as_str())) {
                        continue;
                    }
                }
                score += priority_bonus(entry.priority);

                let (Some(docname), Some(filename)) =
                    (index.docnames.get(entry.doc), index.filenames.get(entry.doc))
                else {
                    continue;
                };
                let hit = SearchHit {
                    docname: docname.clone(),
                    filename: filename.clone(),
                    title: full.clone(),
                    anchor: Some(index.resolve_anchor(&full, entry)),
                    description: Some(format!("{}, in {}", objname, title)),
                    score,
                };
                let key = (full, entry.doc);
                match best.get(&key) {
                    Some(seen) if seen.score >= hit.score => {}
                    _ => {
                        best.insert(key, hit);
                    }
                }
            }
        }
    }
    best.into_values().collect()
}

fn document_hits(index: &SearchIndex, query: &Query) -> Vec<SearchHit> {
    if query.words.is_empty() {
        return Vec::new();
    }
    let terms = fold_case(&index.terms);
    let titleterms = fold_case(&index.titleterms);

    // doc -> word -> best score
    let mut scores: BTreeMap<usize, BTreeMap<&str, i32>> = BTreeMap::new();
    for word in &query.words {
        let mut sources: Vec<(&BTreeSet<usize>, i32)> = Vec::new();
        if let Some(docs) = terms.get(word) {
            sources.push((docs, SCORE_TERM));
        }
        if let Some(docs) = titleterms.get(word) {
            sources.push((docs, SCORE_TITLE));
        }
        if word.chars().count() > 2 {
            if !terms.contains_key(word) {
                sources.extend(
                    terms
                        .iter()
                        .filter(|(key, _)| key.contains(word.as_str()))
                        .map(|(_, docs)| (docs, SCORE_PARTIAL_TERM)),
                );
            }
            if !titleterms.contains_key(word) {
                sources.extend(
                    titleterms
                        .iter()
                        .filter(|(key, _)| key.contains(word.as_str()))
                        .map(|(_, docs)| (docs, SCORE_PARTIAL_TITLE)),
                );
            }
        }
        // A required word with no match anywhere rules out every document.
        if sources.is_empty() {
            return Vec::new();
        }
        for (docs, score) in sources {
            for &doc in docs {
                let entry = scores
                    .entry(doc)
                    .or_default()
                    .entry(word.as_str())
                    .or_insert(score);
                *entry = (*entry).max(score);
            }
        }
    }

    let excluded: BTreeSet<usize> = query
        .excluded
        .iter()
        .flat_map(|word| {
            terms
                .get(word)
                .into_iter()
                .chain(titleterms.get(word))
                .flatten()
                .copied()
        })
        .collect();

    scores
        .into_iter()
        .filter(|(doc, words)| words.len() == query.words.len() && !excluded.contains(doc))
        .filter_map(|(doc, words)| {
            let document = index.document(doc)?;
            Some(SearchHit {
                docname: document.name.to_string(),
                filename: document.filename.to_string(),
                title: document.title.to_string(),
                anchor: None,
                description: None,
                score: words.values().copied().max().unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::{DocRefs, ObjName, ObjectEntry};

    fn sample() -> SearchIndex {
        let mut index = SearchIndex {
            docnames: vec!["containers".into(), "dvs".into(), "pld".into()],
            filenames: vec!["containers.rst".into(), "dvs.rst".into(), "pld.rst".into()],
            titles: vec!["containers.py".into(), "dvs.py".into(), "pld.py".into()],
            ..SearchIndex::default()
        };
        index.terms.insert("apertur".into(), DocRefs::One(0));
        index.terms.insert("detrend".into(), DocRefs::Many(vec![0, 2]));
        index.terms.insert("layout".into(), DocRefs::Many(vec![0, 1]));
        index.terms.insert("dvs_layout".into(), DocRefs::One(0));
        index.titleterms.insert("dvs".into(), DocRefs::One(1));
        index.titleterms.insert("pld".into(), DocRefs::One(2));
        for (code, short) in [(2, "class"), (4, "method"), (5, "function")] {
            index.objnames.insert(
                code,
                ObjName {
                    domain: "py".into(),
                    short: short.into(),
                    long: format!("Python {}", short),
                },
            );
            index.objtypes.insert(code, format!("py:{}", short));
        }
        let entry = |doc, kind| ObjectEntry {
            doc,
            kind,
            priority: 1,
            anchor: String::new(),
        };
        index
            .objects
            .entry("everest3.containers".into())
            .or_default()
            .insert("Target".into(), entry(0, 2));
        index
            .objects
            .entry("everest3.containers.Target".into())
            .or_default()
            .insert("detrend".into(), entry(0, 4));
        index
            .objects
            .entry("everest3.pld".into())
            .or_default()
            .insert("detrend".into(), entry(2, 5));
        index
    }

    #[test]
    fn parse_filters_and_stems() {
        let query = Query::parse("The apertures of 42 -layout");
        assert_eq!(query.words, vec!["apertur".to_string()]);
        assert_eq!(query.excluded, vec!["layout".to_string()]);
        assert!(query.object_terms.contains(&"apertures".to_string()));
    }

    #[test]
    fn short_stem_keeps_word() {
        let query = Query::parse("DVS");
        assert_eq!(query.words, vec!["dvs".to_string()]);
    }

    #[test]
    fn exact_object_name_ranks_first() {
        let hits = search(&sample(), "detrend");
        assert!(hits.len() >= 4);
        // 11 + 5 for both objects, then documents at 5.
        assert_eq!(hits[0].score, 16);
        assert_eq!(hits[0].title, "everest3.containers.Target.detrend");
        assert_eq!(hits[1].title, "everest3.pld.detrend");
        assert_eq!(hits[0].description.as_deref(), Some("Python method, in containers.py"));
        assert!(hits[2..].iter().all(|h| h.anchor.is_none() && h.score == 5));
    }

    #[test]
    fn title_terms_outscore_terms() {
        let hits = search(&sample(), "pld");
        let doc = hits.iter().find(|h| h.anchor.is_none()).unwrap();
        assert_eq!(doc.docname, "pld");
        assert_eq!(doc.score, SCORE_TITLE);
    }

    #[test]
    fn every_word_required() {
        let hits = search(&sample(), "detrend apertur");
        let docs: Vec<_> = hits.iter().filter(|h| h.anchor.is_none()).collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].docname, "containers");
    }

    #[test]
    fn excluded_words_remove_documents() {
        let hits = search(&sample(), "detrend -apertures");
        let docs: Vec<_> = hits.iter().filter(|h| h.anchor.is_none()).collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].docname, "pld");
    }

    #[test]
    fn partial_terms_match() {
        let hits = search(&sample(), "layo");
        let docs: Vec<_> = hits.iter().filter(|h| h.anchor.is_none()).collect();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|h| h.score == SCORE_PARTIAL_TERM));
    }

    #[test]
    fn unknown_word_finds_nothing() {
        assert!(search(&sample(), "zzzz").is_empty());
        assert!(search(&sample(), "").is_empty());
    }
}
