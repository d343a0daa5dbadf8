//! # Search
//!
//! The documentation search index: its data model, ranked lookups,
//! integrity checks and a deterministic builder.
//!
//! ```text
//! SearchIndex
//!   docnames/filenames/titles   parallel, indexed by document number
//!   terms/titleterms            stemmed word -> document(s)
//!   objects                     prefix -> name -> [doc, type, priority, anchor]
//!   objnames/objtypes           type code -> labels
//! ```

mod builder;
mod index;
mod integrity;
mod query;
pub mod stemmer;

pub use builder::{
    DOMAIN, IndexBuilder, IndexManifest, ObjectKind, SourceDocument, SourceObject, split_words,
    word_filter,
};
pub use index::{
    DocRefs, Document, IndexStats, ObjName, ObjectEntry, ObjectRef, SearchIndex, fullname,
};
pub use integrity::{IntegrityReport, IntegrityViolation, TermTable};
pub use query::{
    Query, SCORE_OBJ_NAME, SCORE_OBJ_PARTIAL, SCORE_PARTIAL_TERM, SCORE_PARTIAL_TITLE,
    SCORE_TERM, SCORE_TITLE, STOPWORDS, SearchHit, is_stopword, priority_bonus, search,
};
