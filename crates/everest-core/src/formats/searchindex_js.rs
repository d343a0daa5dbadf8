//! The `searchindex.js` text form: `Search.setIndex({...})`.

use super::literal::parse_literal;
use crate::EverestError;
use crate::constants::{MAX_INDEX_FILE_SIZE, SEARCH_INDEX_CALL};
use crate::search::SearchIndex;

/// Parse a search index from `Search.setIndex(...)` or bare JSON.
pub fn parse(src: &str) -> Result<SearchIndex, EverestError> {
    if src.len() > MAX_INDEX_FILE_SIZE {
        return Err(EverestError::DeserializationError(format!(
            "Search index of {} bytes exceeds maximum allowed {} bytes",
            src.len(),
            MAX_INDEX_FILE_SIZE
        )));
    }
    let body = unwrap_call(src)?;
    let value = parse_literal(body)?;
    serde_json::from_value(value)
        .map_err(|e| EverestError::DeserializationError(format!("search index: {}", e)))
}

/// The literal inside `Search.setIndex(...)`, or the whole input when there
/// is no call.
fn unwrap_call(src: &str) -> Result<&str, EverestError> {
    let trimmed = src.trim().trim_end_matches(';').trim_end();
    let Some(rest) = trimmed.strip_prefix(SEARCH_INDEX_CALL) else {
        return Ok(trimmed);
    };
    rest.trim_start()
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .ok_or_else(|| {
            EverestError::DeserializationError(format!(
                "malformed {}(...) call",
                SEARCH_INDEX_CALL
            ))
        })
}

/// Emit `Search.setIndex(<json>)`.
pub fn to_js(index: &SearchIndex) -> Result<String, EverestError> {
    let json = serde_json::to_string(index)
        .map_err(|e| EverestError::SerializationError(e.to_string()))?;
    Ok(format!("{}({})", SEARCH_INDEX_CALL, json))
}

/// Emit pretty-printed JSON.
pub fn to_json(index: &SearchIndex) -> Result<String, EverestError> {
    serde_json::to_string_pretty(index).map_err(|e| EverestError::SerializationError(e.to_string()))
}
