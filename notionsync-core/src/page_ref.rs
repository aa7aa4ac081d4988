//! Page references: turns a Notion page URL or id into a page id.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRefError {
    #[error("page reference is empty")]
    Empty,
    #[error("no page id found in '{0}'")]
    NoId(String),
}

/// Extracts the page id from a URL or bare id and returns it hyphenated.
///
/// Accepted forms:
/// - a URL with a `p=<id>` query parameter (pages opened as a peek),
/// - a URL whose last path segment ends in a 32 hex digit id
///   (`…/My-Page-0123456789abcdef0123456789abcdef`),
/// - a bare id, with or without hyphens.
pub fn parse_page_ref(input: &str) -> Result<String, PageRefError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PageRefError::Empty);
    }

    let (path, query) = match input.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (input, None),
    };
    let path = path.split('#').next().unwrap_or(path);

    if let Some(query) = query {
        let peeked = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "p")
            .and_then(|(_, value)| parse_id(value));
        if let Some(id) = peeked {
            return Ok(id);
        }
    }

    if let Some(id) = parse_id(path) {
        return Ok(id);
    }

    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    if segment.len() >= 32 {
        if let Some(tail) = segment.get(segment.len() - 32..) {
            if let Some(id) = parse_id(tail) {
                return Ok(id);
            }
        }
    }
    Err(PageRefError::NoId(input.to_string()))
}

fn parse_id(candidate: &str) -> Option<String> {
    let is_id_shaped = matches!(candidate.len(), 32 | 36)
        && candidate.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
    if !is_id_shaped {
        return None;
    }
    Uuid::parse_str(candidate)
        .ok()
        .map(|id| id.hyphenated().to_string())
}
