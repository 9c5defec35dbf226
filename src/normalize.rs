//! Decoding of raw `/query` payloads into [`CanonicalResult`].
//!
//! The backend's `response` field is loosely typed: it may be a bare string,
//! a full result object, an off-topic notice (`{message, suggestions}`) or
//! anything in between. [`normalize`] never fails. Each field is read from
//! its path when present and of the right shape, otherwise it takes its
//! default, so a partial payload yields a partially-defaulted result.

use serde_json::{Map, Value};

use crate::models::{
    CanonicalResult, Relevance, ResultMetadata, Snippet, SnippetKind, DEFAULT_DOCUMENT_TYPE,
    DEFAULT_TITLE,
};

pub fn normalize(raw: &Value) -> CanonicalResult {
    if let Value::String(text) = raw {
        return CanonicalResult {
            snippet: Snippet {
                text: text.clone(),
                kind: SnippetKind::default(),
            },
            ..CanonicalResult::default()
        };
    }

    let Some(obj) = raw.as_object() else {
        return CanonicalResult::default();
    };

    CanonicalResult {
        title: string_at(obj, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        snippet: normalize_snippet(obj),
        steps: strings_at(obj, "steps"),
        link: string_at(obj, "link").unwrap_or_default(),
        metadata: normalize_metadata(obj.get("metadata")),
        suggestions: strings_at(obj, "suggestions"),
        related_topics: strings_at(obj, "related_topics"),
    }
}

fn normalize_snippet(obj: &Map<String, Value>) -> Snippet {
    match obj.get("snippet") {
        Some(Value::Object(snippet)) => Snippet {
            text: string_at(snippet, "text").unwrap_or_default(),
            kind: snippet
                .get("type")
                .and_then(Value::as_str)
                .and_then(parse_snippet_kind)
                .unwrap_or_default(),
        },
        Some(Value::String(text)) => Snippet {
            text: text.clone(),
            kind: SnippetKind::default(),
        },
        // Off-topic and no-hit answers carry only a top-level message.
        _ => Snippet {
            text: string_at(obj, "message").unwrap_or_default(),
            kind: SnippetKind::default(),
        },
    }
}

fn normalize_metadata(raw: Option<&Value>) -> ResultMetadata {
    let Some(meta) = raw.and_then(Value::as_object) else {
        return ResultMetadata::default();
    };

    ResultMetadata {
        relevance: meta
            .get("relevance")
            .and_then(Value::as_str)
            .and_then(parse_relevance)
            .unwrap_or_default(),
        document_type: string_at(meta, "documentType")
            .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string()),
        headers: strings_at(meta, "headers"),
    }
}

fn parse_relevance(s: &str) -> Option<Relevance> {
    match s.trim().to_ascii_lowercase().as_str() {
        "high" => Some(Relevance::High),
        "medium" => Some(Relevance::Medium),
        "low" => Some(Relevance::Low),
        _ => None,
    }
}

fn parse_snippet_kind(s: &str) -> Option<SnippetKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "guide" => Some(SnippetKind::Guide),
        "documentation" => Some(SnippetKind::Documentation),
        _ => None,
    }
}

fn string_at(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Non-string elements are dropped rather than defaulting the whole list.
fn strings_at(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
