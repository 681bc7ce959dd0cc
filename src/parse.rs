//! Best-effort structured parsing of model replies.
//!
//! Replies that should carry a JSON payload often arrive wrapped in markdown
//! code fences. Decoding follows a fixed precedence: strip a ```json fence if
//! one is present, otherwise a bare ``` fence, then attempt the decode.
//! Failure is reported as `None`; every call site supplies its own fallback
//! value, so a malformed reply never crosses a step boundary as an error.

use serde::de::DeserializeOwned;

/// Strip surrounding markdown code fences from a model reply.
///
/// An unterminated fence keeps everything after the opening marker.
pub fn strip_code_fences(content: &str) -> &str {
    if let Some(inner) = fenced_block(content, "```json") {
        return inner;
    }
    if let Some(inner) = fenced_block(content, "```") {
        return inner;
    }
    content.trim()
}

fn fenced_block<'a>(content: &'a str, marker: &str) -> Option<&'a str> {
    let start = content.find(marker)? + marker.len();
    let rest = &content[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Decode a structured payload from a model reply, stripping fences first.
///
/// Returns `None` when the reply does not contain the expected structure.
pub fn decode_reply<T: DeserializeOwned>(content: &str) -> Option<T> {
    serde_json::from_str(strip_code_fences(content)).ok()
}
