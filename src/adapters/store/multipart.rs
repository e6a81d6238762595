//! `$batch` request and response bodies
//!
//! Operations travel as a `multipart/mixed` body with one `application/http`
//! part per operation and no change sets, so the store treats every part
//! independently. With `Prefer: odata.continue-on-error` it keeps going after
//! a failed part and answers with one response part per request part.

use super::models::{entity_id_from_uri, error_message};
use super::traits::ItemOutcome;
use crate::domain::{EngineError, PendingOperation, Result, StoreError};

const CRLF: &str = "\r\n";

/// Build the body of a batch request
///
/// Each part carries a `Content-ID` equal to its 1-based position, which is
/// how response parts are matched back to operations.
///
/// # Errors
///
/// Returns `Serialization` if a payload can't be encoded.
pub fn build_batch_body(
    boundary: &str,
    api_path: &str,
    operations: &[PendingOperation],
) -> Result<String> {
    let mut body = String::new();

    for (i, operation) in operations.iter().enumerate() {
        body.push_str(&format!("--{boundary}{CRLF}"));
        body.push_str(&format!("Content-Type: application/http{CRLF}"));
        body.push_str(&format!("Content-Transfer-Encoding: binary{CRLF}"));
        body.push_str(&format!("Content-ID: {}{CRLF}{CRLF}", i + 1));

        match operation {
            PendingOperation::Create { entity, payload } => {
                body.push_str(&format!("POST {api_path}/{entity} HTTP/1.1{CRLF}"));
                body.push_str(&format!("Content-Type: application/json; type=entry{CRLF}{CRLF}"));
                body.push_str(&serde_json::to_string(payload)?);
                body.push_str(CRLF);
            }
            PendingOperation::Update { target, payload } => {
                body.push_str(&format!(
                    "PATCH {api_path}{} HTTP/1.1{CRLF}",
                    target.resource_path()
                ));
                body.push_str(&format!("Content-Type: application/json; type=entry{CRLF}{CRLF}"));
                body.push_str(&serde_json::to_string(payload)?);
                body.push_str(CRLF);
            }
            PendingOperation::Delete { target } => {
                body.push_str(&format!(
                    "DELETE {api_path}{} HTTP/1.1{CRLF}{CRLF}",
                    target.resource_path()
                ));
            }
        }
    }

    body.push_str(&format!("--{boundary}--{CRLF}"));
    Ok(body)
}

/// `boundary` parameter of a multipart content type
pub fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').map(str::trim).find_map(|param| {
        param
            .strip_prefix("boundary=")
            .map(|b| b.trim_matches('"'))
            .filter(|b| !b.is_empty())
    })
}

/// Parse a batch response into one outcome per operation
///
/// Parts are matched by `Content-ID` when present and by position
/// otherwise. An operation with no matching part is reported as failed.
///
/// # Errors
///
/// Returns `InvalidResponse` when the content type has no boundary or a
/// part has no HTTP status line.
pub fn parse_batch_response(
    content_type: &str,
    body: &str,
    expected: usize,
) -> Result<Vec<ItemOutcome>> {
    let boundary = boundary_from_content_type(content_type).ok_or_else(|| {
        invalid(format!("Batch response content type has no boundary: {content_type}"))
    })?;
    let delimiter = format!("--{boundary}");

    let mut slots: Vec<Option<ItemOutcome>> = vec![None; expected];
    let mut position = 0usize;

    for raw_part in body.split(delimiter.as_str()).skip(1) {
        if raw_part.starts_with("--") {
            break;
        }
        let part = parse_part(raw_part)?;

        let index = part
            .content_id
            .and_then(|id| id.checked_sub(1))
            .unwrap_or(position);
        position += 1;

        match slots.get_mut(index) {
            Some(slot) => *slot = Some(part.outcome),
            None => tracing::warn!(
                index = index,
                expected = expected,
                "Batch response part does not match any operation"
            ),
        }
    }

    Ok(slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| ItemOutcome::failed("No response part for operation"))
        })
        .collect())
}

struct ParsedPart {
    content_id: Option<usize>,
    outcome: ItemOutcome,
}

fn parse_part(raw: &str) -> Result<ParsedPart> {
    let mut lines = raw.lines();
    let mut content_id = None;

    // MIME headers of the part
    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            if content_id.is_some() {
                break;
            }
            continue;
        }
        if line.starts_with("HTTP/") {
            return finish_part(content_id, line, lines);
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-id") {
                content_id = value.trim().parse().ok();
            }
        }
    }

    let status_line = lines
        .by_ref()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| invalid("Batch response part has no HTTP status line".to_string()))?;
    finish_part(content_id, status_line, lines)
}

fn finish_part<'a>(
    content_id: Option<usize>,
    status_line: &str,
    mut lines: impl Iterator<Item = &'a str>,
) -> Result<ParsedPart> {
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid(format!("Malformed status line in batch part: {status_line}")))?;

    let mut entity_id = None;
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("odata-entityid") {
                entity_id = entity_id_from_uri(value.trim());
            }
        }
    }
    let body: Vec<&str> = lines.collect();
    let body = body.join("\n");

    let outcome = if (200..300).contains(&status) {
        ItemOutcome::Succeeded { created: entity_id }
    } else {
        ItemOutcome::failed(format!("HTTP {status}: {}", error_message(status, &body)))
    };

    Ok(ParsedPart {
        content_id,
        outcome,
    })
}

fn invalid(message: String) -> EngineError {
    EngineError::Store(StoreError::InvalidResponse(message))
}
