//! Wire models and field conventions of the record store's Web API

use crate::domain::{EngineError, EntityName, Payload, Record, RecordId, RecordRef, Result, StoreError};
use serde::Deserialize;
use serde_json::Value;

/// Annotation carrying the "more records" flag
pub const MORE_RECORDS_ANNOTATION: &str = "@Microsoft.Dynamics.CRM.morerecords";

/// Annotation carrying the raw paging cookie
pub const PAGING_COOKIE_ANNOTATION: &str = "@Microsoft.Dynamics.CRM.fetchxmlpagingcookie";

/// `Prefer` header value asking the store to include paging annotations
pub const PAGE_METADATA_PREFERENCE: &str = "odata.include-annotations=\"Microsoft.Dynamics.CRM.fetchxmlpagingcookie,Microsoft.Dynamics.CRM.morerecords\"";

/// Body of a paged query response
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    /// Records on the page
    #[serde(default)]
    pub value: Vec<Payload>,

    /// Whether more pages follow
    #[serde(rename = "@Microsoft.Dynamics.CRM.morerecords", default)]
    pub more_records: bool,

    /// Encoded cursor for the next page
    #[serde(rename = "@Microsoft.Dynamics.CRM.fetchxmlpagingcookie", default)]
    pub paging_cookie: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Human-readable message from an error response body
///
/// Uses the OData `error.message` (with its code) when the body has one,
/// otherwise the trimmed body, otherwise the status text.
pub fn error_message(status: u16, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return match envelope.error.code {
            Some(code) if !code.is_empty() => format!("{} ({code})", envelope.error.message),
            _ => envelope.error.message,
        };
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}

/// Turn response rows into records keyed by `id_field`
///
/// # Errors
///
/// Returns `InvalidResponse` if a row lacks a readable identifier.
pub fn records_from_rows(entity: &EntityName, id_field: &str, rows: Vec<Payload>) -> Result<Vec<Record>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, fields)| {
            let id = fields
                .get(id_field)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<RecordId>().ok())
                .ok_or_else(|| {
                    EngineError::Store(StoreError::InvalidResponse(format!(
                        "Row {i} of {entity} has no valid '{id_field}'"
                    )))
                })?;
            Ok(Record::new(entity.clone(), id, fields))
        })
        .collect()
}

/// Identifier at the end of an entity URI such as `.../notes(5f0c...)`
pub fn entity_id_from_uri(uri: &str) -> Option<RecordId> {
    let open = uri.rfind('(')?;
    let close = uri[open..].find(')')? + open;
    uri[open + 1..close].parse().ok()
}

/// Key under which a lookup's target id is returned on read
pub fn lookup_value_key(lookup: &str) -> String {
    format!("_{lookup}_value")
}

/// Point a lookup at `target` in a create or update payload
pub fn bind_lookup(payload: &mut Payload, lookup: &str, target: &RecordRef) {
    payload.insert(
        format!("{lookup}@odata.bind"),
        Value::String(target.resource_path()),
    );
}

/// Copyable fields of a record read from the store
///
/// Drops the primary key, the configured excluded fields, read-only lookup
/// values (`_x_value`) and annotations (anything containing `@`).
pub fn copyable_fields(record: &Record, id_field: &str, excluded: &[String]) -> Payload {
    record
        .fields
        .iter()
        .filter(|(key, value)| {
            key.as_str() != id_field
                && !excluded.iter().any(|e| e == *key)
                && !key.starts_with('_')
                && !key.contains('@')
                && !value.is_null()
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity() -> EntityName {
        EntityName::new("questions").unwrap()
    }

    #[test]
    fn test_query_response_annotations() {
        let body = json!({
            "value": [{"questionid": "0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001"}],
            "@Microsoft.Dynamics.CRM.morerecords": true,
            "@Microsoft.Dynamics.CRM.fetchxmlpagingcookie": "<cookie pagenumber=\"2\" />"
        });
        let response: QueryResponse = serde_json::from_value(body).unwrap();
        assert!(response.more_records);
        assert_eq!(response.value.len(), 1);
        assert!(response.paging_cookie.unwrap().contains("pagenumber"));
    }

    #[test]
    fn test_query_response_defaults() {
        let response: QueryResponse = serde_json::from_str("{\"value\": []}").unwrap();
        assert!(!response.more_records);
        assert!(response.paging_cookie.is_none());
    }

    #[test]
    fn test_records_from_rows() {
        let rows = vec![json!({"questionid": "0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001", "text": "Q1"})
            .as_object()
            .unwrap()
            .clone()];
        let records = records_from_rows(&entity(), "questionid", rows).unwrap();
        assert_eq!(records[0].get_str("text"), Some("Q1"));
    }

    #[test]
    fn test_records_from_rows_missing_id() {
        let rows = vec![json!({"text": "Q1"}).as_object().unwrap().clone()];
        let err = records_from_rows(&entity(), "questionid", rows).unwrap_err();
        assert!(err.to_string().contains("questionid"));
    }

    #[test]
    fn test_entity_id_from_uri() {
        let id = entity_id_from_uri(
            "https://org.example.com/api/data/v9.2/notes(0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001)",
        )
        .unwrap();
        assert_eq!(id.to_string(), "0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001");
        assert!(entity_id_from_uri("https://org.example.com/api/data/v9.2/notes").is_none());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"code":"0x80040237","message":"Duplicate record"}}"#;
        assert_eq!(error_message(412, body), "Duplicate record (0x80040237)");
        assert_eq!(error_message(502, ""), "HTTP 502");
        assert_eq!(error_message(500, " upstream down "), "upstream down");
    }

    #[test]
    fn test_bind_lookup_and_value_key() {
        let target = RecordRef::new(
            EntityName::new("questionnaire_sections").unwrap(),
            "0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001".parse().unwrap(),
        );
        let mut payload = Payload::new();
        bind_lookup(&mut payload, "section", &target);
        assert_eq!(
            payload["section@odata.bind"],
            json!("/questionnaire_sections(0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001)")
        );
        assert_eq!(lookup_value_key("section"), "_section_value");
    }

    #[test]
    fn test_copyable_fields() {
        let fields = json!({
            "questionid": "0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001",
            "text": "How many staff?",
            "createdon": "2024-01-01T00:00:00Z",
            "_section_value": "0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c002",
            "@odata.etag": "W/\"123\"",
            "hint": null
        });
        let record = Record::new(
            entity(),
            "0b6f4c52-1a55-4f0e-8a39-5d0c1ab0c001".parse().unwrap(),
            fields.as_object().unwrap().clone(),
        );

        let copied = copyable_fields(&record, "questionid", &["createdon".to_string()]);
        assert_eq!(copied.len(), 1);
        assert_eq!(copied["text"], json!("How many staff?"));
    }
}
