//! Field normalization rules per document type.
//!
//! Renames are pop-then-insert: the old key never survives. Date reformatting
//! runs before the rename that would move the field, so every date listed for
//! a document type ends up ISO-8601 UTC (`Z`-suffixed) regardless of the
//! source encoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};

/// PTAB date fields reformatted to ISO-8601 before any rename.
pub const PTAB_DATE_FIELDS: [&str; 6] = [
    "LAST_MODIFIED_TS",
    "PATENT_ISSUE_DT",
    "DECISION_MAILED_DT",
    "PRE_GRANT_PUBLICATION_DT",
    "APPLICANT_PUB_AUTHORIZATION_DT",
    "DOCUMENT_CREATE_DT",
];

/// Normalize the `document-id` mapping of a grant or publication record:
/// reformat `date`, then rename `doc-number` -> `appid` and `date` ->
/// `doc_date`.
pub fn normalize_document_id(doc_id: &mut Map<String, Value>) -> Result<()> {
    reformat_date_field(doc_id, "date")?;
    rename_key(doc_id, "appid", "doc-number")?;
    rename_key(doc_id, "doc_date", "date")?;
    Ok(())
}

/// Normalize one PTAB `DATA_RECORD`: reformat the fixed date field list,
/// then rename `BD_PATENT_APPLICATION_NO` -> `appid` and
/// `DOCUMENT_CREATE_DT` -> `doc_date`.
pub fn normalize_ptab_record(record: &mut Map<String, Value>) -> Result<()> {
    for field in PTAB_DATE_FIELDS {
        reformat_date_field(record, field)?;
    }
    rename_key(record, "appid", "BD_PATENT_APPLICATION_NO")?;
    rename_key(record, "doc_date", "DOCUMENT_CREATE_DT")?;
    Ok(())
}

/// Move `old_key`'s value to `new_key`. A missing source key is a
/// `MissingField` error, never a silent no-op.
pub fn rename_key(map: &mut Map<String, Value>, new_key: &str, old_key: &str) -> Result<()> {
    match map.remove(old_key) {
        Some(value) => {
            map.insert(new_key.to_string(), value);
            Ok(())
        }
        None => Err(PipelineError::MissingField {
            field: old_key.to_string(),
        }),
    }
}

fn reformat_date_field(map: &mut Map<String, Value>, field: &str) -> Result<()> {
    let value = map.get(field).ok_or_else(|| PipelineError::MissingField {
        field: field.to_string(),
    })?;
    let raw = value
        .as_str()
        .ok_or_else(|| PipelineError::MalformedDate {
            field: field.to_string(),
            value: value.to_string(),
        })?;
    let iso = format_date(field, raw)?;
    map.insert(field.to_string(), Value::String(iso));
    Ok(())
}

/// Parse a date or timestamp permissively and render it ISO-8601 UTC with a
/// `Z` suffix (`2016-01-15T00:00:00Z`).
pub fn format_date(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.fZ").to_string());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.format("%Y-%m-%dT%H:%M:%S%.fZ").to_string());
        }
    }

    for fmt in ["%Y%m%d", "%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(format!("{}T00:00:00Z", date.format("%Y-%m-%d")));
        }
    }

    Err(PipelineError::MalformedDate {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_rename_removes_old_key() {
        let mut map = as_map(json!({"doc-number": "12345", "date": "20160115"}));
        rename_key(&mut map, "appid", "doc-number").unwrap();
        assert_eq!(map["appid"], json!("12345"));
        assert!(!map.contains_key("doc-number"));
    }

    #[test]
    fn test_rename_missing_key_is_error() {
        let mut map = as_map(json!({"date": "20160115"}));
        let err = rename_key(&mut map, "appid", "doc-number").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingField { field } if field == "doc-number"
        ));
    }

    #[test]
    fn test_normalize_document_id() {
        let mut doc_id = as_map(json!({"doc-number": "12345", "date": "20160115", "kind": "B2"}));
        normalize_document_id(&mut doc_id).unwrap();
        assert_eq!(doc_id["appid"], json!("12345"));
        assert_eq!(doc_id["doc_date"], json!("2016-01-15T00:00:00Z"));
        assert!(!doc_id.contains_key("doc-number"));
        assert!(!doc_id.contains_key("date"));
        // Untouched siblings survive
        assert_eq!(doc_id["kind"], json!("B2"));
    }

    #[test]
    fn test_format_date_compact() {
        assert_eq!(format_date("date", "20160115").unwrap(), "2016-01-15T00:00:00Z");
    }

    #[test]
    fn test_format_date_dashed() {
        assert_eq!(format_date("date", "2016-01-15").unwrap(), "2016-01-15T00:00:00Z");
    }

    #[test]
    fn test_format_date_timestamp() {
        assert_eq!(
            format_date("LAST_MODIFIED_TS", "2016-03-01 14:22:05").unwrap(),
            "2016-03-01T14:22:05Z"
        );
    }

    #[test]
    fn test_format_date_rfc3339() {
        assert_eq!(
            format_date("ts", "2016-03-01T14:22:05+00:00").unwrap(),
            "2016-03-01T14:22:05Z"
        );
    }

    #[test]
    fn test_format_date_garbage_is_error() {
        let err = format_date("date", "not-a-date").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedDate { .. }));
    }

    #[test]
    fn test_normalize_ptab_record() {
        let mut record = as_map(json!({
            "DOCUMENT_IMAGE_ID": "PTAB000123",
            "BD_PATENT_APPLICATION_NO": "14123456",
            "DOCUMENT_CREATE_DT": "20160301",
            "LAST_MODIFIED_TS": "2016-03-01 09:00:00",
            "PATENT_ISSUE_DT": "20150106",
            "DECISION_MAILED_DT": "20160215",
            "PRE_GRANT_PUBLICATION_DT": "20140501",
            "APPLICANT_PUB_AUTHORIZATION_DT": "20140101",
        }));
        normalize_ptab_record(&mut record).unwrap();
        assert_eq!(record["appid"], json!("14123456"));
        assert_eq!(record["doc_date"], json!("2016-03-01T00:00:00Z"));
        assert_eq!(record["LAST_MODIFIED_TS"], json!("2016-03-01T09:00:00Z"));
        assert!(!record.contains_key("BD_PATENT_APPLICATION_NO"));
        assert!(!record.contains_key("DOCUMENT_CREATE_DT"));
    }

    #[test]
    fn test_normalize_ptab_record_bad_date_is_error() {
        let mut record = as_map(json!({
            "BD_PATENT_APPLICATION_NO": "14123456",
            "DOCUMENT_CREATE_DT": "20160301",
            "LAST_MODIFIED_TS": "yesterday",
            "PATENT_ISSUE_DT": "20150106",
            "DECISION_MAILED_DT": "20160215",
            "PRE_GRANT_PUBLICATION_DT": "20140501",
            "APPLICANT_PUB_AUTHORIZATION_DT": "20140101",
        }));
        let err = normalize_ptab_record(&mut record).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedDate { .. }));
    }
}
