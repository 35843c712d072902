use crate::models::{Record, DOIS_FIELD};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// Crossref's recommended pattern for modern DOIs.
static DOI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+[/A-Z0-9]").unwrap());

pub fn extract_dois(text: &str) -> Vec<String> {
    DOI_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Attaches the DOIs found in a forum row's text.
///
/// Posts (`Body`) are always kept. Comments (`Text`) are only worth loading
/// when they cite something, so a comment without a DOI returns `None`. Rows
/// with neither field pass through untouched.
pub fn enrich_row(mut record: Record) -> Option<Record> {
    let source_field = if record.contains_key("Body") {
        "Body"
    } else if record.contains_key("Text") {
        "Text"
    } else {
        return Some(record);
    };

    let dois = record
        .get(source_field)
        .and_then(Value::as_str)
        .map(extract_dois)
        .unwrap_or_default();

    if source_field == "Text" && dois.is_empty() {
        return None;
    }

    record.insert(
        DOIS_FIELD.to_string(),
        Value::Array(dois.into_iter().map(Value::String).collect()),
    );
    Some(record)
}
