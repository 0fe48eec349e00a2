use serde_json::{Map, Value};

use crate::{
    fetcher::{
        error::{FetchError, domain_error, protocol_error},
        types::{ObjectClass, Record},
    },
    identifier::Identifier,
};

const DEFAULT_NAME: &str = "Designation Unknown";
const DEFAULT_DESCRIPTION: &str = "No description available.";
const DEFAULT_CONTAINMENT: &str = "Containment procedures not found.";

/// Pulls the generated text out of a `generateContent` response body.
pub fn extract_payload_text(body: &str) -> Result<String, FetchError> {
    let envelope: Value = serde_json::from_str(body).map_err(|err| {
        protocol_error(format!(
            "Malformed response envelope from API ({err}). Raw body: {body}"
        ))
    })?;

    envelope
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| protocol_error("Invalid response format from API. No content part found."))
}

/// Turns the generated JSON text into a record, or the service's own error.
pub fn parse_record_payload(text: &str, identifier: &Identifier) -> Result<Record, FetchError> {
    let payload: Value = serde_json::from_str(text).map_err(|_| {
        protocol_error(format!(
            "Failed to parse JSON from API response. Raw content: {text}"
        ))
    })?;

    let Value::Object(fields) = payload else {
        return Err(protocol_error(format!(
            "Failed to parse JSON from API response: expected an object. Raw content: {text}"
        )));
    };

    if let Some(message) = reported_error(&fields) {
        return Err(domain_error(message));
    }

    Ok(Record {
        item_number: field_or(&fields, "itemNumber", || identifier.canonical_label()),
        name: field_or(&fields, "name", || DEFAULT_NAME.to_string()),
        object_class: text_field(&fields, "objectClass")
            .map(|raw| ObjectClass::parse(&raw))
            .unwrap_or(ObjectClass::Unassigned),
        description: field_or(&fields, "description", || DEFAULT_DESCRIPTION.to_string()),
        containment: field_or(&fields, "containment", || DEFAULT_CONTAINMENT.to_string()),
        additional_info: field_or(&fields, "additionalInfo", String::new),
    })
}

fn reported_error(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.is_empty() => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match fields.get(key)? {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn field_or(fields: &Map<String, Value>, key: &str, default: impl FnOnce() -> String) -> String {
    text_field(fields, key).unwrap_or_else(default)
}
