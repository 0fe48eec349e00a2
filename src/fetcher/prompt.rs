use crate::identifier::Identifier;

pub fn record_prompt(identifier: &Identifier) -> String {
    let label = identifier.display_label();
    format!(
        r#"Provide a detailed summary of {label} in JSON format. The JSON object MUST contain ALL of the following exact fields. If a value is unavailable, use an empty string for the value.
- itemNumber: "{label}"
- name: string (the official name)
- objectClass: string (e.g., "Safe", "Euclid", "Keter")
- description: string (a detailed description)
- containment: string (containment procedures)
- additionalInfo: string (any additional relevant information, or "" if not found)

Ensure the response is ONLY the JSON object, with no other text, conversational fillers, or markdown outside of the JSON. If {label} does not exist, respond with a JSON object containing only the field "error" with a descriptive string value.
"#
    )
}
