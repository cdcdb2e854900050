use crate::error::{AutofillError, Result};
use crate::oracle::MappingRequest;

pub const SYSTEM_PROMPT: &str = "You are a form field mapping assistant. Analyze HTML forms and map fields to profile keys. Return only valid JSON.";

/// Build the user prompt for a mapping request.
pub fn build_mapping_prompt(request: &MappingRequest) -> Result<String> {
    let fields_json = serde_json::to_string_pretty(&request.fields)
        .map_err(|e| AutofillError::json("serializing field descriptors", e))?;

    Ok(format!(
        r#"Analyze these form input fields and map them to profile keys.

Available profile keys: {keys}

Form Fields (JSON):
{fields}

Instructions:
1. Each field has an 'index' number, use this if no id or name is available
2. Map form input fields to the most appropriate profile key based on field attributes (name, id, placeholder, label, aria-label, etc.)
3. Use field identifiers in this priority: id > name > index
4. Return ONLY a raw JSON object - no markdown, no code blocks, no explanation
5. Format: {{"id:fieldId": "profile_key"}} or {{"name:fieldName": "profile_key"}} or {{"index:0": "profile_key"}}
6. Skip fields that don't match any profile key

Example output:
{{
  "id:passport_number": "passport_num",
  "name:firstName": "first_name",
  "name:email": "email",
  "index:2": "phone"
}}

Return the JSON mapping now:"#,
        keys = request.profile_keys.join(", "),
        fields = fields_json,
    ))
}
