//! Pulls the first well-formed JSON object out of noisy model output.
//!
//! Models wrap structured replies in prose or code fences. `extract_first_json_object`
//! fast-paths a clean whole-string parse, then falls back to scanning for the first
//! `{`, tracking string/escape/brace nesting to find the first balanced region, and
//! requires the result to be a JSON object (not an array or scalar).

use serde_json::Value;

use crate::error::EngineError;

/// Extracts and parses the first JSON object found in `text`.
///
/// Returns `EngineError::JsonNotFound` if no `{` is found, or the braces never
/// balance; `EngineError::JsonParseError` if a balanced region is found but
/// does not parse, or parses to something other than an object.
pub fn extract_first_json_object(text: &str) -> Result<Value, EngineError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Ok(value);
        }
    }

    let bytes = text.as_bytes();
    let start = text.find('{').ok_or(EngineError::JsonNotFound)?;

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;
    let mut end = None;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        let c = b as char;
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + offset + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end.ok_or(EngineError::JsonNotFound)?;
    let candidate = &text[start..end];
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| EngineError::JsonParseError(e.to_string()))?;
    if !value.is_object() {
        return Err(EngineError::JsonParseError(
            "extracted json is not an object".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_object_directly() {
        let v = extract_first_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn recovers_object_surrounded_by_prose() {
        let text = "Sure, here you go:\n```json\n{\"route\": \"answer\"}\n```\nLet me know if that helps.";
        let v = extract_first_json_object(text).unwrap();
        assert_eq!(v["route"], "answer");
    }

    #[test]
    fn handles_braces_inside_strings() {
        let text = r#"noise {"msg": "a { b } c"} trailing"#;
        let v = extract_first_json_object(text).unwrap();
        assert_eq!(v["msg"], "a { b } c");
    }

    #[test]
    fn handles_nested_objects() {
        let text = r#"prefix {"outer": {"inner": 1}} suffix"#;
        let v = extract_first_json_object(text).unwrap();
        assert_eq!(v["outer"]["inner"], 1);
    }

    #[test]
    fn errors_when_no_brace_present() {
        let err = extract_first_json_object("no json here").unwrap_err();
        assert!(matches!(err, EngineError::JsonNotFound));
    }

    #[test]
    fn errors_when_braces_never_balance() {
        let err = extract_first_json_object("{\"a\": 1").unwrap_err();
        assert!(matches!(err, EngineError::JsonNotFound));
    }

    #[test]
    fn errors_when_extracted_region_is_not_an_object() {
        let err = extract_first_json_object("prefix [1, 2, 3] suffix").unwrap_err();
        assert!(matches!(err, EngineError::JsonNotFound));
    }
}
