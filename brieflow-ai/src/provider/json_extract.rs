//! JSON object extraction from free-form provider output
//!
//! Providers often wrap their JSON in prose or markdown code fences. The
//! extractor returns the first balanced `{...}` substring that parses as a
//! JSON object. Braces inside string literals (including escaped quotes)
//! do not count toward the balance.

/// Return the first balanced JSON object embedded in `text`
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(bytes, start) {
            let candidate = &text[start..=end];
            if matches!(
                serde_json::from_str::<serde_json::Value>(candidate),
                Ok(serde_json::Value::Object(_))
            ) {
                return Some(candidate);
            }
        }
        search_from = start + 1;
    }

    None
}

/// Index of the `}` closing the object opened at `start`
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let text = "Here is the analysis:\n{\"intent\": {\"type\": \"video\"}}\nLet me know!";
        assert_eq!(
            extract_json_object(text),
            Some("{\"intent\": {\"type\": \"video\"}}")
        );
    }

    #[test]
    fn test_code_fence() {
        let text = "```json\n{\"ok\": true}\n```";
        assert_eq!(extract_json_object(text), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"note": "use {curly} and \"quoted }\" text", "n": 2} trailing }"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"note": "use {curly} and \"quoted }\" text", "n": 2}"#)
        );
    }

    #[test]
    fn test_skips_non_json_brace_group() {
        let text = "Template {placeholder} then {\"real\": 1}";
        assert_eq!(extract_json_object(text), Some("{\"real\": 1}"));
    }

    #[test]
    fn test_first_object_wins() {
        let text = "{\"first\": 1} {\"second\": 2}";
        assert_eq!(extract_json_object(text), Some("{\"first\": 1}"));
    }

    #[test]
    fn test_unbalanced_or_missing() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"open\": 1"), None);
        assert_eq!(extract_json_object(""), None);
    }
}
