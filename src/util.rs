//! Small utility helpers used across modules.

use serde_json::Value;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = tpl.to_string();
    for (k, v) in pairs {
        let needle = format!("{{{}}}", k);
        out = out.replace(&needle, v);
    }
    out
}

/// Outcome of best-effort JSON extraction from free-form model text.
/// Model output is not trusted to be pure JSON, so extraction failures are
/// a value, not a panic or a raw serde error crossing module boundaries.
#[derive(Debug)]
pub enum JsonExtraction {
    Parsed(Value),
    Failed(String),
}

/// Extract and parse the first balanced `{...}` span from free-form text.
///
/// The scanner is aware of string literals and escapes, so braces inside
/// JSON strings don't confuse the depth counter. Returns `Failed` with the
/// raw input when no balanced object exists or the span doesn't parse.
pub fn extract_json_object(text: &str) -> JsonExtraction {
    // Fast path: the whole payload is already valid JSON.
    if let Ok(v) = serde_json::from_str::<Value>(text.trim()) {
        if v.is_object() {
            return JsonExtraction::Parsed(v);
        }
    }

    let bytes = text.as_bytes();
    let start = match bytes.iter().position(|&b| b == b'{') {
        Some(i) => i,
        None => return JsonExtraction::Failed(text.to_string()),
    };

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
                depth -= 1;
                if depth == 0 {
                    let span = &text[start..=i];
                    return match serde_json::from_str::<Value>(span) {
                        Ok(v) => JsonExtraction::Parsed(v),
                        Err(_) => JsonExtraction::Failed(text.to_string()),
                    };
                }
            }
            _ => {}
        }
    }

    // Ran out of input with unbalanced braces.
    JsonExtraction::Failed(text.to_string())
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
///
/// The cut is backed off to a char boundary: the input is often raw model
/// output, and slicing through a multibyte character would panic.
pub fn trunc_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_template_replaces_all_keys() {
        let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y and x");
    }

    #[test]
    fn extracts_object_wrapped_in_prose() {
        let text = "Sure! Here is your course:\n```json\n{\"name\": \"Rust\"}\n```\nEnjoy.";
        match extract_json_object(text) {
            JsonExtraction::Parsed(v) => assert_eq!(v["name"], "Rust"),
            JsonExtraction::Failed(raw) => panic!("should have parsed: {raw}"),
        }
    }

    #[test]
    fn extracts_nested_object() {
        let text = "prefix {\"course\": {\"chapters\": [{\"n\": 1}]}} suffix";
        match extract_json_object(text) {
            JsonExtraction::Parsed(v) => assert_eq!(v["course"]["chapters"][0]["n"], 1),
            JsonExtraction::Failed(raw) => panic!("should have parsed: {raw}"),
        }
    }

    #[test]
    fn braces_inside_strings_do_not_break_balance() {
        let text = "{\"theory\": \"use {braces} like } this\", \"ok\": true}";
        match extract_json_object(text) {
            JsonExtraction::Parsed(v) => assert_eq!(v["ok"], true),
            JsonExtraction::Failed(raw) => panic!("should have parsed: {raw}"),
        }
    }

    #[test]
    fn unbalanced_input_fails_with_raw_text() {
        let text = "model said: {\"name\": \"oops\"";
        match extract_json_object(text) {
            JsonExtraction::Parsed(_) => panic!("should not parse"),
            JsonExtraction::Failed(raw) => assert!(raw.contains("oops")),
        }
    }

    #[test]
    fn truncation_backs_off_to_a_char_boundary() {
        // 'é' occupies bytes 199..201, straddling the cut point.
        let text = format!("{}é and more prose", "a".repeat(199));
        let out = trunc_for_log(&text, 200);
        assert!(out.starts_with(&"a".repeat(199)));
        assert!(out.contains("bytes total"));

        // A short string passes through untouched.
        assert_eq!(trunc_for_log("héllo", 200), "héllo");
    }

    #[test]
    fn no_object_at_all_fails() {
        assert!(matches!(
            extract_json_object("just words"),
            JsonExtraction::Failed(_)
        ));
    }
}
