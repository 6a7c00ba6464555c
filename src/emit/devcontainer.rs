//! Devcontainer/Codespaces permission-grant injector (spec.md §6,
//! "Container-config injection").
//!
//! Devcontainer JSON files are conventionally JSONC: `//` and `/* */`
//! comments and trailing commas are both tolerated. None of the crates in
//! the example pack parse JSONC, so this module strips both forms down to
//! strict JSON before handing the text to `serde_json` — a small, exact
//! grammar, not worth a dependency.

use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug)]
pub enum EmitError {
    Parse(String),
    NotAnObject,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::Parse(msg) => write!(f, "could not parse devcontainer JSON: {msg}"),
            EmitError::NotAnObject => write!(f, "devcontainer document root is not a JSON object"),
        }
    }
}

impl std::error::Error for EmitError {}

/// Strip `//`/`/* */` comments and trailing commas from `text`, outside of
/// string literals, producing strict JSON.
fn strip_jsonc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut in_string = false;
    let mut escaped = false;

    while i < bytes.len() {
        let c = bytes[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }

        if c == '/' && bytes.get(i + 1) == Some(&'/') {
            while i < bytes.len() && bytes[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '/' && bytes.get(i + 1) == Some(&'*') {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == '*' && bytes[i + 1] == '/') {
                i += 1;
            }
            i += 2;
            continue;
        }

        out.push(c);
        i += 1;
    }

    strip_trailing_commas(&out)
}

/// Remove a comma that is followed (ignoring whitespace) by `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Parse a JSONC devcontainer document into a mutable [`Value`].
pub fn parse(text: &str) -> Result<Value, EmitError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let stripped = strip_jsonc(text);
    serde_json::from_str(&stripped).map_err(|e| EmitError::Parse(e.to_string()))
}

fn object_mut<'a>(value: &'a mut Value, key: &str) -> Result<&'a mut Map<String, Value>, EmitError> {
    let entry = value
        .as_object_mut()
        .ok_or(EmitError::NotAnObject)?
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    entry.as_object_mut().ok_or(EmitError::NotAnObject)
}

/// Inject a permissions grant for `owner/repo` at
/// `$.customizations.codespaces.repositories["owner/repo"]`. Idempotent:
/// running this twice with the same inputs produces the same document, since
/// the entry is overwritten rather than appended.
pub fn inject(document: &mut Value, owner_repo: &str, permissions: Value) -> Result<(), EmitError> {
    let customizations = object_mut(document, "customizations")?;
    let codespaces = customizations
        .entry("codespaces".to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(EmitError::NotAnObject)?;
    let repositories = codespaces
        .entry("repositories".to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(EmitError::NotAnObject)?;
    repositories.insert(owner_repo.to_string(), permissions);
    Ok(())
}

/// Render `document` back to pretty-printed, strict JSON text.
pub fn render(document: &Value) -> String {
    serde_json::to_string_pretty(document).expect("document is always valid JSON after parse")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_line_and_block_comments() {
        let text = "{\n  // a comment\n  \"a\": 1, /* inline */\n  \"b\": 2\n}\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed["a"], 1);
        assert_eq!(parsed["b"], 2);
    }

    #[test]
    fn strips_trailing_commas() {
        let text = "{\n  \"a\": [1, 2, 3,],\n  \"b\": {\"c\": 1,},\n}\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed["a"][2], 3);
        assert_eq!(parsed["b"]["c"], 1);
    }

    #[test]
    fn comment_markers_inside_strings_are_preserved() {
        let text = r#"{ "url": "https://example.com" }"#;
        let parsed = parse(text).unwrap();
        assert_eq!(parsed["url"], "https://example.com");
    }

    #[test]
    fn injects_permissions_at_expected_path() {
        let mut doc = parse("{}").unwrap();
        inject(&mut doc, "acme/alpha", json!({"permissions": "write-all"})).unwrap();
        assert_eq!(
            doc["customizations"]["codespaces"]["repositories"]["acme/alpha"]["permissions"],
            "write-all"
        );
    }

    #[test]
    fn reinjecting_same_entry_is_idempotent() {
        let mut doc = parse("{}").unwrap();
        inject(&mut doc, "acme/alpha", json!({"permissions": "write-all"})).unwrap();
        let first = render(&doc);
        inject(&mut doc, "acme/alpha", json!({"permissions": "write-all"})).unwrap();
        let second = render(&doc);
        assert_eq!(first, second);
    }
}
