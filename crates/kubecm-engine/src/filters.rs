//! Kubernetes-specific template filters
//!
//! These filters extend MiniJinja with the helpers data layers commonly need
//! when building Secrets, ConfigMaps and labels.

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};

fn invalid(err: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidOperation, err.to_string())
}

// Strings as-is, everything else through its display form
fn as_text(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), str::to_string)
}

/// Convert a value to YAML format
///
/// Usage: {{ vars.settings | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value).map_err(invalid)?;
    let yaml = serde_yaml::to_string(&json_value).map_err(invalid)?;

    // Remove trailing newline and leading "---\n" if present
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Convert a value to JSON format
///
/// Usage: {{ vars.auths | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value).map_err(invalid)?;
    serde_json::to_string(&json_value).map_err(invalid)
}

/// Base64 encode a string
///
/// Usage: {{ vars.token | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Base64 decode a string
///
/// Usage: {{ encoded | b64decode }}
pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {}", e)))?;

    String::from_utf8(decoded).map_err(|e| invalid(format!("UTF-8 decode error: {}", e)))
}

/// Quote a string with double quotes
///
/// Usage: {{ name | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let escaped = as_text(&value).replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Quote a string with single quotes
#[must_use]
pub fn squote(value: Value) -> String {
    format!("'{}'", as_text(&value).replace('\'', "''"))
}

/// Indent text with a newline prefix (like Helm's nindent)
///
/// Usage: {{ content | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Indent every non-empty line without a newline prefix
///
/// Usage: {{ content | indent(4) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    let lines: Vec<String> = value
        .lines()
        .map(|line| match line {
            "" => String::new(),
            text => format!("{pad}{text}"),
        })
        .collect();
    lines.join("\n")
}

/// Require a value, fail if undefined or empty
///
/// Usage: {{ vars.registry | required("registry is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    let missing = value.is_undefined()
        || value.is_none()
        || value.as_str().is_some_and(str::is_empty);

    if missing {
        Err(invalid(
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ))
    } else {
        Ok(value)
    }
}

/// SHA256 hash of a string
///
/// Usage: {{ vars.config | sha256 }}
#[must_use]
pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Truncate a string to a maximum number of characters
///
/// Usage: {{ name | trunc(63) }}
#[must_use]
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

/// Trim prefix from a string
///
/// Usage: {{ version | trimprefix("v") }}
#[must_use]
pub fn trimprefix(value: String, prefix: String) -> String {
    value.strip_prefix(&prefix).unwrap_or(&value).to_string()
}

/// Trim suffix from a string
#[must_use]
pub fn trimsuffix(value: String, suffix: String) -> String {
    value.strip_suffix(&suffix).unwrap_or(&value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toyaml() {
        let value = Value::from_serialize(serde_json::json!({"memory": "1Gi", "threads": 4}));
        assert_eq!(toyaml(value).unwrap(), "memory: 1Gi\nthreads: 4");
    }

    #[test]
    fn test_tojson_keeps_key_order() {
        let value = Value::from_serialize(serde_json::json!({
            "auths": {"registry.example.com": {"auth": "fake-token"}}
        }));
        assert_eq!(
            tojson(value).unwrap(),
            r#"{"auths":{"registry.example.com":{"auth":"fake-token"}}}"#
        );
    }

    #[test]
    fn test_b64_roundtrip() {
        let encoded = b64encode("fake-token".to_string());
        assert_eq!(encoded, "ZmFrZS10b2tlbg==");
        assert_eq!(b64decode(encoded).unwrap(), "fake-token");
    }

    #[test]
    fn test_b64decode_invalid() {
        assert!(b64decode("not base64!".to_string()).is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(Value::from("a\"b")), r#""a\"b""#);
        assert_eq!(quote(Value::from(3)), r#""3""#);
        assert_eq!(squote(Value::from("it's")), "'it''s'");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\n\nb".to_string(), 2), "  a\n\n  b");
        assert_eq!(nindent("a".to_string(), 4), "\n    a");
    }

    #[test]
    fn test_required() {
        assert!(required(Value::UNDEFINED, None).is_err());
        assert!(required(Value::from(""), Some("need it".into())).is_err());
        assert_eq!(required(Value::from("x"), None).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_trunc_counts_chars() {
        assert_eq!(trunc("héllo".to_string(), 2), "hé");
        assert_eq!(trunc("abc".to_string(), 10), "abc");
    }

    #[test]
    fn test_trim() {
        assert_eq!(trimprefix("v1.2.3".into(), "v".into()), "1.2.3");
        assert_eq!(trimsuffix("app.yaml".into(), ".yaml".into()), "app");
    }

    #[test]
    fn test_sha256() {
        assert_eq!(
            sha256sum("".to_string()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
