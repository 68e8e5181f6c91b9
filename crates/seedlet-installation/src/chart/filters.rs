//! Filters available to chart templates
//!
//! Chart authors coming from Helm expect a handful of helpers:
//! - `to_yaml`: Serialize a value as a YAML document body
//! - `b64enc` / `b64dec`: Base64 encode and decode strings
//! - `quote`: Wrap a value in double quotes
//! - `required(msg)`: Fail the render if a value is missing

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{Environment, Error, ErrorKind, Value};

/// Register all chart filters on `env`
pub(crate) fn register(env: &mut Environment<'_>) {
    env.add_filter("to_yaml", to_yaml);
    env.add_filter("b64enc", b64enc);
    env.add_filter("b64dec", b64dec);
    env.add_filter("quote", quote);
    env.add_filter("required", required);
}

/// Usage: `{{ Values.resources | to_yaml | indent(10) }}`
fn to_yaml(value: Value) -> Result<String, Error> {
    let yaml = serde_yaml::to_string(&value).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot serialize value as YAML: {e}"),
        )
    })?;
    Ok(yaml.trim_end().to_string())
}

/// Usage: `{{ Values.password | b64enc }}`
fn b64enc(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Usage: `{{ Values.encoded | b64dec }}`
fn b64dec(value: &str) -> Result<String, Error> {
    let bytes = STANDARD.decode(value).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("base64 decode error: {e}"),
        )
    })?;
    String::from_utf8(bytes).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("base64 decode produced invalid UTF-8: {e}"),
        )
    })
}

/// Usage: `{{ Values.region | quote }}`
fn quote(value: Value) -> String {
    if value.is_undefined() || value.is_none() {
        return "\"\"".to_string();
    }
    format!("{:?}", value.to_string())
}

/// Usage: `{{ Values.clusterName | required("clusterName is required") }}`
fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        Err(Error::new(
            ErrorKind::UndefinedError,
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip() {
        assert_eq!(b64enc("hello"), "aGVsbG8=");
        assert_eq!(b64dec("aGVsbG8=").expect("decode"), "hello");
        assert!(b64dec("%%%").is_err());
    }

    #[test]
    fn quote_escapes_and_handles_missing() {
        assert_eq!(quote(Value::from("eu-west-1")), "\"eu-west-1\"");
        assert_eq!(quote(Value::from("a\"b")), "\"a\\\"b\"");
        assert_eq!(quote(Value::UNDEFINED), "\"\"");
        assert_eq!(quote(Value::from(3)), "\"3\"");
    }

    #[test]
    fn required_fails_on_missing_values() {
        assert!(required(Value::from("x"), None).is_ok());
        let err = required(Value::UNDEFINED, Some("region is required".to_string())).unwrap_err();
        assert!(err.to_string().contains("region is required"));
        assert!(required(Value::from(()), None).is_err());
    }

    #[test]
    fn to_yaml_renders_mappings() {
        let value = Value::from_serialize(serde_json::json!({ "cpu": "100m" }));
        assert_eq!(to_yaml(value).expect("yaml"), "cpu: 100m");
    }
}
