//! Argument extraction. Every failure here is a validation error raised
//! before any request is built.

use {
    meetbridge_api::PageRequest,
    meetbridge_common::{Error, ErrorKind, Result},
    serde::de::DeserializeOwned,
    serde_json::Value,
};

pub(crate) fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Validation, message)
}

pub(crate) fn operation(params: &Value) -> Result<&str> {
    params
        .get("operation")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("missing 'operation' argument"))
}

pub(crate) fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(invalid(format!("'{key}' must not be empty"))),
        Some(_) => Err(invalid(format!("'{key}' must be a string"))),
        None => Err(invalid(format!("missing '{key}' argument"))),
    }
}

pub(crate) fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(format!("'{key}' must be a string"))),
    }
}

pub(crate) fn optional_u32(params: &Value, key: &str) -> Result<Option<u32>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(format!("'{key}' must be a non-negative integer"))),
    }
}

/// Deserialize the whole argument object into `T`.
pub(crate) fn parse<T: DeserializeOwned>(params: &Value) -> Result<T> {
    serde_json::from_value(params.clone()).map_err(|e| invalid(format!("invalid arguments: {e}")))
}

pub(crate) fn page(params: &Value) -> Result<PageRequest> {
    Ok(PageRequest {
        page_size: optional_u32(params, "pageSize")?,
        page_token: optional_str(params, "pageToken")?.map(ToString::to_string),
    })
}

/// Classify a gateway failure, keeping it as the source for debug output.
pub(crate) fn api_error(err: meetbridge_api::Error) -> Error {
    Error::classify(&err).with_source(err)
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::message(format!("failed to encode result: {e}")))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    #[rstest]
    #[case::missing(json!({}), "missing 'name' argument")]
    #[case::empty(json!({"name": "  "}), "'name' must not be empty")]
    #[case::wrong_type(json!({"name": 4}), "'name' must be a string")]
    fn required_string_errors(#[case] params: Value, #[case] expected: &str) {
        let err = required_str(&params, "name").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, expected);
    }

    #[test]
    fn page_arguments() {
        let page = page(&json!({"pageSize": 10, "pageToken": "t"})).unwrap();
        assert_eq!(page.page_size, Some(10));
        assert_eq!(page.page_token.as_deref(), Some("t"));
        assert!(super::page(&json!({"pageSize": -1})).is_err());
        assert!(super::page(&json!({"pageSize": "ten"})).is_err());
    }

    #[test]
    fn operation_is_required() {
        assert!(operation(&json!({})).is_err());
        assert_eq!(operation(&json!({"operation": "get_space"})).unwrap(), "get_space");
    }
}
