//! Validation of the bridge's reply arrays
//!
//! Write requests are answered with one entry per field:
//!
//! ```text
//! [ {"success": {"/lights/1/state/on": true}}, {"error": {"type": 6, ...}} ]
//! ```

use serde_json::{Map, Value};

use crate::{ApiError, Result};

/// Tolerance used when comparing floating point values such as xy coordinates
pub const FLOAT_TOLERANCE: f64 = 1e-4;

pub fn float_equals(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT_TOLERANCE
}

/// Compare two JSON values, treating numbers with [`FLOAT_TOLERANCE`]
pub fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => float_equals(x, y),
                _ => false,
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_match(a, b))
        }
        _ => a == b,
    }
}

/// Raise the first `error` entry of a reply as [`ApiError::Api`]
///
/// Replies that are not arrays carry no error entries and pass.
pub fn check_error(reply: &Value) -> Result<()> {
    let Some(entries) = reply.as_array() else {
        return Ok(());
    };

    match entries.iter().find_map(|entry| entry.get("error")) {
        Some(error) => Err(ApiError::Api {
            code: error.get("type").and_then(Value::as_i64).unwrap_or(-1),
            address: error
                .get("address")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: error
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        None => Ok(()),
    }
}

/// Look up `[i].success.<key>` in any entry of a reply array
pub fn success_value<'a>(reply: &'a Value, key: &str) -> Option<&'a Value> {
    reply
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("success"))
        .find_map(|success| success.get(key))
}

/// Validate a PUT reply against the request that produced it
///
/// Every top-level key of `request` must be acknowledged by a
/// `{"success": {"<path>/<key>": <value>}}` entry carrying the same value.
/// Error entries are raised; a reply that is not an array is malformed.
pub fn validate_put_reply(path: &str, request: &Map<String, Value>, reply: &Value) -> Result<bool> {
    check_error(reply)?;
    if !reply.is_array() {
        return Err(ApiError::MalformedReply(format!(
            "expected reply array for PUT {path}, got {reply}"
        )));
    }

    let prefix = path.trim_end_matches('/');
    let mut valid = true;
    for (key, expected) in request {
        let address = format!("{prefix}/{key}");
        match success_value(reply, &address) {
            Some(actual) if values_match(actual, expected) => {}
            Some(actual) => {
                tracing::warn!(%address, %expected, %actual, "bridge acknowledged a different value");
                valid = false;
            }
            None => {
                tracing::warn!(%address, "bridge did not acknowledge field");
                valid = false;
            }
        }
    }
    Ok(valid)
}

/// Whether a DELETE reply is `[{"success": "<path> deleted"}]`
pub fn is_deleted(reply: &Value, path: &str) -> bool {
    let expected = format!("{path} deleted");
    reply
        .get(0)
        .and_then(|entry| entry.get("success"))
        .and_then(Value::as_str)
        .is_some_and(|message| message == expected)
}

/// The `[0].success.id` token of a create reply, if present
pub fn created_id(reply: &Value) -> Option<&Value> {
    reply.get(0)?.get("success")?.get("id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn request(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[rstest]
    #[case(json!(1), json!(1), true)]
    #[case(json!(1), json!(2), false)]
    #[case(json!(0.3), json!(0.30004), true)]
    #[case(json!(0.3), json!(0.31), false)]
    #[case(json!([0.1, 0.2]), json!([0.10001, 0.2]), true)]
    #[case(json!([0.1, 0.2]), json!([0.1]), false)]
    #[case(json!("colorloop"), json!("colorloop"), true)]
    #[case(json!(true), json!(1), false)]
    fn test_values_match(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        assert_eq!(values_match(&a, &b), expected);
    }

    #[test]
    fn test_check_error_extracts_fields() {
        let reply = json!([
            {"success": {"/lights/1/state/on": true}},
            {"error": {"type": 201, "address": "/lights/1/state/bri", "description": "parameter, bri, is not modifiable. Device is set to off."}}
        ]);
        match check_error(&reply).unwrap_err() {
            ApiError::Api { code, address, description } => {
                assert_eq!(code, 201);
                assert_eq!(address, "/lights/1/state/bri");
                assert!(description.contains("not modifiable"));
            }
            other => panic!("Expected ApiError::Api, got {other:?}"),
        }
        assert!(check_error(&json!({"lights": {}})).is_ok());
    }

    #[test]
    fn test_validate_put_reply_accepts_full_success() {
        let reply = json!([
            {"success": {"/lights/1/state/bri": 0}},
            {"success": {"/lights/1/state/on": false}}
        ]);
        let req = request(json!({"bri": 0, "on": false}));
        assert!(validate_put_reply("/lights/1/state", &req, &reply).unwrap());
    }

    #[test]
    fn test_validate_put_reply_rejects_missing_or_different_fields() {
        let reply = json!([{"success": {"/lights/1/state/bri": 10}}]);
        let req = request(json!({"bri": 20}));
        assert!(!validate_put_reply("/lights/1/state", &req, &reply).unwrap());

        let req = request(json!({"bri": 10, "on": true}));
        assert!(!validate_put_reply("/lights/1/state", &req, &reply).unwrap());
    }

    #[test]
    fn test_validate_put_reply_rejects_non_array() {
        let req = request(json!({"on": true}));
        let result = validate_put_reply("/lights/1/state", &req, &json!({"on": true}));
        assert!(matches!(result, Err(ApiError::MalformedReply(_))));
    }

    #[test]
    fn test_delete_and_create_replies() {
        assert!(is_deleted(&json!([{"success": "/groups/3 deleted"}]), "/groups/3"));
        assert!(!is_deleted(&json!([{"success": "/groups/4 deleted"}]), "/groups/3"));
        assert!(!is_deleted(&json!([{"error": {"type": 3}}]), "/groups/3"));

        assert_eq!(created_id(&json!([{"success": {"id": "7"}}])), Some(&json!("7")));
        assert_eq!(created_id(&json!([{"success": {}}])), None);
    }
}
