//! Shared helpers for reading and writing resource attributes

use hue_api::reply::validate_put_reply;
use hue_api::CommandDispatcher;
use hue_state::ApiCache;
use serde_json::{Map, Value};

use crate::error::Result;

/// PUT `fields` to `path`; `true` when every field was acknowledged
pub(crate) fn put_fields(commands: &CommandDispatcher, path: &str, fields: Map<String, Value>) -> Result<bool> {
    let reply = commands.put(path, &Value::Object(fields.clone()))?;
    Ok(validate_put_reply(path, &fields, &reply)?)
}

/// [`put_fields`], then refresh `cache` so reads see the new values
pub(crate) fn put_and_refresh(
    commands: &CommandDispatcher,
    cache: &ApiCache,
    path: &str,
    fields: Map<String, Value>,
) -> Result<bool> {
    let acknowledged = put_fields(commands, path, fields)?;
    if acknowledged {
        cache.refresh()?;
    }
    Ok(acknowledged)
}

pub(crate) fn single(key: &str, value: Value) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(key.to_string(), value);
    fields
}

pub(crate) fn string_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn bool_at(value: &Value, pointer: &str) -> bool {
    value.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

/// Light ids are reported as strings (`["1", "3"]`)
pub(crate) fn ids_at(value: &Value, pointer: &str) -> Vec<i32> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| match id {
                    Value::String(raw) => raw.parse().ok(),
                    Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn id_strings(ids: &[i32]) -> Value {
    Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_accept_strings_and_numbers() {
        let value = json!({"lights": ["1", 3, "x", null]});
        assert_eq!(ids_at(&value, "/lights"), vec![1, 3]);
        assert!(ids_at(&value, "/missing").is_empty());
        assert_eq!(id_strings(&[1, 3]), json!(["1", "3"]));
    }

    #[test]
    fn test_scalar_lookups_default() {
        let value = json!({"state": {"on": true}, "name": "Hall"});
        assert!(bool_at(&value, "/state/on"));
        assert!(!bool_at(&value, "/state/reachable"));
        assert_eq!(string_at(&value, "/name"), "Hall");
        assert_eq!(string_at(&value, "/type"), "");
    }
}
