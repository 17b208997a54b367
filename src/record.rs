use serde_json::{Map, Value};

/// Value logged for a key that was not followed by a value.
pub const MISSING_VALUE: &str = "(MISSING)";

/// Key used when a `null` is passed in a key position.
pub const NULL_KEY: &str = "NULL";

/// Turns a value in a key position into the string used as the JSON key.
pub(crate) fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(key) => key.clone(),
        Value::Null => NULL_KEY.to_owned(),
        other => other.to_string(),
    }
}

/// Collects alternating keys and values into a map.
///
/// A trailing key without a value gets [`MISSING_VALUE`]. When a key repeats, the later value
/// wins.
pub(crate) fn collect_pairs(keyvals: &[Value]) -> Map<String, Value> {
    let mut fields = Map::new();
    for pair in keyvals.chunks(2) {
        let key = key_to_string(&pair[0]);
        let value = pair
            .get(1)
            .cloned()
            .unwrap_or_else(|| Value::from(MISSING_VALUE));
        fields.insert(key, value);
    }
    fields
}
