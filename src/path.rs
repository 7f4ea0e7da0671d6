// Dot-path helpers. Column keys like `organization.name` address nested
// fields in rows and nested objects in query payloads.
use serde_json::{Map, Value};

pub fn segments(key: &str) -> Vec<&str> {
    key.split('.').collect()
}

/// Dereference `key` inside `row`. Numeric segments index into arrays.
pub fn lookup<'a>(row: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(row, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Wrap `value` in one object per path segment: `nest("a.b", 1)` is `{"a":{"b":1}}`.
pub fn nest(key: &str, value: Value) -> Value {
    key.rsplit('.').fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}
