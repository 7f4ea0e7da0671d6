use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flip(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active sort column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, order: SortOrder) -> Self {
        SortSpec {
            key: key.into(),
            order,
        }
    }

    /// Clicking the active column flips its order, any other column starts ascending.
    pub fn toggle(current: Option<&SortSpec>, key: &str) -> SortSpec {
        match current {
            Some(active) if active.key == key => SortSpec::new(key, active.order.flip()),
            _ => SortSpec::new(key, SortOrder::Asc),
        }
    }

    pub fn to_value(&self) -> Value {
        path::nest(&self.key, Value::String(self.order.as_str().to_string()))
    }

    // Follows the first key at every level down to the order string,
    // e.g. {"organization": {"name": "desc"}}
    pub fn from_value(value: &Value) -> Option<SortSpec> {
        let mut segments = Vec::new();
        let mut node = value;
        loop {
            match node {
                Value::Object(map) => {
                    let (key, child) = map.iter().next()?;
                    segments.push(key.as_str());
                    node = child;
                }
                Value::String(order) => {
                    let order = match order.as_str() {
                        "asc" => SortOrder::Asc,
                        "desc" => SortOrder::Desc,
                        _ => return None,
                    };
                    if segments.is_empty() {
                        return None;
                    }
                    return Some(SortSpec::new(segments.join("."), order));
                }
                _ => return None,
            }
        }
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn toggle_flips_same_column() {
        let first = SortSpec::toggle(None, "name");
        assert_eq!(first, SortSpec::new("name", SortOrder::Asc));
        let second = SortSpec::toggle(Some(&first), "name");
        assert_eq!(second.order, SortOrder::Desc);
        let third = SortSpec::toggle(Some(&second), "name");
        assert_eq!(third.order, SortOrder::Asc);
    }

    #[test]
    fn toggle_other_column_starts_ascending() {
        let active = SortSpec::new("name", SortOrder::Desc);
        assert_eq!(
            SortSpec::toggle(Some(&active), "other"),
            SortSpec::new("other", SortOrder::Asc)
        );
    }

    #[test]
    fn nested_sort_value() {
        let spec = SortSpec::new("organization.name", SortOrder::Desc);
        assert_eq!(spec.to_value(), json!({ "organization": { "name": "desc" } }));
        assert_eq!(SortSpec::from_value(&spec.to_value()), Some(spec));
    }

    #[test]
    fn from_value_rejects_garbage() {
        assert_eq!(SortSpec::from_value(&json!({})), None);
        assert_eq!(SortSpec::from_value(&json!("asc")), None);
        assert_eq!(SortSpec::from_value(&json!({ "name": "sideways" })), None);
        assert_eq!(SortSpec::from_value(&json!({ "name": 1 })), None);
    }
}
