use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::column::{ColumnDescriptor, DataType};
use crate::domain::GridError;
use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Equals,
    Contains,
    StartsWith,
    Gte,
    Gt,
    Lt,
    Lte,
    In,
}

const TEXT_CONDITIONS: &[Condition] = &[Condition::Equals, Condition::Contains, Condition::StartsWith];
const NUMBER_CONDITIONS: &[Condition] = &[
    Condition::Equals,
    Condition::Gte,
    Condition::Gt,
    Condition::Lt,
    Condition::Lte,
];
const DATE_CONDITIONS: &[Condition] = &[Condition::Equals, Condition::Gt, Condition::Lt];
const SET_CONDITIONS: &[Condition] = &[Condition::In];

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::Contains => "contains",
            Condition::StartsWith => "startsWith",
            Condition::Gte => "gte",
            Condition::Gt => "gt",
            Condition::Lt => "lt",
            Condition::Lte => "lte",
            Condition::In => "in",
        }
    }

    /// Conditions a user may pick for a column of the given type.
    pub fn legal_for(data_type: DataType) -> &'static [Condition] {
        match data_type {
            DataType::Text => TEXT_CONDITIONS,
            DataType::Number => NUMBER_CONDITIONS,
            DataType::Date => DATE_CONDITIONS,
            DataType::Set => SET_CONDITIONS,
        }
    }

    pub fn is_legal_for(self, data_type: DataType) -> bool {
        Condition::legal_for(data_type).contains(&self)
    }

    pub fn default_for(data_type: DataType) -> Condition {
        match data_type {
            DataType::Set => Condition::In,
            _ => Condition::Equals,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let condition = match s {
            "equals" | "=" => Condition::Equals,
            "contains" => Condition::Contains,
            "startsWith" => Condition::StartsWith,
            "gte" | ">=" | "≥" => Condition::Gte,
            "gt" | ">" => Condition::Gt,
            "lt" | "<" => Condition::Lt,
            "lte" | "<=" | "≤" => Condition::Lte,
            "in" => Condition::In,
            other => {
                return Err(GridError::invalid_argument(
                    "condition",
                    format!("unknown condition '{other}'"),
                ));
            }
        };
        Ok(condition)
    }
}

/// Raw user input for one filter field, before coercion to the column type.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Empty values mean "no constraint" and never reach the compiled filter.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Number(n) => n.is_nan(),
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value as f64)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Number(f64::from(value))
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        FilterValue::List(value)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(value: Vec<&str>) -> Self {
        FilterValue::List(value.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterEntry {
    pub condition: Condition,
    pub value: Option<FilterValue>,
}

impl FilterEntry {
    pub fn is_active(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    Default,
    Insensitive,
}

impl CaseSensitivity {
    fn as_str(&self) -> &'static str {
        match self {
            CaseSensitivity::Default => "default",
            CaseSensitivity::Insensitive => "insensitive",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterLeaf {
    pub condition: Condition,
    pub value: Value,
    pub mode: Option<CaseSensitivity>,
}

impl FilterLeaf {
    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.condition.as_str().to_string(), self.value.clone());
        if let Some(mode) = self.mode {
            map.insert("mode".to_string(), Value::String(mode.as_str().to_string()));
        }
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Branch(BTreeMap<String, FilterNode>),
    Leaf(FilterLeaf),
}

impl FilterNode {
    fn to_value(&self) -> Value {
        match self {
            FilterNode::Branch(children) => branch_to_value(children),
            FilterNode::Leaf(leaf) => leaf.to_value(),
        }
    }
}

fn branch_to_value(children: &BTreeMap<String, FilterNode>) -> Value {
    Value::Object(
        children
            .iter()
            .map(|(k, node)| (k.clone(), node.to_value()))
            .collect(),
    )
}

// Returns a new branch with `leaf` placed at `path`. A leaf sitting where a
// branch is needed (or the other way round) is replaced.
fn insert_at(
    mut branch: BTreeMap<String, FilterNode>,
    segments: &[&str],
    leaf: FilterLeaf,
) -> BTreeMap<String, FilterNode> {
    match segments {
        [] => branch,
        [last] => {
            if let Some(FilterNode::Branch(_)) =
                branch.insert(last.to_string(), FilterNode::Leaf(leaf))
            {
                warn!("Filter on '{last}' replaced nested filters below it");
            }
            branch
        }
        [head, rest @ ..] => {
            let child = match branch.remove(*head) {
                Some(FilterNode::Branch(child)) => child,
                Some(FilterNode::Leaf(_)) => {
                    warn!("Nested filter below '{head}' replaced its filter");
                    BTreeMap::new()
                }
                None => BTreeMap::new(),
            };
            branch.insert(head.to_string(), FilterNode::Branch(insert_at(child, rest, leaf)));
            branch
        }
    }
}

/// Nested condition tree mirroring the dot paths of the filtered columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    root: BTreeMap<String, FilterNode>,
}

impl CompiledFilter {
    pub fn empty() -> Self {
        CompiledFilter::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn with_leaf(self, key: &str, leaf: FilterLeaf) -> Self {
        CompiledFilter {
            root: insert_at(self.root, &path::segments(key), leaf),
        }
    }

    pub fn leaf(&self, key: &str) -> Option<&FilterLeaf> {
        let segments = path::segments(key);
        let (last, parents) = segments.split_last()?;
        let mut branch = &self.root;
        for segment in parents {
            match branch.get(*segment)? {
                FilterNode::Branch(child) => branch = child,
                FilterNode::Leaf(_) => return None,
            }
        }
        match branch.get(*last)? {
            FilterNode::Leaf(leaf) => Some(leaf),
            FilterNode::Branch(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        branch_to_value(&self.root)
    }
}

impl Serialize for CompiledFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[derive(Debug, Clone)]
struct ColumnSchema {
    data_type: DataType,
    options: Vec<String>,
}

/// Result of compiling the current entries. Rejected entries are left out of
/// `filter` and reported for the host to surface.
#[derive(Debug, Default)]
pub struct Compiled {
    pub filter: CompiledFilter,
    pub rejected: Vec<GridError>,
}

/// Per-column filter state plus the type schema used to validate it.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    schema: BTreeMap<String, ColumnSchema>,
    entries: BTreeMap<String, FilterEntry>,
}

impl FilterBuilder {
    pub fn new(columns: &[ColumnDescriptor]) -> Result<Self, GridError> {
        let mut builder = FilterBuilder::default();
        builder.set_schema(columns)?;
        Ok(builder)
    }

    /// Rebuild the schema from the filterable columns. Existing entries are
    /// kept; entries whose column disappeared are rejected at compile time.
    pub fn set_schema(&mut self, columns: &[ColumnDescriptor]) -> Result<(), GridError> {
        let mut schema = BTreeMap::new();
        for column in columns.iter().filter(|c| c.filterable) {
            column.validate()?;
            schema.entry(column.key.clone()).or_insert_with(|| ColumnSchema {
                data_type: column.data_type,
                options: column.options.iter().map(|o| o.value.clone()).collect(),
            });
        }
        trace!("Filter schema has {} columns", schema.len());
        self.schema = schema;
        Ok(())
    }

    pub fn data_type(&self, key: &str) -> Option<DataType> {
        self.schema.get(key).map(|s| s.data_type)
    }

    /// Insert or replace the entry for `key`. Set columns always filter with `in`.
    pub fn set_column_filter(&mut self, key: &str, condition: Condition, value: Option<FilterValue>) {
        let condition = match self.data_type(key) {
            Some(DataType::Set) => Condition::In,
            _ => condition,
        };
        trace!("Filter entry {key} {condition} {value:?}");
        self.entries
            .insert(key.to_string(), FilterEntry { condition, value });
    }

    pub fn entry(&self, key: &str) -> Option<&FilterEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FilterEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Number of entries that will take part in the compiled filter.
    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_active()).count()
    }

    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn compile(&self) -> Compiled {
        let mut compiled = Compiled::default();
        for (key, entry) in &self.entries {
            let Some(value) = entry.value.as_ref().filter(|v| !v.is_empty()) else {
                continue;
            };
            match self.compile_entry(key, entry.condition, value) {
                Ok(leaf) => {
                    compiled.filter = std::mem::take(&mut compiled.filter).with_leaf(key, leaf);
                }
                Err(e) => {
                    debug!("{e}");
                    compiled.rejected.push(e);
                }
            }
        }
        compiled
    }

    fn compile_entry(
        &self,
        key: &str,
        condition: Condition,
        value: &FilterValue,
    ) -> Result<FilterLeaf, GridError> {
        let schema = self
            .schema
            .get(key)
            .ok_or_else(|| GridError::mismatch(key, "no filterable column with this key"))?;
        let condition = if schema.data_type == DataType::Set {
            Condition::In
        } else {
            condition
        };
        if !condition.is_legal_for(schema.data_type) {
            return Err(GridError::mismatch(
                key,
                format!("'{condition}' does not apply to {} columns", schema.data_type),
            ));
        }

        let value = coerce(key, schema, value)?;
        let mode = match schema.data_type {
            DataType::Text => Some(CaseSensitivity::Insensitive),
            _ => None,
        };
        Ok(FilterLeaf {
            condition,
            value,
            mode,
        })
    }
}

fn number_value(n: f64) -> Option<Value> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Some(Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(Value::Number)
    }
}

fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn coerce(key: &str, schema: &ColumnSchema, value: &FilterValue) -> Result<Value, GridError> {
    let data_type = schema.data_type;
    match (data_type, value) {
        (DataType::Text, FilterValue::Text(s)) => Ok(Value::String(s.clone())),
        (DataType::Text, FilterValue::Number(n)) => number_value(*n)
            .map(|v| Value::String(v.to_string()))
            .ok_or_else(|| GridError::mismatch(key, "not a finite number")),

        (DataType::Number, FilterValue::Number(n)) => {
            number_value(*n).ok_or_else(|| GridError::mismatch(key, "not a finite number"))
        }
        (DataType::Number, FilterValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(number_value)
            .ok_or_else(|| GridError::mismatch(key, format!("'{s}' is not a number"))),

        (DataType::Date, FilterValue::Text(s)) => parse_date(s)
            .map(Value::String)
            .ok_or_else(|| GridError::mismatch(key, format!("'{s}' is not a date"))),

        (DataType::Set, FilterValue::List(items)) => {
            if let Some(unknown) = items.iter().find(|i| !schema.options.contains(i)) {
                return Err(GridError::mismatch(
                    key,
                    format!("'{unknown}' is not one of the column options"),
                ));
            }
            Ok(Value::from(items.clone()))
        }
        (DataType::Set, FilterValue::Text(s)) => {
            coerce(key, schema, &FilterValue::List(vec![s.clone()]))
        }

        (data_type, value) => Err(GridError::mismatch(
            key,
            format!("{value:?} does not fit a {data_type} column"),
        )),
    }
}
