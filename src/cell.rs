// Text rendering of cell values. Hosts can override per column through
// `ColumnDescriptor::render`; otherwise the data type picks a renderer.
use std::sync::Arc;

use serde_json::Value;

use crate::column::{ColumnDescriptor, ColumnOption, DataType};
use crate::path;

pub const EMPTY_CELL: &str = "-";

pub trait CellRenderer: Send + Sync {
    /// `value` is `None` when the row has nothing at the column's path.
    fn render(&self, value: Option<&Value>) -> String;
}

fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullableCell;

impl CellRenderer for NullableCell {
    fn render(&self, value: Option<&Value>) -> String {
        value
            .and_then(plain_text)
            .unwrap_or_else(|| EMPTY_CELL.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TruncatedCell {
    pub max_chars: usize,
}

impl CellRenderer for TruncatedCell {
    fn render(&self, value: Option<&Value>) -> String {
        let text = NullableCell.render(value);
        if text.chars().count() <= self.max_chars {
            return text;
        }
        let mut truncated: String = text.chars().take(self.max_chars.saturating_sub(1)).collect();
        truncated.push('…');
        truncated
    }
}

/// Comma separated strings shown as a trimmed list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaListCell;

impl CellRenderer for CommaListCell {
    fn render(&self, value: Option<&Value>) -> String {
        match value {
            Some(Value::String(s)) if !s.trim().is_empty() => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .filter_map(plain_text)
                .collect::<Vec<_>>()
                .join(", "),
            _ => EMPTY_CELL.to_string(),
        }
    }
}

/// Shows the option label for a stored option value.
#[derive(Debug, Clone, Default)]
pub struct OptionCell {
    pub options: Vec<ColumnOption>,
}

impl CellRenderer for OptionCell {
    fn render(&self, value: Option<&Value>) -> String {
        let Some(raw) = value.and_then(plain_text) else {
            return "N/A".to_string();
        };
        self.options
            .iter()
            .find(|o| o.value == raw)
            .map(|o| o.label.clone())
            .unwrap_or(raw)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckCell;

impl CellRenderer for CheckCell {
    fn render(&self, value: Option<&Value>) -> String {
        match value {
            Some(Value::Bool(true)) => "[x]".to_string(),
            Some(Value::Bool(false)) => "[ ]".to_string(),
            other => NullableCell.render(other),
        }
    }
}

pub fn renderer_for(column: &ColumnDescriptor) -> Arc<dyn CellRenderer> {
    if let Some(render) = &column.render {
        return Arc::clone(render);
    }
    match column.data_type {
        DataType::Set => Arc::new(OptionCell {
            options: column.options.clone(),
        }),
        DataType::Text => Arc::new(TruncatedCell { max_chars: 48 }),
        DataType::Number | DataType::Date => Arc::new(NullableCell),
    }
}

/// Render one row for the given columns, in column order.
pub fn render_row<'a>(
    columns: impl IntoIterator<Item = &'a ColumnDescriptor>,
    row: &Value,
) -> Vec<String> {
    columns
        .into_iter()
        .map(|column| renderer_for(column).render(path::lookup(row, &column.key)))
        .collect()
}
