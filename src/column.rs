use std::fmt;
use std::sync::Arc;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::cell::CellRenderer;
use crate::domain::GridError;
use crate::preferences::PreferenceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Number,
    Date,
    Set,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Date => "date",
            DataType::Set => "set",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOption {
    pub label: String,
    pub value: String,
}

impl ColumnOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        ColumnOption {
            label: label.into(),
            value: value.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Metadata for one displayable field of a row.
///
/// `key` is a dot path into the row (`organization.name`). The `render`
/// capability belongs to the host session and is never serialized, so a
/// descriptor read back from preferences has no renderer.
#[derive(Clone, Setters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    #[setters(skip)]
    pub key: String,
    #[setters(into)]
    pub label: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ColumnOption>,
    #[serde(skip)]
    #[setters(skip)]
    pub render: Option<Arc<dyn CellRenderer>>,
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        ColumnDescriptor {
            key: key.into(),
            label: label.into(),
            data_type: DataType::Text,
            sortable: true,
            filterable: false,
            editable: false,
            visible: true,
            options: Vec::new(),
            render: None,
        }
    }

    pub fn with_renderer(mut self, renderer: impl CellRenderer + 'static) -> Self {
        self.render = Some(Arc::new(renderer));
        self
    }

    /// Copy of this descriptor without its renderer, as it gets persisted.
    pub fn stripped(&self) -> Self {
        ColumnDescriptor {
            render: None,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if self.key.is_empty() {
            return Err(GridError::Config(format!(
                "column '{}' has an empty key",
                self.label
            )));
        }
        if self.data_type == DataType::Set && self.filterable && self.options.is_empty() {
            return Err(GridError::Config(format!(
                "filterable set column '{}' needs options",
                self.key
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("data_type", &self.data_type)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("editable", &self.editable)
            .field("visible", &self.visible)
            .field("options", &self.options)
            .field("render", &self.render.as_ref().map(|_| "<renderer>"))
            .finish()
    }
}

// Renderers compare by identity
impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        let same_render = match (&self.render, &other.render) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.key == other.key
            && self.label == other.label
            && self.data_type == other.data_type
            && self.sortable == other.sortable
            && self.filterable == other.filterable
            && self.editable == other.editable
            && self.visible == other.visible
            && self.options == other.options
            && same_render
    }
}

fn validate_all(columns: &[ColumnDescriptor]) -> Result<(), GridError> {
    columns.iter().try_for_each(ColumnDescriptor::validate)
}

/// Apply a persisted layout onto the configured columns.
///
/// Saved entries contribute order and visibility only. Keys no longer
/// configured are dropped, configured columns missing from the save are
/// appended in their configured order.
pub fn merge_saved(
    defaults: &[ColumnDescriptor],
    saved: &[ColumnDescriptor],
) -> Vec<ColumnDescriptor> {
    let mut merged: Vec<ColumnDescriptor> = Vec::with_capacity(defaults.len());
    for entry in saved {
        if merged.iter().any(|c| c.key == entry.key) {
            continue;
        }
        match defaults.iter().find(|d| d.key == entry.key) {
            Some(configured) => merged.push(ColumnDescriptor {
                visible: entry.visible,
                ..configured.clone()
            }),
            None => debug!("Dropping saved column '{}' that is no longer configured", entry.key),
        }
    }
    for configured in defaults {
        if !merged.iter().any(|c| c.key == configured.key) {
            merged.push(configured.clone());
        }
    }
    merged
}

/// Ordered column configuration with a remembered default snapshot.
///
/// Keys are expected to be unique. This is not checked; by-key operations
/// act on the first matching descriptor.
pub struct ColumnRegistry<P> {
    columns: Vec<ColumnDescriptor>,
    defaults: Vec<ColumnDescriptor>,
    preference_key: Option<String>,
    store: P,
}

impl<P: PreferenceStore> ColumnRegistry<P> {
    pub fn new(
        columns: Vec<ColumnDescriptor>,
        preference_key: Option<String>,
        store: P,
    ) -> Result<Self, GridError> {
        let mut registry = ColumnRegistry {
            columns: Vec::new(),
            defaults: Vec::new(),
            preference_key,
            store,
        };
        registry.initialize(columns)?;
        Ok(registry)
    }

    /// Replace both the working and the default snapshot. Unsaved reorder and
    /// visibility edits are discarded.
    pub fn initialize(&mut self, columns: Vec<ColumnDescriptor>) -> Result<(), GridError> {
        validate_all(&columns)?;
        if self.columns != self.defaults {
            debug!("Column configuration refreshed, discarding unsaved layout edits");
        }
        trace!("Initialized registry with {} columns", columns.len());
        self.defaults = columns.clone();
        self.columns = columns;
        Ok(())
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn defaults(&self) -> &[ColumnDescriptor] {
        &self.defaults
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.visible)
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn preference_key(&self) -> Option<&str> {
        self.preference_key.as_deref()
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Move the column at `source` to `target`, shifting the ones in between.
    /// A missing target means position 0. Returns false if nothing moved.
    pub fn reorder(&mut self, source: usize, target: Option<usize>) -> bool {
        let target = target.unwrap_or(0);
        let len = self.columns.len();
        if source >= len || target >= len {
            trace!("Ignoring reorder {source} -> {target} with {len} columns");
            return false;
        }
        let column = self.columns.remove(source);
        self.columns.insert(target, column);
        trace!("Moved column {source} -> {target}");
        true
    }

    pub fn set_visible(&mut self, key: &str, visible: bool) -> bool {
        match self.columns.iter_mut().find(|c| c.key == key) {
            Some(column) => {
                column.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Persist the working layout under the preference key and return it
    /// without renderers.
    pub fn commit(&mut self) -> Result<Vec<ColumnDescriptor>, GridError> {
        let stripped: Vec<ColumnDescriptor> =
            self.columns.iter().map(ColumnDescriptor::stripped).collect();
        match &self.preference_key {
            Some(key) => {
                debug!("Saving column layout for '{key}'");
                self.store.save(key, Some(&stripped))?;
            }
            None => trace!("No preference key, column layout not saved"),
        }
        Ok(stripped)
    }

    pub fn reset(&mut self) -> Result<(), GridError> {
        self.columns = self.defaults.clone();
        if let Some(key) = &self.preference_key {
            debug!("Clearing saved column layout for '{key}'");
            self.store.save(key, None)?;
        }
        Ok(())
    }

    /// Load the persisted layout for the preference key, if any, and apply it
    /// onto the defaults. Returns whether a saved layout was found.
    pub fn restore(&mut self) -> Result<bool, GridError> {
        let Some(key) = &self.preference_key else {
            return Ok(false);
        };
        match self.store.load(key)? {
            Some(saved) => {
                if let Err(e) = validate_all(&saved) {
                    warn!("Ignoring saved column layout for '{key}': {e}");
                }
                self.columns = merge_saved(&self.defaults, &saved);
                debug!("Restored column layout for '{key}'");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
