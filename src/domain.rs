use std::time::Duration;

use derive_setters::Setters;
use serde_json::Value;
use thiserror::Error;

use crate::column::ColumnDescriptor;
use crate::filter::{Condition, FilterValue};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_DISPLAY_MID: usize = 2;
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The host supplied a column or grid configuration that can never work.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A single filter entry could not be coerced to its column's type.
    /// Only that entry is dropped from the compiled filter.
    #[error("filter on '{key}' ignored: {reason}")]
    SchemaMismatch { key: String, reason: String },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("invalid argument for '{command}': {reason}")]
    InvalidArgument { command: String, reason: String },
}

impl GridError {
    pub fn mismatch(key: impl Into<String>, reason: impl Into<String>) -> Self {
        GridError::SchemaMismatch {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(command: impl Into<String>, reason: impl Into<String>) -> Self {
        GridError::InvalidArgument {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Setters)]
pub struct GridConfig {
    pub page_size: usize,
    // Number of consecutive page buttons shown around the current page
    pub max_display_mid: usize,
    pub search_debounce: Duration,
    #[setters(strip_option, into)]
    pub preference_key: Option<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            page_size: DEFAULT_PAGE_SIZE,
            max_display_mid: MAX_DISPLAY_MID,
            search_debounce: SEARCH_DEBOUNCE,
            preference_key: None,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), GridError> {
        if self.page_size == 0 {
            return Err(GridError::Config("page size must be positive".to_string()));
        }
        if self.max_display_mid == 0 {
            return Err(GridError::Config(
                "at least one page button must be displayed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a host can ask the grid to do. Each UI event maps to one message.
#[derive(Debug, Clone)]
pub enum Message {
    // Column registry
    Configure(Vec<ColumnDescriptor>),
    Reorder { from: usize, to: Option<usize> },
    SetVisible { key: String, visible: bool },
    CommitColumns,
    ResetColumns,

    // Filtering and search
    SearchInput(String),
    SetFilter {
        key: String,
        condition: Condition,
        value: Option<FilterValue>,
    },
    ApplyFilters,
    ClearFilters,

    ToggleSort(String),

    // Pagination
    GoToPage(usize),
    NextPage,
    PreviousPage,
    Loaded { total_items: usize },

    EditCell { row: Value, key: String, value: Value },
    Tick,
}
