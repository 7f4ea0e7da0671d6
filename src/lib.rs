//! State core of a data grid in front of a relational query API.
//!
//! [`ColumnRegistry`] keeps column order, visibility and saved layouts.
//! [`FilterBuilder`] turns per-column conditions into a nested `where`
//! object. [`GridModel`] ties both together with search, sort and
//! pagination and hands a [`QueryRequest`] to a [`QuerySink`] whenever the
//! result set should change.

pub mod cell;
pub mod column;
pub mod controller;
pub mod debounce;
pub mod domain;
pub mod filter;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod path;
pub mod preferences;
pub mod query;
pub mod sort;

pub use column::{ColumnDescriptor, ColumnOption, ColumnRegistry, DataType};
pub use domain::{GridConfig, GridError, Message};
pub use filter::{CompiledFilter, Condition, FilterBuilder, FilterValue};
pub use model::GridModel;
pub use preferences::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use query::{CellEdit, GridEvent, QueryRequest, QuerySink};
pub use sort::{SortOrder, SortSpec};
