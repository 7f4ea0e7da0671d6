use std::sync::mpsc::Sender;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::filter::CompiledFilter;
use crate::sort::SortSpec;

/// Everything the data source needs to fetch one page of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(rename = "where")]
    pub filter: CompiledFilter,
    #[serde(serialize_with = "serialize_order_by")]
    pub order_by: Option<SortSpec>,
    pub skip: usize,
    pub take: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_string: Option<String>,
}

// No active sort is sent as an empty object
fn serialize_order_by<S: Serializer>(
    order_by: &Option<SortSpec>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match order_by {
        Some(spec) => spec.serialize(serializer),
        None => Map::new().serialize(serializer),
    }
}

/// An inline edit of one cell, addressed the way the backend expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellEdit {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub id: Value,
    pub key: String,
    pub value: Value,
    /// `value` nested under the key's dot path
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GridEvent {
    Query(QueryRequest),
    Search {
        #[serde(rename = "searchString")]
        search_string: Option<String>,
    },
    Edit(CellEdit),
}

/// Receives what the grid wants fetched. Superseding in-flight requests is
/// up to the implementor.
pub trait QuerySink {
    fn query(&mut self, request: &QueryRequest);

    fn search(&mut self, _search: Option<&str>) {}

    fn edit(&mut self, _edit: &CellEdit) {}
}

impl QuerySink for Vec<GridEvent> {
    fn query(&mut self, request: &QueryRequest) {
        self.push(GridEvent::Query(request.clone()));
    }

    fn search(&mut self, search: Option<&str>) {
        self.push(GridEvent::Search {
            search_string: search.map(str::to_string),
        });
    }

    fn edit(&mut self, edit: &CellEdit) {
        self.push(GridEvent::Edit(edit.clone()));
    }
}

impl QuerySink for Sender<GridEvent> {
    fn query(&mut self, request: &QueryRequest) {
        if self.send(GridEvent::Query(request.clone())).is_err() {
            debug!("Query receiver is gone, dropping request");
        }
    }

    fn search(&mut self, search: Option<&str>) {
        let event = GridEvent::Search {
            search_string: search.map(str::to_string),
        };
        if self.send(event).is_err() {
            debug!("Query receiver is gone, dropping search");
        }
    }

    fn edit(&mut self, edit: &CellEdit) {
        if self.send(GridEvent::Edit(edit.clone())).is_err() {
            debug!("Query receiver is gone, dropping edit");
        }
    }
}
