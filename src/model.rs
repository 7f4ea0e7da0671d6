use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

use crate::column::{ColumnDescriptor, ColumnRegistry};
use crate::debounce::Debouncer;
use crate::domain::{GridConfig, GridError, Message};
use crate::filter::{CompiledFilter, Condition, FilterBuilder, FilterValue};
use crate::pagination::{PageItem, PaginationState};
use crate::path;
use crate::preferences::PreferenceStore;
use crate::query::{CellEdit, QueryRequest, QuerySink};
use crate::sort::SortSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    TornDown,
}

/// Grid state for one view: columns, filters, search, sort and page.
///
/// Every change that affects the result set sends a fresh `QueryRequest`
/// to the sink. The only deferred work is the free-text search, which fires
/// from `tick` once its quiet window has passed.
pub struct GridModel<S, P> {
    config: GridConfig,
    pub status: Status,
    registry: ColumnRegistry<P>,
    filters: FilterBuilder,
    applied: CompiledFilter,
    rejected: Vec<GridError>,
    sort: Option<SortSpec>,
    pagination: PaginationState,
    search_input: String,
    search: Option<String>,
    pending_search: Debouncer<Option<String>>,
    sink: S,
    last_update: Instant,
}

impl<S: QuerySink, P: PreferenceStore> GridModel<S, P> {
    pub fn init(
        config: &GridConfig,
        columns: Vec<ColumnDescriptor>,
        store: P,
        sink: S,
    ) -> Result<Self, GridError> {
        config.validate()?;
        let registry = ColumnRegistry::new(columns, config.preference_key.clone(), store)?;
        let filters = FilterBuilder::new(registry.columns())?;
        let model = GridModel {
            config: config.clone(),
            status: Status::Ready,
            registry,
            filters,
            applied: CompiledFilter::empty(),
            rejected: Vec::new(),
            sort: None,
            pagination: PaginationState::new(config.page_size)?,
            search_input: String::new(),
            search: None,
            pending_search: Debouncer::new(config.search_debounce),
            sink,
            last_update: Instant::now(),
        };
        info!(
            "Grid ready with {} columns, page size {}",
            model.registry.columns().len(),
            config.page_size
        );
        Ok(model)
    }

    /// Start from a host-supplied nested sort object such as
    /// `{"organization": {"name": "desc"}}`.
    pub fn with_initial_sort(mut self, sort: &Value) -> Self {
        self.sort = SortSpec::from_value(sort);
        if self.sort.is_none() {
            debug!("Ignoring unusable initial sort {sort}");
        }
        self
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn registry(&self) -> &ColumnRegistry<P> {
        &self.registry
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        self.registry.columns()
    }

    pub fn filters(&self) -> &FilterBuilder {
        &self.filters
    }

    /// Field-level errors from the last apply, for the host to surface.
    pub fn rejected(&self) -> &[GridError] {
        &self.rejected
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn page_items(&self) -> Vec<PageItem> {
        self.pagination.controls(self.config.max_display_mid)
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn has_pending_search(&self) -> bool {
        self.pending_search.is_pending()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    /// Apply the persisted column layout for the preference key, if any.
    pub fn restore_columns(&mut self) -> Result<bool, GridError> {
        self.registry.restore()
    }

    /// The request describing the current state.
    pub fn request(&self) -> QueryRequest {
        QueryRequest {
            filter: self.applied.clone(),
            order_by: self.sort.clone(),
            skip: self.pagination.skip(),
            take: self.pagination.take(),
            search_string: self.search.clone(),
        }
    }

    pub fn update(&mut self, message: Message) -> Result<(), GridError> {
        self.update_at(message, Instant::now())
    }

    #[instrument(level = "trace", skip(self, now))]
    pub fn update_at(&mut self, message: Message, now: Instant) -> Result<(), GridError> {
        if self.status == Status::TornDown {
            debug!("Ignoring {message:?} after teardown");
            return Ok(());
        }
        // A search whose window already elapsed goes out before the new event
        self.tick(now);

        trace!("Update: {message:?}");
        match message {
            Message::Configure(columns) => self.configure(columns)?,
            Message::Reorder { from, to } => {
                self.registry.reorder(from, to);
            }
            Message::SetVisible { key, visible } => {
                if !self.registry.set_visible(&key, visible) {
                    trace!("No column '{key}' to show or hide");
                }
            }
            Message::CommitColumns => self.commit_columns(),
            Message::ResetColumns => self.reset_columns(),
            Message::SearchInput(raw) => self.search_changed(raw, now),
            Message::SetFilter {
                key,
                condition,
                value,
            } => self.set_filter(&key, condition, value),
            Message::ApplyFilters => self.apply_filters(),
            Message::ClearFilters => self.clear_filters(),
            Message::ToggleSort(key) => self.toggle_sort(&key),
            Message::GoToPage(page) => {
                if self.pagination.go_to_page(page) {
                    self.emit();
                }
            }
            Message::NextPage => {
                if self.pagination.next() {
                    self.emit();
                }
            }
            Message::PreviousPage => {
                if self.pagination.previous() {
                    self.emit();
                }
            }
            Message::Loaded { total_items } => {
                trace!("Data source reports {total_items} items");
                // The loaded page is past the end, fetch the new last page
                if self.pagination.set_total_items(total_items) {
                    self.emit();
                }
            }
            Message::EditCell { row, key, value } => self.edit_cell(&row, &key, value)?,
            Message::Tick => {}
        }

        self.last_update = now;
        Ok(())
    }

    /// Fire the debounced search if its quiet window has elapsed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(search) = self.pending_search.poll(now) {
            self.run_search(search);
        }
    }

    /// Stop the grid. A pending search is dropped and later messages are ignored.
    pub fn teardown(&mut self) {
        if self.pending_search.cancel().is_some() {
            debug!("Cancelled pending search on teardown");
        }
        self.status = Status::TornDown;
    }

    // -------------------- Control handling functions ---------------------- //

    fn emit(&mut self) {
        let request = self.request();
        trace!(
            "Query skip={} take={} search={:?}",
            request.skip, request.take, request.search_string
        );
        self.sink.query(&request);
    }

    fn configure(&mut self, columns: Vec<ColumnDescriptor>) -> Result<(), GridError> {
        self.registry.initialize(columns)?;
        self.filters.set_schema(self.registry.columns())?;
        if let Some(sort) = &self.sort
            && self.registry.column(&sort.key).is_none()
        {
            debug!("Sorted column '{}' was removed, dropping sort", sort.key);
            self.sort = None;
        }
        Ok(())
    }

    fn commit_columns(&mut self) {
        match self.registry.commit() {
            Ok(columns) => debug!("Committed layout of {} columns", columns.len()),
            Err(e) => warn!("Could not save column layout: {e}"),
        }
    }

    fn reset_columns(&mut self) {
        if let Err(e) = self.registry.reset() {
            warn!("Could not clear saved column layout: {e}");
        }
    }

    fn search_changed(&mut self, raw: String, now: Instant) {
        let trimmed = raw.trim();
        let normalized = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self.search_input = raw;
        if self.pending_search.schedule(normalized, now) {
            trace!("Superseded pending search");
        }
    }

    fn run_search(&mut self, search: Option<String>) {
        debug!("Search for {search:?}");
        self.search = search;
        self.sink.search(self.search.as_deref());
        self.pagination.reset();
        self.emit();
    }

    fn set_filter(&mut self, key: &str, condition: Condition, value: Option<FilterValue>) {
        self.filters.set_column_filter(key, condition, value);
    }

    fn apply_filters(&mut self) {
        let compiled = self.filters.compile();
        for e in &compiled.rejected {
            warn!("{e}");
        }
        debug!(
            "Applying {} filters, {} rejected",
            self.filters.active_count().saturating_sub(compiled.rejected.len()),
            compiled.rejected.len()
        );
        self.applied = compiled.filter;
        self.rejected = compiled.rejected;
        self.pagination.reset();
        self.emit();
    }

    fn clear_filters(&mut self) {
        debug!("Clearing filters");
        self.filters.clear();
        self.applied = CompiledFilter::empty();
        self.rejected.clear();
        self.pagination.reset();
        self.emit();
    }

    fn toggle_sort(&mut self, key: &str) {
        match self.registry.column(key) {
            Some(column) if column.sortable => {
                let sort = SortSpec::toggle(self.sort.as_ref(), key);
                debug!("Sort by {} {}", sort.key, sort.order);
                self.sort = Some(sort);
                self.emit();
            }
            Some(_) => debug!("Column '{key}' is not sortable"),
            None => debug!("No column '{key}' to sort by"),
        }
    }

    fn edit_cell(&mut self, row: &Value, key: &str, value: Value) -> Result<(), GridError> {
        match self.registry.column(key) {
            Some(column) if column.editable => {}
            Some(_) => {
                return Err(GridError::invalid_argument(
                    "edit",
                    format!("column '{key}' is not editable"),
                ));
            }
            None => {
                return Err(GridError::invalid_argument(
                    "edit",
                    format!("no column '{key}'"),
                ));
            }
        }
        if path::lookup(row, key) == Some(&value) {
            trace!("Edit of '{key}' leaves the value unchanged");
            return Ok(());
        }
        let edit = CellEdit {
            id: row.get("id").cloned().unwrap_or(Value::Null),
            key: key.to_string(),
            data: path::nest(key, value.clone()),
            value,
        };
        debug!("Edit {} of row {}", edit.key, edit.id);
        self.sink.edit(&edit);
        Ok(())
    }
}

impl<S, P> Drop for GridModel<S, P> {
    fn drop(&mut self) {
        if self.pending_search.cancel().is_some() {
            trace!("Dropped pending search with the grid");
        }
    }
}
