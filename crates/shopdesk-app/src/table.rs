// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

use crate::entity::{ColumnKind, ColumnSpec, EntityDescriptor};
use crate::error::{RemoteError, StoreError};
use crate::filter::{FilterState, SearchableColumnFilter, TextSpan, highlight};
use crate::forms::{CrudFormController, FormError, SubmitOutcome};
use crate::ids::RecordId;
use crate::model::{EntityKind, Record};
use crate::remote::RemoteResource;
use crate::store::ResourceStore;

pub const DEFAULT_PAGE_SIZE: usize = 4;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Asc => "^",
            Self::Desc => "v",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: &'static str,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("column `{0}` is not searchable")]
    NotSearchable(String),
    #[error("page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    BadPageSize(usize),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Form(#[from] FormError),
}

/// Text used for sorting and display; line items collapse to one summary.
pub fn cell_text(record: &Record, column: &ColumnSpec) -> String {
    match column.kind {
        ColumnKind::LineItems => record.line_item_summary(),
        ColumnKind::Text | ColumnKind::Media => record.text(column.key).unwrap_or_default(),
    }
}

fn finite_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Numbers sort before text so mixed columns still get a total order. Ties
/// fall back to the raw text.
fn compare_cells(left: &str, right: &str) -> Ordering {
    let grouped = match (finite_number(left), finite_number(right)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.to_lowercase().cmp(&right.to_lowercase()),
    };
    grouped.then_with(|| left.cmp(right))
}

/// Paginated, searchable, sortable listing of one store plus its add/edit
/// modal. Reads the store; writes only through store entry points.
#[derive(Debug, Clone)]
pub struct ResourceTableView {
    descriptor: &'static EntityDescriptor,
    filter: FilterState,
    sort: Option<SortSpec>,
    page: usize,
    page_size: usize,
    selected: usize,
    form: CrudFormController,
}

impl ResourceTableView {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            descriptor: entity.descriptor(),
            filter: FilterState::default(),
            sort: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            selected: 0,
            form: CrudFormController::new(entity),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Result<Self, TableError> {
        validate_page_size(page_size)?;
        self.page_size = page_size;
        Ok(self)
    }

    pub fn entity(&self) -> EntityKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn form(&self) -> &CrudFormController {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut CrudFormController {
        &mut self.form
    }

    /// Filtered and sorted rows, before pagination.
    pub fn rows<'a>(&self, store: &'a ResourceStore) -> Vec<&'a Record> {
        let mut rows: Vec<&Record> = store
            .records()
            .iter()
            .filter(|record| self.filter.admits(record))
            .collect();
        if let Some(sort) = self.sort
            && let Some(column) = self.descriptor.column(sort.column)
        {
            rows.sort_by(|left, right| {
                let ordering = compare_cells(&cell_text(left, column), &cell_text(right, column));
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        rows
    }

    pub fn page_count(&self, store: &ResourceStore) -> usize {
        self.rows(store).len().div_ceil(self.page_size).max(1)
    }

    pub fn page_rows<'a>(&self, store: &'a ResourceStore) -> Vec<&'a Record> {
        let rows = self.rows(store);
        let pages = rows.len().div_ceil(self.page_size).max(1);
        let page = self.page.min(pages - 1);
        rows.into_iter()
            .skip(page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Pulls page and selection back inside the current row set.
    pub fn clamp(&mut self, store: &ResourceStore) {
        let pages = self.page_count(store);
        self.page = self.page.min(pages - 1);
        let visible = self.page_rows(store).len();
        self.selected = self.selected.min(visible.saturating_sub(1));
    }

    pub fn set_page(&mut self, store: &ResourceStore, page: usize) {
        self.page = page;
        self.selected = 0;
        self.clamp(store);
    }

    pub fn next_page(&mut self, store: &ResourceStore) {
        self.set_page(store, self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self, store: &ResourceStore) {
        self.set_page(store, self.page.saturating_sub(1));
    }

    /// Changes the page size, keeping the first visible row on screen.
    pub fn set_page_size(
        &mut self,
        store: &ResourceStore,
        page_size: usize,
    ) -> Result<(), TableError> {
        validate_page_size(page_size)?;
        let first_row = self.page * self.page_size;
        self.page_size = page_size;
        self.set_page(store, first_row / page_size);
        Ok(())
    }

    pub fn move_selection(&mut self, store: &ResourceStore, delta: isize) {
        let visible = self.page_rows(store).len();
        if visible == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self
            .selected
            .saturating_add_signed(delta)
            .min(visible - 1);
    }

    pub fn selected_record<'a>(&self, store: &'a ResourceStore) -> Option<&'a Record> {
        self.page_rows(store).get(self.selected).copied()
    }

    /// Makes `column` the one searched column, replacing any earlier search.
    pub fn search(&mut self, column: &str, text: &str) -> Result<(), TableError> {
        if self.descriptor.column(column).is_none() {
            return Err(TableError::UnknownColumn(column.to_owned()));
        }
        if SearchableColumnFilter::for_column(self.descriptor, column).is_none() {
            return Err(TableError::NotSearchable(column.to_owned()));
        }
        self.filter.apply(column, text);
        self.page = 0;
        self.selected = 0;
        Ok(())
    }

    pub fn clear_search(&mut self) {
        self.filter.clear();
        self.page = 0;
        self.selected = 0;
    }

    /// Ascending, then descending, then unsorted.
    pub fn cycle_sort(&mut self, column: &str) -> Result<Option<SortSpec>, TableError> {
        let spec = self
            .descriptor
            .column(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_owned()))?;
        self.sort = match self.sort {
            Some(current) if current.column == spec.key => match current.direction {
                SortDirection::Asc => Some(SortSpec {
                    column: spec.key,
                    direction: SortDirection::Desc,
                }),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec {
                column: spec.key,
                direction: SortDirection::Asc,
            }),
        };
        Ok(self.sort)
    }

    /// One cell as spans, with search hits marked in the searched column.
    pub fn cell(&self, record: &Record, column: &ColumnSpec) -> Vec<TextSpan> {
        let text = cell_text(record, column);
        highlight(&text, self.filter.query_for(column.key).unwrap_or(""))
    }

    pub fn cells(&self, record: &Record) -> Vec<Vec<TextSpan>> {
        self.descriptor
            .columns
            .iter()
            .map(|column| self.cell(record, column))
            .collect()
    }

    /// Blocking reload through `client`.
    pub fn load(
        &mut self,
        client: &dyn RemoteResource,
        store: &mut ResourceStore,
    ) -> Result<usize, TableError> {
        store.begin_load()?;
        match client.list() {
            Ok(records) => {
                let count = records.len();
                store.load_succeeded(records)?;
                self.clamp(store);
                Ok(count)
            }
            Err(error) => {
                store.load_failed(error.to_string())?;
                self.clamp(store);
                Err(TableError::Remote(error))
            }
        }
    }

    pub fn open_create(&mut self) -> Result<(), TableError> {
        Ok(self.form.open_create()?)
    }

    pub fn edit(&mut self, store: &ResourceStore, id: &RecordId) -> Result<(), TableError> {
        let record = store.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            entity: self.entity(),
            id: id.clone(),
        })?;
        Ok(self.form.open_edit(record)?)
    }

    pub fn submit(
        &mut self,
        client: &dyn RemoteResource,
        store: &mut ResourceStore,
    ) -> Result<SubmitOutcome, TableError> {
        let outcome = self.form.submit(client, store)?;
        self.clamp(store);
        Ok(outcome)
    }

    /// Deletes without confirmation. On failure the row stays.
    pub fn delete(
        &mut self,
        client: &dyn RemoteResource,
        store: &mut ResourceStore,
        id: &RecordId,
    ) -> Result<String, TableError> {
        client.delete(id)?;
        self.apply_delete(store, id)
    }

    pub fn apply_delete(
        &mut self,
        store: &mut ResourceStore,
        id: &RecordId,
    ) -> Result<String, TableError> {
        store.removed(id)?;
        self.clamp(store);
        debug!(entity = %self.entity(), %id, "row deleted");
        Ok(format!("{} deleted", self.entity().singular()))
    }
}

fn validate_page_size(page_size: usize) -> Result<(), TableError> {
    if (1..=MAX_PAGE_SIZE).contains(&page_size) {
        Ok(())
    } else {
        Err(TableError::BadPageSize(page_size))
    }
}
