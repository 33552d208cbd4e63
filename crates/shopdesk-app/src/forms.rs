// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::entity::{EntityDescriptor, FieldFormat};
use crate::error::{RemoteError, StoreError};
use crate::ids::RecordId;
use crate::model::{EntityKind, LINE_ITEMS_FIELD, LineItem, LineItemField, Record};
use crate::remote::RemoteResource;
use crate::store::ResourceStore;

/// In-progress field values and line items for an open modal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DraftForm {
    pub fields: BTreeMap<String, String>,
    pub line_items: Vec<LineItem>,
}

impl DraftForm {
    pub fn blank(descriptor: &EntityDescriptor) -> Self {
        Self {
            fields: descriptor
                .fields
                .iter()
                .map(|field| (field.key.to_owned(), String::new()))
                .collect(),
            line_items: Vec::new(),
        }
    }

    pub fn from_record(descriptor: &EntityDescriptor, record: &Record) -> Self {
        Self {
            fields: descriptor
                .fields
                .iter()
                .map(|field| {
                    (
                        field.key.to_owned(),
                        record.text(field.key).unwrap_or_default(),
                    )
                })
                .collect(),
            line_items: record.line_items.clone(),
        }
    }

    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map_or("", String::as_str)
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_owned(), value.into());
    }

    pub fn validate(&self, descriptor: &EntityDescriptor) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for field in descriptor.fields {
            let value = self.field(field.key).trim();
            if value.is_empty() {
                if field.required {
                    errors.0.insert(field.key, FieldError::Missing);
                }
                continue;
            }
            if field.format == FieldFormat::Number && !is_number(value) {
                errors.0.insert(field.key, FieldError::NotANumber);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Request body for create and update. Values go out as typed.
    pub fn to_body(&self, descriptor: &EntityDescriptor) -> Map<String, Value> {
        let mut body: Map<String, Value> = descriptor
            .fields
            .iter()
            .map(|field| {
                (
                    field.key.to_owned(),
                    Value::String(self.field(field.key).to_owned()),
                )
            })
            .collect();
        if descriptor.line_items {
            body.insert(
                LINE_ITEMS_FIELD.to_owned(),
                Value::Array(self.line_items.iter().map(LineItem::to_json).collect()),
            );
        }
        body
    }
}

fn is_number(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Missing,
    NotANumber,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("is required"),
            Self::NotANumber => f.write_str("must be a number"),
        }
    }
}

/// Per-field problems found before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(BTreeMap<&'static str, FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<FieldError> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldError)> + '_ {
        self.0.iter().map(|(key, error)| (*key, *error))
    }

    fn clear_field(&mut self, key: &str) {
        self.0.remove(key);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .0
            .iter()
            .map(|(key, error)| format!("{key} {error}"))
            .collect::<Vec<_>>();
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("no form is open")]
    Closed,
    #[error("a form is already open -- save or cancel it first")]
    AlreadyOpen,
    #[error("fix the highlighted fields: {0}")]
    Invalid(ValidationErrors),
    #[error("a save is already in progress")]
    SubmitPending,
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("`{0}` is not a field of this form")]
    UnknownField(String),
    #[error("line item {index} does not exist")]
    NoSuchLineItem { index: usize },
    #[error("this form has no line items")]
    LineItemsUnsupported,
    #[error("this form has no media field")]
    NoMediaField,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Closed,
    Creating,
    Editing(Record),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAction {
    Create,
    Update(RecordId),
}

/// A validated draft ready to go over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub entity: EntityKind,
    pub action: SubmitAction,
    pub body: Map<String, Value>,
    token: u64,
}

impl SubmitRequest {
    pub fn execute(&self, client: &dyn RemoteResource) -> Result<Record, RemoteError> {
        match &self.action {
            SubmitAction::Create => client.create(&self.body),
            SubmitAction::Update(id) => client.update(id, &self.body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(RecordId),
    Updated(RecordId),
}

impl SubmitOutcome {
    pub fn id(&self) -> &RecordId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }

    pub fn notice(&self, entity: EntityKind) -> String {
        match self {
            Self::Created(_) => format!("{} added", entity.singular()),
            Self::Updated(_) => format!("{} updated", entity.singular()),
        }
    }
}

/// Add/edit modal lifecycle for one entity type.
#[derive(Debug, Clone)]
pub struct CrudFormController {
    descriptor: &'static EntityDescriptor,
    state: FormState,
    draft: Option<DraftForm>,
    errors: ValidationErrors,
    last_error: Option<String>,
    pending: Option<u64>,
    submits: u64,
}

impl CrudFormController {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            descriptor: entity.descriptor(),
            state: FormState::Closed,
            draft: None,
            errors: ValidationErrors::default(),
            last_error: None,
            pending: None,
            submits: 0,
        }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, FormState::Closed)
    }

    pub fn draft(&self) -> Option<&DraftForm> {
        self.draft.as_ref()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn open_create(&mut self) -> Result<(), FormError> {
        self.open(FormState::Creating, DraftForm::blank(self.descriptor))
    }

    pub fn open_edit(&mut self, record: Record) -> Result<(), FormError> {
        let draft = DraftForm::from_record(self.descriptor, &record);
        self.open(FormState::Editing(record), draft)
    }

    fn open(&mut self, state: FormState, draft: DraftForm) -> Result<(), FormError> {
        if self.is_open() {
            return Err(FormError::AlreadyOpen);
        }
        self.state = state;
        self.draft = Some(draft);
        self.errors = ValidationErrors::default();
        self.last_error = None;
        Ok(())
    }

    /// Discards the draft. A save still in flight keeps running but no longer
    /// touches this form when it lands.
    pub fn cancel(&mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.state = FormState::Closed;
        self.draft = None;
        self.errors = ValidationErrors::default();
        self.last_error = None;
        self.pending = None;
    }

    fn draft_mut(&mut self) -> Result<&mut DraftForm, FormError> {
        self.draft.as_mut().ok_or(FormError::Closed)
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> Result<(), FormError> {
        if self.descriptor.field(key).is_none() {
            return Err(FormError::UnknownField(key.to_owned()));
        }
        self.draft_mut()?.set_field(key, value);
        self.errors.clear_field(key);
        Ok(())
    }

    pub fn set_media_url(&mut self, url: impl Into<String>) -> Result<(), FormError> {
        let field = self.descriptor.media_field().ok_or(FormError::NoMediaField)?;
        self.set_field(field.key, url)
    }

    fn line_items_mut(&mut self) -> Result<&mut Vec<LineItem>, FormError> {
        if !self.descriptor.line_items {
            return Err(FormError::LineItemsUnsupported);
        }
        Ok(&mut self.draft_mut()?.line_items)
    }

    /// Appends an empty line item and returns its index.
    pub fn add_line_item(&mut self) -> Result<usize, FormError> {
        let items = self.line_items_mut()?;
        items.push(LineItem::default());
        Ok(items.len() - 1)
    }

    pub fn set_line_item_field(
        &mut self,
        index: usize,
        field: LineItemField,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        let item = self
            .line_items_mut()?
            .get_mut(index)
            .ok_or(FormError::NoSuchLineItem { index })?;
        item.set(field, value);
        Ok(())
    }

    pub fn remove_line_item(&mut self, index: usize) -> Result<LineItem, FormError> {
        let items = self.line_items_mut()?;
        if index >= items.len() {
            return Err(FormError::NoSuchLineItem { index });
        }
        Ok(items.remove(index))
    }

    /// Validates the draft and builds the request to send. Invalid drafts
    /// record their field errors and never produce a request.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, FormError> {
        let action = match &self.state {
            FormState::Closed => return Err(FormError::Closed),
            FormState::Creating => SubmitAction::Create,
            FormState::Editing(record) => SubmitAction::Update(record.id.clone()),
        };
        if self.pending.is_some() {
            return Err(FormError::SubmitPending);
        }
        let draft = self.draft.as_ref().ok_or(FormError::Closed)?;
        if let Err(errors) = draft.validate(self.descriptor) {
            debug!(entity = %self.descriptor.kind, invalid = errors.len(), "draft rejected");
            self.errors = errors.clone();
            return Err(FormError::Invalid(errors));
        }
        let body = draft.to_body(self.descriptor);

        self.errors = ValidationErrors::default();
        self.last_error = None;
        self.submits += 1;
        self.pending = Some(self.submits);
        Ok(SubmitRequest {
            entity: self.descriptor.kind,
            action,
            body,
            token: self.submits,
        })
    }

    /// Applies the server's answer. Success lands in the store and closes the
    /// form. Failure keeps the modal and draft as they were.
    pub fn finish_submit(
        &mut self,
        request: &SubmitRequest,
        result: Result<Record, RemoteError>,
        store: &mut ResourceStore,
    ) -> Result<SubmitOutcome, FormError> {
        let current = self.pending == Some(request.token);
        if current {
            self.pending = None;
        }

        let record = match result {
            Ok(record) => record,
            Err(error) => {
                if current {
                    self.last_error = Some(error.to_string());
                }
                return Err(FormError::Remote(error));
            }
        };

        let outcome = match &request.action {
            SubmitAction::Create => {
                let id = record.id.clone();
                store.added(record);
                SubmitOutcome::Created(id)
            }
            SubmitAction::Update(id) => {
                if let Err(error) = store.updated(id, record) {
                    if current {
                        self.close();
                    }
                    return Err(FormError::Store(error));
                }
                SubmitOutcome::Updated(id.clone())
            }
        };
        if current {
            self.close();
        }
        Ok(outcome)
    }

    pub fn submit(
        &mut self,
        client: &dyn RemoteResource,
        store: &mut ResourceStore,
    ) -> Result<SubmitOutcome, FormError> {
        let request = self.begin_submit()?;
        let result = request.execute(client);
        self.finish_submit(&request, result, store)
    }
}
