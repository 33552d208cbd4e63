// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::ids::RecordId;
use crate::model::{EntityKind, Record};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

impl FetchStatus {
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn label(&self) -> String {
        match self {
            Self::Idle => "idle".to_owned(),
            Self::Loading => "loading".to_owned(),
            Self::Succeeded => "loaded".to_owned(),
            Self::Failed(reason) => format!("load failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    LoadStarted(EntityKind),
    Loaded { entity: EntityKind, count: usize },
    LoadFailed { entity: EntityKind, reason: String },
    Added { entity: EntityKind, id: RecordId },
    Updated { entity: EntityKind, id: RecordId },
    Removed { entity: EntityKind, id: RecordId },
}

/// In-memory collection for one entity type. The only mutation path for its
/// records and fetch status.
#[derive(Debug)]
pub struct ResourceStore {
    entity: EntityKind,
    records: Vec<Record>,
    status: FetchStatus,
    revision: u64,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl ResourceStore {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            records: Vec::new(),
            status: FetchStatus::Idle,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|record| &record.id == id)
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|record| &record.id == id)
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn begin_load(&mut self) -> Result<Vec<StoreEvent>, StoreError> {
        if self.status.is_loading() {
            return Err(StoreError::LoadInFlight(self.entity));
        }
        self.status = FetchStatus::Loading;
        Ok(self.publish(StoreEvent::LoadStarted(self.entity)))
    }

    pub fn load_succeeded(&mut self, records: Vec<Record>) -> Result<Vec<StoreEvent>, StoreError> {
        if !self.status.is_loading() {
            return Err(StoreError::NotLoading(self.entity));
        }
        let count = records.len();
        self.records = records;
        self.status = FetchStatus::Succeeded;
        debug!(entity = %self.entity, count, "collection replaced");
        Ok(self.publish(StoreEvent::Loaded {
            entity: self.entity,
            count,
        }))
    }

    pub fn load_failed(&mut self, reason: impl Into<String>) -> Result<Vec<StoreEvent>, StoreError> {
        if !self.status.is_loading() {
            return Err(StoreError::NotLoading(self.entity));
        }
        let reason = reason.into();
        warn!(entity = %self.entity, %reason, "load failed");
        self.status = FetchStatus::Failed(reason.clone());
        Ok(self.publish(StoreEvent::LoadFailed {
            entity: self.entity,
            reason,
        }))
    }

    pub fn added(&mut self, record: Record) -> Vec<StoreEvent> {
        let id = record.id.clone();
        self.records.push(record);
        self.publish(StoreEvent::Added {
            entity: self.entity,
            id,
        })
    }

    /// Replaces the record with `id` in place. The stored identity always
    /// stays `id`, whatever the replacement carries.
    pub fn updated(
        &mut self,
        id: &RecordId,
        mut record: Record,
    ) -> Result<Vec<StoreEvent>, StoreError> {
        let index = self.position(id).ok_or_else(|| self.not_found(id))?;
        record.id = id.clone();
        self.records[index] = record;
        Ok(self.publish(StoreEvent::Updated {
            entity: self.entity,
            id: id.clone(),
        }))
    }

    pub fn removed(&mut self, id: &RecordId) -> Result<Vec<StoreEvent>, StoreError> {
        let index = self.position(id).ok_or_else(|| self.not_found(id))?;
        self.records.remove(index);
        Ok(self.publish(StoreEvent::Removed {
            entity: self.entity,
            id: id.clone(),
        }))
    }

    fn not_found(&self, id: &RecordId) -> StoreError {
        StoreError::NotFound {
            entity: self.entity,
            id: id.clone(),
        }
    }

    fn publish(&mut self, event: StoreEvent) -> Vec<StoreEvent> {
        self.revision = self.revision.saturating_add(1);
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        vec![event]
    }
}

/// One store per entity type. Created at start-up and handed to whoever needs
/// it.
#[derive(Debug)]
pub struct Stores {
    orders: ResourceStore,
    products: ResourceStore,
}

impl Default for Stores {
    fn default() -> Self {
        Self {
            orders: ResourceStore::new(EntityKind::Orders),
            products: ResourceStore::new(EntityKind::Products),
        }
    }
}

impl Stores {
    pub fn get(&self, entity: EntityKind) -> &ResourceStore {
        match entity {
            EntityKind::Orders => &self.orders,
            EntityKind::Products => &self.products,
        }
    }

    pub fn get_mut(&mut self, entity: EntityKind) -> &mut ResourceStore {
        match entity {
            EntityKind::Orders => &mut self.orders,
            EntityKind::Products => &mut self.products,
        }
    }
}
