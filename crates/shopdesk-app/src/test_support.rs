// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    EntityKind, Operation, Record, RecordId, RemoteCause, RemoteError, RemoteResource,
    ResourceStore,
};

/// Echo backend: create assigns `new-<n>` ids, update echoes the body back.
pub struct FakeResource {
    entity: EntityKind,
    fail: bool,
    calls: AtomicUsize,
    listed: Mutex<Vec<Record>>,
}

impl FakeResource {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            fail: false,
            calls: AtomicUsize::new(0),
            listed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_records(self, records: Vec<Record>) -> Self {
        *self.listed.lock().expect("fake lock") = records;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn call(&self, operation: Operation) -> Result<usize, RemoteError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(RemoteError::new(
                operation,
                self.entity,
                RemoteCause::BareStatus(500),
            ));
        }
        Ok(n)
    }

    fn record(id: RecordId, fields: &Map<String, Value>) -> Record {
        let mut body = fields.clone();
        body.insert("_id".to_owned(), Value::String(id.to_string()));
        Record::from_json(Value::Object(body)).expect("fake bodies decode")
    }
}

impl RemoteResource for FakeResource {
    fn entity(&self) -> EntityKind {
        self.entity
    }

    fn list(&self) -> Result<Vec<Record>, RemoteError> {
        self.call(Operation::List)?;
        Ok(self.listed.lock().expect("fake lock").clone())
    }

    fn create(&self, fields: &Map<String, Value>) -> Result<Record, RemoteError> {
        let n = self.call(Operation::Create)?;
        Ok(Self::record(RecordId::new(format!("new-{n}")), fields))
    }

    fn update(&self, id: &RecordId, fields: &Map<String, Value>) -> Result<Record, RemoteError> {
        self.call(Operation::Update)?;
        Ok(Self::record(id.clone(), fields))
    }

    fn delete(&self, _id: &RecordId) -> Result<(), RemoteError> {
        self.call(Operation::Delete)?;
        Ok(())
    }
}

pub fn loaded_store(entity: EntityKind, ids: &[&str]) -> ResourceStore {
    let mut store = ResourceStore::new(entity);
    store.begin_load().expect("idle store loads");
    store
        .load_succeeded(ids.iter().map(|id| Record::new(*id)).collect())
        .expect("loading store accepts records");
    store
}

pub fn valid_order() -> Vec<(&'static str, &'static str)> {
    vec![
        ("customer_id", "C1"),
        ("total_price", "100"),
        ("status", "pending"),
        ("payment_method", "cod"),
        ("address_line", "1 Rd"),
        ("city", "X"),
        ("state", "Y"),
        ("country", "Z"),
        ("postal_code", "00000"),
        ("phone", "000"),
    ]
}
