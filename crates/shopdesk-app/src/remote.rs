// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::RemoteError;
use crate::ids::RecordId;
use crate::model::{EntityKind, Record};

/// CRUD access to one entity's REST collection. Each call is exactly one
/// round trip and nothing is retried.
pub trait RemoteResource: Send + Sync {
    fn entity(&self) -> EntityKind;

    fn list(&self) -> Result<Vec<Record>, RemoteError>;

    fn create(&self, fields: &Map<String, Value>) -> Result<Record, RemoteError>;

    fn update(&self, id: &RecordId, fields: &Map<String, Value>) -> Result<Record, RemoteError>;

    fn delete(&self, id: &RecordId) -> Result<(), RemoteError>;
}

/// One client per entity, shareable across worker threads.
#[derive(Clone)]
pub struct Resources {
    pub orders: Arc<dyn RemoteResource>,
    pub products: Arc<dyn RemoteResource>,
}

impl Resources {
    pub fn new(orders: Arc<dyn RemoteResource>, products: Arc<dyn RemoteResource>) -> Self {
        Self { orders, products }
    }

    pub fn get(&self, entity: EntityKind) -> &Arc<dyn RemoteResource> {
        match entity {
            EntityKind::Orders => &self.orders,
            EntityKind::Products => &self.products,
        }
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("orders", &self.orders.entity())
            .field("products", &self.products.entity())
            .finish()
    }
}
