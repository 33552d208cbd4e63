// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;
use thiserror::Error;

use crate::ids::RecordId;
use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
    Upload,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteCause {
    #[error("cannot reach {url} ({message})")]
    Transport { url: String, message: String },
    #[error("server error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("server returned {0}")]
    BareStatus(u16),
    #[error("decode response: {0}")]
    Decode(String),
}

/// Any failure at the network/server boundary, tagged with what was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} {entity} failed: {cause}")]
pub struct RemoteError {
    pub operation: Operation,
    pub entity: EntityKind,
    pub cause: RemoteCause,
}

impl RemoteError {
    pub fn new(operation: Operation, entity: EntityKind, cause: RemoteCause) -> Self {
        Self {
            operation,
            entity,
            cause,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("expected a JSON array of records")]
    NotAList,
    #[error("record has no `_id`")]
    MissingId,
    #[error("`products` is not a list")]
    LineItemsNotAList,
    #[error("line item {0} is not an object")]
    BadLineItem(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id} is not in the loaded collection")]
    NotFound { entity: EntityKind, id: RecordId },
    #[error("{0} load already in flight")]
    LoadInFlight(EntityKind),
    #[error("{0} is not loading")]
    NotLoading(EntityKind),
}

#[cfg(test)]
mod tests {
    use super::{Operation, RemoteCause, RemoteError, StoreError};
    use crate::{EntityKind, RecordId};

    #[test]
    fn remote_error_message_names_operation_and_entity() {
        let error = RemoteError::new(
            Operation::Create,
            EntityKind::Orders,
            RemoteCause::Status {
                status: 422,
                message: "customer_id is invalid".to_owned(),
            },
        );
        assert_eq!(
            error.to_string(),
            "create orders failed: server error (422): customer_id is invalid"
        );
    }

    #[test]
    fn not_found_message_names_the_id() {
        let error = StoreError::NotFound {
            entity: EntityKind::Products,
            id: RecordId::new("abc"),
        };
        assert_eq!(error.to_string(), "products abc is not in the loaded collection");
    }
}
