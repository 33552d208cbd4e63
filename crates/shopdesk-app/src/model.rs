// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::entity::{EntityDescriptor, ORDERS, PRODUCTS};
use crate::error::DecodeError;
use crate::ids::RecordId;

pub const ID_FIELD: &str = "_id";
pub const FALLBACK_ID_FIELD: &str = "id";
pub const LINE_ITEMS_FIELD: &str = "products";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Orders,
    Products,
}

impl EntityKind {
    pub const ALL: [Self; 2] = [Self::Orders, Self::Products];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Products => "products",
        }
    }

    pub const fn singular(self) -> &'static str {
        match self {
            Self::Orders => "order",
            Self::Products => "product",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Orders => "Orders",
            Self::Products => "Products",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "orders" => Some(Self::Orders),
            "products" => Some(Self::Products),
            _ => None,
        }
    }

    pub fn descriptor(self) -> &'static EntityDescriptor {
        match self {
            Self::Orders => &ORDERS,
            Self::Products => &PRODUCTS,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemField {
    ProductId,
    Quantity,
    Price,
}

impl LineItemField {
    pub const ALL: [Self; 3] = [Self::ProductId, Self::Quantity, Self::Price];

    pub const fn key(self) -> &'static str {
        match self {
            Self::ProductId => "product_id",
            Self::Quantity => "quantity",
            Self::Price => "price",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ProductId => "Product ID",
            Self::Quantity => "Quantity",
            Self::Price => "Price",
        }
    }
}

/// One product line of an order. Addressed by position only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: String,
    pub price: String,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<String>,
        quantity: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            quantity: quantity.into(),
            price: price.into(),
        }
    }

    pub fn get(&self, field: LineItemField) -> &str {
        match field {
            LineItemField::ProductId => &self.product_id,
            LineItemField::Quantity => &self.quantity,
            LineItemField::Price => &self.price,
        }
    }

    pub fn set(&mut self, field: LineItemField, value: impl Into<String>) {
        let slot = match field {
            LineItemField::ProductId => &mut self.product_id,
            LineItemField::Quantity => &mut self.quantity,
            LineItemField::Price => &mut self.price,
        };
        *slot = value.into();
    }

    /// `P1 x2 @ 10`: product id, quantity after `x`, unit price after `@`.
    pub fn summary(&self) -> String {
        format!("{} x{} @ {}", self.product_id, self.quantity, self.price)
    }

    fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| object.get(key).and_then(value_text).unwrap_or_default();
        Some(Self {
            product_id: text(LineItemField::ProductId.key()),
            quantity: text(LineItemField::Quantity.key()),
            price: text(LineItemField::Price.key()),
        })
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for field in LineItemField::ALL {
            object.insert(field.key().to_owned(), Value::String(self.get(field).to_owned()));
        }
        Value::Object(object)
    }
}

/// One order or product as last confirmed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub fields: BTreeMap<String, Value>,
    pub line_items: Vec<LineItem>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
            line_items: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_owned(), value.into());
        self
    }

    pub fn with_line_item(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value coerced to display text. `None` means the value is absent.
    pub fn text(&self, name: &str) -> Option<String> {
        if name == ID_FIELD {
            return Some(self.id.to_string());
        }
        self.fields.get(name).and_then(value_text)
    }

    pub fn line_item_summary(&self) -> String {
        self.line_items
            .iter()
            .map(LineItem::summary)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn from_json(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut object) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let id = object
            .remove(ID_FIELD)
            .or_else(|| object.remove(FALLBACK_ID_FIELD))
            .as_ref()
            .and_then(value_text)
            .filter(|id| !id.is_empty())
            .ok_or(DecodeError::MissingId)?;

        let line_items = match object.remove(LINE_ITEMS_FIELD) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| LineItem::from_json(item).ok_or(DecodeError::BadLineItem(index)))
                .collect::<Result<Vec<_>, _>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(DecodeError::LineItemsNotAList),
        };

        Ok(Self {
            id: RecordId::new(id),
            fields: object.into_iter().collect(),
            line_items,
        })
    }

    pub fn list_from_json(value: Value) -> Result<Vec<Self>, DecodeError> {
        let Value::Array(items) = value else {
            return Err(DecodeError::NotAList);
        };
        items.into_iter().map(Self::from_json).collect()
    }

    pub fn to_json(&self, descriptor: &EntityDescriptor) -> Value {
        let mut object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        object.insert(ID_FIELD.to_owned(), Value::String(self.id.to_string()));
        if descriptor.line_items {
            object.insert(
                LINE_ITEMS_FIELD.to_owned(),
                Value::Array(self.line_items.iter().map(LineItem::to_json).collect()),
            );
        }
        Value::Object(object)
    }
}

pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, LineItem, Record};
    use crate::error::DecodeError;
    use crate::ORDERS;
    use serde_json::json;

    #[test]
    fn from_json_reads_mongo_style_id_and_line_items() {
        let record = Record::from_json(json!({
            "_id": "65f1",
            "customer_id": "C1",
            "total_price": 100,
            "products": [{"product_id": "P1", "quantity": 2, "price": "50"}],
        }))
        .expect("valid order");

        assert_eq!(record.id.as_str(), "65f1");
        assert_eq!(record.text("total_price").as_deref(), Some("100"));
        assert_eq!(record.line_items, vec![LineItem::new("P1", "2", "50")]);
        assert!(record.field("products").is_none());
    }

    #[test]
    fn from_json_falls_back_to_plain_id() {
        let record = Record::from_json(json!({"id": 7, "title": "Mug"})).expect("valid product");
        assert_eq!(record.id.as_str(), "7");
    }

    #[test]
    fn from_json_rejects_missing_id_and_non_objects() {
        assert_eq!(
            Record::from_json(json!({"title": "Mug"})),
            Err(DecodeError::MissingId)
        );
        assert_eq!(Record::from_json(json!("nope")), Err(DecodeError::NotAnObject));
        assert_eq!(
            Record::list_from_json(json!({"_id": "1"})),
            Err(DecodeError::NotAList)
        );
    }

    #[test]
    fn text_treats_null_as_absent() {
        let record = Record::new("1").with_field("status", serde_json::Value::Null);
        assert_eq!(record.text("status"), None);
        assert_eq!(record.text("_id").as_deref(), Some("1"));
    }

    #[test]
    fn to_json_includes_line_items_only_for_orders() {
        let record = Record::new("1")
            .with_field("status", "pending")
            .with_line_item(LineItem::new("P1", "1", "9"));
        let order = record.to_json(&ORDERS);
        assert_eq!(order["products"][0]["product_id"], "P1");

        let product = record.to_json(EntityKind::Products.descriptor());
        assert!(product.get("products").is_none());
    }

    #[test]
    fn line_item_summary_joins_entries() {
        let record = Record::new("1")
            .with_line_item(LineItem::new("P1", "2", "10"))
            .with_line_item(LineItem::new("P2", "1", "5"));
        assert_eq!(record.line_item_summary(), "P1 x2 @ 10; P2 x1 @ 5");
    }
}
