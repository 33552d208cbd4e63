// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::{EntityKind, ID_FIELD, LINE_ITEMS_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    LineItems,
    Media,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub title: &'static str,
    pub kind: ColumnKind,
    pub searchable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Text,
    Number,
    MediaUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub format: FieldFormat,
}

/// Everything that differs between the orders screen and the products screen.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub columns: &'static [ColumnSpec],
    pub fields: &'static [FieldSpec],
    pub line_items: bool,
}

impl EntityDescriptor {
    pub fn path(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn column(&self, key: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|column| column.key == key)
    }

    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn media_field(&self) -> Option<&'static FieldSpec> {
        self.fields
            .iter()
            .find(|field| field.format == FieldFormat::MediaUrl)
    }
}

const fn text_column(key: &'static str, title: &'static str, searchable: bool) -> ColumnSpec {
    ColumnSpec {
        key,
        title,
        kind: ColumnKind::Text,
        searchable,
    }
}

const fn required(key: &'static str, label: &'static str, format: FieldFormat) -> FieldSpec {
    FieldSpec {
        key,
        label,
        required: true,
        format,
    }
}

pub static ORDERS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Orders,
    columns: &[
        text_column(ID_FIELD, "Order ID", true),
        text_column("customer_id", "Customer ID", true),
        text_column("total_price", "Total Price", false),
        text_column("status", "Status", true),
        text_column("address_line", "Address", false),
        text_column("city", "City", false),
        text_column("state", "State", false),
        text_column("country", "Country", false),
        text_column("postal_code", "Postal Code", false),
        text_column("phone", "Phone", false),
        text_column("payment_method", "Payment Method", false),
        ColumnSpec {
            key: LINE_ITEMS_FIELD,
            title: "Products",
            kind: ColumnKind::LineItems,
            searchable: false,
        },
    ],
    fields: &[
        required("customer_id", "Customer ID", FieldFormat::Text),
        required("total_price", "Total Price", FieldFormat::Number),
        required("status", "Status", FieldFormat::Text),
        required("payment_method", "Payment Method", FieldFormat::Text),
        required("address_line", "Address", FieldFormat::Text),
        required("city", "City", FieldFormat::Text),
        required("state", "State", FieldFormat::Text),
        required("country", "Country", FieldFormat::Text),
        required("postal_code", "Postal Code", FieldFormat::Text),
        required("phone", "Phone", FieldFormat::Text),
    ],
    line_items: true,
};

pub static PRODUCTS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Products,
    columns: &[
        text_column(ID_FIELD, "Product ID", true),
        text_column("category", "Category", true),
        text_column("title", "Title", true),
        text_column("description", "Description", true),
        text_column("price", "Price", true),
        text_column("size", "Size", true),
        text_column("color", "Color", true),
        text_column("quantity", "Quantity", true),
        ColumnSpec {
            key: "media",
            title: "Media",
            kind: ColumnKind::Media,
            searchable: false,
        },
    ],
    fields: &[
        required("category", "Category", FieldFormat::Text),
        required("title", "Title", FieldFormat::Text),
        required("description", "Description", FieldFormat::Text),
        required("price", "Price", FieldFormat::Number),
        required("size", "Size", FieldFormat::Text),
        required("color", "Color", FieldFormat::Text),
        required("quantity", "Quantity", FieldFormat::Number),
        required("media", "Image", FieldFormat::MediaUrl),
    ],
    line_items: false,
};

#[cfg(test)]
mod tests {
    use super::{ORDERS, PRODUCTS};
    use crate::EntityKind;

    #[test]
    fn order_required_fields_match_form_contract() {
        let required = ORDERS
            .required_fields()
            .map(|field| field.key)
            .collect::<Vec<_>>();
        assert_eq!(
            required,
            vec![
                "customer_id",
                "total_price",
                "status",
                "payment_method",
                "address_line",
                "city",
                "state",
                "country",
                "postal_code",
                "phone",
            ]
        );
        assert!(ORDERS.line_items);
        assert!(ORDERS.media_field().is_none());
    }

    #[test]
    fn product_required_fields_include_media() {
        let required = PRODUCTS
            .required_fields()
            .map(|field| field.key)
            .collect::<Vec<_>>();
        assert_eq!(
            required,
            vec![
                "category",
                "title",
                "description",
                "price",
                "size",
                "color",
                "quantity",
                "media",
            ]
        );
        assert_eq!(PRODUCTS.media_field().map(|field| field.key), Some("media"));
    }

    #[test]
    fn only_id_customer_and_status_are_searchable_for_orders() {
        let searchable = ORDERS
            .columns
            .iter()
            .filter(|column| column.searchable)
            .map(|column| column.key)
            .collect::<Vec<_>>();
        assert_eq!(searchable, vec!["_id", "customer_id", "status"]);
    }

    #[test]
    fn descriptor_lookup_round_trips_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
            assert_eq!(kind.descriptor().path(), kind.as_str());
        }
    }
}
