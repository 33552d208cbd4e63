// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::iter;

use crate::entity::EntityDescriptor;
use crate::model::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub highlighted: bool,
}

impl TextSpan {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            highlighted: false,
        }
    }

    fn marked(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            highlighted: true,
        }
    }
}

/// Case-insensitive substring filter bound to one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchableColumnFilter<'a> {
    column: &'a str,
}

impl<'a> SearchableColumnFilter<'a> {
    pub const fn new(column: &'a str) -> Self {
        Self { column }
    }

    /// Only columns the descriptor marks searchable get a filter.
    pub fn for_column(descriptor: &EntityDescriptor, column: &'a str) -> Option<Self> {
        descriptor
            .column(column)
            .filter(|spec| spec.searchable)
            .map(|_| Self::new(column))
    }

    pub const fn column(&self) -> &'a str {
        self.column
    }

    pub fn matches(&self, record: &Record, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let Some(value) = record.text(self.column) else {
            return false;
        };
        fold_case(&value).contains(&fold_case(query))
    }
}

fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Lowercased text plus, for every lowered byte, the byte range of the
/// original char it came from.
fn fold_case_mapped(text: &str) -> (String, Vec<(usize, usize)>) {
    let mut folded = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (start, ch) in text.char_indices() {
        let end = start + ch.len_utf8();
        for lower in ch.to_lowercase() {
            folded.push(lower);
            origin.extend(iter::repeat_n((start, end), lower.len_utf8()));
        }
    }
    (folded, origin)
}

/// Splits `text` into spans, marking every case-insensitive occurrence of
/// `query`. Occurrences are found left to right and never overlap.
pub fn highlight(text: &str, query: &str) -> Vec<TextSpan> {
    if text.is_empty() {
        return Vec::new();
    }
    let needle = fold_case(query);
    if needle.is_empty() {
        return vec![TextSpan::plain(text)];
    }

    let (haystack, origin) = fold_case_mapped(text);
    let mut spans: Vec<TextSpan> = Vec::new();
    let mut cursor = 0;
    for (offset, found) in haystack.match_indices(needle.as_str()) {
        let start = origin[offset].0;
        let end = origin[offset + found.len() - 1].1;
        if start < cursor {
            continue;
        }
        if start > cursor {
            spans.push(TextSpan::plain(&text[cursor..start]));
        }
        match spans.last_mut() {
            Some(last) if last.highlighted && start == cursor => {
                last.text.push_str(&text[start..end]);
            }
            _ => spans.push(TextSpan::marked(&text[start..end])),
        }
        cursor = end;
    }
    if cursor < text.len() {
        spans.push(TextSpan::plain(&text[cursor..]));
    }
    spans
}

/// The one column currently searched in a table, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_text: String,
    pub column: Option<String>,
}

impl FilterState {
    /// Replaces whatever filter was active.
    pub fn apply(&mut self, column: &str, search_text: &str) {
        self.column = Some(column.to_owned());
        self.search_text = search_text.to_owned();
    }

    pub fn clear(&mut self) {
        self.column = None;
        self.search_text.clear();
    }

    pub fn is_active(&self) -> bool {
        self.column.is_some() && !self.search_text.is_empty()
    }

    pub fn admits(&self, record: &Record) -> bool {
        match &self.column {
            Some(column) => SearchableColumnFilter::new(column).matches(record, &self.search_text),
            None => true,
        }
    }

    /// Search text to highlight in `column`, when that column is the one
    /// being searched.
    pub fn query_for(&self, column: &str) -> Option<&str> {
        (self.is_active() && self.column.as_deref() == Some(column))
            .then_some(self.search_text.as_str())
    }
}
