//! Row type for projected results.

use super::value::Value;

/// A row of query results.
///
/// The shape is chosen per session: positional rows are plain value lists,
/// named rows pair each value with its column name.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Row {
    /// Get value by position (0-based).
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Row::Positional(values) => values.get(index),
            Row::Named(entries) => entries.get(index).map(|(_, v)| v),
        }
    }

    /// Get value by column name (case-insensitive). Only named rows carry
    /// names; use [`ResultSet::get_by_name`](crate::ResultSet::get_by_name)
    /// for positional rows.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        match self {
            Row::Positional(_) => None,
            Row::Named(entries) => entries
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v),
        }
    }

    /// Get the number of values.
    pub fn len(&self) -> usize {
        match self {
            Row::Positional(values) => values.len(),
            Row::Named(entries) => entries.len(),
        }
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Row::Named(_))
    }

    /// Column names, for named rows.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Row::Positional(_) => Vec::new(),
            Row::Named(entries) => entries.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }

    /// Iterate over values.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Row::Positional(values) => Box::new(values.iter()),
            Row::Named(entries) => Box::new(entries.iter().map(|(_, v)| v)),
        }
    }

    /// Consume the row, keeping only the values.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Row::Positional(values) => values,
            Row::Named(entries) => entries.into_iter().map(|(_, v)| v).collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_values().into_iter()
    }
}
