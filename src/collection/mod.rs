mod access;

pub use access::{ItemAccess, Record};

use crate::core::{ModelError, Result, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

/// Collection key: a stable insertion index or an explicit name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Ordered, keyed sequence of items.
///
/// Backed by an insertion-ordered map keyed by a stable index: `remove`
/// leaves a gap in the key space, iteration and `len` cover survivors only,
/// and appended items never reuse a removed index.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: IndexMap<Key, T>,
    next_index: usize,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
            next_index: 0,
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Order-preserving walk over the items. Re-iterating is the explicit
    /// rewind: call again for a fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }

    /// Keyed walk, exposing the surviving key space.
    pub fn entries(&self) -> impl Iterator<Item = (&Key, &T)> {
        self.items.iter()
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<&T> {
        self.items.get(&key.into())
    }

    pub fn get_mut(&mut self, key: impl Into<Key>) -> Option<&mut T> {
        self.items.get_mut(&key.into())
    }

    pub fn exists(&self, key: impl Into<Key>) -> bool {
        self.items.contains_key(&key.into())
    }

    /// Keyed write. Integer keys at or past the append cursor push it
    /// forward so later appends stay unique.
    pub fn set(&mut self, key: impl Into<Key>, item: T) {
        let key = key.into();
        if let Key::Index(index) = key {
            self.next_index = self.next_index.max(index + 1);
        }
        self.items.insert(key, item);
    }

    /// Delete by key, preserving the order of survivors; absent keys are a
    /// no-op.
    pub fn remove(&mut self, key: impl Into<Key>) -> Option<T> {
        self.items.shift_remove(&key.into())
    }

    /// Append at the next free insertion index.
    pub fn add(&mut self, item: T) {
        let key = Key::Index(self.next_index);
        self.next_index += 1;
        self.items.insert(key, item);
    }

    /// Sub-sequence starting at `start`.
    ///
    /// When `len` is omitted it defaults to `self.len() - 1`, not "all
    /// remaining".
    pub fn slice(&self, start: usize, len: Option<usize>) -> Vec<T>
    where
        T: Clone,
    {
        let len = len.unwrap_or_else(|| self.len().saturating_sub(1));
        self.items.values().skip(start).take(len).cloned().collect()
    }

    /// First `n` items as a new collection.
    pub fn take(&self, n: usize) -> Collection<T>
    where
        T: Clone,
    {
        Self::from_vec(self.slice(0, Some(n)))
    }

    /// Raw sequence of surviving items.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.values().cloned().collect()
    }

    /// Items passing the predicate, in original order, re-keyed from zero.
    /// The source collection is untouched.
    pub fn filter(&self, mut predicate: impl FnMut(&T) -> bool) -> Collection<T>
    where
        T: Clone,
    {
        self.items
            .values()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    /// Loose membership check. Items exposing an identity value compare via
    /// the same loose equality `find` uses, so `Text("1")` matches a stored
    /// `Integer(1)`; everything else falls back to structural equality.
    pub fn contains(&self, item: &T) -> bool
    where
        T: ItemAccess + PartialEq,
    {
        self.items.values().any(|stored| {
            if let (Some(a), Some(b)) = (stored.identity(), item.identity()) {
                a.loose_eq(&b)
            } else {
                stored == item
            }
        })
    }

    /// Value of `name` read off every item, in order. Items without an
    /// attribute-read capability fail the whole call.
    pub fn pluck(&self, name: &str) -> Result<Vec<Value>>
    where
        T: ItemAccess,
    {
        let mut values = Vec::with_capacity(self.items.len());
        for item in self.items.values() {
            match item.read(name) {
                Some(result) => values.push(result?),
                None => {
                    return Err(ModelError::Unsupported(format!(
                        "item does not support property reads ('{name}')"
                    )));
                }
            }
        }
        Ok(values)
    }

    /// JSON view of the sequence: items exposing a record capability are
    /// replaced by their record, the rest serialize as-is.
    pub fn expand(&self) -> Result<Vec<serde_json::Value>>
    where
        T: ItemAccess + Serialize,
    {
        let mut out = Vec::with_capacity(self.items.len());
        for item in self.items.values() {
            let json = match item.record() {
                Some(record) => serde_json::to_value(record)?,
                None => serde_json::to_value(item)?,
            };
            out.push(json);
        }
        Ok(out)
    }

    /// In-place sort.
    ///
    /// With a property, the direction mapping is inverted: `Desc` (the
    /// default) sorts ascending and `Asc` sorts descending, both preserving
    /// keys. Without a property, items sort naturally, the direction is
    /// honored as named, and the sequence is re-keyed from zero.
    pub fn order(&mut self, direction: SortDirection, property: Option<&str>) -> &mut Self
    where
        T: ItemAccess,
    {
        match property {
            Some(name) => {
                self.items.sort_by(|_, a, _, b| {
                    let ord = compare_by_property(a, b, name);
                    match direction {
                        SortDirection::Desc => ord,
                        SortDirection::Asc => ord.reverse(),
                    }
                });
            }
            None => {
                let mut items: Vec<T> = self.items.drain(..).map(|(_, item)| item).collect();
                items.sort_by(|a, b| {
                    let ord = compare_naturally(a, b);
                    match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                });
                self.next_index = 0;
                for item in items {
                    self.add(item);
                }
            }
        }
        self
    }

    /// First item whose match source for `name` loosely equals `value`.
    pub fn find(&self, name: &str, value: &Value) -> Result<Option<&T>>
    where
        T: ItemAccess,
    {
        for item in self.items.values() {
            if matches_item(item, name, value)? {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Every matching item, in original order; empty when none match.
    pub fn find_all(&self, name: &str, value: &Value) -> Result<Vec<&T>>
    where
        T: ItemAccess,
    {
        let mut matches = Vec::new();
        for item in self.items.values() {
            if matches_item(item, name, value)? {
                matches.push(item);
            }
        }
        Ok(matches)
    }
}

/// Per-item match source for `find`:
/// items with declared-property introspection only match when the property is
/// declared (then read leniently); plain readable items go through their own
/// read contract (maps fail hard on a missing key); everything else compares
/// its identity.
fn matches_item<T: ItemAccess>(item: &T, name: &str, value: &Value) -> Result<bool> {
    let candidate = match item.declared(name) {
        Some(false) => return Ok(false),
        Some(true) => match item.read(name) {
            Some(result) => result?,
            None => Value::Null,
        },
        None => match item.read(name) {
            Some(result) => result?,
            None => match item.identity() {
                Some(identity) => identity,
                None => return Ok(false),
            },
        },
    };
    Ok(candidate.loose_eq(value))
}

fn compare_by_property<T: ItemAccess>(a: &T, b: &T, name: &str) -> Ordering {
    let left = property_sort_value(a, name);
    let right = property_sort_value(b, name);
    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}

fn compare_naturally<T: ItemAccess>(a: &T, b: &T) -> Ordering {
    let left = a.sort_key().unwrap_or(Value::Null);
    let right = b.sort_key().unwrap_or(Value::Null);
    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}

fn property_sort_value<T: ItemAccess>(item: &T, name: &str) -> Value {
    match item.read(name) {
        Some(Ok(value)) => value,
        _ => item.identity().unwrap_or(Value::Null),
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for item in iter {
            collection.add(item);
        }
        collection
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = indexmap::map::IntoValues<Key, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_values()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = indexmap::map::Values<'a, Key, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}
