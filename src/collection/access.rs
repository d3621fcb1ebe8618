use crate::core::{ModelError, Result, Value};
use crate::model::Model;
use indexmap::IndexMap;

/// A name/value record, as produced by `Model::to_array` and consumed by the
/// store collaborator.
pub type Record = IndexMap<String, Value>;

/// Capability probe behind the collection's derived operations (`find`,
/// `pluck`, `expand`, `order`).
///
/// Each item kind advertises only what it supports; `find` picks its matching
/// branch from the combination:
/// - declared-property introspection (`declared` + lenient `read`),
/// - generic attribute read (`read` alone; may fail hard per item),
/// - identity comparison (`identity` alone).
pub trait ItemAccess {
    /// Declared-property introspection; `None` when the item carries no
    /// declaration table.
    fn declared(&self, _name: &str) -> Option<bool> {
        None
    }

    /// Attribute-style read; `None` when the item has no readable attributes.
    /// `Some(Err(_))` is a per-item hard failure.
    fn read(&self, _name: &str) -> Option<Result<Value>> {
        None
    }

    /// Record view, when the item can flatten itself to name/value pairs.
    fn record(&self) -> Option<Record> {
        None
    }

    /// The item's own value, for identity comparison.
    fn identity(&self) -> Option<Value> {
        None
    }

    /// Sort key for natural ordering without a property.
    fn sort_key(&self) -> Option<Value> {
        self.identity()
    }
}

impl ItemAccess for Model {
    fn declared(&self, name: &str) -> Option<bool> {
        Some(self.is_property(name))
    }

    fn read(&self, name: &str) -> Option<Result<Value>> {
        Some(Ok(self.get_value(name).cloned().unwrap_or(Value::Null)))
    }

    fn record(&self) -> Option<Record> {
        Some(self.to_array(&[]))
    }
}

impl ItemAccess for Record {
    fn read(&self, name: &str) -> Option<Result<Value>> {
        // Missing keys fail hard in this branch, unlike model reads.
        Some(
            self.get(name)
                .cloned()
                .ok_or_else(|| ModelError::UnknownProperty(name.to_string())),
        )
    }

    fn record(&self) -> Option<Record> {
        Some(self.clone())
    }
}

impl ItemAccess for Value {
    fn identity(&self) -> Option<Value> {
        Some(self.clone())
    }
}
