pub mod declaration;
pub mod registry;

pub use declaration::{
    LoadHook, ModelDescriptor, PropertyDeclaration, PropertyKind, RelationReturn, RelationSpec,
    Validator,
};
pub use registry::{ModelFactory, ModelRegistry, RelationMethod, Resolved};

use crate::core::{ModelError, Result, Value};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const DEFAULT_VALIDATION_MESSAGE: &str = "invalid value";

/// A model instance: a shared declaration table plus an instance-scoped
/// value bag, message store, and optional relation registry handle.
///
/// Accessors come in two tiers that are deliberately not unified:
/// the strict `set`/`get` pair raises on unknown names, while the lenient
/// `fetch` falls back to the absent marker.
#[derive(Clone)]
pub struct Model {
    descriptor: Arc<ModelDescriptor>,
    values: IndexMap<String, Value>,
    messages: HashMap<String, String>,
    registry: Option<Arc<ModelRegistry>>,
}

impl Model {
    pub fn new(descriptor: Arc<ModelDescriptor>) -> Self {
        Self {
            descriptor,
            values: IndexMap::new(),
            messages: HashMap::new(),
            registry: None,
        }
    }

    pub fn from_descriptor(descriptor: ModelDescriptor) -> Self {
        Self::new(Arc::new(descriptor))
    }

    pub fn descriptor(&self) -> &Arc<ModelDescriptor> {
        &self.descriptor
    }

    pub fn bind_registry(&mut self, registry: Arc<ModelRegistry>) {
        self.registry = Some(registry);
    }

    pub fn registry(&self) -> Option<&Arc<ModelRegistry>> {
        self.registry.as_ref()
    }

    /// Instance-level declaration insert.
    ///
    /// Copy-on-write: the shared descriptor is cloned on first deviation, so
    /// sibling instances of the same type are unaffected.
    pub fn add_property(
        &mut self,
        declaration: PropertyDeclaration,
        override_existing: bool,
    ) -> Result<()> {
        Arc::make_mut(&mut self.descriptor).add_property(declaration, override_existing)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.descriptor.property(name)
    }

    pub fn properties(&self) -> &[PropertyDeclaration] {
        self.descriptor.properties()
    }

    pub fn is_property(&self, name: &str) -> bool {
        self.descriptor.is_property(name)
    }

    /// Unconditional value-bag write; bypasses guard checks. Used internally
    /// by relation methods and by non-enforcing loads.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Pure value-bag read; `None` is the absent marker.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Strict setter: unknown names are an error, guarded properties drop
    /// the write silently.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let declaration = self
            .descriptor
            .property(name)
            .ok_or_else(|| ModelError::UnknownProperty(name.to_string()))?;
        if declaration.guarded {
            tracing::debug!(property = %name, "dropping write to guarded property");
            return Ok(());
        }
        let key = declaration.name.clone();
        self.values.insert(key, value.into());
        Ok(())
    }

    /// Strict getter: unknown names are an error; relation properties
    /// resolve through the registry on every call.
    pub fn get(&self, name: &str) -> Result<Resolved> {
        let declaration = self
            .descriptor
            .property(name)
            .ok_or_else(|| ModelError::UnknownProperty(name.to_string()))?;

        if let Some(spec) = declaration.relation_spec() {
            let registry = self
                .registry
                .as_ref()
                .ok_or_else(|| ModelError::InvalidRelationTarget(spec.model.clone()))?;
            let local = self.values.get(&spec.local).cloned().unwrap_or(Value::Null);
            return registry.resolve(spec, local);
        }

        Ok(Resolved::Value(
            self.values.get(name).cloned().unwrap_or(Value::Null),
        ))
    }

    /// Lenient accessor: case-insensitive match against declared names,
    /// absent marker instead of an error on a miss.
    pub fn fetch(&self, name: &str) -> Option<Value> {
        let needle = name.to_ascii_lowercase();
        let declared = self
            .descriptor
            .properties()
            .iter()
            .find(|decl| decl.name.to_ascii_lowercase() == needle);

        match declared {
            Some(decl) => self.values.get(&decl.name).cloned(),
            None => {
                tracing::debug!(property = %name, "lenient accessor miss");
                None
            }
        }
    }

    /// Bulk ingest. Per declared key: the load hook pre-transforms the value,
    /// then guarded properties are skipped when `enforce_guard` is set,
    /// otherwise the write goes through the unconditional path. Unknown keys
    /// are ignored.
    pub fn load<I>(&mut self, data: I, enforce_guard: bool)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in data {
            let Some(declaration) = self.descriptor.property(&key) else {
                tracing::debug!(key = %key, "ignoring unknown key in load");
                continue;
            };

            let value = match self.descriptor.load_hook(&key) {
                Some(hook) => hook(value),
                None => value,
            };

            if enforce_guard && declaration.guarded {
                tracing::debug!(property = %key, "skipping guarded property in load");
                continue;
            }

            let name = declaration.name.clone();
            self.values.insert(name, value);
        }
    }

    /// Copy of the value bag minus the names in `filter`. Filters only by the
    /// explicit exclusion list, never by declared properties.
    pub fn to_array(&self, filter: &[&str]) -> IndexMap<String, Value> {
        self.values
            .iter()
            .filter(|(name, _)| !filter.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Required-field and validation pass, walking declarations in order.
    ///
    /// Per property: the required check runs first, then the validator (only
    /// when a value is present). The first failure wins; a failing validator
    /// reports the field's custom message if one was set.
    ///
    /// A stored `Value::Null` counts as "no value" here, same as an absent
    /// entry: it fails the required check and is never fed to a validator.
    pub fn verify(&self, ignore: &[&str]) -> Result<()> {
        for declaration in self.descriptor.properties() {
            if ignore.contains(&declaration.name.as_str()) {
                continue;
            }

            let value = self.values.get(&declaration.name).filter(|v| !v.is_null());
            if declaration.required && value.is_none() {
                return Err(ModelError::RequiredPropertyMissing(declaration.name.clone()));
            }

            if let (Some(value), Some(validator)) =
                (value, self.descriptor.validator(&declaration.name))
                && !validator(value)
            {
                let message = self
                    .messages
                    .get(&declaration.name)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_VALIDATION_MESSAGE.to_string());
                return Err(ModelError::Validation {
                    property: declaration.name.clone(),
                    message,
                });
            }
        }
        Ok(())
    }

    /// Auxiliary message store; set in advance to override the default
    /// message `verify` reports for a field.
    pub fn set_message(&mut self, field: impl Into<String>, text: impl Into<String>) {
        self.messages.insert(field.into(), text.into());
    }

    pub fn get_message(&self, field: &str) -> Option<&str> {
        self.messages.get(field).map(String::as_str)
    }

    pub fn messages(&self) -> &HashMap<String, String> {
        &self.messages
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type", &self.descriptor.name())
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
