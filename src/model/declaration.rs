use crate::core::{DataType, ModelError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-property pre-transform applied during `load`.
pub type LoadHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Per-property predicate consulted by `verify`.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// What a resolved relation hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationReturn {
    /// The instantiated related model, mutated by the invoked method.
    #[default]
    Instance,
    /// The invoked method's raw return value.
    Value,
}

/// Wiring for a lazily resolved cross-model relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    /// Registry identifier of the related model type.
    pub model: String,
    /// Method to invoke on the fresh instance.
    pub method: String,
    /// Local property whose current value is passed to the method.
    pub local: String,
    pub returns: RelationReturn,
}

impl RelationSpec {
    pub fn new(
        model: impl Into<String>,
        method: impl Into<String>,
        local: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            method: method.into(),
            local: local.into(),
            returns: RelationReturn::Instance,
        }
    }

    pub fn returning_value(mut self) -> Self {
        self.returns = RelationReturn::Value;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PropertyKind {
    #[default]
    Plain,
    /// Descriptive scalar tag, never enforced.
    Scalar(DataType),
    Relation(RelationSpec),
}

/// Static metadata describing one named property of a model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub kind: PropertyKind,
    /// A value must be present at verification time.
    pub required: bool,
    /// External writes through the strict setter are silently dropped.
    pub guarded: bool,
    /// Physical column name, interpreted only by the store collaborator.
    pub column: Option<String>,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: PropertyKind::Plain,
            required: false,
            guarded: false,
            column: None,
        }
    }

    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        let mut decl = Self::new(name);
        decl.kind = PropertyKind::Scalar(data_type);
        decl
    }

    pub fn relation(name: impl Into<String>, spec: RelationSpec) -> Self {
        let mut decl = Self::new(name);
        decl.kind = PropertyKind::Relation(spec);
        decl
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, PropertyKind::Relation(_))
    }

    pub fn relation_spec(&self) -> Option<&RelationSpec> {
        match &self.kind {
            PropertyKind::Relation(spec) => Some(spec),
            _ => None,
        }
    }

    /// Physical column backing this property, defaulting to its name.
    pub fn storage_column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Declaration table plus hook tables for one model type.
///
/// Shared by reference across instances; declaration order is the `verify`
/// walk order.
#[derive(Clone, Default)]
pub struct ModelDescriptor {
    name: String,
    properties: Vec<PropertyDeclaration>,
    load_hooks: HashMap<String, LoadHook>,
    validators: HashMap<String, Validator>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            load_hooks: HashMap::new(),
            validators: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a declaration; duplicate names are rejected unless
    /// `override_existing` is set, in which case the new declaration wins.
    pub fn add_property(
        &mut self,
        declaration: PropertyDeclaration,
        override_existing: bool,
    ) -> Result<()> {
        match self.find_index(&declaration.name) {
            Some(idx) => {
                if !override_existing {
                    return Err(ModelError::DuplicateProperty(declaration.name));
                }
                self.properties[idx] = declaration;
            }
            None => self.properties.push(declaration),
        }
        Ok(())
    }

    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|decl| decl.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.find_index(name).map(|idx| &self.properties[idx])
    }

    pub fn properties(&self) -> &[PropertyDeclaration] {
        &self.properties
    }

    pub fn is_property(&self, name: &str) -> bool {
        self.find_index(name).is_some()
    }

    pub fn set_load_hook(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) {
        self.load_hooks.insert(name.into(), Arc::new(hook));
    }

    pub fn set_validator(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    pub(crate) fn load_hook(&self, name: &str) -> Option<&LoadHook> {
        self.load_hooks.get(name)
    }

    pub(crate) fn validator(&self, name: &str) -> Option<&Validator> {
        self.validators.get(name)
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("load_hooks", &self.load_hooks.keys())
            .field("validators", &self.validators.keys())
            .finish()
    }
}
