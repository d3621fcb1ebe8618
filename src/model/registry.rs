use crate::core::{ModelError, Result, Value};
use crate::model::Model;
use crate::model::declaration::{RelationReturn, RelationSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh instance of a relation-target model type.
///
/// This is the model-factory indirection: a persistence-aware caller registers
/// a closure capturing its store handle, so every related instance is built
/// with that handle without the resolution logic knowing about persistence.
pub type ModelFactory = Arc<dyn Fn() -> Model + Send + Sync>;

/// Invocable relation method: receives the fresh instance and the local
/// property's current value, returns a value the caller may or may not use.
pub type RelationMethod = Arc<dyn Fn(&mut Model, Value) -> Result<Value> + Send + Sync>;

/// Result of a strict property read.
pub enum Resolved {
    Value(Value),
    Model(Model),
}

impl Resolved {
    pub fn value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Model(_) => None,
        }
    }

    pub fn model(self) -> Option<Model> {
        match self {
            Self::Value(_) => None,
            Self::Model(model) => Some(model),
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Model(model) => f.debug_tuple("Model").field(model).finish(),
        }
    }
}

struct RelationTarget {
    factory: ModelFactory,
    methods: HashMap<String, RelationMethod>,
}

/// Startup-built registry mapping relation-target identifiers to factories
/// and method dispatch tables. Relation declarations resolve through this
/// registry instead of open-ended dynamic instantiation.
#[derive(Default)]
pub struct ModelRegistry {
    targets: HashMap<String, RelationTarget>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Model + Send + Sync + 'static,
    ) {
        self.targets.insert(
            name.into(),
            RelationTarget {
                factory: Arc::new(factory),
                methods: HashMap::new(),
            },
        );
    }

    pub fn register_method(
        &mut self,
        target: &str,
        method: impl Into<String>,
        f: impl Fn(&mut Model, Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<()> {
        let entry = self
            .targets
            .get_mut(target)
            .ok_or_else(|| ModelError::InvalidRelationTarget(target.to_string()))?;
        entry.methods.insert(method.into(), Arc::new(f));
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Build a registry-bound instance of a registered model type.
    pub fn instantiate(self: &Arc<Self>, name: &str) -> Result<Model> {
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| ModelError::InvalidRelationTarget(name.to_string()))?;
        let mut model = (target.factory)();
        model.bind_registry(Arc::clone(self));
        Ok(model)
    }

    /// Resolve a relation declaration against the local property's value.
    ///
    /// Always instantiates and invokes afresh; results are never memoized.
    pub fn resolve(self: &Arc<Self>, spec: &RelationSpec, local: Value) -> Result<Resolved> {
        let target = self
            .targets
            .get(&spec.model)
            .ok_or_else(|| ModelError::InvalidRelationTarget(spec.model.clone()))?;

        let mut related = (target.factory)();
        related.bind_registry(Arc::clone(self));

        let method = target.methods.get(&spec.method).cloned().ok_or_else(|| {
            ModelError::InvalidRelationMethod {
                target: spec.model.clone(),
                method: spec.method.clone(),
            }
        })?;

        tracing::debug!(model = %spec.model, method = %spec.method, "resolving relation");
        let returned = method(&mut related, local)?;

        match spec.returns {
            RelationReturn::Value => Ok(Resolved::Value(returned)),
            RelationReturn::Instance => Ok(Resolved::Model(related)),
        }
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("targets", &self.targets.keys())
            .finish()
    }
}
