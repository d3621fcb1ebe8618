use propmodel::{
    Model, ModelDescriptor, ModelError, ModelRegistry, PropertyDeclaration, RelationSpec, Resolved,
    Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn remote_descriptor() -> ModelDescriptor {
    let mut descriptor = ModelDescriptor::new("remote");
    descriptor
        .add_property(PropertyDeclaration::new("test"), false)
        .unwrap();
    descriptor
}

fn source_model(spec: RelationSpec) -> Model {
    let mut descriptor = ModelDescriptor::new("source");
    descriptor
        .add_property(PropertyDeclaration::new("test"), false)
        .unwrap();
    descriptor
        .add_property(PropertyDeclaration::relation("relate_to_me", spec), false)
        .unwrap();
    Model::from_descriptor(descriptor)
}

fn registry_with_remote() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register("remote", || Model::from_descriptor(remote_descriptor()));
    registry
        .register_method("remote", "derive", |model, local| {
            model.set_value("test", local);
            Ok(Value::Null)
        })
        .unwrap();
    registry
        .register_method("remote", "shout", |_, local| match local.as_str() {
            Some(s) => Ok(Value::Text(s.to_ascii_uppercase())),
            None => Ok(Value::Null),
        })
        .unwrap();
    registry
}

#[test]
fn test_relation_returns_mutated_instance() {
    let registry = Arc::new(registry_with_remote());

    let mut model = source_model(RelationSpec::new("remote", "derive", "test"));
    model.bind_registry(registry);
    model.set("test", "woo").unwrap();

    match model.get("relate_to_me").unwrap() {
        Resolved::Model(related) => {
            assert_eq!(related.get_value("test"), Some(&Value::Text("woo".into())));
        }
        other => panic!("expected related model, got {:?}", other),
    }
}

#[test]
fn test_relation_returning_value() {
    let registry = Arc::new(registry_with_remote());

    let mut model = source_model(RelationSpec::new("remote", "shout", "test").returning_value());
    model.bind_registry(registry);
    model.set("test", "woo").unwrap();

    assert_eq!(
        model.get("relate_to_me").unwrap().value(),
        Some(Value::Text("WOO".into()))
    );
}

#[test]
fn test_relation_local_value_defaults_to_null() {
    let registry = Arc::new(registry_with_remote());

    let mut model = source_model(RelationSpec::new("remote", "derive", "test"));
    model.bind_registry(registry);

    let related = model.get("relate_to_me").unwrap().model().unwrap();
    assert_eq!(related.get_value("test"), Some(&Value::Null));
}

#[test]
fn test_unknown_target_and_method() {
    let registry = Arc::new(registry_with_remote());

    let mut model = source_model(RelationSpec::new("missing", "derive", "test"));
    model.bind_registry(Arc::clone(&registry));
    let err = model.get("relate_to_me").unwrap_err();
    assert!(matches!(err, ModelError::InvalidRelationTarget(name) if name == "missing"));

    let mut model = source_model(RelationSpec::new("remote", "missing", "test"));
    model.bind_registry(registry);
    let err = model.get("relate_to_me").unwrap_err();
    match err {
        ModelError::InvalidRelationMethod { target, method } => {
            assert_eq!(target, "remote");
            assert_eq!(method, "missing");
        }
        other => panic!("expected method error, got {}", other),
    }
}

#[test]
fn test_unbound_registry_fails_target_resolution() {
    let model = source_model(RelationSpec::new("remote", "derive", "test"));
    let err = model.get("relate_to_me").unwrap_err();
    assert!(matches!(err, ModelError::InvalidRelationTarget(_)));
}

#[test]
fn test_resolution_is_never_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));

    let mut registry = ModelRegistry::new();
    registry.register("remote", || Model::from_descriptor(remote_descriptor()));
    let counter = Arc::clone(&calls);
    registry
        .register_method("remote", "derive", move |model, local| {
            counter.fetch_add(1, Ordering::SeqCst);
            model.set_value("test", local);
            Ok(Value::Null)
        })
        .unwrap();

    let mut model = source_model(RelationSpec::new("remote", "derive", "test"));
    model.bind_registry(Arc::new(registry));
    model.set("test", "woo").unwrap();

    model.get("relate_to_me").unwrap();
    model.get("relate_to_me").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_related_instances_inherit_the_registry() {
    let registry = Arc::new(registry_with_remote());

    let mut model = source_model(RelationSpec::new("remote", "derive", "test"));
    model.bind_registry(Arc::clone(&registry));

    let related = model.get("relate_to_me").unwrap().model().unwrap();
    assert!(related.registry().is_some());
}

#[test]
fn test_registry_instantiate() {
    let registry = Arc::new(registry_with_remote());

    let model = registry.instantiate("remote").unwrap();
    assert!(model.is_property("test"));

    let err = registry.instantiate("missing").unwrap_err();
    assert!(err.to_string().contains("not registered"));
}

#[test]
fn test_register_method_on_unknown_target() {
    let mut registry = ModelRegistry::new();
    let err = registry
        .register_method("ghost", "derive", |_, _| Ok(Value::Null))
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidRelationTarget(name) if name == "ghost"));
}
