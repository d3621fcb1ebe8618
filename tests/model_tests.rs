use propmodel::{
    DataType, Model, ModelDescriptor, ModelError, PropertyDeclaration, Resolved, Value,
};

fn user_descriptor() -> ModelDescriptor {
    let mut descriptor = ModelDescriptor::new("user");
    descriptor
        .add_property(
            PropertyDeclaration::scalar("id", DataType::Integer).describe("primary key"),
            false,
        )
        .unwrap();
    descriptor
        .add_property(PropertyDeclaration::new("name").required(), false)
        .unwrap();
    descriptor
        .add_property(PropertyDeclaration::new("email"), false)
        .unwrap();
    descriptor
        .add_property(PropertyDeclaration::new("secret").guarded(), false)
        .unwrap();
    descriptor.set_load_hook("email", |value| match value.as_str() {
        Some(s) => Value::Text(s.to_ascii_lowercase()),
        None => value,
    });
    descriptor.set_validator("email", |value| {
        value.as_str().is_some_and(|s| s.contains('@'))
    });
    descriptor
}

fn user() -> Model {
    Model::from_descriptor(user_descriptor())
}

#[test]
fn test_set_get_roundtrip() {
    let mut model = user();
    model.set("name", "alice").unwrap();

    match model.get("name").unwrap() {
        Resolved::Value(value) => assert_eq!(value, Value::Text("alice".into())),
        other => panic!("expected a value, got {:?}", other),
    }
}

#[test]
fn test_unset_property_reads_null() {
    let model = user();
    assert_eq!(model.get("name").unwrap().value(), Some(Value::Null));
    assert_eq!(model.get_value("name"), None);
}

#[test]
fn test_unknown_property_is_strict_error() {
    let mut model = user();

    let err = model.set("nope", 1i64).unwrap_err();
    assert!(err.to_string().contains("Unknown property 'nope'"));

    let err = model.get("nope").unwrap_err();
    assert!(matches!(err, ModelError::UnknownProperty(name) if name == "nope"));
}

#[test]
fn test_guarded_write_is_silent_noop() {
    let mut model = user();
    model.set("secret", "hunter2").unwrap();

    assert_eq!(model.get_value("secret"), None);
    assert_eq!(model.get("secret").unwrap().value(), Some(Value::Null));

    // The unconditional path still works.
    model.set_value("secret", "hunter2");
    assert_eq!(model.get_value("secret"), Some(&Value::Text("hunter2".into())));
}

#[test]
fn test_load_respects_and_bypasses_guards() {
    let data = vec![
        ("name".to_string(), Value::Text("bob".into())),
        ("secret".to_string(), Value::Text("s3cr3t".into())),
        ("unknown".to_string(), Value::Integer(9)),
    ];

    let mut model = user();
    model.load(data.clone(), true);
    assert_eq!(model.get_value("name"), Some(&Value::Text("bob".into())));
    assert_eq!(model.get_value("secret"), None);
    assert_eq!(model.get_value("unknown"), None);

    let mut model = user();
    model.load(data, false);
    assert_eq!(model.get_value("secret"), Some(&Value::Text("s3cr3t".into())));
}

#[test]
fn test_load_hook_transforms_value() {
    let mut model = user();
    model.load(
        vec![("email".to_string(), Value::Text("Bob@Example.COM".into()))],
        true,
    );
    assert_eq!(
        model.get_value("email"),
        Some(&Value::Text("bob@example.com".into()))
    );
}

#[test]
fn test_load_hook_runs_on_guard_bypass() {
    let mut descriptor = ModelDescriptor::new("user");
    descriptor
        .add_property(PropertyDeclaration::new("token").guarded(), false)
        .unwrap();
    descriptor.set_load_hook("token", |value| match value.as_str() {
        Some(s) => Value::Text(s.trim().to_string()),
        None => value,
    });

    let data = vec![("token".to_string(), Value::Text("  tok-123  ".into()))];

    let mut model = Model::from_descriptor(descriptor);
    model.load(data.clone(), false);
    assert_eq!(model.get_value("token"), Some(&Value::Text("tok-123".into())));

    // Enforcing the guard drops the write before the hooked value lands.
    let mut model = Model::from_descriptor(model.descriptor().as_ref().clone());
    model.load(data, true);
    assert_eq!(model.get_value("token"), None);
}

#[test]
fn test_duplicate_property_and_override() {
    let mut model = user();

    let err = model
        .add_property(PropertyDeclaration::new("name"), false)
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateProperty(name) if name == "name"));

    model
        .add_property(PropertyDeclaration::new("name").guarded(), true)
        .unwrap();
    assert!(model.property("name").unwrap().guarded);
}

#[test]
fn test_add_property_copy_on_write() {
    let mut first = user();
    let second = first.clone();

    first
        .add_property(PropertyDeclaration::new("extra"), false)
        .unwrap();

    assert!(first.is_property("extra"));
    assert!(!second.is_property("extra"));
}

#[test]
fn test_to_array_filters_by_exclusion_only() {
    let mut model = user();
    model.set("name", "carol").unwrap();
    model.set_value("stray", 1i64); // not declared, still in the bag

    let all = model.to_array(&[]);
    assert_eq!(all.len(), 2);
    assert!(all.contains_key("stray"));

    let filtered = model.to_array(&["name", "stray"]);
    assert!(filtered.is_empty());
}

#[test]
fn test_verify_required_first_then_validators() {
    let mut model = user();

    let err = model.verify(&[]).unwrap_err();
    assert!(matches!(err, ModelError::RequiredPropertyMissing(name) if name == "name"));

    model.set("name", "dave").unwrap();
    model.verify(&[]).unwrap();

    model.set("email", "not-an-address").unwrap();
    let err = model.verify(&[]).unwrap_err();
    match err {
        ModelError::Validation { property, message } => {
            assert_eq!(property, "email");
            assert_eq!(message, "invalid value");
        }
        other => panic!("expected validation error, got {}", other),
    }
}

#[test]
fn test_verify_treats_stored_null_as_missing() {
    let mut model = user();
    model.set("name", Value::Null).unwrap();

    // An explicit Null in the bag is no different from an absent entry.
    let err = model.verify(&[]).unwrap_err();
    assert!(matches!(err, ModelError::RequiredPropertyMissing(name) if name == "name"));

    // A Null in an optional, validated property skips the validator too.
    model.set("name", "grace").unwrap();
    model.set("email", Value::Null).unwrap();
    model.verify(&[]).unwrap();
}

#[test]
fn test_verify_ignore_list() {
    let model = user();
    // "name" is required but ignored here.
    model.verify(&["name"]).unwrap();
}

#[test]
fn test_verify_custom_message() {
    let mut model = user();
    model.set("name", "erin").unwrap();
    model.set("email", "broken").unwrap();
    model.set_message("email", "must look like an address");

    let err = model.verify(&[]).unwrap_err();
    assert!(err.to_string().contains("must look like an address"));
    assert_eq!(model.get_message("email"), Some("must look like an address"));
    assert_eq!(model.messages().len(), 1);
}

#[test]
fn test_fetch_is_lenient_and_case_insensitive() {
    let mut model = user();
    model.set("name", "frank").unwrap();

    assert_eq!(model.fetch("Name"), Some(Value::Text("frank".into())));
    assert_eq!(model.fetch("NAME"), Some(Value::Text("frank".into())));
    // Declared but unset and undeclared both miss without an error.
    assert_eq!(model.fetch("email"), None);
    assert_eq!(model.fetch("whatever"), None);
}

#[test]
fn test_declaration_lookups_are_pure() {
    let model = user();
    assert!(model.is_property("secret"));
    assert!(!model.is_property("ghost"));
    assert_eq!(model.properties().len(), 4);
    assert_eq!(
        model.property("id").unwrap().description.as_deref(),
        Some("primary key")
    );
}
