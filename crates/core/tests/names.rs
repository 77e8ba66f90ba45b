use classlens_core::names::{NameError, TypeName};

#[test]
fn both_spellings_normalize_to_internal_form() {
    let dotted = TypeName::new("com.example.Widget").unwrap();
    let slashed = TypeName::new("com/example/Widget").unwrap();
    assert_eq!(dotted, slashed);
    assert_eq!(dotted.as_internal(), "com/example/Widget");
    assert_eq!(dotted.java_name(), "com.example.Widget");
    assert_eq!(dotted.to_string(), "com.example.Widget");
}

#[test]
fn accessors_split_package_and_simple_name() {
    let name = TypeName::new("com.example.Outer$Inner").unwrap();
    assert_eq!(name.simple_name(), "Outer$Inner");
    assert_eq!(name.package(), Some("com/example"));
    assert_eq!(name.resource_path(), "com/example/Outer$Inner.class");

    let bare = TypeName::new("Bare").unwrap();
    assert_eq!(bare.package(), None);
    assert_eq!(bare.simple_name(), "Bare");
}

#[test]
fn rejects_empty_and_malformed_names() {
    assert_eq!(TypeName::new(""), Err(NameError::Empty));
    for bad in ["com..Widget", ".Widget", "Widget/", "[Ljava/lang/String;", "a.b/c"] {
        assert!(
            matches!(TypeName::new(bad), Err(NameError::Malformed { .. })),
            "expected {bad} to be rejected"
        );
    }
}

#[test]
fn serde_uses_internal_form_and_validates() {
    let name = TypeName::new("java.lang.Object").unwrap();
    let json = serde_json::to_string(&name).unwrap();
    assert_eq!(json, "\"java/lang/Object\"");
    let back: TypeName = serde_json::from_str("\"java.lang.Object\"").unwrap();
    assert_eq!(back, name);
    assert!(serde_json::from_str::<TypeName>("\"\"").is_err());
}
