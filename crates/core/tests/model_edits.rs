use classlens_core::classfile::code::OFFSET_ATTRIBUTES;
use classlens_core::classfile::{
    access, opcodes, parse, ClassNode, ClassVersion, Constant, FieldNode, Instruction,
    MethodBody, MethodNode, Operand, RawAttribute,
};
use classlens_core::context::{LoadingScope, ReflectedClass, ReflectedMember};
use classlens_core::{ClassModel, ModelError, Provenance, TypeName};

fn name(value: &str) -> TypeName {
    TypeName::new(value).unwrap()
}

fn returns_int(value: i8) -> MethodBody {
    MethodBody::new(
        1,
        1,
        vec![
            Instruction::with_operand(opcodes::BIPUSH, Operand::Byte(value)),
            Instruction::new(opcodes::IRETURN),
        ],
    )
}

fn parsed_model() -> ClassModel {
    let mut node = ClassNode::new(name("demo/Counter"), Some(name("java/lang/Object")));
    node.fields.push(FieldNode::new(access::PRIVATE, "count", "I"));
    node.methods.push(MethodNode::new(access::PUBLIC, "value", "()I", Some(returns_int(7))));
    node.methods.push(MethodNode::new(
        access::PUBLIC | access::ABSTRACT,
        "reset",
        "()V",
        None,
    ));
    let bytes = node.to_bytes().unwrap();
    ClassModel::from_parsed(parse(&bytes).unwrap(), Some(LoadingScope::new("app")))
}

fn live_model() -> ClassModel {
    ClassModel::from_reflected(
        ReflectedClass {
            name: name("demo/Live"),
            access: access::PUBLIC | access::SUPER,
            super_name: Some(name("java/lang/Object")),
            interfaces: vec![name("java/io/Serializable")],
            fields: vec![ReflectedMember::new(access::PUBLIC, "id", "J")],
            methods: vec![ReflectedMember::new(access::PUBLIC, "run", "()V")],
        },
        None,
    )
}

#[test]
fn reads_reflect_the_decoded_tree() {
    let model = parsed_model();
    assert_eq!(model.name().as_internal(), "demo/Counter");
    assert_eq!(model.super_name().unwrap().java_name(), "java.lang.Object");
    assert!(!model.is_interface());
    assert_eq!(model.version(), ClassVersion::JAVA_8);
    assert_eq!(model.field("count").unwrap().descriptor, "I");
    assert_eq!(model.method_names(), vec!["value", "reset"]);
    assert_eq!(model.method("value", "()I").unwrap().body.as_ref().unwrap().len(), 2);
    assert_eq!(model.scope().unwrap().name(), "app");
    assert_eq!(model.provenance(), Provenance::Parsed);
}

#[test]
fn edits_survive_re_encoding() {
    let mut model = parsed_model();
    model.add_field(FieldNode::new(access::PUBLIC, "label", "Ljava/lang/String;")).unwrap();
    model.remove_field("count").unwrap();
    assert!(model.add_interface(name("java/lang/Runnable")).unwrap());
    assert!(!model.add_interface(name("java/lang/Runnable")).unwrap());

    let index = model.constants_mut().unwrap().intern_string("hello").unwrap();
    let body = MethodBody::new(
        1,
        1,
        vec![
            Instruction::with_operand(opcodes::LDC, Operand::Constant(index)),
            Instruction::new(opcodes::ARETURN),
        ],
    );
    model
        .add_method(MethodNode::new(access::PUBLIC, "greet", "()Ljava/lang/String;", Some(body)))
        .unwrap();
    model.set_method_body("value", "()I", returns_int(42)).unwrap();

    let reparsed = parse(&model.to_bytes().unwrap()).unwrap();
    assert!(reparsed.fields.iter().all(|f| f.name != "count"));
    assert!(reparsed.fields.iter().any(|f| f.name == "label"));
    assert_eq!(reparsed.interfaces, vec![name("java/lang/Runnable")]);
    let value = reparsed.methods.iter().find(|m| m.name == "value").unwrap();
    assert_eq!(
        value.body.as_ref().unwrap().instructions[0].operand,
        Operand::Byte(42)
    );
    let greet = reparsed.methods.iter().find(|m| m.name == "greet").unwrap();
    let Operand::Constant(ldc) = greet.body.as_ref().unwrap().instructions[0].operand else {
        panic!("expected constant operand");
    };
    assert!(matches!(
        reparsed.constant_pool.get(ldc).unwrap(),
        Constant::String { .. }
    ));
}

#[test]
fn edit_errors_are_reported() {
    let mut model = parsed_model();
    assert!(matches!(
        model.add_field(FieldNode::new(0, "count", "J")),
        Err(ModelError::DuplicateField { .. })
    ));
    assert!(matches!(
        model.add_method(MethodNode::new(0, "value", "()I", None)),
        Err(ModelError::DuplicateMethod { .. })
    ));
    assert!(matches!(
        model.remove_method("missing", "()V"),
        Err(ModelError::NoSuchMethod { .. })
    ));
    assert!(matches!(model.remove_field("missing"), Err(ModelError::NoSuchField { .. })));
    assert!(matches!(
        model.set_method_body("reset", "()V", returns_int(1)),
        Err(ModelError::BodilessMethod { .. })
    ));
    assert!(matches!(
        model.method_body_mut("reset", "()V"),
        Err(ModelError::BodilessMethod { .. })
    ));
    assert!(matches!(
        model.add_method(MethodNode::new(access::NATIVE, "peek", "()I", Some(returns_int(0)))),
        Err(ModelError::BodilessMethod { .. })
    ));
}

#[test]
fn body_edits_drop_pc_dependent_attributes() {
    let mut model = parsed_model();
    let mut body = returns_int(3);
    for attr in OFFSET_ATTRIBUTES {
        body.attributes.push(RawAttribute { name: attr.to_string(), data: vec![0, 0] });
    }
    body.attributes.push(RawAttribute { name: "Custom".to_string(), data: vec![1] });
    model.set_method_body("value", "()I", body).unwrap();

    let body = model.method_body_mut("value", "()I").unwrap();
    let names: Vec<&str> = body.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Custom"]);
    body.instructions.insert(0, Instruction::new(opcodes::NOP));
    assert_eq!(model.method("value", "()I").unwrap().body.as_ref().unwrap().len(), 3);
}

#[test]
fn clones_are_independent() {
    let original = parsed_model();
    let mut copy = original.clone();
    copy.remove_method("value", "()I").unwrap();
    copy.constants_mut().unwrap().intern_utf8("only-in-copy").unwrap();
    assert!(original.method("value", "()I").is_some());
    assert_ne!(original.constants().len(), copy.constants().len());
}

#[test]
fn live_models_are_read_only() {
    let mut model = live_model();
    assert_eq!(model.provenance(), Provenance::Live);
    assert!(model.scope().is_none());
    assert_eq!(model.field("id").unwrap().descriptor, "J");
    assert!(model.method("run", "()V").unwrap().body.is_none());
    assert_eq!(model.interfaces(), &[name("java/io/Serializable")]);

    assert!(matches!(model.to_bytes(), Err(ModelError::LiveTypeReadOnly(_))));
    assert!(matches!(
        model.add_field(FieldNode::new(0, "x", "I")),
        Err(ModelError::LiveTypeReadOnly(_))
    ));
    assert!(matches!(model.constants_mut(), Err(ModelError::LiveTypeReadOnly(_))));
    assert!(matches!(
        model.method_body_mut("run", "()V"),
        Err(ModelError::LiveTypeReadOnly(_))
    ));
}

#[test]
fn summary_counts_instructions() {
    let summary = parsed_model().summary();
    assert_eq!(summary.name, "demo.Counter");
    assert_eq!(summary.version, "52.0");
    assert_eq!(summary.methods[0].instructions, Some(2));
    assert_eq!(summary.methods[1].instructions, None);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["provenance"], "parsed");
    assert!(json["methods"][1].get("instructions").is_none());
}
