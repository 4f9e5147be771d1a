//! Negative tests covering the `ErrorKind` variants and their context

use std::sync::Arc;

use trellis::{Engine, EngineBuilder, ReferenceMode};
use trellis_core::converter::CollectionConverter;
use trellis_core::{ErrorKind, SystemAttribute, Value};
use trellis_stream::Node;
use trellis_test_utils::fixtures::{demo_registry, DEMO_TYPES};
use trellis_test_utils::GraphBuilder;

fn builder() -> EngineBuilder {
    Engine::builder(demo_registry())
        .alias("person", "demo.Person")
        .alias("team", "demo.Team")
        .alias("node", "demo.Node")
        .alias("drawing", "demo.Drawing")
        .alias("wallet", "demo.Wallet")
        .allow_types_matching([DEMO_TYPES])
}

fn engine() -> Engine {
    builder().build().unwrap()
}

#[test]
fn test_unknown_type_name() {
    let node = Node::new("team").with_child(Node::new("lead").with_attribute("class", "martian"));
    let error = engine().deserialize(&node, None).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ClassResolution { name } if name == "martian"));
    assert_eq!(error.context("path"), Some("/team/lead"));
}

#[test]
fn test_forbidden_type_in_class_attribute() {
    let engine = builder().deny_types(["demo.Employee"]).build().unwrap();
    let node = Node::new("team").with_child(Node::new("lead").with_attribute("class", "demo.Employee"));
    let error = engine.deserialize(&node, None).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ForbiddenType { type_name } if type_name == "demo.Employee"));
    assert_eq!(error.context("path"), Some("/team/lead"));
}

#[test]
fn test_alias_does_not_bypass_permissions() {
    let engine = Engine::builder(demo_registry())
        .alias("harmless", "demo.Secret")
        .allow_types(["demo.Person"])
        .build()
        .unwrap();
    let error = engine.deserialize(&Node::new("harmless"), None).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ForbiddenType { type_name } if type_name == "demo.Secret"));
}

#[test]
fn test_unresolved_reference() {
    for (mode, marker) in [
        (ReferenceMode::Id, "42"),
        (ReferenceMode::RelativePath, "../missing"),
        (ReferenceMode::AbsolutePath, "/team/missing"),
    ] {
        let engine = builder().reference_mode(mode).build().unwrap();
        let node = Node::new("team").with_child(Node::new("lead").with_attribute("reference", marker));
        let error = engine.deserialize(&node, None).unwrap_err();
        assert!(
            matches!(error.kind(), ErrorKind::UnresolvedReference { reference } if reference == marker),
            "{:?}: {}",
            mode,
            error
        );
    }
}

#[test]
fn test_invalid_value_reports_context() {
    let node = Node::new("node").with_child(
        Node::new("children").with_child(Node::new("int").with_value("twelve")),
    );
    let error = engine().deserialize(&node, None).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidValue { value, .. } if value == "twelve"));
    assert_eq!(error.context("path"), Some("/node/children/int"));
    assert_eq!(error.context("required-type"), Some("trellis.Int"));
    assert!(error.to_string().contains("required-type"));
}

#[test]
fn test_class_marker_outside_declared_type() {
    let node = Node::new("drawing").with_child(
        Node::new("shape")
            .with_attribute("class", "person")
            .with_child(Node::new("first").with_value("Eve")),
    );
    let error = engine().deserialize(&node, None).unwrap_err();
    assert!(matches!(
        error.kind(),
        ErrorKind::TypeMismatch { expected, found } if expected == "demo.Shape" && found == "demo.Person"
    ));
    assert_eq!(error.context("path"), Some("/drawing/shape"));
}

#[test]
fn test_primitive_class_marker_on_struct_field() {
    let node = Node::new("wallet").with_child(Node::new("owner").with_attribute("class", "int").with_value("7"));
    let error = engine().deserialize(&node, None).unwrap_err();
    assert!(matches!(
        error.kind(),
        ErrorKind::TypeMismatch { expected, found } if expected == "demo.Person" && found == "trellis.Int"
    ));
    assert_eq!(error.context("path"), Some("/wallet/owner"));
}

#[test]
fn test_reference_to_object_of_wrong_type() {
    let node = Node::new("wallet")
        .with_attribute("id", "1")
        .with_child(
            Node::new("cash")
                .with_attribute("id", "2")
                .with_child(Node::new("amount").with_value("12"))
                .with_child(Node::new("currency").with_value("EUR")),
        )
        .with_child(Node::new("owner").with_attribute("reference", "2"));
    let error = engine().deserialize(&node, None).unwrap_err();
    assert!(matches!(
        error.kind(),
        ErrorKind::TypeMismatch { expected, found } if expected == "demo.Person" && found == "demo.Money"
    ));
    assert_eq!(error.context("path"), Some("/wallet/owner"));
}

#[test]
fn test_null_class_marker_fits_any_field() {
    let engine = engine();
    let node = Node::new("wallet").with_child(Node::new("owner").with_attribute("class", "null"));
    let decoded = engine.deserialize(&node, None).unwrap();
    let wallet = decoded.root.as_ref().unwrap();
    let owner = decoded.graph.field(engine.registry(), wallet, "owner").unwrap();
    assert!(owner.is_null());
}

#[test]
fn test_local_converter_must_accept_field_value() {
    let engine = builder()
        .register_local_converter("demo.Wallet", "owner", Arc::new(CollectionConverter))
        .build()
        .unwrap();
    let mut graph = GraphBuilder::new(engine.registry());
    let ada = graph.object("demo.Person", &[("first", "Ada".into())]);
    let wallet = graph.object("demo.Wallet", &[("owner", Value::Ref(ada))]);
    let graph = graph.build();

    let error = engine.serialize(&graph, &Value::Ref(wallet)).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ConverterMismatch { type_name, .. } if type_name == "demo.Person"));
    assert_eq!(error.context("path"), Some("/wallet/owner"));

    let node = Node::new("wallet").with_child(Node::new("owner").with_child(Node::new("first").with_value("Ada")));
    let error = engine.deserialize(&node, None).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::ConverterMismatch { type_name, .. } if type_name == "demo.Person"));
}

#[test]
fn test_local_converter_for_unknown_field() {
    let error = builder()
        .register_local_converter("demo.Wallet", "purse", Arc::new(CollectionConverter))
        .build()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidConfiguration(_)));
}

#[test]
fn test_duplicate_field() {
    let node = Node::new("person")
        .with_child(Node::new("first").with_value("Ada"))
        .with_child(Node::new("first").with_value("Augusta"));
    let error = engine().deserialize(&node, None).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::DuplicateField { field, .. } if field == "first"));
}

#[test]
fn test_structural_stream_error() {
    let error = engine().from_json("[1, 2, 3]", None).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::Stream(_)));
}

#[test]
fn test_disabled_id_attribute() {
    let engine = builder().disable_system_attribute(SystemAttribute::Id).build().unwrap();
    let mut graph = GraphBuilder::new(engine.registry());
    let ada = graph.object("demo.Person", &[("first", "Ada".into())]);
    let graph = graph.build();
    let error = engine.serialize(&graph, &Value::Ref(ada)).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidConfiguration(_)));

    // Without tracking the attribute is never needed.
    let engine = builder()
        .disable_system_attribute(SystemAttribute::Id)
        .reference_mode(ReferenceMode::NoReferences)
        .build()
        .unwrap();
    assert!(engine.serialize(&graph, &Value::Ref(ada)).is_ok());
}

#[test]
fn test_invalid_configuration() {
    let error = builder().implicit_collection("demo.Team", "name").build().unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidConfiguration(_)));

    let error = builder()
        .default_implementation("demo.Shape", "demo.Person")
        .build()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidConfiguration(_)));

    let error = builder().omit_field("demo.Person", "age").build().unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidConfiguration(_)));
}

#[test]
fn test_error_keeps_innermost_path() {
    let engine = builder().reference_mode(ReferenceMode::NoReferences).build().unwrap();
    let mut graph = GraphBuilder::new(engine.registry());
    let node = graph.object("demo.Node", &[("label", "loop".into())]);
    let children = graph.list("trellis.List", [Value::Ref(node)]);
    graph.set(node, "children", children);
    let graph = graph.build();

    let error = engine.serialize(&graph, &Value::Ref(node)).unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::Circularity { .. }));
    assert_eq!(error.context("path"), Some("/node/children/node"));
    assert_eq!(error.context("type"), Some("demo.Node"));
}
