//! `<select>.value` applies after its options are built.

use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};
use structive_dom::PropertyValue;

fn register_picker() {
    register_template(Template::new(
        61,
        vec![TemplateNode::element(
            "select",
            &[],
            Some("value:choice"),
            vec![TemplateNode::embed(62)],
        )],
    ));
    register_template(Template::structural(
        62,
        "for:options",
        vec![TemplateNode::element(
            "option",
            &[],
            Some("value:options.*;textContent:options.*"),
            vec![],
        )],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([
                (
                    "options",
                    Value::array([
                        Value::string("a"),
                        Value::string("b"),
                        Value::string("c"),
                    ]),
                ),
                ("choice", Value::string("b")),
            ])
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-picker".into(),
        template_id: 61,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

#[test]
fn select_value_lands_after_options_exist() {
    register_picker();
    let host = TestHost::new();
    let handle = host.mount("x-picker").unwrap();

    assert_eq!(handle.texts("option"), vec!["a", "b", "c"]);
    let select = handle.elements("select")[0];
    assert_eq!(
        handle.property(select, "value"),
        Some(PropertyValue::Text("b".into()))
    );
}

#[test]
fn changing_the_choice_updates_the_select() {
    register_picker();
    let host = TestHost::new();
    let handle = host.mount("x-picker").unwrap();
    let select = handle.elements("select")[0];

    handle
        .update(|state| state.set("choice", Value::string("c")))
        .unwrap();
    assert_eq!(
        handle.property(select, "value"),
        Some(PropertyValue::Text("c".into()))
    );
}
