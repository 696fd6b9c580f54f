//! Checkbox membership and radio equality bindings.

use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};
use structive_dom::PropertyValue;

fn register_controls() {
    register_template(Template::new(
        91,
        vec![
            TemplateNode::element(
                "input",
                &[("type", "checkbox"), ("value", "red")],
                Some("checkbox:colors"),
                vec![],
            ),
            TemplateNode::element(
                "input",
                &[("type", "checkbox"), ("value", "blue")],
                Some("checkbox:colors"),
                vec![],
            ),
            TemplateNode::element(
                "input",
                &[("type", "radio"), ("value", "a")],
                Some("radio:pick"),
                vec![],
            ),
            TemplateNode::element(
                "input",
                &[("type", "radio"), ("value", "b")],
                Some("radio:pick"),
                vec![],
            ),
        ],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([
                ("colors", Value::array([Value::string("red")])),
                ("pick", Value::string("b")),
            ])
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-controls".into(),
        template_id: 91,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

fn checked(handle: &structive::ComponentHandle, node: structive_dom::NodeId) -> bool {
    matches!(
        handle.property(node, "checked"),
        Some(PropertyValue::Bool(true))
    )
}

#[test]
fn checkbox_reflects_array_membership() {
    register_controls();
    let host = TestHost::new();
    let handle = host.mount("x-controls").unwrap();
    let inputs = handle.elements("input");
    assert!(checked(&handle, inputs[0]));
    assert!(!checked(&handle, inputs[1]));

    handle
        .update(|state| {
            state.set(
                "colors",
                Value::array([Value::string("red"), Value::string("blue")]),
            )
        })
        .unwrap();
    assert!(checked(&handle, inputs[0]));
    assert!(checked(&handle, inputs[1]));
}

#[test]
fn radio_reflects_equality() {
    register_controls();
    let host = TestHost::new();
    let handle = host.mount("x-controls").unwrap();
    let inputs = handle.elements("input");
    assert!(!checked(&handle, inputs[2]));
    assert!(checked(&handle, inputs[3]));

    handle
        .update(|state| state.set("pick", Value::string("a")))
        .unwrap();
    assert!(checked(&handle, inputs[2]));
    assert!(!checked(&handle, inputs[3]));
}
