//! Parent → child component bindings: bridged reads and redraw
//! notifications.

use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};

fn register_pair() {
    // The child renders a path its parent provides.
    register_template(Template::new(
        51,
        vec![TemplateNode::element(
            "span",
            &[],
            Some("textContent:label"),
            vec![],
        )],
    ));
    let child_state = StateClass::builder()
        .data(|| Value::object([("label", Value::string("?"))]))
        .build();
    register_component_class(ComponentClass {
        tag: "x-chip".into(),
        template_id: 51,
        state_class: child_state,
        config: ComponentConfig::default(),
    });

    register_template(Template::new(
        52,
        vec![TemplateNode::element(
            "x-chip",
            &[],
            Some("state.label:user.name"),
            vec![],
        )],
    ));
    let parent_state = StateClass::builder()
        .data(|| {
            Value::object([(
                "user",
                Value::object([("name", Value::string("alice"))]),
            )])
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-card".into(),
        template_id: 52,
        state_class: parent_state,
        config: ComponentConfig::default(),
    });
}

#[test]
fn child_reads_through_the_bridge() {
    register_pair();
    let host = TestHost::new();
    let handle = host.mount("x-card").unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("alice"));
}

#[test]
fn parent_writes_notify_the_child() {
    register_pair();
    let host = TestHost::new();
    let handle = host.mount("x-card").unwrap();

    handle
        .update(|state| state.set("user.name", Value::string("bob")))
        .unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("bob"));
}

#[test]
fn parent_and_child_engines_are_linked() {
    register_pair();
    let host = TestHost::new();
    let handle = host.mount("x-card").unwrap();
    let children = handle.engine().child_engines();
    assert_eq!(children.len(), 1);
    let child = &children[0];
    assert_eq!(child.tag(), "x-chip");
    let parent = child.parent_engine().unwrap();
    assert_eq!(parent.id, handle.engine().id);
}
