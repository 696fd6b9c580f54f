//! Mount a component and watch a text binding track state writes.

use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};

fn register_profile() {
    register_template(Template::new(
        1,
        vec![TemplateNode::element(
            "span",
            &[],
            Some("textContent:user.name"),
            vec![],
        )],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([(
                "user",
                Value::object([("name", Value::string("alice"))]),
            )])
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-profile".into(),
        template_id: 1,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

#[test]
fn mounted_text_reflects_state() {
    register_profile();
    let host = TestHost::new();
    let handle = host.mount("x-profile").unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("alice"));

    handle
        .update(|state| state.set("user.name", Value::string("bob")))
        .unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("bob"));
    assert_eq!(handle.read("user.name").unwrap(), Value::string("bob"));
}

#[test]
fn writes_in_one_transaction_render_once() {
    register_profile();
    let host = TestHost::new();
    let handle = host.mount("x-profile").unwrap();

    handle
        .update(|state| {
            state.set("user.name", Value::string("x"))?;
            state.set("user.name", Value::string("y"))?;
            state.set("user.name", Value::string("z"))
        })
        .unwrap();
    // The render sees state as of the last write.
    assert_eq!(handle.first_text("span").as_deref(), Some("z"));
}

#[test]
fn a_broken_binding_does_not_freeze_the_component() {
    register_template(Template::new(
        2,
        vec![
            TemplateNode::element("span", &[], Some("textContent:missing.thing"), vec![]),
            TemplateNode::element("span", &[], Some("textContent:user.name"), vec![]),
        ],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([(
                "user",
                Value::object([("name", Value::string("alice"))]),
            )])
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-partial".into(),
        template_id: 2,
        state_class: state,
        config: ComponentConfig::default(),
    });

    let host = TestHost::new();
    let handle = host.mount("x-partial").unwrap();
    let texts = handle.texts("span");
    // The bad binding leaves its node untouched; the good one renders.
    assert_eq!(texts, vec!["".to_string(), "alice".to_string()]);

    handle
        .update(|state| state.set("user.name", Value::string("bob")))
        .unwrap();
    assert_eq!(handle.texts("span")[1], "bob");
}
