//! Output filter pipelines end to end.

use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, ErrorCode, StateClass, TestHost, Value};

fn register_badge(template_id: u32, bind_text: &str, tag: &str) {
    register_template(Template::new(
        template_id,
        vec![TemplateNode::element("span", &[], Some(bind_text), vec![])],
    ));
    let state = StateClass::builder()
        .data(|| Value::object([("value", Value::string(""))]))
        .build();
    register_component_class(ComponentClass {
        tag: tag.into(),
        template_id,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

#[test]
fn defaults_then_uppercase() {
    register_badge(21, "textContent:value|defaults,n/a|uc", "x-badge");
    let host = TestHost::new();
    let handle = host.mount("x-badge").unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("N/A"));

    handle
        .update(|state| state.set("value", Value::string("hi")))
        .unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("HI"));
}

#[test]
fn unknown_filter_fails_component_setup() {
    register_badge(22, "textContent:value|sparkle", "x-broken");
    let host = TestHost::new();
    let error = host.mount("x-broken").unwrap_err();
    assert_eq!(error.code, ErrorCode::UnknownFilter);
}

#[test]
fn encoded_options_reach_the_filter() {
    register_badge(23, "textContent:value|defaults,#a%2Cb#", "x-encoded");
    let host = TestHost::new();
    let handle = host.mount("x-encoded").unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("a,b"));
}
