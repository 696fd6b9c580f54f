//! Dynamic dependencies: getters re-run when what they read changes,
//! once per batch.

use std::cell::Cell;
use std::rc::Rc;
use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};

fn register_full_name(tag: &str, template_id: u32, runs: Rc<Cell<u32>>) {
    register_template(Template::new(
        template_id,
        vec![TemplateNode::element(
            "span",
            &[],
            Some("textContent:fullName"),
            vec![],
        )],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([
                ("first", Value::string("John")),
                ("last", Value::string("Doe")),
            ])
        })
        .getter("fullName", move |state| {
            runs.set(runs.get() + 1);
            let first = state.get("first")?.display_string();
            let last = state.get("last")?.display_string();
            Ok(Value::string(format!("{first} {last}")))
        })
        .build();
    register_component_class(ComponentClass {
        tag: tag.into(),
        template_id,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

#[test]
fn getter_recomputes_once_per_batch() {
    let runs = Rc::new(Cell::new(0));
    register_full_name("x-person", 25, runs.clone());
    let host = TestHost::new();
    let handle = host.mount("x-person").unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("John Doe"));
    assert_eq!(runs.get(), 1);

    handle
        .update(|state| state.set("first", Value::string("Jane")))
        .unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("Jane Doe"));
    assert_eq!(runs.get(), 2);

    // Two writes the getter depends on, one transaction: one recompute.
    handle
        .update(|state| {
            state.set("first", Value::string("A"))?;
            state.set("last", Value::string("B"))
        })
        .unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("A B"));
    assert_eq!(runs.get(), 3);
}

#[test]
fn track_dependency_forces_an_edge() {
    let runs = Rc::new(Cell::new(0));
    let runs_in_getter = runs.clone();
    register_template(Template::new(
        26,
        vec![TemplateNode::element(
            "span",
            &[],
            Some("textContent:greeting"),
            vec![],
        )],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([
                ("first", Value::string("John")),
                ("mood", Value::string("calm")),
            ])
        })
        .getter("greeting", move |state| {
            runs_in_getter.set(runs_in_getter.get() + 1);
            // The getter never reads "mood", but declares it matters.
            state.track_dependency("mood")?;
            Ok(Value::string(format!(
                "hello {}",
                state.get("first")?.display_string()
            )))
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-greeter".into(),
        template_id: 26,
        state_class: state,
        config: ComponentConfig::default(),
    });

    let host = TestHost::new();
    let handle = host.mount("x-greeter").unwrap();
    assert_eq!(runs.get(), 1);

    handle
        .update(|state| state.set("mood", Value::string("bright")))
        .unwrap();
    assert_eq!(runs.get(), 2);
}
