//! The updated callback runs after the triggering render, once, with
//! the refs the transaction accumulated; it may schedule further work.

use std::cell::RefCell;
use std::rc::Rc;
use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};

#[test]
fn updated_callback_sees_the_changed_refs() {
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let seen_in_hook = seen.clone();

    register_template(Template::new(
        71,
        vec![TemplateNode::element(
            "span",
            &[],
            Some("textContent:count"),
            vec![],
        )],
    ));
    let state = StateClass::builder()
        .data(|| Value::object([("count", Value::int(0)), ("echo", Value::int(0))]))
        .updated(move |state, infos| {
            seen_in_hook
                .borrow_mut()
                .push(infos.iter().map(|i| i.pattern.to_string()).collect());
            // Follow-up writes are allowed; write only on the first pass
            // so the cascade terminates.
            if infos.iter().any(|i| i.pattern.as_ref() == "count") {
                let count = state.get("count")?;
                state.set("echo", count)?;
            }
            Ok(())
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-echo".into(),
        template_id: 71,
        state_class: state,
        config: ComponentConfig::default(),
    });

    let host = TestHost::new();
    let handle = host.mount("x-echo").unwrap();
    seen.borrow_mut().clear();

    handle
        .update(|state| state.set("count", Value::int(5)))
        .unwrap();

    let calls = seen.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], vec!["count".to_string()]);
    assert_eq!(calls[1], vec!["echo".to_string()]);
    drop(calls);
    assert_eq!(handle.read("echo").unwrap(), Value::int(5));
    assert_eq!(handle.first_text("span").as_deref(), Some("5"));
}
