//! List reconciliation: row identity across reorders, positional loop
//! indexes, and in-place element swaps.

use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};

fn register_list() {
    register_template(Template::new(
        11,
        vec![TemplateNode::element(
            "ul",
            &[],
            None,
            vec![TemplateNode::embed(12)],
        )],
    ));
    register_template(Template::structural(
        12,
        "for:items",
        vec![TemplateNode::element(
            "li",
            &[],
            None,
            vec![
                TemplateNode::element("span", &[], Some("textContent:items.*.name"), vec![]),
                TemplateNode::element("em", &[], Some("textContent:$1"), vec![]),
            ],
        )],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([(
                "items",
                Value::array([
                    Value::object([("name", Value::string("a"))]),
                    Value::object([("name", Value::string("b"))]),
                    Value::object([("name", Value::string("c"))]),
                ]),
            )])
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-list".into(),
        template_id: 11,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

#[test]
fn initial_rows_render_in_order() {
    register_list();
    let host = TestHost::new();
    let handle = host.mount("x-list").unwrap();
    assert_eq!(handle.texts("span"), vec!["a", "b", "c"]);
    // Loop indexes display 1-based row numbers.
    assert_eq!(handle.texts("em"), vec!["1", "2", "3"]);
}

#[test]
fn whole_array_reorder_preserves_row_nodes() {
    register_list();
    let host = TestHost::new();
    let handle = host.mount("x-list").unwrap();
    let before = handle.elements("li");
    assert_eq!(before.len(), 3);

    handle
        .update(|state| {
            let a = state.get("items.0")?;
            let b = state.get("items.1")?;
            let c = state.get("items.2")?;
            state.set("items", Value::array([c, a, b]))
        })
        .unwrap();

    assert_eq!(handle.texts("span"), vec!["c", "a", "b"]);
    let after = handle.elements("li");
    // The same three nodes, moved, not rebuilt.
    assert_eq!(after, vec![before[2], before[0], before[1]]);
    // Positional indexes are unchanged by identity movement.
    assert_eq!(handle.texts("em"), vec!["1", "2", "3"]);
}

#[test]
fn element_write_swap_reuses_rows() {
    register_list();
    let host = TestHost::new();
    let handle = host.mount("x-list").unwrap();
    let before = handle.elements("li");

    handle
        .update(|state| {
            let first = state.get("items.0")?;
            let second = state.get("items.1")?;
            state.set("items.0", second)?;
            state.set("items.1", first)
        })
        .unwrap();

    assert_eq!(handle.texts("span"), vec!["b", "a", "c"]);
    let after = handle.elements("li");
    assert_eq!(after, vec![before[1], before[0], before[2]]);
}

#[test]
fn rows_append_and_remove() {
    register_list();
    let host = TestHost::new();
    let handle = host.mount("x-list").unwrap();

    handle
        .update(|state| {
            let items = state.get("items")?;
            if let Value::Array(array) = &items {
                array
                    .borrow_mut()
                    .push(Value::object([("name", Value::string("d"))]));
            }
            state.set("items", items)
        })
        .unwrap();
    assert_eq!(handle.texts("span"), vec!["a", "b", "c", "d"]);

    handle
        .update(|state| {
            let b = state.get("items.1")?;
            let d = state.get("items.3")?;
            state.set("items", Value::array([b, d]))
        })
        .unwrap();
    assert_eq!(handle.texts("span"), vec!["b", "d"]);
    assert_eq!(handle.texts("em"), vec!["1", "2"]);
}
