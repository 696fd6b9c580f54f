//! A small TodoMVC slice: two-way input, actions with loop context,
//! wildcard enumeration in a getter, list growth.

use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, StateClass, TestHost, Value};

fn register_todo_app() {
    register_template(Template::new(
        41,
        vec![
            TemplateNode::element("input", &[("type", "text")], Some("value:draft"), vec![]),
            TemplateNode::element(
                "button",
                &[],
                Some("onclick:add_todo"),
                vec![TemplateNode::text("add")],
            ),
            TemplateNode::element("ul", &[], None, vec![TemplateNode::embed(42)]),
            TemplateNode::element("span", &[], Some("textContent:remaining"), vec![]),
        ],
    ));
    register_template(Template::structural(
        42,
        "for:todos",
        vec![TemplateNode::element(
            "li",
            &[],
            None,
            vec![
                TemplateNode::element("label", &[], Some("textContent:todos.*.title"), vec![]),
                TemplateNode::element(
                    "button",
                    &[("class", "toggle")],
                    Some("onclick:toggle"),
                    vec![TemplateNode::text("toggle")],
                ),
            ],
        )],
    ));
    let state = StateClass::builder()
        .data(|| {
            Value::object([
                ("draft", Value::string("")),
                ("todos", Value::empty_array()),
            ])
        })
        .list("todos")
        .getter("remaining", |state| {
            let done: Vec<Value> = state.get_all("todos.*.done", &[])?;
            let open = done.iter().filter(|d| !d.truthy()).count();
            Ok(Value::int(open as i64))
        })
        .action("add_todo", |state, _event| {
            let title = state.get("draft")?;
            if title.display_string().is_empty() {
                return Ok(());
            }
            let todos = state.get("todos")?;
            if let Value::Array(array) = &todos {
                array.borrow_mut().push(Value::object([
                    ("title", title),
                    ("done", Value::bool(false)),
                ]));
            }
            state.set("todos", todos)?;
            state.set("draft", Value::string(""))
        })
        .action("toggle", |state, _event| {
            let row = state.index(1)?;
            let done = state.resolve("todos.*.done", &[row])?.truthy();
            state.resolve_set("todos.*.done", &[row], Value::bool(!done))
        })
        .build();
    register_component_class(ComponentClass {
        tag: "x-todos".into(),
        template_id: 41,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

#[test]
fn add_toggle_and_count() {
    register_todo_app();
    let host = TestHost::new();
    let handle = host.mount("x-todos").unwrap();
    assert_eq!(handle.first_text("span").as_deref(), Some("0"));

    let input = handle.elements("input")[0];
    let add = handle.elements("button")[0];

    handle.input(input, "buy milk");
    handle.click(add);
    handle.input(input, "walk dog");
    handle.click(add);

    assert_eq!(handle.texts("label"), vec!["buy milk", "walk dog"]);
    assert_eq!(handle.first_text("span").as_deref(), Some("2"));
    // The draft resets after a successful add.
    assert_eq!(handle.read("draft").unwrap(), Value::string(""));

    // Toggle the first row through its own loop context.
    let toggles = handle.elements("button");
    handle.click(toggles[1]);
    assert_eq!(handle.first_text("span").as_deref(), Some("1"));
    assert_eq!(
        handle.read("todos.0.done").unwrap(),
        Value::bool(true)
    );

    handle.click(toggles[1]);
    assert_eq!(handle.first_text("span").as_deref(), Some("2"));
}

#[test]
fn empty_draft_adds_nothing() {
    register_todo_app();
    let host = TestHost::new();
    let handle = host.mount("x-todos").unwrap();
    let add = handle.elements("button")[0];
    handle.click(add);
    assert!(handle.texts("label").is_empty());
    assert_eq!(handle.first_text("span").as_deref(), Some("0"));
}
