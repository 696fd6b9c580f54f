//! Benchmarks of the update path: single-property fan-out, list
//! reconciliation and reorder cost at varying row counts.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use structive::registry::{register_component_class, register_template, ComponentClass};
use structive::template::{Template, TemplateNode};
use structive::{ComponentConfig, ComponentHandle, StateClass, TestHost, Value};

fn register_text_component() {
    register_template(Template::new(
        1,
        vec![TemplateNode::element(
            "span",
            &[],
            Some("textContent:label"),
            vec![],
        )],
    ));
    let state = StateClass::builder()
        .data(|| Value::object([("label", Value::string(""))]))
        .build();
    register_component_class(ComponentClass {
        tag: "b-text".into(),
        template_id: 1,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

fn register_list_component() {
    register_template(Template::new(
        2,
        vec![TemplateNode::element(
            "ul",
            &[],
            None,
            vec![TemplateNode::embed(3)],
        )],
    ));
    register_template(Template::structural(
        3,
        "for:items",
        vec![TemplateNode::element(
            "li",
            &[],
            Some("textContent:items.*.name"),
            vec![],
        )],
    ));
    let state = StateClass::builder()
        .data(|| Value::object([("items", Value::empty_array())]))
        .list("items")
        .build();
    register_component_class(ComponentClass {
        tag: "b-list".into(),
        template_id: 2,
        state_class: state,
        config: ComponentConfig::default(),
    });
}

fn fill_items(handle: &ComponentHandle, n: usize) {
    handle
        .update(|state| {
            let rows: Vec<Value> = (0..n)
                .map(|i| Value::object([("name", Value::string(format!("row {i}")))]))
                .collect();
            state.set("items", Value::array(rows))
        })
        .unwrap();
}

/// One text binding, many sequential writes.
fn bench_text_update(c: &mut Criterion) {
    register_text_component();
    let mut group = c.benchmark_group("text_update");

    group.bench_function("1000_writes", |b| {
        let host = TestHost::new();
        let handle = host.mount("b-text").unwrap();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            handle
                .update(|state| state.set("label", Value::string(format!("v{i}"))))
                .unwrap();
        });
    });

    group.finish();
}

/// Replace the whole list with fresh rows.
fn bench_list_rebuild(c: &mut Criterion) {
    register_list_component();
    let mut group = c.benchmark_group("list_rebuild");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rows", n), &n, |b, &n| {
            let host = TestHost::new();
            let handle = host.mount("b-list").unwrap();
            b.iter(|| {
                fill_items(&handle, n);
                handle
                    .update(|state| state.set("items", Value::empty_array()))
                    .unwrap();
            });
        });
    }

    group.finish();
}

/// Rotate an existing list; retained rows should only move.
fn bench_list_rotate(c: &mut Criterion) {
    register_list_component();
    let mut group = c.benchmark_group("list_rotate");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rows", n), &n, |b, &n| {
            let host = TestHost::new();
            let handle = host.mount("b-list").unwrap();
            fill_items(&handle, n);
            b.iter(|| {
                handle
                    .update(|state| {
                        let rows = state.get("items")?.array_items().unwrap_or_default();
                        let rotated: Vec<Value> = rows
                            .iter()
                            .skip(1)
                            .chain(rows.first())
                            .cloned()
                            .collect();
                        state.set("items", Value::array(rotated))
                    })
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_text_update,
    bench_list_rebuild,
    bench_list_rotate,
);
criterion_main!(benches);
