//! Node-side binding behavior.
//!
//! One enum covers every binding-node kind; structural kinds (`for`,
//! `if`) own their child contents, the component kind forwards refs to
//! a child engine. Each kind's `apply` reads the filtered value through
//! the batch's readonly access and writes its DOM target.

use crate::binding::binding::{Binding, BindingSource};
use crate::binding::content::BindContent;
use crate::binding::loop_context::LoopContext;
use crate::component::{ComponentEngine, OutputBinding};
use crate::error::{report, ErrorCode, Result, StructiveError};
use crate::path::get_structured_path_info;
use crate::registry;
use crate::renderer::Renderer;
use crate::state_ref::get_state_property_ref;
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use structive_dom::PropertyValue;

pub enum BindingNodeKind {
    /// Content of a bound text node (`<!--@@:expr-->`).
    Text,
    /// An element property; `two_way` wires an input listener back into
    /// state on form elements.
    Property { name: String, two_way: bool },
    /// `attr.X`.
    Attribute { name: String },
    /// `onX`; listeners are wired at activation, nothing renders.
    Event {
        event: String,
        prevent: bool,
        stop: bool,
    },
    /// Membership of the node's value in a state array.
    Checkbox,
    /// Equality of the node's value with the state value.
    Radio,
    /// Structural loop over a list.
    For(RefCell<ForContents>),
    /// Structural conditional.
    If(RefCell<IfContents>),
    /// One `state.X:path` clause on a child component's host element.
    ComponentProp { child_pattern: Rc<str> },
}

pub struct ForContents {
    pub template_id: u32,
    pub contents: Vec<Rc<BindContent>>,
    pub by_list_index: FxHashMap<u64, Rc<BindContent>>,
    pub pool: Vec<Rc<BindContent>>,
}

impl ForContents {
    pub fn new(template_id: u32) -> Self {
        Self {
            template_id,
            contents: Vec::new(),
            by_list_index: FxHashMap::default(),
            pool: Vec::new(),
        }
    }
}

pub struct IfContents {
    pub template_id: u32,
    pub content: Option<Rc<BindContent>>,
    pub visible: bool,
}

impl IfContents {
    pub fn new(template_id: u32) -> Self {
        Self {
            template_id,
            content: None,
            visible: false,
        }
    }
}

pub(crate) fn to_property_value(value: &Value) -> PropertyValue {
    match value {
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Int(v) => PropertyValue::Number(*v as f64),
        Value::Float(v) => PropertyValue::Number(*v),
        Value::Undefined | Value::Null => PropertyValue::Null,
        other => PropertyValue::Text(other.display_string()),
    }
}

pub(crate) fn from_property_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Text(s) => Value::string(s.clone()),
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Number(n) => Value::Float(*n),
        PropertyValue::Null => Value::Null,
    }
}

/// A form node's own `value`: the property when set, else the template
/// attribute.
fn own_value(document: &structive_dom::Document, node: structive_dom::NodeId) -> String {
    document
        .property(node, "value")
        .map(|p| p.to_string())
        .or_else(|| document.attribute(node, "value"))
        .unwrap_or_default()
}

/// Read the filtered source value for a non-structural binding.
fn filtered_value(binding: &Rc<Binding>, renderer: &Rc<Renderer>) -> Result<Value> {
    let access = renderer.readonly_access();
    match &binding.source {
        BindingSource::State(state) => state.get_filtered_value(&access),
        BindingSource::Index(index) => index.get_filtered_value(),
    }
}

/// Node-side `applyChange`: dispatch on kind, write the DOM target.
pub(crate) fn apply_binding_node(binding: &Rc<Binding>, renderer: &Rc<Renderer>) -> Result<()> {
    let engine = binding.engine_rc()?;
    match &binding.kind {
        BindingNodeKind::Text => {
            let value = filtered_value(binding, renderer)?;
            engine
                .document()
                .borrow_mut()
                .set_text(binding.node, &value.display_string());
            Ok(())
        }
        BindingNodeKind::Property { name, .. } => {
            let value = filtered_value(binding, renderer)?;
            let document_rc = engine.document();
            let mut document = document_rc.borrow_mut();
            if name == "textContent" {
                document.set_text_content(binding.node, &value.display_string());
            } else {
                document.set_property(binding.node, name, to_property_value(&value));
            }
            Ok(())
        }
        BindingNodeKind::Attribute { name } => {
            let value = filtered_value(binding, renderer)?;
            engine
                .document()
                .borrow_mut()
                .set_attribute(binding.node, name, &value.display_string());
            Ok(())
        }
        BindingNodeKind::Event { .. } => Ok(()),
        BindingNodeKind::Checkbox => {
            let value = filtered_value(binding, renderer)?;
            let array = value.as_array().ok_or_else(|| {
                StructiveError::new(
                    ErrorCode::BindingResolution,
                    "checkbox binding requires an array state value",
                )
                .with_context(json!({ "node": binding.node.to_string() }))
            })?;
            let document_rc = engine.document();
            let mut document = document_rc.borrow_mut();
            let node_value = own_value(&document, binding.node);
            let checked = array
                .borrow()
                .iter()
                .any(|v| v.display_string() == node_value);
            document.set_property(binding.node, "checked", PropertyValue::Bool(checked));
            Ok(())
        }
        BindingNodeKind::Radio => {
            let value = filtered_value(binding, renderer)?;
            let document_rc = engine.document();
            let mut document = document_rc.borrow_mut();
            let node_value = own_value(&document, binding.node);
            let checked = value.display_string() == node_value;
            document.set_property(binding.node, "checked", PropertyValue::Bool(checked));
            Ok(())
        }
        BindingNodeKind::For(contents) => apply_for(binding, renderer, &engine, contents),
        BindingNodeKind::If(contents) => apply_if(binding, renderer, &engine, contents),
        BindingNodeKind::ComponentProp { child_pattern } => {
            let content = binding.parent_content().ok_or_else(|| {
                StructiveError::new(ErrorCode::BindingResolution, "component binding has no content")
            })?;
            let child = content.component_at(binding.node).ok_or_else(|| {
                StructiveError::new(
                    ErrorCode::UndefinedComponent,
                    format!("no component attached for \"{child_pattern}\""),
                )
            })?;
            let child_info = get_structured_path_info(child_pattern)?;
            let child_ref = get_state_property_ref(child_info, None)?;
            child.enqueue_ref(child_ref);
            Ok(())
        }
    }
}

/// Structural loop: reconcile child contents against the list's current
/// rows, preserving content (and DOM node) identity per `ListIndex`.
fn apply_for(
    binding: &Rc<Binding>,
    renderer: &Rc<Renderer>,
    engine: &Rc<ComponentEngine>,
    contents: &RefCell<ForContents>,
) -> Result<()> {
    let state = match &binding.source {
        BindingSource::State(state) => state,
        BindingSource::Index(_) => {
            return Err(StructiveError::new(
                ErrorCode::BindingContract,
                "for binding cannot loop over a loop index",
            ))
        }
    };
    let reference = state.reference().ok_or_else(|| {
        StructiveError::new(ErrorCode::BindingResolution, "for binding has no ref")
    })?;
    let access = renderer.readonly_access();
    let list_indexes = access.list_indexes(&reference)?;
    let _previous = renderer.take_list_info(&reference.key());

    let document = engine.document();
    let marker = binding.node;
    let parent_node = document.borrow().parent(marker).ok_or_else(|| {
        StructiveError::new(ErrorCode::BindingResolution, "for marker is detached")
    })?;
    let parent_loop_context = binding
        .parent_content()
        .and_then(|c| c.current_loop_context());
    let element_info =
        get_structured_path_info(&format!("{}.*", reference.info.pattern))?;

    let mut created: Vec<Rc<BindContent>> = Vec::new();
    {
        let mut state_mut = contents.borrow_mut();
        let template_id = state_mut.template_id;
        let mut new_contents = Vec::with_capacity(list_indexes.len());
        let mut new_map = FxHashMap::default();
        for list_index in list_indexes.iter() {
            if let Some(existing) = state_mut.by_list_index.remove(&list_index.id) {
                existing.mount(parent_node, Some(marker));
                new_map.insert(list_index.id, existing.clone());
                new_contents.push(existing);
                continue;
            }
            let content = match state_mut.pool.pop() {
                Some(pooled) => {
                    pooled.rebind_loop_index(list_index.clone());
                    pooled
                }
                None => {
                    let loop_context = LoopContext::new(
                        element_info.clone(),
                        list_index.clone(),
                        parent_loop_context.clone(),
                    );
                    BindContent::create(
                        engine,
                        &registry::template(template_id)?,
                        Some(loop_context),
                        parent_loop_context.clone(),
                        Some(binding),
                    )?
                }
            };
            content.mount(parent_node, Some(marker));
            content.activate()?;
            created.push(content.clone());
            new_map.insert(list_index.id, content.clone());
            new_contents.push(content);
        }
        let removed_contents: Vec<_> = state_mut.by_list_index.drain().map(|(_, removed)| removed).collect();
        for removed in removed_contents {
            removed.inactivate()?;
            removed.unmount();
            state_mut.pool.push(removed);
        }
        state_mut.by_list_index = new_map;
        state_mut.contents = new_contents;
    }

    for content in &created {
        renderer.render_bindings(content);
    }
    // Reorders mutate retained indexes in place; re-run the bindings
    // keyed by those rows (loop-index displays in particular).
    for list_index in list_indexes.iter() {
        for row_binding in engine.bindings_for_list_index(list_index.id) {
            if let Err(error) = row_binding.apply_change(renderer) {
                report(&error);
            }
        }
    }
    Ok(())
}

/// Structural conditional: build on truthy, tear down on falsy.
fn apply_if(
    binding: &Rc<Binding>,
    renderer: &Rc<Renderer>,
    engine: &Rc<ComponentEngine>,
    contents: &RefCell<IfContents>,
) -> Result<()> {
    let visible = filtered_value(binding, renderer)?.truthy();
    let marker = binding.node;

    if visible {
        let existing = contents.borrow().content.clone();
        if existing.is_none() {
            let parent_node = engine.document().borrow().parent(marker).ok_or_else(|| {
                StructiveError::new(ErrorCode::BindingResolution, "if marker is detached")
            })?;
            let parent_loop_context = binding
                .parent_content()
                .and_then(|c| c.current_loop_context());
            let template_id = contents.borrow().template_id;
            let content = BindContent::create(
                engine,
                &registry::template(template_id)?,
                None,
                parent_loop_context,
                Some(binding),
            )?;
            content.mount(parent_node, Some(marker));
            content.activate()?;
            {
                let mut state_mut = contents.borrow_mut();
                state_mut.content = Some(content.clone());
                state_mut.visible = true;
            }
            renderer.render_bindings(&content);
        }
    } else {
        let removed = {
            let mut state_mut = contents.borrow_mut();
            state_mut.visible = false;
            state_mut.content.take()
        };
        if let Some(content) = removed {
            content.inactivate()?;
            content.unmount();
        }
    }
    Ok(())
}

/// Register the parent→child path mapping for one `state.X` clause.
pub(crate) fn register_component_output(binding: &Rc<Binding>) -> Result<()> {
    let child_pattern = match &binding.kind {
        BindingNodeKind::ComponentProp { child_pattern } => child_pattern.clone(),
        _ => return Ok(()),
    };
    let engine = binding.engine_rc()?;
    let content = binding.parent_content().ok_or_else(|| {
        StructiveError::new(ErrorCode::BindingResolution, "component binding has no content")
    })?;
    let child = content.component_at(binding.node).ok_or_else(|| {
        StructiveError::new(
            ErrorCode::UndefinedComponent,
            format!("no component class defined for the \"{child_pattern}\" host"),
        )
    })?;
    let parent_ref = match &binding.source {
        BindingSource::State(state) => state.reference().ok_or_else(|| {
            StructiveError::new(ErrorCode::BindingResolution, "component binding has no ref")
        })?,
        BindingSource::Index(_) => {
            return Err(StructiveError::new(
                ErrorCode::BindingContract,
                "component bindings cannot forward loop indexes",
            ))
        }
    };
    child.register_output(
        child_pattern,
        OutputBinding {
            parent: Rc::downgrade(&engine),
            parent_ref,
        },
    );
    Ok(())
}

pub(crate) fn remove_component_output(binding: &Rc<Binding>) {
    if let BindingNodeKind::ComponentProp { child_pattern } = &binding.kind {
        if let Some(content) = binding.parent_content() {
            if let Some(child) = content.component_at(binding.node) {
                child.remove_output(child_pattern);
            }
        }
    }
}
