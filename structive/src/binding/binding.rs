//! One data-bind clause at one node instance.

use crate::binding::content::BindContent;
use crate::binding::node_kind::{
    apply_binding_node, from_property_value, register_component_output, remove_component_output,
    BindingNodeKind, ForContents, IfContents,
};
use crate::binding::state_binding::{BindingState, BindingStateIndex};
use crate::binding_text::ParsedBind;
use crate::component::ComponentEngine;
use crate::error::{report, ErrorCode, Result, StructiveError};
use crate::renderer::{RenderPhase, Renderer};
use crate::state_ref::StatePropertyRef;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use structive_dom::{Event, NodeId};

thread_local! {
    static NEXT_BINDING_ID: Cell<u64> = const { Cell::new(1) };
}

pub enum BindingSource {
    State(BindingState),
    Index(BindingStateIndex),
}

pub struct Binding {
    pub id: u64,
    engine: Weak<ComponentEngine>,
    parent_content: Weak<BindContent>,
    pub node: NodeId,
    pub kind: BindingNodeKind,
    pub source: BindingSource,
    active: Cell<bool>,
}

impl Binding {
    /// Build one binding from a parsed clause.
    pub(crate) fn from_clause(
        engine: &Rc<ComponentEngine>,
        content: &Rc<BindContent>,
        node: NodeId,
        clause: &ParsedBind,
        embedded_template: Option<u32>,
    ) -> Result<Rc<Self>> {
        let kind = Self::kind_for(engine, node, clause, embedded_template)?;
        let path = clause.state_path.as_str();
        // A loop source is an identity-tracked list even when nothing
        // else names its elements.
        if matches!(kind, BindingNodeKind::For(_)) && !path.starts_with('$') {
            engine.path_manager().add_path(path, true)?;
        }
        let source = if path.starts_with('$') && path.len() > 1 {
            BindingSource::Index(BindingStateIndex::new(engine, path, &clause.output_filters)?)
        } else {
            BindingSource::State(BindingState::new(
                engine,
                path,
                &clause.output_filters,
                &clause.input_filters,
            )?)
        };
        let id = NEXT_BINDING_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Ok(Rc::new(Self {
            id,
            engine: Rc::downgrade(engine),
            parent_content: Rc::downgrade(content),
            node,
            kind,
            source,
            active: Cell::new(false),
        }))
    }

    fn kind_for(
        engine: &Rc<ComponentEngine>,
        node: NodeId,
        clause: &ParsedBind,
        embedded_template: Option<u32>,
    ) -> Result<BindingNodeKind> {
        let property = clause.node_property.as_str();
        let readonly = clause
            .decorates
            .iter()
            .any(|d| d == "readonly" || d == "ro");
        let kind = match property {
            "for" => BindingNodeKind::For(ForContents::new(embedded_template.ok_or_else(
                || {
                    StructiveError::new(
                        ErrorCode::BindingContract,
                        "for binding outside an embedded-template marker",
                    )
                },
            )?)
            .into()),
            "if" => BindingNodeKind::If(IfContents::new(embedded_template.ok_or_else(
                || {
                    StructiveError::new(
                        ErrorCode::BindingContract,
                        "if binding outside an embedded-template marker",
                    )
                },
            )?)
            .into()),
            "checkbox" => BindingNodeKind::Checkbox,
            "radio" => BindingNodeKind::Radio,
            _ => {
                if let Some(name) = property.strip_prefix("attr.") {
                    BindingNodeKind::Attribute {
                        name: name.to_string(),
                    }
                } else if let Some(name) = property.strip_prefix("state.") {
                    BindingNodeKind::ComponentProp {
                        child_pattern: Rc::from(name),
                    }
                } else if let Some(event) = property.strip_prefix("on") {
                    BindingNodeKind::Event {
                        event: event.to_string(),
                        prevent: clause.decorates.iter().any(|d| d == "prevent"),
                        stop: clause.decorates.iter().any(|d| d == "stop"),
                    }
                } else {
                    let document = engine.document();
                    let document = document.borrow();
                    if document.is_text(node) && property == "textContent" {
                        BindingNodeKind::Text
                    } else {
                        let tag = document.tag(node).unwrap_or_default();
                        let form_element =
                            matches!(tag.as_str(), "input" | "textarea" | "select");
                        let two_way = form_element
                            && matches!(property, "value" | "checked")
                            && !readonly;
                        BindingNodeKind::Property {
                            name: property.to_string(),
                            two_way,
                        }
                    }
                }
            }
        };
        Ok(kind)
    }

    pub fn engine_rc(&self) -> Result<Rc<ComponentEngine>> {
        self.engine.upgrade().ok_or_else(|| {
            StructiveError::new(ErrorCode::BindingResolution, "component engine is gone")
        })
    }

    pub fn parent_content(&self) -> Option<Rc<BindContent>> {
        self.parent_content.upgrade()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Structural kinds run in the build phase; everything else defers.
    pub fn buildable(&self) -> bool {
        matches!(self.kind, BindingNodeKind::For(_) | BindingNodeKind::If(_))
    }

    /// `<select>.value` runs in the last phase, after options exist.
    pub fn is_select_value(&self) -> bool {
        match (&self.kind, self.engine.upgrade()) {
            (BindingNodeKind::Property { name, .. }, Some(engine)) if name == "value" => {
                engine.document().borrow().is_select_element(self.node)
            }
            _ => false,
        }
    }

    pub fn current_ref(&self) -> Option<Rc<StatePropertyRef>> {
        match &self.source {
            BindingSource::State(state) => state.reference(),
            BindingSource::Index(_) => None,
        }
    }

    /// Node side first (listeners), then state side (ref + registries).
    pub fn activate(self: &Rc<Self>) -> Result<()> {
        if self.active.get() {
            return Ok(());
        }
        self.activate_node()?;
        match &self.source {
            BindingSource::State(state) => state.activate(self)?,
            BindingSource::Index(index) => index.activate(self)?,
        }
        register_component_output(self)?;
        self.active.set(true);
        Ok(())
    }

    pub fn inactivate(self: &Rc<Self>) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        self.active.set(false);
        remove_component_output(self);
        match &self.source {
            BindingSource::State(state) => state.inactivate(self)?,
            BindingSource::Index(index) => index.inactivate(self)?,
        }
        self.inactivate_node();
        // Structural kinds tear down the contents they own.
        match &self.kind {
            BindingNodeKind::For(contents) => {
                let mut contents = contents.borrow_mut();
                for content in contents.contents.drain(..) {
                    content.inactivate()?;
                    content.unmount();
                }
                contents.by_list_index.clear();
            }
            BindingNodeKind::If(contents) => {
                let removed = contents.borrow_mut().content.take();
                if let Some(content) = removed {
                    content.inactivate()?;
                    content.unmount();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn activate_node(self: &Rc<Self>) -> Result<()> {
        let engine = self.engine_rc()?;
        match &self.kind {
            BindingNodeKind::Event {
                event,
                prevent,
                stop,
            } => {
                let action_name = match &self.source {
                    BindingSource::State(state) => state.info.pattern.clone(),
                    BindingSource::Index(_) => {
                        return Err(StructiveError::new(
                            ErrorCode::BindingContract,
                            "event bindings need an action name, not a loop index",
                        ))
                    }
                };
                let weak_engine = Rc::downgrade(&engine);
                let weak_binding = Rc::downgrade(self);
                let prevent = *prevent;
                let stop = *stop;
                let listener = Rc::new(move |event: &Event| {
                    if prevent {
                        event.prevent_default();
                    }
                    if stop {
                        event.stop_propagation();
                    }
                    let engine = match weak_engine.upgrade() {
                        Some(engine) => engine,
                        None => return,
                    };
                    let loop_context = weak_binding
                        .upgrade()
                        .and_then(|b| b.parent_content())
                        .and_then(|c| c.current_loop_context());
                    match engine.state_class().action(&action_name) {
                        Some(action) => {
                            engine.invoke_with_context(loop_context, |access| {
                                action(access, event)
                            });
                        }
                        None => report(&StructiveError::warning(
                            ErrorCode::StatePropertyMissing,
                            format!("no action \"{action_name}\" on state"),
                        )),
                    }
                });
                engine
                    .document()
                    .borrow_mut()
                    .add_listener(self.node, event, listener);
            }
            BindingNodeKind::Property { name, two_way } if *two_way => {
                let property_name = name.clone();
                let weak_engine = Rc::downgrade(&engine);
                let weak_binding = Rc::downgrade(self);
                let listener = Rc::new(move |_event: &Event| {
                    let (engine, binding) =
                        match (weak_engine.upgrade(), weak_binding.upgrade()) {
                            (Some(engine), Some(binding)) => (engine, binding),
                            _ => return,
                        };
                    let value = engine
                        .document()
                        .borrow()
                        .property(binding.node, &property_name)
                        .map(|p| from_property_value(&p))
                        .unwrap_or(crate::value::Value::Undefined);
                    let loop_context = binding
                        .parent_content()
                        .and_then(|c| c.current_loop_context());
                    engine.invoke_with_context(loop_context, |access| match &binding.source {
                        BindingSource::State(state) => state.assign_value(access, value),
                        BindingSource::Index(index) => index.assign_value(value),
                    });
                });
                engine
                    .document()
                    .borrow_mut()
                    .add_listener(self.node, "input", listener);
            }
            _ => {}
        }
        Ok(())
    }

    fn inactivate_node(&self) {
        let engine = match self.engine.upgrade() {
            Some(engine) => engine,
            None => return,
        };
        match &self.kind {
            BindingNodeKind::Event { event, .. } => {
                engine
                    .document()
                    .borrow_mut()
                    .remove_listeners(self.node, event);
            }
            BindingNodeKind::Property { two_way, .. } if *two_way => {
                engine
                    .document()
                    .borrow_mut()
                    .remove_listeners(self.node, "input");
            }
            _ => {}
        }
    }

    /// Phase-gated, deduped execution of the node side.
    pub fn apply_change(self: &Rc<Self>, renderer: &Rc<Renderer>) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        match renderer.phase() {
            RenderPhase::Build => {
                if !self.buildable() {
                    if self.is_select_value() {
                        renderer.enqueue_apply_select(self.clone());
                    } else {
                        renderer.enqueue_apply(self.clone());
                    }
                    return Ok(());
                }
            }
            RenderPhase::Apply => {
                if self.buildable() || self.is_select_value() {
                    return Ok(());
                }
            }
            RenderPhase::ApplySelect => {
                if self.buildable() || !self.is_select_value() {
                    return Ok(());
                }
            }
        }
        if !renderer.mark_updated(self.id) {
            return Ok(());
        }
        apply_binding_node(self, renderer)?;

        if let Some(reference) = self.current_ref() {
            let engine = self.engine_rc()?;
            let is_index = matches!(self.source, BindingSource::Index(_));
            let has_dynamic = engine
                .path_manager()
                .has_dynamic_dependents(&reference.info.pattern);
            let shared = engine.bindings_for_key(&reference.key()).len() > 1;
            if !is_index && !has_dynamic && !shared {
                renderer.mark_processed(reference.key());
            }
        }
        Ok(())
    }
}
