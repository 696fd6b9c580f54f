//! Template instantiations.
//!
//! A `BindContent` is one clone of a template fragment: its document
//! nodes, its bindings, its loop context (when it is a list row) and the
//! child component engines attached to component-tag elements.

use crate::binding::binding::Binding;
use crate::binding::loop_context::LoopContext;
use crate::binding_text::parse_bind_text;
use crate::component::ComponentEngine;
use crate::error::Result;
use crate::list_index::ListIndex;
use crate::registry;
use crate::template::{Template, TemplateNode};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use structive_dom::NodeId;

thread_local! {
    static NEXT_CONTENT_ID: Cell<u64> = const { Cell::new(1) };
}

pub struct BindContent {
    pub id: u64,
    pub template_id: u32,
    engine: Weak<ComponentEngine>,
    parent_binding: RefCell<Option<Weak<Binding>>>,
    /// Set when this content is one iteration of a loop.
    own_loop_context: Option<Rc<LoopContext>>,
    parent_loop_context: RefCell<Option<Rc<LoopContext>>>,
    bindings: RefCell<Vec<Rc<Binding>>>,
    root_nodes: RefCell<Vec<NodeId>>,
    components: RefCell<FxHashMap<NodeId, Rc<ComponentEngine>>>,
    active: Cell<bool>,
}

impl BindContent {
    pub fn create(
        engine: &Rc<ComponentEngine>,
        template: &Rc<Template>,
        own_loop_context: Option<Rc<LoopContext>>,
        parent_loop_context: Option<Rc<LoopContext>>,
        parent_binding: Option<&Rc<Binding>>,
    ) -> Result<Rc<Self>> {
        let id = NEXT_CONTENT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        let content = Rc::new(Self {
            id,
            template_id: template.id,
            engine: Rc::downgrade(engine),
            parent_binding: RefCell::new(parent_binding.map(Rc::downgrade)),
            own_loop_context,
            parent_loop_context: RefCell::new(parent_loop_context),
            bindings: RefCell::new(Vec::new()),
            root_nodes: RefCell::new(Vec::new()),
            components: RefCell::new(FxHashMap::default()),
            active: Cell::new(false),
        });
        let mut nodes = Vec::with_capacity(template.roots.len());
        for template_node in &template.roots {
            nodes.push(Self::instantiate(engine, &content, template_node)?);
        }
        *content.root_nodes.borrow_mut() = nodes;
        Ok(content)
    }

    fn instantiate(
        engine: &Rc<ComponentEngine>,
        content: &Rc<BindContent>,
        template_node: &TemplateNode,
    ) -> Result<NodeId> {
        match template_node {
            TemplateNode::Text(text) => Ok(engine.document().borrow_mut().create_text(text)),
            TemplateNode::TextBinding(expr) => {
                let node = engine.document().borrow_mut().create_text("");
                let parsed = parse_bind_text(&format!("textContent:{expr}"))?;
                for clause in parsed.iter() {
                    let binding = Binding::from_clause(engine, content, node, clause, None)?;
                    content.bindings.borrow_mut().push(binding);
                }
                Ok(node)
            }
            TemplateNode::EmbeddedTemplate(template_id) => {
                let marker = engine
                    .document()
                    .borrow_mut()
                    .create_comment(&format!("@@|{template_id}"));
                let embedded = registry::template(*template_id)?;
                if let Some(bind_text) = &embedded.bind_text {
                    let parsed = parse_bind_text(bind_text)?;
                    for clause in parsed.iter() {
                        let binding = Binding::from_clause(
                            engine,
                            content,
                            marker,
                            clause,
                            Some(*template_id),
                        )?;
                        content.bindings.borrow_mut().push(binding);
                    }
                }
                Ok(marker)
            }
            TemplateNode::Element {
                tag,
                attributes,
                bind_text,
                children,
            } => {
                let node = {
                    let document_rc = engine.document();
                    let mut document = document_rc.borrow_mut();
                    let node = document.create_element(tag);
                    for (name, value) in attributes {
                        document.set_attribute(node, name, value);
                    }
                    node
                };
                if registry::is_component_tag(tag) {
                    let child_class = registry::component_class_by_tag(tag)?;
                    let child = ComponentEngine::attach(
                        engine.document(),
                        node,
                        child_class,
                        Some(engine),
                        false,
                    )?;
                    content.components.borrow_mut().insert(node, child);
                }
                if let Some(bind_text) = bind_text {
                    let parsed = parse_bind_text(bind_text)?;
                    for clause in parsed.iter() {
                        let binding = Binding::from_clause(engine, content, node, clause, None)?;
                        content.bindings.borrow_mut().push(binding);
                    }
                }
                for child_template in children {
                    let child = Self::instantiate(engine, content, child_template)?;
                    engine.document().borrow_mut().append_child(node, child);
                }
                Ok(node)
            }
        }
    }

    pub fn engine(&self) -> Option<Rc<ComponentEngine>> {
        self.engine.upgrade()
    }

    pub fn parent_binding(&self) -> Option<Rc<Binding>> {
        self.parent_binding.borrow().as_ref().and_then(|w| w.upgrade())
    }

    /// This content's loop context, or the nearest enclosing one.
    pub fn current_loop_context(&self) -> Option<Rc<LoopContext>> {
        self.own_loop_context
            .clone()
            .or_else(|| self.parent_loop_context.borrow().clone())
    }

    /// Resolve a wildcard prefix against the enclosing loops, nearest
    /// match first.
    pub fn find(&self, wildcard_path: &str) -> Option<Rc<LoopContext>> {
        self.current_loop_context()?.find(wildcard_path)
    }

    /// Rebind a pooled iteration content to another row.
    pub fn rebind_loop_index(&self, list_index: Rc<ListIndex>) {
        if let Some(context) = &self.own_loop_context {
            context.set_list_index(list_index);
        }
    }

    pub fn bindings(&self) -> Vec<Rc<Binding>> {
        self.bindings.borrow().clone()
    }

    pub fn root_nodes(&self) -> Vec<NodeId> {
        self.root_nodes.borrow().clone()
    }

    pub fn component_at(&self, node: NodeId) -> Option<Rc<ComponentEngine>> {
        self.components.borrow().get(&node).cloned()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Insert this content's nodes under `parent`, before `reference`.
    /// Re-mounting moves the same nodes, preserving their identity.
    pub fn mount(&self, parent: NodeId, reference: Option<NodeId>) {
        let engine = match self.engine() {
            Some(engine) => engine,
            None => return,
        };
        let document = engine.document();
        let mut document = document.borrow_mut();
        for node in self.root_nodes.borrow().iter() {
            document.insert_before(parent, *node, reference);
        }
    }

    pub fn unmount(&self) {
        let engine = match self.engine() {
            Some(engine) => engine,
            None => return,
        };
        let document = engine.document();
        let mut document = document.borrow_mut();
        for node in self.root_nodes.borrow().iter() {
            document.detach(*node);
        }
    }

    /// Activate every binding, then bring up child components.
    pub fn activate(self: &Rc<Self>) -> Result<()> {
        if self.active.get() {
            return Ok(());
        }
        for binding in self.bindings() {
            binding.activate()?;
        }
        let components: Vec<Rc<ComponentEngine>> =
            self.components.borrow().values().cloned().collect();
        for child in components {
            if !child.is_connected() {
                child.connected_callback()?;
            }
        }
        self.active.set(true);
        Ok(())
    }

    pub fn inactivate(self: &Rc<Self>) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        self.active.set(false);
        for binding in self.bindings() {
            binding.inactivate()?;
        }
        let components: Vec<Rc<ComponentEngine>> =
            self.components.borrow().values().cloned().collect();
        for child in components {
            child.disconnected_callback()?;
        }
        Ok(())
    }
}
