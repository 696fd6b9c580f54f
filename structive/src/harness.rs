//! Test harness.
//!
//! Mounts components into a fresh document and provides the event
//! simulation and read-back helpers the integration tests are written
//! against.

use crate::component::ComponentEngine;
use crate::error::Result;
use crate::state::access::StateAccess;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;
use structive_dom::{dispatch_event, Document, NodeId, PropertyValue};

pub struct TestHost {
    document: Rc<RefCell<Document>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            document: Rc::new(RefCell::new(Document::new())),
        }
    }

    pub fn document(&self) -> Rc<RefCell<Document>> {
        self.document.clone()
    }

    pub fn root(&self) -> NodeId {
        self.document.borrow().root()
    }

    /// Mount a registered component under the document root.
    pub fn mount(&self, tag: &str) -> Result<ComponentHandle> {
        let engine = ComponentEngine::mount(self.document.clone(), self.root(), tag)?;
        Ok(ComponentHandle {
            document: self.document.clone(),
            engine,
        })
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ComponentHandle {
    document: Rc<RefCell<Document>>,
    engine: Rc<ComponentEngine>,
}

impl std::fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentHandle({})", self.engine.tag())
    }
}

impl ComponentHandle {
    pub fn engine(&self) -> &Rc<ComponentEngine> {
        &self.engine
    }

    pub fn document(&self) -> Rc<RefCell<Document>> {
        self.document.clone()
    }

    /// Run one update transaction; renders flush before this returns.
    pub fn update(&self, f: impl FnOnce(&StateAccess) -> Result<()>) -> Result<()> {
        self.engine.update(f)
    }

    /// Drain any still-pending scheduled work; reports whether any ran.
    pub fn tick(&self) -> bool {
        self.engine.flush()
    }

    /// `$updateComplete` analog: same drain as [`tick`](Self::tick).
    pub fn update_complete(&self) -> bool {
        self.engine.flush()
    }

    /// Read a state path through a readonly handle.
    pub fn read(&self, path: &str) -> Result<Value> {
        self.engine.readonly().get(path)
    }

    pub fn elements(&self, tag: &str) -> Vec<NodeId> {
        self.document.borrow().elements_by_tag(tag)
    }

    pub fn texts(&self, tag: &str) -> Vec<String> {
        let document = self.document.borrow();
        document
            .elements_by_tag(tag)
            .into_iter()
            .map(|node| document.text_content(node))
            .collect()
    }

    pub fn first_text(&self, tag: &str) -> Option<String> {
        self.texts(tag).into_iter().next()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.document.borrow().attribute(node, name)
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<PropertyValue> {
        self.document.borrow().property(node, name)
    }

    pub fn dispatch(&self, node: NodeId, event_type: &str, detail: PropertyValue) -> bool {
        dispatch_event(&self.document, node, event_type, detail)
    }

    pub fn click(&self, node: NodeId) -> bool {
        self.dispatch(node, "click", PropertyValue::Null)
    }

    /// Type into a form element: set its value property, fire `input`.
    pub fn input(&self, node: NodeId, text: &str) {
        self.document
            .borrow_mut()
            .set_property(node, "value", PropertyValue::text(text));
        self.dispatch(node, "input", PropertyValue::text(text));
    }
}
