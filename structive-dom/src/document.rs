//! Node arena and tree operations.
//!
//! Nodes live in a generational arena so a stale id can never resurrect
//! a freed slot. The tree is mutated in place; moving a node to a new
//! position keeps its id.

use crate::event::EventListener;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::json;
use std::fmt;

/// Generational index into the document arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
    pub index: u32,
    pub generation: u32,
}

impl NodeId {
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    pub fn is_valid(&self) -> bool {
        self.index != u32::MAX
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}g{}", self.index, self.generation)
    }
}

/// Value stored in an element property slot.
///
/// Properties are typed, unlike attributes which are always strings.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum PropertyValue {
    Text(String),
    Bool(bool),
    Number(f64),
    Null,
}

impl PropertyValue {
    pub fn text(value: impl Into<String>) -> Self {
        PropertyValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => write!(f, "{s}"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Null => Ok(()),
        }
    }
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        properties: IndexMap<String, PropertyValue>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// The document: an arena of nodes plus the listener table.
pub struct Document {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    root: NodeId,
    listeners: FxHashMap<NodeId, Vec<(String, EventListener)>>,
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::with_capacity(64),
            free_list: Vec::new(),
            root: NodeId::INVALID,
            listeners: FxHashMap::default(),
        };
        doc.root = doc.create_element("body");
        doc
    }

    /// The root element every mounted tree hangs off.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(data);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                data: Some(data),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
        })
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeKind::Text(content.to_string()))
    }

    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.alloc(NodeKind::Comment(content.to_string()))
    }

    pub fn is_valid(&self, id: NodeId) -> bool {
        (id.index as usize) < self.slots.len()
            && self.slots[id.index as usize].generation == id.generation
            && self.slots[id.index as usize].data.is_some()
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        if self.is_valid(id) {
            self.slots[id.index as usize].data.as_ref()
        } else {
            None
        }
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        if self.is_valid(id) {
            self.slots[id.index as usize].data.as_mut()
        } else {
            None
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    pub fn tag(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Comment(_)))
    }

    pub fn is_select_element(&self, id: NodeId) -> bool {
        self.tag(id).as_deref() == Some("select")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).and_then(|d| d.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.data(id).map(|d| d.children.clone()).unwrap_or_default()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.data(id).map(|d| d.children.len()).unwrap_or(0)
    }

    /// Remove a node from its parent's child list without freeing it.
    pub fn detach(&mut self, child: NodeId) {
        let parent = match self.data(child).and_then(|d| d.parent) {
            Some(p) => p,
            None => return,
        };
        if let Some(parent_data) = self.data_mut(parent) {
            parent_data.children.retain(|c| *c != child);
        }
        if let Some(child_data) = self.data_mut(child) {
            child_data.parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `reference` (append when `None`).
    /// A child that already has a parent is detached first, so moving a
    /// node keeps its identity.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if !self.is_valid(parent) || !self.is_valid(child) {
            return;
        }
        self.detach(child);
        let position = match reference {
            Some(r) => self
                .data(parent)
                .and_then(|d| d.children.iter().position(|c| *c == r)),
            None => None,
        };
        if let Some(parent_data) = self.data_mut(parent) {
            match position {
                Some(i) => parent_data.children.insert(i, child),
                None => parent_data.children.push(child),
            }
        }
        if let Some(child_data) = self.data_mut(child) {
            child_data.parent = Some(parent);
        }
    }

    /// Detach and free a node and its whole subtree. Listeners go with it.
    pub fn remove_node(&mut self, id: NodeId) {
        if !self.is_valid(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            for child in self.children(node) {
                stack.push(child);
            }
            self.listeners.remove(&node);
            let slot = &mut self.slots[node.index as usize];
            slot.generation += 1;
            slot.data = None;
            self.free_list.push(node.index);
        }
    }

    pub fn set_text(&mut self, id: NodeId, content: &str) {
        if let Some(data) = self.data_mut(id) {
            match &mut data.kind {
                NodeKind::Text(c) | NodeKind::Comment(c) => {
                    *c = content.to_string();
                }
                NodeKind::Element { .. } => {}
            }
        }
    }

    /// Concatenated text of a node and its descendants, document order.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(c)) => c.clone(),
            Some(NodeKind::Comment(_)) | None => String::new(),
            Some(NodeKind::Element { .. }) => {
                let mut out = String::new();
                for child in self.children(id) {
                    out.push_str(&self.text_content(child));
                }
                out
            }
        }
    }

    /// Replace an element's children with a single text node (or set a
    /// text node's content directly).
    pub fn set_text_content(&mut self, id: NodeId, content: &str) {
        if self.is_text(id) {
            self.set_text(id, content);
            return;
        }
        if !self.is_element(id) {
            return;
        }
        for child in self.children(id) {
            self.remove_node(child);
        }
        let text = self.create_text(content);
        self.append_child(id, text);
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(NodeKind::Element { attributes, .. }) = self.data_mut(id).map(|d| &mut d.kind) {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(NodeKind::Element { attributes, .. }) = self.data_mut(id).map(|d| &mut d.kind) {
            attributes.shift_remove(name);
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes.get(name).cloned(),
            _ => None,
        }
    }

    pub fn set_property(&mut self, id: NodeId, name: &str, value: PropertyValue) {
        if let Some(NodeKind::Element { properties, .. }) = self.data_mut(id).map(|d| &mut d.kind) {
            properties.insert(name.to_string(), value);
        }
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<PropertyValue> {
        match self.kind(id) {
            Some(NodeKind::Element { properties, .. }) => properties.get(name).cloned(),
            _ => None,
        }
    }

    /// All descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            let children = self.children(node);
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.tag(*id).as_deref() == Some(tag))
            .collect()
    }

    pub fn add_listener(&mut self, id: NodeId, event_type: &str, listener: EventListener) {
        self.listeners
            .entry(id)
            .or_default()
            .push((event_type.to_string(), listener));
    }

    pub fn remove_listeners(&mut self, id: NodeId, event_type: &str) {
        if let Some(entries) = self.listeners.get_mut(&id) {
            entries.retain(|(ty, _)| ty != event_type);
        }
    }

    pub(crate) fn listeners_for(&self, id: NodeId, event_type: &str) -> Vec<EventListener> {
        self.listeners
            .get(&id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(ty, _)| ty == event_type)
                    .map(|(_, l)| l.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// JSON snapshot of a subtree, for diagnostics and test assertions.
    pub fn to_json(&self, id: NodeId) -> serde_json::Value {
        match self.kind(id) {
            Some(NodeKind::Text(c)) => json!({ "text": c }),
            Some(NodeKind::Comment(c)) => json!({ "comment": c }),
            Some(NodeKind::Element {
                tag,
                attributes,
                properties,
            }) => {
                let children: Vec<serde_json::Value> = self
                    .children(id)
                    .into_iter()
                    .map(|c| self.to_json(c))
                    .collect();
                json!({
                    "tag": tag,
                    "attributes": attributes,
                    "properties": properties,
                    "children": children,
                })
            }
            None => serde_json::Value::Null,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_free_with_generations() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_text("hi");
        assert!(doc.is_valid(a));
        assert!(doc.is_valid(b));
        assert_ne!(a, b);

        doc.remove_node(a);
        assert!(!doc.is_valid(a));

        let c = doc.create_element("span");
        assert_eq!(c.index, a.index);
        assert_ne!(c.generation, a.generation);
    }

    #[test]
    fn insert_before_moves_existing_child() {
        let mut doc = Document::new();
        let ul = doc.create_element("ul");
        doc.append_child(doc.root(), ul);
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        let c = doc.create_element("li");
        doc.append_child(ul, a);
        doc.append_child(ul, b);
        doc.append_child(ul, c);

        // Move c to the front; identity is preserved.
        doc.insert_before(ul, c, Some(a));
        assert_eq!(doc.children(ul), vec![c, a, b]);
        assert!(doc.is_valid(c));
    }

    #[test]
    fn remove_node_frees_subtree() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("x");
        doc.append_child(doc.root(), div);
        doc.append_child(div, text);

        doc.remove_node(div);
        assert!(!doc.is_valid(div));
        assert!(!doc.is_valid(text));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn text_content_concatenates() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let t1 = doc.create_text("a");
        let span = doc.create_element("span");
        let t2 = doc.create_text("b");
        doc.append_child(doc.root(), div);
        doc.append_child(div, t1);
        doc.append_child(div, span);
        doc.append_child(span, t2);
        assert_eq!(doc.text_content(div), "ab");

        doc.set_text_content(div, "c");
        assert_eq!(doc.text_content(div), "c");
        assert_eq!(doc.child_count(div), 1);
    }

    #[test]
    fn attributes_and_properties_are_separate() {
        let mut doc = Document::new();
        let input = doc.create_element("input");
        doc.set_attribute(input, "type", "text");
        doc.set_property(input, "value", PropertyValue::text("hello"));
        assert_eq!(doc.attribute(input, "type").as_deref(), Some("text"));
        assert_eq!(doc.attribute(input, "value"), None);
        assert_eq!(
            doc.property(input, "value"),
            Some(PropertyValue::Text("hello".into()))
        );
    }
}
