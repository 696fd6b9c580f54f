//! Per-component path tree.
//!
//! The updater walks this tree to find static descendants of a changed
//! pattern. Nodes are created by path registration and never removed.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub struct PathNode {
    /// Segment name ("" at the root).
    pub name: Rc<str>,
    /// Full path down to this node ("" at the root).
    pub current_path: Rc<str>,
    pub level: usize,
    children: RefCell<FxHashMap<Rc<str>, Rc<PathNode>>>,
}

impl std::fmt::Debug for PathNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PathNode({})", self.current_path)
    }
}

impl PathNode {
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            name: Rc::from(""),
            current_path: Rc::from(""),
            level: 0,
            children: RefCell::new(FxHashMap::default()),
        })
    }

    /// Existing or newly created child for `segment`.
    pub fn append_child(self: &Rc<Self>, segment: &str) -> Rc<PathNode> {
        if let Some(existing) = self.children.borrow().get(segment) {
            return existing.clone();
        }
        let current_path: Rc<str> = if self.current_path.is_empty() {
            Rc::from(segment)
        } else {
            Rc::from(format!("{}.{}", self.current_path, segment).as_str())
        };
        let child = Rc::new(PathNode {
            name: Rc::from(segment),
            current_path,
            level: self.level + 1,
            children: RefCell::new(FxHashMap::default()),
        });
        self.children
            .borrow_mut()
            .insert(child.name.clone(), child.clone());
        child
    }

    pub fn child(&self, segment: &str) -> Option<Rc<PathNode>> {
        self.children.borrow().get(segment).cloned()
    }

    pub fn children(&self) -> Vec<Rc<PathNode>> {
        self.children.borrow().values().cloned().collect()
    }

    /// Walk `segments` downward without creating anything.
    pub fn find(self: &Rc<Self>, segments: &[Rc<str>]) -> Option<Rc<PathNode>> {
        let mut node = self.clone();
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }
}

/// Resolve a dotted path against a tree root.
pub fn find_path_node_by_path(root: &Rc<PathNode>, path: &str) -> Option<Rc<PathNode>> {
    let mut node = root.clone();
    for segment in path.split('.') {
        node = node.child(segment)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_child_is_idempotent() {
        let root = PathNode::root();
        let a1 = root.append_child("items");
        let a2 = root.append_child("items");
        assert!(Rc::ptr_eq(&a1, &a2));
        assert_eq!(a1.current_path.as_ref(), "items");
        assert_eq!(a1.level, 1);
    }

    #[test]
    fn find_walks_registered_paths_only() {
        let root = PathNode::root();
        root.append_child("items").append_child("*").append_child("name");
        let node = find_path_node_by_path(&root, "items.*.name").unwrap();
        assert_eq!(node.current_path.as_ref(), "items.*.name");
        assert!(find_path_node_by_path(&root, "items.*.missing").is_none());
    }
}
