//! Per-component registry of declared paths.
//!
//! Tracks which patterns are computed accessors, which are identity-
//! tracked lists, and the dynamic dependency edges recorded the first
//! time a getter reads another pattern.

use super::info::get_structured_path_info;
use super::node::{find_path_node_by_path, PathNode};
use crate::error::{ErrorCode, Result, StructiveError};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct PathManager {
    root_node: Rc<PathNode>,
    getters: RefCell<IndexSet<Rc<str>>>,
    setters: RefCell<IndexSet<Rc<str>>>,
    only_getters: RefCell<IndexSet<Rc<str>>>,
    lists: RefCell<IndexSet<Rc<str>>>,
    elements: RefCell<IndexSet<Rc<str>>>,
    dynamic_dependencies: RefCell<FxHashMap<Rc<str>, IndexSet<Rc<str>>>>,
    has_updated_callback: Cell<bool>,
}

impl PathManager {
    pub fn new() -> Self {
        Self {
            root_node: PathNode::root(),
            getters: RefCell::new(IndexSet::new()),
            setters: RefCell::new(IndexSet::new()),
            only_getters: RefCell::new(IndexSet::new()),
            lists: RefCell::new(IndexSet::new()),
            elements: RefCell::new(IndexSet::new()),
            dynamic_dependencies: RefCell::new(FxHashMap::default()),
            has_updated_callback: Cell::new(false),
        }
    }

    pub fn root_node(&self) -> Rc<PathNode> {
        self.root_node.clone()
    }

    /// Register a pattern (and its prefixes) in the path tree. Any
    /// wildcard inside the pattern implies its parent path is a list.
    pub fn add_path(&self, pattern: &str, is_list: bool) -> Result<()> {
        let info = get_structured_path_info(pattern)?;
        let mut node = self.root_node.clone();
        for segment in &info.path_segments {
            node = node.append_child(segment);
        }
        for (i, wildcard_parent) in info.wildcard_parent_paths.iter().enumerate() {
            self.lists.borrow_mut().insert(wildcard_parent.clone());
            self.elements
                .borrow_mut()
                .insert(info.wildcard_paths[i].clone());
        }
        if is_list {
            self.lists.borrow_mut().insert(info.pattern.clone());
            let element_pattern = format!("{}.*", pattern);
            let element_info = get_structured_path_info(&element_pattern)?;
            self.elements
                .borrow_mut()
                .insert(element_info.pattern.clone());
            let mut node = self.root_node.clone();
            for segment in &element_info.path_segments {
                node = node.append_child(segment);
            }
        }
        Ok(())
    }

    pub fn add_getter(&self, pattern: &str) -> Result<()> {
        self.add_path(pattern, false)?;
        let info = get_structured_path_info(pattern)?;
        self.getters.borrow_mut().insert(info.pattern.clone());
        if !self.setters.borrow().contains(pattern) {
            self.only_getters.borrow_mut().insert(info.pattern.clone());
        }
        Ok(())
    }

    pub fn add_setter(&self, pattern: &str) -> Result<()> {
        self.add_path(pattern, false)?;
        let info = get_structured_path_info(pattern)?;
        self.setters.borrow_mut().insert(info.pattern.clone());
        self.only_getters.borrow_mut().shift_remove(pattern);
        Ok(())
    }

    /// Record `source → dependent` the first time a getter for `source`
    /// reads another pattern. Self-edges are ignored.
    pub fn add_dynamic_dependency(&self, source: &str, dependent: &str) {
        if source == dependent {
            return;
        }
        let source: Rc<str> = Rc::from(source);
        let dependent: Rc<str> = Rc::from(dependent);
        self.dynamic_dependencies
            .borrow_mut()
            .entry(source)
            .or_default()
            .insert(dependent);
    }

    /// Dependents recorded against getters that read `source`: edges run
    /// source → getter-that-must-recompute, so this looks up by source.
    pub fn dynamic_dependents_of(&self, source: &str) -> Vec<Rc<str>> {
        self.dynamic_dependencies
            .borrow()
            .get(source)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_dynamic_dependents(&self, source: &str) -> bool {
        self.dynamic_dependencies
            .borrow()
            .get(source)
            .map(|set| !set.is_empty())
            .unwrap_or(false)
    }

    pub fn is_getter(&self, pattern: &str) -> bool {
        self.getters.borrow().contains(pattern)
    }

    pub fn is_setter(&self, pattern: &str) -> bool {
        self.setters.borrow().contains(pattern)
    }

    pub fn is_only_getter(&self, pattern: &str) -> bool {
        self.only_getters.borrow().contains(pattern)
    }

    pub fn is_list(&self, pattern: &str) -> bool {
        self.lists.borrow().contains(pattern)
    }

    pub fn is_element(&self, pattern: &str) -> bool {
        self.elements.borrow().contains(pattern)
    }

    pub fn lists(&self) -> Vec<Rc<str>> {
        self.lists.borrow().iter().cloned().collect()
    }

    pub fn set_has_updated_callback(&self, value: bool) {
        self.has_updated_callback.set(value);
    }

    pub fn has_updated_callback(&self) -> bool {
        self.has_updated_callback.get()
    }

    pub fn find_node(&self, path: &str) -> Option<Rc<PathNode>> {
        find_path_node_by_path(&self.root_node, path)
    }

    pub fn node_or_err(&self, path: &str) -> Result<Rc<PathNode>> {
        self.find_node(path).ok_or_else(|| {
            StructiveError::new(
                ErrorCode::PathNodeMissing,
                format!("no path node registered for \"{path}\""),
            )
            .with_context(json!({ "path": path }))
        })
    }
}

impl Default for PathManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_paths_imply_lists_and_elements() {
        let manager = PathManager::new();
        manager.add_path("items.*.name", false).unwrap();
        assert!(manager.is_list("items"));
        assert!(manager.is_element("items.*"));
        assert!(manager.find_node("items.*.name").is_some());
    }

    #[test]
    fn explicit_list_registration_adds_element_pattern() {
        let manager = PathManager::new();
        manager.add_path("rows", true).unwrap();
        assert!(manager.is_list("rows"));
        assert!(manager.is_element("rows.*"));
        assert!(manager.find_node("rows.*").is_some());
    }

    #[test]
    fn only_getters_shrink_when_setter_appears() {
        let manager = PathManager::new();
        manager.add_getter("fullName").unwrap();
        assert!(manager.is_only_getter("fullName"));
        manager.add_setter("fullName").unwrap();
        assert!(!manager.is_only_getter("fullName"));
        assert!(manager.is_getter("fullName"));
    }

    #[test]
    fn dynamic_dependencies_dedupe_and_skip_self() {
        let manager = PathManager::new();
        manager.add_dynamic_dependency("first", "fullName");
        manager.add_dynamic_dependency("first", "fullName");
        manager.add_dynamic_dependency("first", "first");
        assert_eq!(manager.dynamic_dependents_of("first").len(), 1);
        assert!(!manager.has_dynamic_dependents("fullName"));
    }

    #[test]
    fn missing_node_is_an_error() {
        let manager = PathManager::new();
        let err = manager.node_or_err("nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::PathNodeMissing);
    }
}
