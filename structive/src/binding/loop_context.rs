//! Loop contexts.
//!
//! A `LoopContext` is the (wildcard-prefix ref, list index) pair active
//! inside one list iteration. Wildcard resolution walks the chain from
//! the innermost context outward and takes the nearest match.

use crate::error::Result;
use crate::list_index::ListIndex;
use crate::path::StructuredPathInfo;
use crate::state_ref::{get_state_property_ref, StatePropertyRef};
use std::cell::RefCell;
use std::rc::Rc;

pub struct LoopContext {
    parent: Option<Rc<LoopContext>>,
    /// The element pattern this loop iterates (`items.*`).
    info: Rc<StructuredPathInfo>,
    list_index: RefCell<Rc<ListIndex>>,
}

impl LoopContext {
    pub fn new(
        info: Rc<StructuredPathInfo>,
        list_index: Rc<ListIndex>,
        parent: Option<Rc<LoopContext>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            parent,
            info,
            list_index: RefCell::new(list_index),
        })
    }

    pub fn info(&self) -> Rc<StructuredPathInfo> {
        self.info.clone()
    }

    pub fn pattern(&self) -> Rc<str> {
        self.info.pattern.clone()
    }

    pub fn parent(&self) -> Option<Rc<LoopContext>> {
        self.parent.clone()
    }

    pub fn list_index(&self) -> Rc<ListIndex> {
        self.list_index.borrow().clone()
    }

    /// Rebind this context to another row; used when an inactive content
    /// is pulled from the pool for a fresh iteration.
    pub fn set_list_index(&self, list_index: Rc<ListIndex>) {
        *self.list_index.borrow_mut() = list_index;
    }

    /// The ref of this iteration's element pattern.
    pub fn element_ref(&self) -> Result<Rc<StatePropertyRef>> {
        get_state_property_ref(self.info.clone(), Some(self.list_index()))
    }

    /// Nearest enclosing context whose pattern equals `wildcard_path`.
    pub fn find(self: &Rc<Self>, wildcard_path: &str) -> Option<Rc<LoopContext>> {
        let mut current = Some(self.clone());
        while let Some(context) = current {
            if context.info.pattern.as_ref() == wildcard_path {
                return Some(context);
            }
            current = context.parent.clone();
        }
        None
    }

    /// Chain from the outermost loop down to this one.
    pub fn chain(self: &Rc<Self>) -> Vec<Rc<LoopContext>> {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(context) = current {
            current = context.parent.clone();
            chain.push(context);
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::get_structured_path_info;

    #[test]
    fn find_prefers_the_nearest_match() {
        let items = get_structured_path_info("items.*").unwrap();
        let tags = get_structured_path_info("items.*.tags.*").unwrap();
        let outer_li = ListIndex::new(None, 0);
        let inner_li = ListIndex::new(Some(outer_li.clone()), 1);
        let outer = LoopContext::new(items.clone(), outer_li.clone(), None);
        let inner = LoopContext::new(tags, inner_li, Some(outer.clone()));

        let found = inner.find("items.*").unwrap();
        assert!(Rc::ptr_eq(&found, &outer));
        assert!(inner.find("rows.*").is_none());
        assert_eq!(inner.chain().len(), 2);
        assert!(Rc::ptr_eq(&inner.chain()[0], &outer));
    }

    #[test]
    fn rebinding_swaps_the_row() {
        let items = get_structured_path_info("items.*").unwrap();
        let a = ListIndex::new(None, 0);
        let b = ListIndex::new(None, 1);
        let context = LoopContext::new(items, a, None);
        context.set_list_index(b.clone());
        assert!(Rc::ptr_eq(&context.list_index(), &b));
    }
}
