//! Interned `(pattern, list index)` references.
//!
//! A `StatePropertyRef` is the coordinate every cache entry and every
//! notification keys on. Refs are hash-consed by `(info.id, list index
//! id)`, so equality is identity. The ref itself carries no value.

use crate::error::{ErrorCode, Result, StructiveError};
use crate::list_index::ListIndex;
use crate::path::StructuredPathInfo;
use rustc_hash::FxHashMap;
use serde_json::json;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Interning key: `(info.id, list_index.id | 0)`.
pub type RefKey = (u32, u64);

pub struct StatePropertyRef {
    pub info: Rc<StructuredPathInfo>,
    pub list_index: Option<Rc<ListIndex>>,
    parent: RefCell<Option<Option<Rc<StatePropertyRef>>>>,
}

impl StatePropertyRef {
    pub fn key(&self) -> RefKey {
        (
            self.info.id,
            self.list_index.as_ref().map(|li| li.id).unwrap_or(0),
        )
    }

    pub fn pattern(&self) -> Rc<str> {
        self.info.pattern.clone()
    }

    /// The ref one pattern level up. When the parent pattern carries
    /// fewer wildcards one level of list index is dropped; otherwise the
    /// same list index is kept. Memoised after the first derivation.
    pub fn parent_ref(self: &Rc<Self>) -> Result<Option<Rc<StatePropertyRef>>> {
        if let Some(memo) = &*self.parent.borrow() {
            return Ok(memo.clone());
        }
        let derived = match &self.info.parent_info {
            None => None,
            Some(parent_info) => {
                let parent_list_index = if parent_info.wildcard_count < self.info.wildcard_count {
                    match parent_info.wildcard_count {
                        0 => None,
                        n => self
                            .list_index
                            .as_ref()
                            .and_then(|li| li.at(n as isize - 1)),
                    }
                } else {
                    self.list_index.clone()
                };
                Some(get_state_property_ref(
                    parent_info.clone(),
                    parent_list_index,
                )?)
            }
        };
        *self.parent.borrow_mut() = Some(derived.clone());
        Ok(derived)
    }
}

impl PartialEq for StatePropertyRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for StatePropertyRef {}

impl std::hash::Hash for StatePropertyRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for StatePropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.list_index {
            Some(li) => write!(f, "Ref({} @ {:?})", self.info.pattern, li.indexes()),
            None => write!(f, "Ref({})", self.info.pattern),
        }
    }
}

thread_local! {
    static REF_CACHE: RefCell<FxHashMap<RefKey, Rc<StatePropertyRef>>> =
        RefCell::new(FxHashMap::default());
}

/// Intern a ref. `list_index` must be absent exactly when the pattern has
/// no wildcards, and its depth must cover every wildcard level.
pub fn get_state_property_ref(
    info: Rc<StructuredPathInfo>,
    list_index: Option<Rc<ListIndex>>,
) -> Result<Rc<StatePropertyRef>> {
    match (&list_index, info.wildcard_count) {
        (None, 0) => {}
        (Some(li), n) if n > 0 => {
            if li.position + 1 != n {
                return Err(StructiveError::new(
                    ErrorCode::BindingResolution,
                    format!(
                        "list index depth {} does not match wildcard count {} of \"{}\"",
                        li.position + 1,
                        n,
                        info.pattern
                    ),
                )
                .with_context(json!({ "pattern": info.pattern.as_ref() })));
            }
        }
        _ => {
            return Err(StructiveError::new(
                ErrorCode::BindingResolution,
                format!(
                    "pattern \"{}\" requires a list index iff it has wildcards",
                    info.pattern
                ),
            )
            .with_context(json!({
                "pattern": info.pattern.as_ref(),
                "wildcards": info.wildcard_count,
            })));
        }
    }

    let key = (
        info.id,
        list_index.as_ref().map(|li| li.id).unwrap_or(0),
    );
    if let Some(hit) = REF_CACHE.with(|cache| cache.borrow().get(&key).cloned()) {
        return Ok(hit);
    }
    let reference = Rc::new(StatePropertyRef {
        info,
        list_index,
        parent: RefCell::new(None),
    });
    REF_CACHE.with(|cache| cache.borrow_mut().insert(key, reference.clone()));
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::get_structured_path_info;

    #[test]
    fn refs_are_interned_by_pattern_and_list_index() {
        let info = get_structured_path_info("user.name").unwrap();
        let a = get_state_property_ref(info.clone(), None).unwrap();
        let b = get_state_property_ref(info, None).unwrap();
        assert!(Rc::ptr_eq(&a, &b));

        let list_info = get_structured_path_info("items.*").unwrap();
        let li = ListIndex::new(None, 0);
        let c = get_state_property_ref(list_info.clone(), Some(li.clone())).unwrap();
        let d = get_state_property_ref(list_info, Some(li)).unwrap();
        assert!(Rc::ptr_eq(&c, &d));
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn list_index_presence_must_match_wildcards() {
        let plain = get_structured_path_info("user.name").unwrap();
        let li = ListIndex::new(None, 0);
        assert_eq!(
            get_state_property_ref(plain, Some(li)).unwrap_err().code,
            ErrorCode::BindingResolution
        );
        let wild = get_structured_path_info("items.*").unwrap();
        assert_eq!(
            get_state_property_ref(wild, None).unwrap_err().code,
            ErrorCode::BindingResolution
        );
    }

    #[test]
    fn parent_ref_follows_the_wildcard_count_rule() {
        let li = ListIndex::new(None, 2);
        let name_info = get_structured_path_info("items.*.name").unwrap();
        let name_ref = get_state_property_ref(name_info.clone(), Some(li.clone())).unwrap();

        // items.*.name -> items.* keeps the same list index.
        let element_ref = name_ref.parent_ref().unwrap().unwrap();
        assert_eq!(element_ref.info.pattern.as_ref(), "items.*");
        assert!(Rc::ptr_eq(element_ref.list_index.as_ref().unwrap(), &li));
        assert!(Rc::ptr_eq(
            &element_ref.info,
            name_ref.info.parent_info.as_ref().unwrap()
        ));

        // items.* -> items drops the list dimension.
        let list_ref = element_ref.parent_ref().unwrap().unwrap();
        assert_eq!(list_ref.info.pattern.as_ref(), "items");
        assert!(list_ref.list_index.is_none());
        assert!(list_ref.parent_ref().unwrap().is_none());
    }

    #[test]
    fn nested_parent_keeps_outer_level() {
        let outer = ListIndex::new(None, 0);
        let inner = ListIndex::new(Some(outer.clone()), 1);
        let info = get_structured_path_info("rows.*.cols.*").unwrap();
        let cell_ref = get_state_property_ref(info, Some(inner)).unwrap();
        let cols_ref = cell_ref.parent_ref().unwrap().unwrap();
        assert_eq!(cols_ref.info.pattern.as_ref(), "rows.*.cols");
        assert!(Rc::ptr_eq(cols_ref.list_index.as_ref().unwrap(), &outer));
    }
}
