//! One-shot render batches.
//!
//! A `Renderer` executes one drained queue batch: it walks each queued
//! ref's dependent refs (static children, list rows, dynamic
//! dependents), applies their bindings in build order, then runs the
//! deferred apply and apply-select phases. `<select>.value` writes run
//! last so the `<option>`s a `for` builds already exist.

use crate::binding::{BindContent, Binding};
use crate::component::ComponentEngine;
use crate::error::{report, ErrorCode, Result, StructiveError};
use crate::list_index::ListIndex;
use crate::path::{get_structured_path_info, StructuredPathInfo};
use crate::state::access::{AccessMode, StateAccess};
use crate::state_ref::{get_state_property_ref, RefKey, StatePropertyRef};
use crate::value::Value;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Build,
    Apply,
    ApplySelect,
}

/// The previous value and row identities of a list, captured when its
/// cache entry is rediffed; structural bindings diff against this.
#[derive(Clone)]
pub struct ListInfo {
    pub values: Vec<Value>,
    pub list_indexes: Option<Rc<Vec<Rc<ListIndex>>>>,
}

pub struct Renderer {
    engine: Rc<ComponentEngine>,
    phase: Cell<RenderPhase>,
    updated_bindings: RefCell<FxHashSet<u64>>,
    processed_refs: RefCell<FxHashSet<RefKey>>,
    apply_queue: RefCell<Vec<Rc<Binding>>>,
    apply_select_queue: RefCell<Vec<Rc<Binding>>>,
    last_list_info: RefCell<FxHashMap<RefKey, ListInfo>>,
}

impl Renderer {
    pub fn new(engine: Rc<ComponentEngine>) -> Rc<Self> {
        Rc::new(Self {
            engine,
            phase: Cell::new(RenderPhase::Build),
            updated_bindings: RefCell::new(FxHashSet::default()),
            processed_refs: RefCell::new(FxHashSet::default()),
            apply_queue: RefCell::new(Vec::new()),
            apply_select_queue: RefCell::new(Vec::new()),
            last_list_info: RefCell::new(FxHashMap::default()),
        })
    }

    pub fn engine(&self) -> &Rc<ComponentEngine> {
        &self.engine
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase.get()
    }

    pub fn readonly_access(&self) -> StateAccess {
        StateAccess::new(self.engine.clone(), AccessMode::Readonly)
    }

    /// Render a drained queue batch. Per-binding failures are logged and
    /// the batch continues; one bad binding must not freeze the component.
    pub fn render(self: &Rc<Self>, batch: &[Rc<StatePropertyRef>]) {
        self.engine.handler().set_renderer(Some(self.clone()));
        self.phase.set(RenderPhase::Build);

        let mut visited: FxHashSet<RefKey> = FxHashSet::default();
        let mut worklist: VecDeque<Rc<StatePropertyRef>> = batch.iter().cloned().collect();
        while let Some(reference) = worklist.pop_front() {
            if !visited.insert(reference.key()) {
                continue;
            }
            for binding in self.engine.bindings_for_key(&reference.key()) {
                if let Err(error) = binding.apply_change(self) {
                    report(&error);
                }
            }
            if let Err(error) = self.expand(&reference, &mut worklist) {
                report(&error);
            }
        }

        self.run_deferred_phases();
        self.engine.handler().set_renderer(None);
    }

    /// First render of a freshly activated content: every binding runs
    /// once through the phases, nothing is expanded.
    pub fn initial(self: &Rc<Self>, content: &Rc<BindContent>) {
        self.engine.handler().set_renderer(Some(self.clone()));
        self.phase.set(RenderPhase::Build);
        for binding in content.bindings() {
            if let Err(error) = binding.apply_change(self) {
                report(&error);
            }
        }
        self.run_deferred_phases();
        self.engine.handler().set_renderer(None);
    }

    /// Run the bindings of a content created mid-batch (a new loop row
    /// or a newly visible conditional).
    pub(crate) fn render_bindings(self: &Rc<Self>, content: &Rc<BindContent>) {
        for binding in content.bindings() {
            if let Err(error) = binding.apply_change(self) {
                report(&error);
            }
        }
    }

    fn run_deferred_phases(self: &Rc<Self>) {
        self.phase.set(RenderPhase::Apply);
        loop {
            let batch = std::mem::take(&mut *self.apply_queue.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for binding in batch {
                if let Err(error) = binding.apply_change(self) {
                    report(&error);
                }
            }
        }
        self.phase.set(RenderPhase::ApplySelect);
        loop {
            let batch = std::mem::take(&mut *self.apply_select_queue.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for binding in batch {
                if let Err(error) = binding.apply_change(self) {
                    report(&error);
                }
            }
        }
    }

    /// Push the refs depending on `reference` onto the worklist: static
    /// children (element children fan out across the list's current
    /// rows) and dynamic dependents (fanned out across all rows).
    fn expand(
        self: &Rc<Self>,
        reference: &Rc<StatePropertyRef>,
        worklist: &mut VecDeque<Rc<StatePropertyRef>>,
    ) -> Result<()> {
        let manager = self.engine.path_manager();
        let access = self.readonly_access();

        let node = manager.find_node(&reference.info.pattern);
        if node.is_none() {
            report(&StructiveError::warning(
                ErrorCode::PathNodeMissing,
                format!(
                    "no path node registered for \"{}\"",
                    reference.info.pattern
                ),
            ));
        }
        if let Some(node) = node {
            for child in node.children() {
                let child_info = get_structured_path_info(&child.current_path)?;
                if child.name.as_ref() == "*" {
                    if manager.is_list(&reference.info.pattern) {
                        match access.list_indexes(reference) {
                            Ok(list_indexes) => {
                                for list_index in list_indexes.iter() {
                                    worklist.push_back(get_state_property_ref(
                                        child_info.clone(),
                                        Some(list_index.clone()),
                                    )?);
                                }
                            }
                            Err(error) => report(&error),
                        }
                    }
                } else {
                    worklist.push_back(get_state_property_ref(
                        child_info,
                        reference.list_index.clone(),
                    )?);
                }
            }
        }

        for dependent in manager.dynamic_dependents_of(&reference.info.pattern) {
            match get_structured_path_info(&dependent) {
                Ok(dependent_info) => {
                    if dependent_info.wildcard_count == 0 {
                        worklist.push_back(get_state_property_ref(dependent_info, None)?);
                    } else {
                        let mut refs = Vec::new();
                        if let Err(error) =
                            self.collect_refs(&access, &dependent_info, 0, None, &mut refs)
                        {
                            report(&error);
                        }
                        for r in refs {
                            worklist.push_back(r);
                        }
                    }
                }
                Err(error) => report(
                    &StructiveError::new(
                        ErrorCode::PathInfoMissing,
                        format!("dynamic dependent \"{dependent}\" cannot be resolved"),
                    )
                    .with_cause(error),
                ),
            }
        }
        Ok(())
    }

    /// Every concrete ref of a wildcard pattern, across all current rows.
    fn collect_refs(
        &self,
        access: &StateAccess,
        info: &Rc<StructuredPathInfo>,
        level: usize,
        current: Option<Rc<ListIndex>>,
        out: &mut Vec<Rc<StatePropertyRef>>,
    ) -> Result<()> {
        if level == info.wildcard_count {
            out.push(get_state_property_ref(info.clone(), current)?);
            return Ok(());
        }
        let list_info = get_structured_path_info(&info.wildcard_parent_paths[level])?;
        let list_ref = get_state_property_ref(list_info, current)?;
        let list_indexes = access.list_indexes(&list_ref)?;
        for list_index in list_indexes.iter() {
            self.collect_refs(access, info, level + 1, Some(list_index.clone()), out)?;
        }
        Ok(())
    }

    /// False when the binding already ran in this batch.
    pub(crate) fn mark_updated(&self, binding_id: u64) -> bool {
        self.updated_bindings.borrow_mut().insert(binding_id)
    }

    pub(crate) fn mark_processed(&self, key: RefKey) {
        self.processed_refs.borrow_mut().insert(key);
    }

    pub fn processed_count(&self) -> usize {
        self.processed_refs.borrow().len()
    }

    pub(crate) fn record_list_info(&self, key: RefKey, info: ListInfo) {
        self.last_list_info.borrow_mut().insert(key, info);
    }

    pub(crate) fn take_list_info(&self, key: &RefKey) -> Option<ListInfo> {
        self.last_list_info.borrow_mut().remove(key)
    }

    pub(crate) fn enqueue_apply(&self, binding: Rc<Binding>) {
        self.apply_queue.borrow_mut().push(binding);
    }

    pub(crate) fn enqueue_apply_select(&self, binding: Rc<Binding>) {
        self.apply_select_queue.borrow_mut().push(binding);
    }
}
