//! Update scheduling.
//!
//! Writes enqueue refs; the transitive closure of affected patterns is
//! stamped with the current (version, revision); a scheduled microtask
//! drains the queue into render batches until quiescence. `update` wraps
//! one synchronous transaction — everything it writes renders as one
//! batch — and re-enters afterwards for the state's updated callback.

use crate::binding::loop_context::LoopContext;
use crate::component::ComponentEngine;
use crate::error::{report, ErrorCode, Result, StructiveError};
use crate::list_index::ListIndex;
use crate::path::StructuredPathInfo;
use crate::renderer::Renderer;
use crate::stamp::Stamp;
use crate::state::access::{AccessMode, StateAccess};
use crate::state_ref::{RefKey, StatePropertyRef};
use crate::value::Value;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// Snapshot of a list taken at the first in-place element write of a
/// batch, so a reorder collapses into index mutations.
pub struct SwapInfo {
    pub values: Vec<Value>,
    pub list_indexes: Option<Rc<Vec<Rc<ListIndex>>>>,
}

/// What the state's updated callback receives per changed ref.
#[derive(Debug, Clone)]
pub struct UpdateInfo {
    pub pattern: Rc<str>,
    pub indexes: Vec<usize>,
}

/// Scheduled work drained by `flush`.
pub(crate) enum Microtask {
    Render,
    UpdatedCallback(Vec<Rc<StatePropertyRef>>),
}

/// Per-component update bookkeeping.
pub struct Updater {
    pub version: u64,
    pub revision: u64,
    pub(crate) queue: Vec<Rc<StatePropertyRef>>,
    pub(crate) save_queue: Vec<Rc<StatePropertyRef>>,
    pub(crate) rendering: bool,
    pub(crate) update_depth: u32,
    pub(crate) affected_memo: FxHashMap<Rc<str>, Rc<Vec<Rc<str>>>>,
    pub(crate) swap_info: FxHashMap<RefKey, SwapInfo>,
}

impl Updater {
    pub fn new() -> Self {
        Self {
            version: 0,
            revision: 0,
            queue: Vec::new(),
            save_queue: Vec::new(),
            rendering: false,
            update_depth: 0,
            affected_memo: FxHashMap::default(),
            swap_info: FxHashMap::default(),
        }
    }
}

impl Default for Updater {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentEngine {
    /// Queue a changed ref: bump the revision, stamp every pattern
    /// reachable through static children and dynamic dependencies, and
    /// schedule a render if one is not already pending.
    pub(crate) fn enqueue_ref(self: &Rc<Self>, reference: Rc<StatePropertyRef>) {
        let (version, revision, schedule) = {
            let mut updater = self.updater.borrow_mut();
            updater.revision += 1;
            updater.queue.push(reference.clone());
            updater.save_queue.push(reference.clone());
            let schedule = !updater.rendering;
            if schedule {
                updater.rendering = true;
            }
            (updater.version, updater.revision, schedule)
        };

        let affected = self.affected_patterns(&reference.info);
        {
            let mut stamps = self.version_revision.borrow_mut();
            for pattern in affected.iter() {
                stamps.insert(pattern.clone(), Stamp::new(version, revision));
            }
        }

        {
            let mut ledger = self.diagnostics.borrow_mut();
            if ledger.is_enabled() {
                let indexes = reference
                    .list_index
                    .as_ref()
                    .map(|li| li.indexes())
                    .unwrap_or_default();
                ledger.record(version, revision, reference.info.pattern.clone(), indexes);
            }
        }

        if schedule {
            self.microtasks.borrow_mut().push_back(Microtask::Render);
        }
    }

    /// Transitive closure of patterns affected by a change to `info`:
    /// static path-tree descendants (skipping element subtrees when the
    /// source itself is their list) plus dynamic dependents, cycles cut
    /// by a visited set and memoised per source pattern.
    pub(crate) fn affected_patterns(&self, info: &Rc<StructuredPathInfo>) -> Rc<Vec<Rc<str>>> {
        let source = info.pattern.clone();
        if let Some(hit) = self.updater.borrow().affected_memo.get(&source) {
            return hit.clone();
        }
        let manager = self.path_manager();
        let mut seen: FxHashSet<Rc<str>> = FxHashSet::default();
        let mut result: Vec<Rc<str>> = Vec::new();
        let mut worklist: Vec<Rc<str>> = vec![source.clone()];
        while let Some(pattern) = worklist.pop() {
            if !seen.insert(pattern.clone()) {
                continue;
            }
            result.push(pattern.clone());
            if let Some(node) = manager.find_node(&pattern) {
                for child in node.children() {
                    if child.name.as_ref() == "*"
                        && pattern == source
                        && manager.is_list(&pattern)
                    {
                        continue;
                    }
                    worklist.push(child.current_path.clone());
                }
            }
            for dependent in manager.dynamic_dependents_of(&pattern) {
                worklist.push(dependent);
            }
        }
        let result = Rc::new(result);
        self.updater
            .borrow_mut()
            .affected_memo
            .insert(source, result.clone());
        result
    }

    /// Drain the render queue to quiescence; entries queued during a
    /// batch are picked up by the next loop turn. A failing batch is
    /// logged and does not stop the loop.
    pub(crate) fn rendering(self: &Rc<Self>) {
        loop {
            let batch: Vec<Rc<StatePropertyRef>> = {
                let mut updater = self.updater.borrow_mut();
                if updater.queue.is_empty() {
                    updater.rendering = false;
                    break;
                }
                std::mem::take(&mut updater.queue)
            };
            let renderer = Renderer::new(self.clone());
            renderer.render(&batch);
        }
    }

    /// Run `f` against a writable handle as one update transaction.
    /// Errors from `f` propagate to the caller; the flush still happens.
    pub fn update(
        self: &Rc<Self>,
        f: impl FnOnce(&StateAccess) -> Result<()>,
    ) -> Result<()> {
        self.update_with_context(None, f)
    }

    pub(crate) fn update_with_context(
        self: &Rc<Self>,
        loop_context: Option<Rc<LoopContext>>,
        f: impl FnOnce(&StateAccess) -> Result<()>,
    ) -> Result<()> {
        let outermost = {
            let mut updater = self.updater.borrow_mut();
            updater.update_depth += 1;
            let outermost = updater.update_depth == 1;
            if outermost {
                updater.version += 1;
                updater.revision = 0;
                updater.affected_memo.clear();
                updater.swap_info.clear();
            }
            outermost
        };

        let entered_context = loop_context.is_some();
        if entered_context && self.handler().loop_context().is_some() {
            self.updater.borrow_mut().update_depth -= 1;
            return Err(StructiveError::new(
                ErrorCode::LoopContextBusy,
                "a loop context is already active for this update",
            ));
        }
        let previous_context = if entered_context {
            self.handler().replace_loop_context(loop_context)
        } else {
            None
        };

        let result = f(&StateAccess::new(self.clone(), AccessMode::Writable));

        if entered_context {
            self.handler().replace_loop_context(previous_context);
        }

        if outermost {
            let saved = {
                let mut updater = self.updater.borrow_mut();
                std::mem::take(&mut updater.save_queue)
            };
            if self.path_manager().has_updated_callback() && !saved.is_empty() {
                self.microtasks
                    .borrow_mut()
                    .push_back(Microtask::UpdatedCallback(saved));
            }
        }
        self.updater.borrow_mut().update_depth -= 1;
        if outermost {
            self.flush();
        }
        result
    }

    /// Fire-and-forget update; failures are reported as `STATE-204`.
    pub fn invoke(self: &Rc<Self>, f: impl FnOnce(&StateAccess) -> Result<()>) {
        self.invoke_with_context(None, f);
    }

    pub(crate) fn invoke_with_context(
        self: &Rc<Self>,
        loop_context: Option<Rc<LoopContext>>,
        f: impl FnOnce(&StateAccess) -> Result<()>,
    ) {
        if let Err(error) = self.update_with_context(loop_context, f) {
            report(
                &StructiveError::new(ErrorCode::InvokeFailed, "invoked update failed")
                    .with_cause(error),
            );
        }
    }

    /// Drain scheduled microtasks, then let child components drain
    /// theirs. Re-entrant calls (updated callbacks scheduling work while
    /// we drain) fall through to the running loop. Reports whether any
    /// render or callback actually ran, here or in a child.
    pub fn flush(self: &Rc<Self>) -> bool {
        if self.flushing.get() {
            return false;
        }
        self.flushing.set(true);
        let mut did_work = false;
        loop {
            loop {
                let task = self.microtasks.borrow_mut().pop_front();
                match task {
                    Some(Microtask::Render) => {
                        did_work = true;
                        self.rendering();
                    }
                    Some(Microtask::UpdatedCallback(saved)) => {
                        did_work = true;
                        self.run_updated_callback(saved);
                    }
                    None => break,
                }
            }
            let children: Vec<Rc<ComponentEngine>> = self.child_engines();
            for child in children {
                if child.flush() {
                    did_work = true;
                }
            }
            // A child render may have written back through the bridge.
            if self.microtasks.borrow().is_empty() {
                break;
            }
        }
        self.flushing.set(false);
        did_work
    }

    /// `$updatedCallback` re-entry: its own update transaction, with the
    /// refs accumulated by the triggering one. Failures become `UPD-005`.
    fn run_updated_callback(self: &Rc<Self>, saved: Vec<Rc<StatePropertyRef>>) {
        let hook = match self.state_class().on_updated() {
            Some(hook) => hook,
            None => return,
        };
        let infos: Vec<UpdateInfo> = saved
            .iter()
            .map(|r| UpdateInfo {
                pattern: r.info.pattern.clone(),
                indexes: r
                    .list_index
                    .as_ref()
                    .map(|li| li.indexes())
                    .unwrap_or_default(),
            })
            .collect();
        if let Err(error) = self.update(move |access| hook(access, &infos)) {
            report(
                &StructiveError::new(
                    ErrorCode::UpdatedCallbackFailed,
                    "updated callback failed",
                )
                .with_cause(error),
            );
        }
    }

    /// First render of a freshly activated content: run its bindings
    /// through the phases without draining the queue.
    pub(crate) fn initial_render(self: &Rc<Self>, content: &Rc<crate::binding::BindContent>) {
        let renderer = Renderer::new(self.clone());
        renderer.initial(content);
    }

    pub(crate) fn updater_version(&self) -> u64 {
        self.updater.borrow().version
    }

    pub(crate) fn updater_version_revision(&self) -> (u64, u64) {
        let updater = self.updater.borrow();
        (updater.version, updater.revision)
    }

    pub(crate) fn take_swap_info(&self, key: &RefKey) -> Option<SwapInfo> {
        self.updater.borrow_mut().swap_info.remove(key)
    }

    pub(crate) fn put_swap_info(&self, key: RefKey, info: SwapInfo) {
        self.updater.borrow_mut().swap_info.insert(key, info);
    }

    pub(crate) fn has_swap_info(&self, key: &RefKey) -> bool {
        self.updater.borrow().swap_info.contains_key(key)
    }
}
