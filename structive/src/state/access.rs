//! State access handles.
//!
//! A `StateAccess` is the engine's stand-in for a property-intercepting
//! proxy: every read and write on user state flows through `get_by_ref`
//! and `set_by_ref` here. The shared `StateHandler` tracks the ref being
//! evaluated (for dynamic-dependency recording and `$N` lookup), the
//! ambient loop context, and the renderer of the batch in flight.

use crate::binding::loop_context::LoopContext;
use crate::component::{CacheEntry, ComponentEngine};
use crate::error::{ErrorCode, Result, StructiveError};
use crate::list_index::{create_list_indexes, ListIndex};
use crate::path::{get_resolved_path_info, ResolvedPathInfo, StructuredPathInfo, WildcardType};
use crate::renderer::{ListInfo, Renderer};
use crate::state_ref::{get_state_property_ref, StatePropertyRef};
use crate::updater::SwapInfo;
use crate::value::Value;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Bound on getter nesting depth.
pub(crate) const MAX_REF_DEPTH: usize = 32;

/// Shared evaluation state between all access handles of one engine.
pub struct StateHandler {
    ref_stack: RefCell<Vec<Rc<StatePropertyRef>>>,
    loop_context: RefCell<Option<Rc<LoopContext>>>,
    renderer: RefCell<Option<Rc<Renderer>>>,
}

impl StateHandler {
    pub fn new() -> Self {
        Self {
            ref_stack: RefCell::new(Vec::new()),
            loop_context: RefCell::new(None),
            renderer: RefCell::new(None),
        }
    }

    pub fn push_ref(&self, reference: Rc<StatePropertyRef>) -> Result<()> {
        let mut stack = self.ref_stack.borrow_mut();
        if stack.len() >= MAX_REF_DEPTH {
            return Err(StructiveError::new(
                ErrorCode::RefStackViolation,
                format!("ref stack exceeded depth {MAX_REF_DEPTH}"),
            )
            .with_context(json!({ "pattern": reference.info.pattern.as_ref() })));
        }
        stack.push(reference);
        Ok(())
    }

    pub fn pop_ref(&self) {
        self.ref_stack.borrow_mut().pop();
    }

    /// The ref currently being evaluated, if any.
    pub fn last_ref(&self) -> Option<Rc<StatePropertyRef>> {
        self.ref_stack.borrow().last().cloned()
    }

    pub fn stack_is_empty(&self) -> bool {
        self.ref_stack.borrow().is_empty()
    }

    pub fn loop_context(&self) -> Option<Rc<LoopContext>> {
        self.loop_context.borrow().clone()
    }

    pub fn replace_loop_context(
        &self,
        context: Option<Rc<LoopContext>>,
    ) -> Option<Rc<LoopContext>> {
        std::mem::replace(&mut *self.loop_context.borrow_mut(), context)
    }

    pub fn renderer(&self) -> Option<Rc<Renderer>> {
        self.renderer.borrow().clone()
    }

    pub fn set_renderer(&self, renderer: Option<Rc<Renderer>>) {
        *self.renderer.borrow_mut() = renderer;
    }
}

impl Default for StateHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Pops the ref stack even when evaluation bails early.
struct RefStackGuard<'a>(&'a StateHandler);

impl Drop for RefStackGuard<'_> {
    fn drop(&mut self) {
        self.0.pop_ref();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Readonly,
    Writable,
}

/// One read (or read/write) handle over a component's state.
pub struct StateAccess {
    engine: Rc<ComponentEngine>,
    mode: AccessMode,
}

impl StateAccess {
    pub(crate) fn new(engine: Rc<ComponentEngine>, mode: AccessMode) -> Self {
        Self { engine, mode }
    }

    pub fn engine(&self) -> &Rc<ComponentEngine> {
        &self.engine
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Read a path, resolving wildcards against the ambient loop context.
    pub fn get(&self, path: &str) -> Result<Value> {
        let reference = self.ref_for(path, &[])?;
        self.get_by_ref(&reference)
    }

    /// Write a path. Fails `STATE-202` on a readonly handle.
    pub fn set(&self, path: &str, value: Value) -> Result<()> {
        let reference = self.ref_for(path, &[])?;
        self.set_by_ref(&reference, value)
    }

    /// Read a path with explicit wildcard indexes (`$resolve` read form).
    pub fn resolve(&self, path: &str, indexes: &[usize]) -> Result<Value> {
        let reference = self.ref_for(path, indexes)?;
        self.get_by_ref(&reference)
    }

    /// Write a path with explicit wildcard indexes (`$resolve` write form).
    pub fn resolve_set(&self, path: &str, indexes: &[usize], value: Value) -> Result<()> {
        let reference = self.ref_for(path, indexes)?;
        self.set_by_ref(&reference, value)
    }

    /// `$N`: the index of the N-th enclosing loop, 1-based N, 0-based value.
    pub fn index(&self, n: usize) -> Result<usize> {
        if !(1..=9).contains(&n) {
            return Err(StructiveError::new(
                ErrorCode::LoopIndexOutOfRange,
                format!("loop index accessor ${n} is out of range"),
            ));
        }
        let list_index = self
            .engine
            .handler()
            .last_ref()
            .and_then(|r| r.list_index.clone())
            .or_else(|| {
                self.engine
                    .handler()
                    .loop_context()
                    .map(|lc| lc.list_index())
            })
            .ok_or_else(|| {
                StructiveError::new(
                    ErrorCode::ListIndexMissing,
                    format!("no enclosing loop for ${n}"),
                )
            })?;
        list_index.indexes().get(n - 1).copied().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::ListIndexMissing,
                format!("loop nesting is shallower than ${n}"),
            )
        })
    }

    /// Enumerate all concrete resolutions of a wildcard path; a partial
    /// `indexes` prefix pins the outer loops.
    pub fn get_all(&self, path: &str, indexes: &[usize]) -> Result<Vec<Value>> {
        let resolved = get_resolved_path_info(path)?;
        if resolved.info.wildcard_count == 0 {
            return Ok(vec![self.get_by_ref(&get_state_property_ref(
                resolved.info.clone(),
                None,
            )?)?]);
        }
        let mut results = Vec::new();
        self.collect_all(&resolved, indexes, 0, None, &mut results)?;
        Ok(results)
    }

    fn collect_all(
        &self,
        resolved: &Rc<ResolvedPathInfo>,
        fixed: &[usize],
        level: usize,
        current: Option<Rc<ListIndex>>,
        out: &mut Vec<Value>,
    ) -> Result<()> {
        let info = &resolved.info;
        if level == info.wildcard_count {
            let reference = get_state_property_ref(info.clone(), current)?;
            out.push(self.get_by_ref(&reference)?);
            return Ok(());
        }
        let list_indexes = self.list_indexes_at_level(info, level, current.clone())?;
        let pinned = resolved.wildcard_indexes[level].or_else(|| fixed.get(level).copied());
        match pinned {
            Some(index) => {
                let list_index = list_indexes.get(index).cloned().ok_or_else(|| {
                    StructiveError::new(
                        ErrorCode::ListIndexMissing,
                        format!("index {index} out of range at \"{}\"", info.wildcard_paths[level]),
                    )
                })?;
                self.collect_all(resolved, fixed, level + 1, Some(list_index), out)
            }
            None => {
                for list_index in list_indexes.iter() {
                    self.collect_all(resolved, fixed, level + 1, Some(list_index.clone()), out)?;
                }
                Ok(())
            }
        }
    }

    /// Force-record a dynamic dependency from the getter being evaluated.
    pub fn track_dependency(&self, path: &str) -> Result<()> {
        let outer = self.engine.handler().last_ref().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::RefStackViolation,
                "track_dependency called outside a getter",
            )
        })?;
        let resolved = get_resolved_path_info(path)?;
        self.engine
            .path_manager()
            .add_path(&resolved.info.pattern, false)?;
        self.engine
            .path_manager()
            .add_dynamic_dependency(&resolved.info.pattern, &outer.info.pattern);
        Ok(())
    }

    /// Run a callback inside an update transaction (fire and forget).
    pub fn invoke(&self, f: impl FnOnce(&StateAccess) -> Result<()>) {
        self.engine.invoke(f);
    }

    /// Alias of [`invoke`](Self::invoke) for call sites that wrap an
    /// existing closure.
    pub fn wrap(&self, f: impl FnOnce(&StateAccess) -> Result<()>) {
        self.engine.invoke(f);
    }

    /// Drain pending renders and callbacks before returning; reports
    /// whether any work actually ran.
    pub fn update_complete(&self) -> bool {
        self.engine.flush()
    }

    /// Delegate to the host's router hook.
    pub fn navigate(&self, to: &str) {
        self.engine.navigate(to);
    }

    /// The owning component.
    pub fn component(&self) -> Rc<ComponentEngine> {
        self.engine.clone()
    }

    // ----- ref resolution ---------------------------------------------

    /// Intern the ref for an access string, filling wildcards from
    /// explicit indexes, the ref under evaluation, or the loop context.
    pub fn ref_for(&self, path: &str, extra: &[usize]) -> Result<Rc<StatePropertyRef>> {
        let resolved = get_resolved_path_info(path)?;
        let list_index = self.build_list_index(&resolved, extra)?;
        get_state_property_ref(resolved.info.clone(), list_index)
    }

    fn build_list_index(
        &self,
        resolved: &Rc<ResolvedPathInfo>,
        extra: &[usize],
    ) -> Result<Option<Rc<ListIndex>>> {
        let info = &resolved.info;
        if info.wildcard_count == 0 {
            return Ok(None);
        }
        // Pure context resolution first: the whole chain comes from the
        // ref under evaluation or the nearest loop contexts.
        if resolved.wildcard_type == WildcardType::Context && extra.is_empty() {
            return Ok(Some(self.context_list_index_at(
                info,
                info.wildcard_count - 1,
            )?));
        }
        let mut current: Option<Rc<ListIndex>> = None;
        for level in 0..info.wildcard_count {
            let pinned = resolved.wildcard_indexes[level].or_else(|| {
                // Explicit indexes fill context-wildcards positionally.
                let context_position = resolved.wildcard_indexes[..level]
                    .iter()
                    .filter(|w| w.is_none())
                    .count();
                extra.get(context_position).copied()
            });
            current = Some(match pinned {
                Some(index) => {
                    let list_indexes = self.list_indexes_at_level(info, level, current.clone())?;
                    list_indexes.get(index).cloned().ok_or_else(|| {
                        StructiveError::new(
                            ErrorCode::ListIndexMissing,
                            format!(
                                "index {index} out of range for \"{}\"",
                                info.wildcard_parent_paths[level]
                            ),
                        )
                        .with_context(json!({ "path": resolved.name.as_ref(), "level": level }))
                    })?
                }
                None => self.context_list_index_at(info, level)?,
            });
        }
        Ok(current)
    }

    /// The rows of the list feeding wildcard `level` of `info`, given the
    /// chain resolved so far.
    fn list_indexes_at_level(
        &self,
        info: &Rc<StructuredPathInfo>,
        level: usize,
        current: Option<Rc<ListIndex>>,
    ) -> Result<Rc<Vec<Rc<ListIndex>>>> {
        let list_info = crate::path::get_structured_path_info(&info.wildcard_parent_paths[level])?;
        let list_ref = get_state_property_ref(list_info, current)?;
        self.list_indexes(&list_ref)
    }

    /// Resolve the wildcard at `level` from the evaluation context:
    /// the ref under evaluation first, then the nearest loop context.
    fn context_list_index_at(
        &self,
        info: &Rc<StructuredPathInfo>,
        level: usize,
    ) -> Result<Rc<ListIndex>> {
        let wildcard_path = &info.wildcard_paths[level];
        if let Some(outer) = self.engine.handler().last_ref() {
            if let (Some(outer_li), Some(&k)) = (
                &outer.list_index,
                outer.info.index_by_wildcard_path.get(wildcard_path.as_ref()),
            ) {
                if let Some(list_index) = outer_li.at(k as isize) {
                    return Ok(list_index);
                }
            }
        }
        if let Some(context) = self.engine.handler().loop_context() {
            if let Some(found) = context.find(wildcard_path) {
                return Ok(found.list_index());
            }
        }
        Err(StructiveError::new(
            ErrorCode::ListIndexMissing,
            format!("no list index in scope for \"{wildcard_path}\""),
        )
        .with_context(json!({ "wildcard_path": wildcard_path.as_ref() })))
    }

    // ----- the read path ----------------------------------------------

    pub fn get_by_ref(&self, reference: &Rc<StatePropertyRef>) -> Result<Value> {
        let engine = &self.engine;
        let pattern = reference.info.pattern.clone();

        // Record a dynamic dependency when an outer getter is reading us.
        if let Some(outer) = engine.handler().last_ref() {
            if outer.info.pattern != pattern
                && engine.path_manager().is_only_getter(&outer.info.pattern)
            {
                // The source needs a path node so the updater can walk it.
                let _ = engine.path_manager().add_path(&pattern, false);
                engine
                    .path_manager()
                    .add_dynamic_dependency(&pattern, &outer.info.pattern);
            }
        }

        // Cache consultation: an entry is current when it is newer than
        // the running update, or stamped exactly at the pattern's latest
        // dirty mark. A pattern never dirtied keeps its entry forever.
        let updater_version = engine.updater_version();
        if let Some(entry) = engine.cache_get(&reference.key()) {
            let valid = match engine.stamp_for(&pattern) {
                None => true,
                Some(stamp) => {
                    entry.version > updater_version
                        || (entry.version == stamp.version && entry.revision == stamp.revision)
                }
            };
            if valid {
                return Ok(entry.value);
            }
        }

        // Cross-component delegation.
        if let Some((bound_prefix, output)) = engine.find_output_binding(&reference.info) {
            let has_local_setter = reference
                .info
                .cumulative_paths
                .iter()
                .any(|p| engine.path_manager().is_setter(p));
            if !has_local_setter {
                return self.output_get(reference, &bound_prefix, &output);
            }
        }

        // Recompute: user getter, or structural walk through the parent.
        engine.handler().push_ref(reference.clone())?;
        let computed = {
            let _guard = RefStackGuard(engine.handler());
            if let Some(getter) = engine.state_class().getter(&pattern) {
                getter(self)
            } else {
                self.structural_get(reference)
            }
        }?;

        self.finish_get(reference, computed.clone())?;
        Ok(computed)
    }

    fn structural_get(&self, reference: &Rc<StatePropertyRef>) -> Result<Value> {
        match reference.parent_ref()? {
            None => {
                let root = self.engine.state_root();
                root.get(&reference.info.pattern).ok_or_else(|| {
                    StructiveError::new(
                        ErrorCode::StatePropertyMissing,
                        format!("state has no property \"{}\"", reference.info.pattern),
                    )
                    .with_context(json!({ "path": reference.info.pattern.as_ref() }))
                })
            }
            Some(parent) => {
                let parent_value = self.get_by_ref(&parent)?;
                let segment = reference.info.last_segment.clone();
                if segment.as_ref() == "*" {
                    let list_index = reference.list_index.as_ref().ok_or_else(|| {
                        StructiveError::new(
                            ErrorCode::ListIndexMissing,
                            format!("no list index for \"{}\"", reference.info.pattern),
                        )
                    })?;
                    parent_value.get_index(list_index.index()).ok_or_else(|| {
                        StructiveError::new(
                            ErrorCode::StatePropertyMissing,
                            format!(
                                "\"{}\" has no element {}",
                                parent.info.pattern,
                                list_index.index()
                            ),
                        )
                        .with_context(json!({ "path": reference.info.pattern.as_ref() }))
                    })
                } else {
                    parent_value.get(&segment).ok_or_else(|| {
                        StructiveError::new(
                            ErrorCode::StatePropertyMissing,
                            format!(
                                "\"{}\" has no property \"{segment}\"",
                                parent.info.pattern
                            ),
                        )
                        .with_context(json!({ "path": reference.info.pattern.as_ref() }))
                    })
                }
            }
        }
    }

    /// Post-read bookkeeping: list diffing and the cache write.
    fn finish_get(&self, reference: &Rc<StatePropertyRef>, value: Value) -> Result<()> {
        let engine = &self.engine;
        let pattern = reference.info.pattern.clone();
        let stamp = engine.stamp_for(&pattern);
        let (version, revision) = match stamp {
            Some(s) => (s.version, s.revision),
            None => engine.updater_version_revision(),
        };

        if !engine.path_manager().is_list(&pattern) {
            engine.cache_insert(
                reference.key(),
                CacheEntry {
                    value,
                    list_indexes: None,
                    version,
                    revision,
                },
            );
            return Ok(());
        }

        let new_items = match value.array_items() {
            Some(items) => items,
            None => {
                let error = if value.is_nullish() {
                    StructiveError::new(
                        ErrorCode::StatePropertyMissing,
                        format!("list \"{pattern}\" has no value"),
                    )
                } else if self.engine.handler().stack_is_empty() {
                    StructiveError::new(
                        ErrorCode::RefStackViolation,
                        format!("list \"{pattern}\" read with an empty ref stack"),
                    )
                } else {
                    StructiveError::new(
                        ErrorCode::StatePropertyMissing,
                        format!("\"{pattern}\" is declared as a list but is not an array"),
                    )
                };
                return Err(error.with_context(json!({ "path": pattern.as_ref() })));
            }
        };

        let previous = engine.cache_get(&reference.key());
        let previous_values = previous.as_ref().and_then(|e| e.value.array_items());
        let previous_indexes = previous.as_ref().and_then(|e| e.list_indexes.clone());

        // An in-place reorder (a[i] = a[j]) was snapshotted at the first
        // element write; diff against the snapshot once the swap looks
        // complete. With duplicate rows the distinct-count heuristic can
        // fire early and re-key rows past the first duplicate.
        let swap = engine.take_swap_info(&reference.key());
        let (diff_values, diff_indexes, defer) = match swap {
            Some(info) => {
                if distinct_count(&new_items) == info.values.len() {
                    (Some(info.values), info.list_indexes, false)
                } else {
                    engine.put_swap_info(reference.key(), info);
                    (None, None, true)
                }
            }
            None => (previous_values, previous_indexes.clone(), false),
        };

        let list_indexes = if defer {
            previous_indexes.unwrap_or_else(|| Rc::new(Vec::new()))
        } else {
            if let Some(renderer) = engine.handler().renderer() {
                renderer.record_list_info(
                    reference.key(),
                    ListInfo {
                        values: diff_values.clone().unwrap_or_default(),
                        list_indexes: diff_indexes.clone(),
                    },
                );
            }
            Rc::new(create_list_indexes(
                reference.list_index.clone(),
                diff_values.as_deref(),
                &new_items,
                diff_indexes.as_deref().map(|v| &v[..]),
            ))
        };

        engine.cache_insert(
            reference.key(),
            CacheEntry {
                value,
                list_indexes: Some(list_indexes),
                version,
                revision,
            },
        );
        Ok(())
    }

    /// Rows of a list ref; reads through the cache, diffing as needed.
    pub fn list_indexes(
        &self,
        reference: &Rc<StatePropertyRef>,
    ) -> Result<Rc<Vec<Rc<ListIndex>>>> {
        let _ = self.get_by_ref(reference)?;
        match self
            .engine
            .cache_get(&reference.key())
            .and_then(|e| e.list_indexes)
        {
            Some(list_indexes) => Ok(list_indexes),
            None => Err(if self.engine.handler().stack_is_empty() {
                StructiveError::new(
                    ErrorCode::RefStackViolation,
                    format!(
                        "no list indexes for \"{}\" (empty ref stack)",
                        reference.info.pattern
                    ),
                )
            } else {
                StructiveError::new(
                    ErrorCode::StatePropertyMissing,
                    format!("no list indexes for \"{}\"", reference.info.pattern),
                )
            }),
        }
    }

    // ----- the write path ---------------------------------------------

    pub fn set_by_ref(&self, reference: &Rc<StatePropertyRef>, value: Value) -> Result<()> {
        if self.mode == AccessMode::Readonly {
            return Err(StructiveError::new(
                ErrorCode::ReadonlyWrite,
                format!("write to \"{}\" through a readonly handle", reference.info.pattern),
            )
            .with_context(json!({ "path": reference.info.pattern.as_ref() })));
        }
        let engine = self.engine.clone();
        let result = self.write_by_ref(reference, value);
        // The ref is enqueued whether or not the write itself succeeded.
        engine.enqueue_ref(reference.clone());
        if engine.path_manager().is_element(&reference.info.pattern) {
            if let Ok(Some(parent)) = reference.parent_ref() {
                engine.enqueue_ref(parent);
            }
        }
        result
    }

    fn write_by_ref(&self, reference: &Rc<StatePropertyRef>, value: Value) -> Result<()> {
        let engine = &self.engine;
        let pattern = reference.info.pattern.clone();

        // Cross-component delegation.
        if let Some((bound_prefix, output)) = engine.find_output_binding(&reference.info) {
            let has_local_setter = reference
                .info
                .cumulative_paths
                .iter()
                .any(|p| engine.path_manager().is_setter(p));
            if !has_local_setter {
                return self.output_set(reference, &bound_prefix, &output, value);
            }
        }

        if let Some(setter) = engine.state_class().setter(&pattern) {
            engine.handler().push_ref(reference.clone())?;
            let _guard = RefStackGuard(engine.handler());
            return setter(self, value);
        }

        match reference.parent_ref()? {
            None => {
                let root = engine.state_root();
                match &root {
                    Value::Object(object) => {
                        object.borrow_mut().insert(pattern.to_string(), value);
                        Ok(())
                    }
                    _ => Err(StructiveError::new(
                        ErrorCode::StatePropertyMissing,
                        "state root is not an object",
                    )),
                }
            }
            Some(parent) => {
                let parent_value = self.get_by_ref(&parent)?;
                let segment = reference.info.last_segment.clone();
                if segment.as_ref() == "*" {
                    let list_index = reference.list_index.as_ref().ok_or_else(|| {
                        StructiveError::new(
                            ErrorCode::ListIndexMissing,
                            format!("no list index for \"{pattern}\""),
                        )
                    })?;
                    if engine.path_manager().is_element(&pattern) {
                        engine.snapshot_swap_info(&parent, &parent_value);
                    }
                    match &parent_value {
                        Value::Array(array) => {
                            let mut items = array.borrow_mut();
                            let index = list_index.index();
                            if index < items.len() {
                                items[index] = value;
                                Ok(())
                            } else if index == items.len() {
                                items.push(value);
                                Ok(())
                            } else {
                                Err(StructiveError::new(
                                    ErrorCode::ListIndexMissing,
                                    format!(
                                        "index {index} out of range writing \"{pattern}\""
                                    ),
                                ))
                            }
                        }
                        _ => Err(StructiveError::new(
                            ErrorCode::StatePropertyMissing,
                            format!("\"{}\" is not an array", parent.info.pattern),
                        )),
                    }
                } else {
                    match &parent_value {
                        Value::Object(object) => {
                            object.borrow_mut().insert(segment.to_string(), value);
                            Ok(())
                        }
                        _ => Err(StructiveError::new(
                            ErrorCode::StatePropertyMissing,
                            format!("\"{}\" is not an object", parent.info.pattern),
                        )),
                    }
                }
            }
        }
    }

    // ----- cross-component bridge -------------------------------------

    fn translate_output(
        &self,
        reference: &Rc<StatePropertyRef>,
        bound_prefix: &str,
        output: &crate::component::OutputBinding,
    ) -> Result<(Rc<ComponentEngine>, Rc<StatePropertyRef>)> {
        let parent_engine = output.parent.upgrade().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::OutputNotMappedGet,
                format!("parent component gone for \"{}\"", reference.info.pattern),
            )
        })?;
        let rest = reference
            .info
            .pattern
            .strip_prefix(bound_prefix)
            .unwrap_or("");
        let parent_pattern = format!("{}{rest}", output.parent_ref.info.pattern);
        let parent_info = crate::path::get_structured_path_info(&parent_pattern)?;
        if parent_info.wildcard_count != output.parent_ref.info.wildcard_count {
            return Err(StructiveError::new(
                ErrorCode::OutputNotMappedGet,
                format!(
                    "cannot align list indexes across components for \"{}\"",
                    reference.info.pattern
                ),
            )
            .with_context(json!({
                "child_path": reference.info.pattern.as_ref(),
                "parent_path": parent_pattern,
            })));
        }
        let parent_ref =
            get_state_property_ref(parent_info, output.parent_ref.list_index.clone())?;
        Ok((parent_engine, parent_ref))
    }

    fn output_get(
        &self,
        reference: &Rc<StatePropertyRef>,
        bound_prefix: &str,
        output: &crate::component::OutputBinding,
    ) -> Result<Value> {
        let (parent_engine, parent_ref) = self.translate_output(reference, bound_prefix, output)?;
        let parent_access = StateAccess::new(parent_engine, AccessMode::Readonly);
        parent_access.get_by_ref(&parent_ref)
    }

    fn output_set(
        &self,
        reference: &Rc<StatePropertyRef>,
        bound_prefix: &str,
        output: &crate::component::OutputBinding,
        value: Value,
    ) -> Result<()> {
        let (parent_engine, parent_ref) = self
            .translate_output(reference, bound_prefix, output)
            .map_err(|e| {
                StructiveError::new(
                    ErrorCode::OutputNotMappedSet,
                    format!("cannot map write for \"{}\"", reference.info.pattern),
                )
                .with_cause(e)
            })?;
        let parent_access = StateAccess::new(parent_engine, AccessMode::Writable);
        parent_access.set_by_ref(&parent_ref, value)
    }
}

/// Count of identity-distinct values, for the swap-completion check.
fn distinct_count(values: &[Value]) -> usize {
    let mut count = 0;
    for (i, value) in values.iter().enumerate() {
        if !values[..i].iter().any(|v| v == value) {
            count += 1;
        }
    }
    count
}

// Re-exported so the engine can build swap snapshots without reaching
// into updater internals from the write path.
impl ComponentEngine {
    pub(crate) fn snapshot_swap_info(&self, parent: &Rc<StatePropertyRef>, parent_value: &Value) {
        let key = parent.key();
        if self.has_swap_info(&key) {
            return;
        }
        let list_indexes = self.cache_get(&key).and_then(|e| e.list_indexes);
        self.put_swap_info(
            key,
            SwapInfo {
                values: parent_value.array_items().unwrap_or_default(),
                list_indexes,
            },
        );
    }
}
