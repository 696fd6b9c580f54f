//! Component engine.
//!
//! One engine per component instance: it owns the state tree, the path
//! manager, the ref cache and stamps, the binding registries and the
//! root content, and wires parent/child components through a
//! process-wide registry of weak handles.

use crate::binding::{BindContent, Binding};
use crate::config::ShadowRootMode;
use crate::diagnostics::DiagnosticsLedger;
use crate::error::Result;
use crate::filter::FilterRegistry;
use crate::list_index::ListIndex;
use crate::path::{PathManager, StructuredPathInfo};
use crate::registry::{self, ComponentClass};
use crate::stamp::Stamp;
use crate::state::access::{AccessMode, StateAccess, StateHandler};
use crate::state::StateClass;
use crate::state_ref::{RefKey, StatePropertyRef};
use crate::updater::{Microtask, Updater};
use crate::value::Value;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use structive_dom::{Document, NodeId};

/// Cached value of one ref, stamped with the version/revision it was
/// computed under. List entries also carry their row identities.
#[derive(Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub list_indexes: Option<Rc<Vec<Rc<ListIndex>>>>,
    pub version: u64,
    pub revision: u64,
}

/// One child-pattern → parent-ref mapping of the state-output bridge.
#[derive(Clone)]
pub struct OutputBinding {
    pub parent: Weak<ComponentEngine>,
    pub parent_ref: Rc<StatePropertyRef>,
}

thread_local! {
    static NEXT_ENGINE_ID: Cell<u64> = const { Cell::new(1) };
    // Process-wide parent lookup; weak so dead trees are collectable.
    static PARENT_BY_COMPONENT: RefCell<FxHashMap<u64, Weak<ComponentEngine>>> =
        RefCell::new(FxHashMap::default());
}

pub struct ComponentEngine {
    pub id: u64,
    class: Rc<ComponentClass>,
    state_class: Rc<StateClass>,
    document: Rc<RefCell<Document>>,
    host: NodeId,
    mount_point: NodeId,
    state: RefCell<Value>,
    path_manager: PathManager,
    handler: StateHandler,
    pub(crate) cache: RefCell<FxHashMap<RefKey, CacheEntry>>,
    pub(crate) version_revision: RefCell<FxHashMap<Rc<str>, Stamp>>,
    pub(crate) updater: RefCell<Updater>,
    pub(crate) microtasks: RefCell<VecDeque<Microtask>>,
    pub(crate) flushing: Cell<bool>,
    bindings_by_ref: RefCell<FxHashMap<RefKey, SmallVec<[Rc<Binding>; 2]>>>,
    bindings_by_list_index: RefCell<FxHashMap<u64, Vec<Weak<Binding>>>>,
    root_content: RefCell<Option<Rc<BindContent>>>,
    state_output: RefCell<FxHashMap<Rc<str>, OutputBinding>>,
    children: RefCell<Vec<Rc<ComponentEngine>>>,
    connected: Cell<bool>,
    ready: Cell<bool>,
    output_filters: Rc<FilterRegistry>,
    input_filters: Rc<FilterRegistry>,
    router: RefCell<Option<Rc<dyn Fn(&str)>>>,
    pub(crate) diagnostics: RefCell<DiagnosticsLedger>,
}

impl ComponentEngine {
    /// Create a host element for `tag` under `parent_node` and bring the
    /// component up.
    pub fn mount(
        document: Rc<RefCell<Document>>,
        parent_node: NodeId,
        tag: &str,
    ) -> Result<Rc<Self>> {
        let class = registry::component_class_by_tag(tag)?;
        let host = {
            let mut doc = document.borrow_mut();
            let host = doc.create_element(&class.tag);
            doc.append_child(parent_node, host);
            host
        };
        Self::attach(document, host, class, None, true)
    }

    /// Attach an engine to an existing host element. `connect` defers
    /// the connected callback so a parent can wire its state bridge
    /// before the child's first render.
    pub(crate) fn attach(
        document: Rc<RefCell<Document>>,
        host: NodeId,
        class: Rc<ComponentClass>,
        parent: Option<&Rc<ComponentEngine>>,
        connect: bool,
    ) -> Result<Rc<Self>> {
        let mount_point = match class.config.shadow_root_mode {
            ShadowRootMode::None => host,
            ShadowRootMode::Auto | ShadowRootMode::Open => {
                let mut doc = document.borrow_mut();
                let shadow_root = doc.create_element("#shadow-root");
                doc.append_child(host, shadow_root);
                shadow_root
            }
        };
        let id = NEXT_ENGINE_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        let state_class = class.state_class.clone();
        let engine = Rc::new(Self {
            id,
            state_class: state_class.clone(),
            document,
            host,
            mount_point,
            state: RefCell::new(state_class.initial_state()),
            path_manager: PathManager::new(),
            handler: StateHandler::new(),
            cache: RefCell::new(FxHashMap::default()),
            version_revision: RefCell::new(FxHashMap::default()),
            updater: RefCell::new(Updater::new()),
            microtasks: RefCell::new(VecDeque::new()),
            flushing: Cell::new(false),
            bindings_by_ref: RefCell::new(FxHashMap::default()),
            bindings_by_list_index: RefCell::new(FxHashMap::default()),
            root_content: RefCell::new(None),
            state_output: RefCell::new(FxHashMap::default()),
            children: RefCell::new(Vec::new()),
            connected: Cell::new(false),
            ready: Cell::new(false),
            output_filters: FilterRegistry::text_default(),
            input_filters: FilterRegistry::text_default(),
            router: RefCell::new(None),
            diagnostics: RefCell::new(DiagnosticsLedger::new()),
            class,
        });

        for (pattern, accessor) in engine.state_class.accessors() {
            if accessor.getter.is_some() {
                engine.path_manager.add_getter(pattern)?;
            }
            if accessor.setter.is_some() {
                engine.path_manager.add_setter(pattern)?;
            }
        }
        for list in engine.state_class.list_properties() {
            engine.path_manager.add_path(list, true)?;
        }
        engine
            .path_manager
            .set_has_updated_callback(engine.state_class.has_updated_callback());
        if engine.class.config.enable_diagnostics {
            engine.diagnostics.borrow_mut().enable();
        }

        if let Some(parent) = parent {
            PARENT_BY_COMPONENT.with(|registry| {
                registry
                    .borrow_mut()
                    .insert(engine.id, Rc::downgrade(parent))
            });
            parent.children.borrow_mut().push(engine.clone());
        }

        let template = registry::template(engine.class.template_id)?;
        let content = BindContent::create(&engine, &template, None, None, None)?;
        content.mount(engine.mount_point, None);
        *engine.root_content.borrow_mut() = Some(content);

        if connect {
            engine.connected_callback()?;
        }
        Ok(engine)
    }

    /// Activate the root content, run the first render, then the
    /// state's connected hook. Failures here are fatal to the component.
    pub fn connected_callback(self: &Rc<Self>) -> Result<()> {
        if self.connected.get() {
            return Ok(());
        }
        self.connected.set(true);
        let content = self.root_content.borrow().clone();
        if let Some(content) = content {
            content.activate()?;
            self.initial_render(&content);
        }
        if let Some(hook) = self.state_class.on_connected() {
            self.update(move |access| hook(access))?;
        }
        self.flush();
        self.ready.set(true);
        Ok(())
    }

    pub fn disconnected_callback(self: &Rc<Self>) -> Result<()> {
        if !self.connected.get() {
            return Ok(());
        }
        self.connected.set(false);
        if let Some(hook) = self.state_class.on_disconnected() {
            self.update(move |access| hook(access))?;
        }
        let content = self.root_content.borrow().clone();
        if let Some(content) = content {
            content.inactivate()?;
        }
        PARENT_BY_COMPONENT.with(|registry| registry.borrow_mut().remove(&self.id));
        Ok(())
    }

    // ----- plumbing ---------------------------------------------------

    pub fn document(&self) -> Rc<RefCell<Document>> {
        self.document.clone()
    }

    pub fn host(&self) -> NodeId {
        self.host
    }

    pub fn mount_point(&self) -> NodeId {
        self.mount_point
    }

    pub fn tag(&self) -> String {
        self.class.tag.clone()
    }

    pub fn class(&self) -> Rc<ComponentClass> {
        self.class.clone()
    }

    pub fn state_class(&self) -> Rc<StateClass> {
        self.state_class.clone()
    }

    pub fn path_manager(&self) -> &PathManager {
        &self.path_manager
    }

    pub fn handler(&self) -> &StateHandler {
        &self.handler
    }

    pub fn state_root(&self) -> Value {
        self.state.borrow().clone()
    }

    pub fn root_content(&self) -> Option<Rc<BindContent>> {
        self.root_content.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// A readonly access handle over this component's state.
    pub fn readonly(self: &Rc<Self>) -> StateAccess {
        StateAccess::new(self.clone(), AccessMode::Readonly)
    }

    pub fn output_filter_registry(&self) -> Rc<FilterRegistry> {
        self.output_filters.clone()
    }

    pub fn input_filter_registry(&self) -> Rc<FilterRegistry> {
        self.input_filters.clone()
    }

    pub fn set_router(&self, hook: impl Fn(&str) + 'static) {
        *self.router.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn navigate(&self, to: &str) {
        let hook = self.router.borrow().clone();
        match hook {
            Some(hook) => hook(to),
            None => tracing::info!(to, "navigate requested with no router attached"),
        }
    }

    pub fn parent_engine(&self) -> Option<Rc<ComponentEngine>> {
        PARENT_BY_COMPONENT
            .with(|registry| registry.borrow().get(&self.id).cloned())
            .and_then(|weak| weak.upgrade())
    }

    pub fn child_engines(&self) -> Vec<Rc<ComponentEngine>> {
        self.children.borrow().clone()
    }

    pub fn enable_diagnostics(&self) {
        self.diagnostics.borrow_mut().enable();
    }

    pub fn diagnostics_json(&self) -> serde_json::Value {
        self.diagnostics.borrow().to_json()
    }

    // ----- caches -----------------------------------------------------

    pub(crate) fn cache_get(&self, key: &RefKey) -> Option<CacheEntry> {
        self.cache.borrow().get(key).cloned()
    }

    pub(crate) fn cache_insert(&self, key: RefKey, entry: CacheEntry) {
        self.cache.borrow_mut().insert(key, entry);
    }

    pub(crate) fn stamp_for(&self, pattern: &str) -> Option<Stamp> {
        self.version_revision.borrow().get(pattern).copied()
    }

    // ----- binding registries -----------------------------------------

    pub fn save_binding(&self, reference: &Rc<StatePropertyRef>, binding: &Rc<Binding>) {
        let mut registry = self.bindings_by_ref.borrow_mut();
        let entry = registry.entry(reference.key()).or_default();
        if !entry.iter().any(|b| b.id == binding.id) {
            entry.push(binding.clone());
        }
    }

    pub fn remove_binding(&self, reference: &Rc<StatePropertyRef>, binding: &Rc<Binding>) {
        let mut registry = self.bindings_by_ref.borrow_mut();
        if let Some(entry) = registry.get_mut(&reference.key()) {
            entry.retain(|b| b.id != binding.id);
            if entry.is_empty() {
                registry.remove(&reference.key());
            }
        }
    }

    pub fn bindings_for_key(&self, key: &RefKey) -> Vec<Rc<Binding>> {
        self.bindings_by_ref
            .borrow()
            .get(key)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn save_list_index_binding(&self, list_index: &Rc<ListIndex>, binding: &Rc<Binding>) {
        let mut registry = self.bindings_by_list_index.borrow_mut();
        let entry = registry.entry(list_index.id).or_default();
        if !entry
            .iter()
            .any(|w| w.upgrade().map(|b| b.id == binding.id).unwrap_or(false))
        {
            entry.push(Rc::downgrade(binding));
        }
    }

    pub fn remove_list_index_binding(&self, list_index_id: u64, binding_id: u64) {
        let mut registry = self.bindings_by_list_index.borrow_mut();
        if let Some(entry) = registry.get_mut(&list_index_id) {
            entry.retain(|w| {
                w.upgrade()
                    .map(|b| b.id != binding_id)
                    .unwrap_or(false)
            });
            if entry.is_empty() {
                registry.remove(&list_index_id);
            }
        }
    }

    pub fn bindings_for_list_index(&self, list_index_id: u64) -> Vec<Rc<Binding>> {
        self.bindings_by_list_index
            .borrow()
            .get(&list_index_id)
            .map(|entries| entries.iter().filter_map(|w| w.upgrade()).collect())
            .unwrap_or_default()
    }

    // ----- state-output bridge ----------------------------------------

    pub(crate) fn register_output(&self, child_pattern: Rc<str>, output: OutputBinding) {
        self.state_output.borrow_mut().insert(child_pattern, output);
    }

    pub(crate) fn remove_output(&self, child_pattern: &str) {
        self.state_output.borrow_mut().remove(child_pattern);
    }

    /// Longest bound prefix of `info`'s path, if any.
    pub(crate) fn find_output_binding(
        &self,
        info: &StructuredPathInfo,
    ) -> Option<(Rc<str>, OutputBinding)> {
        let outputs = self.state_output.borrow();
        if outputs.is_empty() {
            return None;
        }
        for prefix in info.cumulative_paths.iter().rev() {
            if let Some(output) = outputs.get(prefix) {
                return Some((prefix.clone(), output.clone()));
            }
        }
        None
    }
}
