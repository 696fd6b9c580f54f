//! State class schema.

use crate::error::Result;
use crate::state::access::StateAccess;
use crate::updater::UpdateInfo;
use crate::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;
use structive_dom::Event;

pub type GetterFn = Rc<dyn Fn(&StateAccess) -> Result<Value>>;
pub type SetterFn = Rc<dyn Fn(&StateAccess, Value) -> Result<()>>;
pub type ActionFn = Rc<dyn Fn(&StateAccess, &Event) -> Result<()>>;
pub type LifecycleFn = Rc<dyn Fn(&StateAccess) -> Result<()>>;
pub type UpdatedFn = Rc<dyn Fn(&StateAccess, &[UpdateInfo]) -> Result<()>>;

/// A computed property: a getter, a setter, or both.
#[derive(Clone)]
pub struct Accessor {
    pub getter: Option<GetterFn>,
    pub setter: Option<SetterFn>,
}

/// Schema of one component's state: the shape a proxy would reflect.
pub struct StateClass {
    initial: Rc<dyn Fn() -> Value>,
    accessors: IndexMap<String, Accessor>,
    actions: IndexMap<String, ActionFn>,
    list_properties: Vec<String>,
    connected: Option<LifecycleFn>,
    disconnected: Option<LifecycleFn>,
    updated: Option<UpdatedFn>,
}

impl StateClass {
    pub fn builder() -> StateClassBuilder {
        StateClassBuilder {
            initial: Rc::new(|| Value::object(Vec::<(String, Value)>::new())),
            accessors: IndexMap::new(),
            actions: IndexMap::new(),
            list_properties: Vec::new(),
            connected: None,
            disconnected: None,
            updated: None,
        }
    }

    /// A fresh state tree for one component instance.
    pub fn initial_state(&self) -> Value {
        (self.initial)()
    }

    pub fn accessor(&self, pattern: &str) -> Option<&Accessor> {
        self.accessors.get(pattern)
    }

    pub fn getter(&self, pattern: &str) -> Option<GetterFn> {
        self.accessors.get(pattern).and_then(|a| a.getter.clone())
    }

    pub fn setter(&self, pattern: &str) -> Option<SetterFn> {
        self.accessors.get(pattern).and_then(|a| a.setter.clone())
    }

    pub fn accessors(&self) -> impl Iterator<Item = (&String, &Accessor)> {
        self.accessors.iter()
    }

    pub fn action(&self, name: &str) -> Option<ActionFn> {
        self.actions.get(name).cloned()
    }

    pub fn list_properties(&self) -> &[String] {
        &self.list_properties
    }

    pub fn on_connected(&self) -> Option<LifecycleFn> {
        self.connected.clone()
    }

    pub fn on_disconnected(&self) -> Option<LifecycleFn> {
        self.disconnected.clone()
    }

    pub fn on_updated(&self) -> Option<UpdatedFn> {
        self.updated.clone()
    }

    pub fn has_updated_callback(&self) -> bool {
        self.updated.is_some()
    }
}

pub struct StateClassBuilder {
    initial: Rc<dyn Fn() -> Value>,
    accessors: IndexMap<String, Accessor>,
    actions: IndexMap<String, ActionFn>,
    list_properties: Vec<String>,
    connected: Option<LifecycleFn>,
    disconnected: Option<LifecycleFn>,
    updated: Option<UpdatedFn>,
}

impl StateClassBuilder {
    /// Factory for the instance's initial state tree.
    pub fn data(mut self, initial: impl Fn() -> Value + 'static) -> Self {
        self.initial = Rc::new(initial);
        self
    }

    pub fn getter(
        mut self,
        pattern: &str,
        getter: impl Fn(&StateAccess) -> Result<Value> + 'static,
    ) -> Self {
        let entry = self
            .accessors
            .entry(pattern.to_string())
            .or_insert(Accessor {
                getter: None,
                setter: None,
            });
        entry.getter = Some(Rc::new(getter));
        self
    }

    pub fn setter(
        mut self,
        pattern: &str,
        setter: impl Fn(&StateAccess, Value) -> Result<()> + 'static,
    ) -> Self {
        let entry = self
            .accessors
            .entry(pattern.to_string())
            .or_insert(Accessor {
                getter: None,
                setter: None,
            });
        entry.setter = Some(Rc::new(setter));
        self
    }

    pub fn action(
        mut self,
        name: &str,
        action: impl Fn(&StateAccess, &Event) -> Result<()> + 'static,
    ) -> Self {
        self.actions.insert(name.to_string(), Rc::new(action));
        self
    }

    /// Declare a pattern whose value is an identity-tracked list.
    pub fn list(mut self, pattern: &str) -> Self {
        self.list_properties.push(pattern.to_string());
        self
    }

    pub fn connected(mut self, hook: impl Fn(&StateAccess) -> Result<()> + 'static) -> Self {
        self.connected = Some(Rc::new(hook));
        self
    }

    pub fn disconnected(mut self, hook: impl Fn(&StateAccess) -> Result<()> + 'static) -> Self {
        self.disconnected = Some(Rc::new(hook));
        self
    }

    pub fn updated(
        mut self,
        hook: impl Fn(&StateAccess, &[UpdateInfo]) -> Result<()> + 'static,
    ) -> Self {
        self.updated = Some(Rc::new(hook));
        self
    }

    pub fn build(self) -> Rc<StateClass> {
        Rc::new(StateClass {
            initial: self.initial,
            accessors: self.accessors,
            actions: self.actions,
            list_properties: self.list_properties,
            connected: self.connected,
            disconnected: self.disconnected,
            updated: self.updated,
        })
    }
}
