//! Filter pipelines.
//!
//! A filter library maps a name to a factory taking option strings and
//! returning a `value → value` function. A parsed filter list compiles
//! once into an ordered pipeline; unknown names fail `FLT-201`. Filters
//! are pure as far as the engine is concerned; whatever they raise is
//! propagated to the binding that invoked them.

use crate::error::{ErrorCode, Result, StructiveError};
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde_json::json;
use std::rc::Rc;

pub type FilterFn = Rc<dyn Fn(&Value) -> Result<Value>>;
pub type FilterFactory = Rc<dyn Fn(&[String]) -> Result<FilterFn>>;

/// One `name,option,option` unit from a binding text.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterWithOptions {
    pub name: String,
    pub options: Vec<String>,
}

pub struct FilterRegistry {
    factories: FxHashMap<String, FilterFactory>,
}

impl FilterRegistry {
    pub fn empty() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// The builtin text filter set the engine ships with.
    pub fn text_default() -> Rc<Self> {
        let mut registry = Self::empty();
        registry.register("uc", |_options| {
            Ok(filter(|value| Value::string(value.display_string().to_uppercase())))
        });
        registry.register("lc", |_options| {
            Ok(filter(|value| Value::string(value.display_string().to_lowercase())))
        });
        registry.register("trim", |_options| {
            Ok(filter(|value| Value::string(value.display_string().trim())))
        });
        registry.register("defaults", |options| {
            let fallback = options.first().cloned().unwrap_or_default();
            Ok(Rc::new(move |value: &Value| {
                let empty = value.is_nullish() || value.as_str().map(str::is_empty).unwrap_or(false);
                Ok(if empty {
                    Value::string(fallback.clone())
                } else {
                    value.clone()
                })
            }))
        });
        registry.register("fallback", |options| {
            let fallback = options.first().cloned().unwrap_or_default();
            Ok(Rc::new(move |value: &Value| {
                Ok(if value.is_nullish() {
                    Value::string(fallback.clone())
                } else {
                    value.clone()
                })
            }))
        });
        registry.register("eq", |options| {
            let expected = options.first().cloned().unwrap_or_default();
            Ok(Rc::new(move |value: &Value| {
                Ok(Value::Bool(value.display_string() == expected))
            }))
        });
        registry.register("ne", |options| {
            let expected = options.first().cloned().unwrap_or_default();
            Ok(Rc::new(move |value: &Value| {
                Ok(Value::Bool(value.display_string() != expected))
            }))
        });
        registry.register("not", |_options| {
            Ok(filter(|value| Value::Bool(!value.truthy())))
        });
        registry.register("prefix", |options| {
            let prefix = options.first().cloned().unwrap_or_default();
            Ok(Rc::new(move |value: &Value| {
                Ok(Value::string(format!("{prefix}{}", value.display_string())))
            }))
        });
        registry.register("suffix", |options| {
            let suffix = options.first().cloned().unwrap_or_default();
            Ok(Rc::new(move |value: &Value| {
                Ok(Value::string(format!("{}{suffix}", value.display_string())))
            }))
        });
        Rc::new(registry)
    }

    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn(&[String]) -> Result<FilterFn> + 'static,
    ) {
        self.factories.insert(name.to_string(), Rc::new(factory));
    }

    pub fn create(&self, name: &str, options: &[String]) -> Result<FilterFn> {
        match self.factories.get(name) {
            Some(factory) => factory(options),
            None => Err(StructiveError::new(
                ErrorCode::UnknownFilter,
                format!("unknown filter \"{name}\""),
            )
            .with_context(json!({ "filter": name }))),
        }
    }

    /// Compile a parsed filter list into an ordered pipeline.
    pub fn compile(&self, filters: &[FilterWithOptions]) -> Result<Vec<FilterFn>> {
        filters
            .iter()
            .map(|f| self.create(&f.name, &f.options))
            .collect()
    }
}

fn filter(f: impl Fn(&Value) -> Value + 'static) -> FilterFn {
    Rc::new(move |value| Ok(f(value)))
}

/// Run a value through a compiled pipeline, in order.
pub fn apply_filters(value: Value, filters: &[FilterFn]) -> Result<Value> {
    let mut current = value;
    for f in filters {
        current = f(&current)?;
    }
    Ok(current)
}
