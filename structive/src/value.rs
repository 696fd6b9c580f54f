//! Runtime state values.
//!
//! Aggregates are `Rc<RefCell<…>>` so the engine can mutate state in
//! place; equality of aggregates is reference identity, which is what
//! the list diff keys on. Scalars compare by value.

use indexmap::IndexMap;
use serde_json::json;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<IndexMap<String, Value>>>),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        let s: String = value.into();
        Value::String(Rc::from(s.as_str()))
    }

    pub fn int(value: i64) -> Self {
        Value::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    pub fn bool(value: bool) -> Self {
        Value::Bool(value)
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn empty_array() -> Self {
        Value::Array(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn object(fields: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Rc<RefCell<Vec<Value>>>> {
        match self {
            Value::Array(a) => Some(a.clone()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Rc<RefCell<IndexMap<String, Value>>>> {
        match self {
            Value::Object(o) => Some(o.clone()),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Field of an object value, if present.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(o) => o.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Element of an array value, if present.
    pub fn get_index(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(a) => a.borrow().get(index).cloned(),
            _ => None,
        }
    }

    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.borrow().len()),
            _ => None,
        }
    }

    /// Shallow copy of an array's elements. Element identity is kept.
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(a) => Some(a.borrow().clone()),
            _ => None,
        }
    }

    /// Truthiness: `false`, `0`, `""`, null and undefined are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Conversion used by text-producing bindings.
    pub fn display_string(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(s) => s.to_string(),
            Value::Array(a) => {
                let items: Vec<String> =
                    a.borrow().iter().map(|item| item.display_string()).collect();
                items.join(",")
            }
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// JSON snapshot for diagnostics. Assumes an acyclic value tree.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::String(s) => json!(s.as_ref()),
            Value::Array(a) => {
                serde_json::Value::Array(a.borrow().iter().map(|v| v.to_json()).collect())
            }
            Value::Object(o) => serde_json::Value::Object(
                o.borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value.as_str()))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_compare_by_value() {
        assert_eq!(Value::int(3), Value::int(3));
        assert_eq!(Value::string("a"), Value::string("a"));
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::int(3), Value::string("3"));
    }

    #[test]
    fn aggregates_compare_by_identity() {
        let a = Value::object([("x", Value::int(1))]);
        let b = Value::object([("x", Value::int(1))]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn in_place_mutation_is_shared() {
        let obj = Value::object([("name", Value::string("alice"))]);
        let alias = obj.clone();
        if let Value::Object(o) = &obj {
            o.borrow_mut().insert("name".into(), Value::string("bob"));
        }
        assert_eq!(alias.get("name"), Some(Value::string("bob")));
    }

    #[test]
    fn truthiness_follows_emptiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::string("").truthy());
        assert!(!Value::int(0).truthy());
        assert!(Value::array([]).truthy());
        assert!(Value::string("x").truthy());
    }

    #[test]
    fn display_string_matches_bindings() {
        assert_eq!(Value::Null.display_string(), "");
        assert_eq!(Value::int(5).display_string(), "5");
        assert_eq!(
            Value::array([Value::int(1), Value::int(2)]).display_string(),
            "1,2"
        );
    }
}
