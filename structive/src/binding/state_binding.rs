//! State-side binding halves.
//!
//! A `BindingState` resolves one dotted/wildcard path to a ref (wildcard
//! refs resolve at activation time against the loop context) and owns
//! the compiled filter pipelines. A `BindingStateIndex` is the `$N`
//! variant: it tracks the N-th enclosing loop's index and is read-only.

use crate::binding::binding::Binding;
use crate::binding::loop_context::LoopContext;
use crate::component::ComponentEngine;
use crate::error::{ErrorCode, Result, StructiveError};
use crate::filter::{apply_filters, FilterFn, FilterWithOptions};
use crate::list_index::ListIndex;
use crate::path::{get_structured_path_info, StructuredPathInfo};
use crate::state::access::StateAccess;
use crate::state_ref::{get_state_property_ref, StatePropertyRef};
use crate::value::Value;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

pub struct BindingState {
    pub info: Rc<StructuredPathInfo>,
    reference: RefCell<Option<Rc<StatePropertyRef>>>,
    loop_context: RefCell<Option<Rc<LoopContext>>>,
    output_filters: Vec<FilterFn>,
    input_filters: Vec<FilterFn>,
}

impl BindingState {
    pub fn new(
        engine: &Rc<ComponentEngine>,
        path: &str,
        output: &[FilterWithOptions],
        input: &[FilterWithOptions],
    ) -> Result<Self> {
        let info = get_structured_path_info(path)?;
        engine.path_manager().add_path(&info.pattern, false)?;
        // Non-wildcard refs never change; compute once up front.
        let reference = if info.wildcard_count == 0 {
            Some(get_state_property_ref(info.clone(), None)?)
        } else {
            None
        };
        Ok(Self {
            info,
            reference: RefCell::new(reference),
            loop_context: RefCell::new(None),
            output_filters: engine.output_filter_registry().compile(output)?,
            input_filters: engine.input_filter_registry().compile(input)?,
        })
    }

    pub fn reference(&self) -> Option<Rc<StatePropertyRef>> {
        self.reference.borrow().clone()
    }

    pub fn loop_context(&self) -> Option<Rc<LoopContext>> {
        self.loop_context.borrow().clone()
    }

    /// Resolve the ref (against the nearest matching loop context for
    /// wildcard patterns) and register with the engine.
    pub fn activate(&self, binding: &Rc<Binding>) -> Result<()> {
        let engine = binding.engine_rc()?;
        if self.info.wildcard_count > 0 {
            let content = binding.parent_content().ok_or_else(|| {
                StructiveError::new(
                    ErrorCode::BindingResolution,
                    format!("binding for \"{}\" has no parent content", self.info.pattern),
                )
            })?;
            let last_wildcard = self.info.last_wildcard_path.clone().ok_or_else(|| {
                StructiveError::new(
                    ErrorCode::BindingResolution,
                    format!("\"{}\" has no wildcard path", self.info.pattern),
                )
            })?;
            let context = content
                .current_loop_context()
                .and_then(|lc| lc.find(&last_wildcard))
                .ok_or_else(|| {
                    StructiveError::new(ErrorCode::BindingResolution, "LoopContext is null")
                        .with_context(json!({
                            "pattern": self.info.pattern.as_ref(),
                            "wildcard_path": last_wildcard.as_ref(),
                        }))
                })?;
            let reference =
                get_state_property_ref(self.info.clone(), Some(context.list_index()))?;
            *self.loop_context.borrow_mut() = Some(context);
            *self.reference.borrow_mut() = Some(reference);
        }
        let reference = self.reference().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::BindingResolution,
                format!("no ref resolved for \"{}\"", self.info.pattern),
            )
        })?;
        engine.save_binding(&reference, binding);
        if let Some(list_index) = &reference.list_index {
            engine.save_list_index_binding(list_index, binding);
        }
        Ok(())
    }

    pub fn inactivate(&self, binding: &Rc<Binding>) -> Result<()> {
        let engine = binding.engine_rc()?;
        if let Some(reference) = self.reference() {
            engine.remove_binding(&reference, binding);
            if let Some(list_index) = &reference.list_index {
                engine.remove_list_index_binding(list_index.id, binding.id);
            }
        }
        if self.info.wildcard_count > 0 {
            *self.reference.borrow_mut() = None;
            *self.loop_context.borrow_mut() = None;
        }
        Ok(())
    }

    pub fn get_value(&self, access: &StateAccess) -> Result<Value> {
        let reference = self.reference().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::BindingResolution,
                format!("\"{}\" read before activation", self.info.pattern),
            )
        })?;
        access.get_by_ref(&reference)
    }

    pub fn get_filtered_value(&self, access: &StateAccess) -> Result<Value> {
        apply_filters(self.get_value(access)?, &self.output_filters)
    }

    /// Node → state write, through the input filters.
    pub fn assign_value(&self, access: &StateAccess, value: Value) -> Result<()> {
        let reference = self.reference().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::BindingResolution,
                format!("\"{}\" written before activation", self.info.pattern),
            )
        })?;
        let filtered = apply_filters(value, &self.input_filters)?;
        access.set_by_ref(&reference, filtered)
    }
}

/// `$N` loop-index source. Read-only; displays the 1-based row number.
pub struct BindingStateIndex {
    /// 1-based loop depth selector.
    pub n: usize,
    list_index: RefCell<Option<Rc<ListIndex>>>,
    output_filters: Vec<FilterFn>,
}

impl BindingStateIndex {
    pub fn new(
        engine: &Rc<ComponentEngine>,
        path: &str,
        output: &[FilterWithOptions],
    ) -> Result<Self> {
        let digits = path.strip_prefix('$').unwrap_or("");
        let n: usize = digits.parse().map_err(|_| {
            StructiveError::new(
                ErrorCode::LoopIndexOutOfRange,
                format!("\"{path}\" is not a numeric loop-index accessor"),
            )
        })?;
        if !(1..=9).contains(&n) {
            return Err(StructiveError::new(
                ErrorCode::LoopIndexOutOfRange,
                format!("loop-index accessor ${n} is out of range"),
            ));
        }
        Ok(Self {
            n,
            list_index: RefCell::new(None),
            output_filters: engine.output_filter_registry().compile(output)?,
        })
    }

    pub fn list_index(&self) -> Option<Rc<ListIndex>> {
        self.list_index.borrow().clone()
    }

    /// Capture the N-th enclosing loop and register for its reorders.
    pub fn activate(&self, binding: &Rc<Binding>) -> Result<()> {
        let engine = binding.engine_rc()?;
        let content = binding.parent_content().ok_or_else(|| {
            StructiveError::new(ErrorCode::BindingResolution, "loop-index binding has no content")
        })?;
        let chain = content
            .current_loop_context()
            .map(|lc| lc.chain())
            .unwrap_or_default();
        let context = chain.get(self.n - 1).cloned().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::BindingResolution,
                format!("no enclosing loop for ${}", self.n),
            )
        })?;
        let list_index = context.list_index();
        engine.save_list_index_binding(&list_index, binding);
        *self.list_index.borrow_mut() = Some(list_index);
        Ok(())
    }

    pub fn inactivate(&self, binding: &Rc<Binding>) -> Result<()> {
        let engine = binding.engine_rc()?;
        if let Some(list_index) = self.list_index.borrow_mut().take() {
            engine.remove_list_index_binding(list_index.id, binding.id);
        }
        Ok(())
    }

    pub fn get_value(&self) -> Result<Value> {
        let list_index = self.list_index().ok_or_else(|| {
            StructiveError::new(
                ErrorCode::ListIndexMissing,
                format!("${} read before activation", self.n),
            )
        })?;
        Ok(Value::Int(list_index.index() as i64 + 1))
    }

    pub fn get_filtered_value(&self) -> Result<Value> {
        apply_filters(self.get_value()?, &self.output_filters)
    }

    /// The index surface is read-only by contract.
    pub fn assign_value(&self, _value: Value) -> Result<()> {
        Err(StructiveError::new(
            ErrorCode::BindingContract,
            format!("${} is read-only", self.n),
        ))
    }
}
