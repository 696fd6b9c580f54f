//! Process-wide registries.
//!
//! Templates, state classes and component classes are registered by
//! integer id (and component classes additionally by tag). All tables
//! are append-only caches with single-threaded access; re-registering
//! an id overwrites the previous entry with a logged warning.

use crate::config::ComponentConfig;
use crate::error::{ErrorCode, Result, StructiveError};
use crate::state::StateClass;
use crate::template::Template;
use rustc_hash::FxHashMap;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A component class: what a custom tag instantiates.
pub struct ComponentClass {
    pub tag: String,
    pub template_id: u32,
    pub state_class: Rc<StateClass>,
    pub config: ComponentConfig,
}

impl std::fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ComponentClass({} -> template {})",
            self.tag, self.template_id
        )
    }
}

thread_local! {
    static TEMPLATES: RefCell<FxHashMap<u32, Rc<Template>>> = RefCell::new(FxHashMap::default());
    static STATE_CLASSES: RefCell<FxHashMap<u32, Rc<StateClass>>> =
        RefCell::new(FxHashMap::default());
    static COMPONENT_CLASSES: RefCell<FxHashMap<u32, Rc<ComponentClass>>> =
        RefCell::new(FxHashMap::default());
    static TAG_INDEX: RefCell<FxHashMap<String, u32>> = RefCell::new(FxHashMap::default());
    static NEXT_COMPONENT_ID: Cell<u32> = const { Cell::new(1) };
}

pub fn register_template(template: Template) -> u32 {
    let id = template.id;
    TEMPLATES.with(|templates| {
        if templates.borrow().contains_key(&id) {
            tracing::warn!(template_id = id, "template id re-registered; overwriting");
        }
        templates.borrow_mut().insert(id, Rc::new(template));
    });
    id
}

pub fn template(id: u32) -> Result<Rc<Template>> {
    TEMPLATES
        .with(|templates| templates.borrow().get(&id).cloned())
        .ok_or_else(|| {
            StructiveError::new(
                ErrorCode::TemplateMissing,
                format!("no template registered under id {id}"),
            )
            .with_context(json!({ "template_id": id }))
        })
}

pub fn register_state_class(id: u32, class: Rc<StateClass>) -> u32 {
    STATE_CLASSES.with(|classes| {
        if classes.borrow().contains_key(&id) {
            tracing::warn!(state_class_id = id, "state class id re-registered; overwriting");
        }
        classes.borrow_mut().insert(id, class);
    });
    id
}

pub fn state_class(id: u32) -> Option<Rc<StateClass>> {
    STATE_CLASSES.with(|classes| classes.borrow().get(&id).cloned())
}

/// Register a component class; the tag index points at the new id.
pub fn register_component_class(class: ComponentClass) -> u32 {
    let id = NEXT_COMPONENT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    let tag = class.tag.clone();
    TAG_INDEX.with(|tags| {
        if tags.borrow().contains_key(&tag) {
            tracing::warn!(tag = %tag, "component tag re-registered; overwriting");
        }
        tags.borrow_mut().insert(tag, id);
    });
    COMPONENT_CLASSES.with(|classes| classes.borrow_mut().insert(id, Rc::new(class)));
    id
}

pub fn is_component_tag(tag: &str) -> bool {
    TAG_INDEX.with(|tags| tags.borrow().contains_key(tag))
}

pub fn component_class_by_tag(tag: &str) -> Result<Rc<ComponentClass>> {
    let id = TAG_INDEX
        .with(|tags| tags.borrow().get(tag).copied())
        .ok_or_else(|| {
            StructiveError::new(
                ErrorCode::UndefinedComponent,
                format!("no component class registered for tag \"{tag}\""),
            )
            .with_context(json!({ "tag": tag }))
        })?;
    let class = COMPONENT_CLASSES
        .with(|classes| classes.borrow().get(&id).cloned())
        .ok_or_else(|| {
            StructiveError::new(
                ErrorCode::UndefinedComponent,
                format!("component class {id} for tag \"{tag}\" is gone"),
            )
            .with_context(json!({ "tag": tag, "component_id": id }))
        })?;
    if class.tag != tag {
        return Err(StructiveError::new(
            ErrorCode::AmbiguousTag,
            format!(
                "tag \"{tag}\" resolves to a class registered under \"{}\"",
                class.tag
            ),
        )
        .with_context(json!({ "tag": tag, "registered_tag": class.tag })));
    }
    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateNode;

    #[test]
    fn templates_overwrite_under_the_same_id() {
        register_template(Template::new(900, vec![TemplateNode::text("a")]));
        register_template(Template::new(900, vec![TemplateNode::text("b")]));
        let t = template(900).unwrap();
        assert!(matches!(&t.roots[0], TemplateNode::Text(s) if s == "b"));
        assert_eq!(
            template(901).unwrap_err().code,
            ErrorCode::TemplateMissing
        );
    }

    #[test]
    fn component_tags_resolve() {
        let class = ComponentClass {
            tag: "x-demo".into(),
            template_id: 910,
            state_class: StateClass::builder().build(),
            config: ComponentConfig::default(),
        };
        register_component_class(class);
        assert!(is_component_tag("x-demo"));
        assert!(component_class_by_tag("x-demo").is_ok());
        assert_eq!(
            component_class_by_tag("x-nope").unwrap_err().code,
            ErrorCode::UndefinedComponent
        );
    }
}
