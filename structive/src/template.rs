//! Template model.
//!
//! Templates are programmatic trees; HTML/mustache ingestion happens in
//! a loader outside this crate. The two marker kinds mirror the comment
//! placeholders that loader produces: `@@:expr` for a text-content
//! binding and `@@|N` for a nested template instantiation point.

#[derive(Debug, Clone)]
pub enum TemplateNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        /// The `data-bind` text, if any.
        bind_text: Option<String>,
        children: Vec<TemplateNode>,
    },
    /// Static text.
    Text(String),
    /// `<!--@@:stateExpr-->`: replaced by a bound text node at activation.
    TextBinding(String),
    /// `<!--@@|N-->`: instantiation point for the registered template N.
    EmbeddedTemplate(u32),
}

impl TemplateNode {
    pub fn element(
        tag: &str,
        attributes: &[(&str, &str)],
        bind_text: Option<&str>,
        children: Vec<TemplateNode>,
    ) -> Self {
        TemplateNode::Element {
            tag: tag.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            bind_text: bind_text.map(str::to_string),
            children,
        }
    }

    pub fn text(content: &str) -> Self {
        TemplateNode::Text(content.to_string())
    }

    pub fn text_binding(expr: &str) -> Self {
        TemplateNode::TextBinding(expr.to_string())
    }

    pub fn embed(template_id: u32) -> Self {
        TemplateNode::EmbeddedTemplate(template_id)
    }
}

/// A registered template fragment.
///
/// Structural templates (the target of `@@|N`) carry their own bind
/// text — the `for:`/`if:` clause that governs the instantiation point.
#[derive(Debug, Clone)]
pub struct Template {
    pub id: u32,
    pub bind_text: Option<String>,
    pub roots: Vec<TemplateNode>,
}

impl Template {
    pub fn new(id: u32, roots: Vec<TemplateNode>) -> Self {
        Self {
            id,
            bind_text: None,
            roots,
        }
    }

    pub fn structural(id: u32, bind_text: &str, roots: Vec<TemplateNode>) -> Self {
        Self {
            id,
            bind_text: Some(bind_text.to_string()),
            roots,
        }
    }
}
