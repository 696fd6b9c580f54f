//! Binding-text grammar.
//!
//! `bindText := clause (";" clause)*`
//! `clause := nodeProp ("|" inputFilter)* ":" statePath ("|" outputFilter)* ("@" decorate ("," decorate)*)?`
//! `filter := name ("," option)*`
//!
//! Options may be percent-encoded between `#…#` to embed separators.
//! Parse results are interned by input string, so parsing the same text
//! twice returns the identical object.

use crate::error::{ErrorCode, Result, StructiveError};
use crate::filter::FilterWithOptions;
use rustc_hash::FxHashMap;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// One parsed clause of a `data-bind` text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBind {
    pub node_property: String,
    /// Run node → state on two-way writes.
    pub input_filters: Vec<FilterWithOptions>,
    pub state_path: String,
    /// Run state → node on reads.
    pub output_filters: Vec<FilterWithOptions>,
    pub decorates: Vec<String>,
}

thread_local! {
    static PARSE_CACHE: RefCell<FxHashMap<Box<str>, Rc<Vec<ParsedBind>>>> =
        RefCell::new(FxHashMap::default());
}

/// Split on `separator`, ignoring separators inside `#…#` sections.
fn split_top(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_hash = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '#' => in_hash = !in_hash,
            c if c == separator && !in_hash => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn parse_filter(text: &str) -> Option<FilterWithOptions> {
    let pieces = split_top(text, ',');
    let name = pieces.first()?.trim();
    if name.is_empty() {
        return None;
    }
    let options = pieces[1..]
        .iter()
        .map(|raw| {
            let raw = raw.trim();
            if raw.len() >= 2 && raw.starts_with('#') && raw.ends_with('#') {
                percent_decode(&raw[1..raw.len() - 1])
            } else {
                raw.to_string()
            }
        })
        .collect();
    Some(FilterWithOptions {
        name: name.to_string(),
        options,
    })
}

fn parse_clause(clause: &str) -> Result<ParsedBind> {
    let mut sides = split_top(clause, ':');
    if sides.len() < 2 {
        return Err(StructiveError::new(
            ErrorCode::BindingResolution,
            format!("binding clause \"{clause}\" has no \":\" separator"),
        )
        .with_context(json!({ "clause": clause })));
    }
    let node_side = sides.remove(0);
    // A state path may itself contain ':' only through encoded options, so
    // the remainder joins back untouched.
    let state_side = sides.join(":");

    let mut node_pieces = split_top(node_side, '|');
    let node_property = node_pieces.remove(0).trim().to_string();
    if node_property.is_empty() {
        return Err(StructiveError::new(
            ErrorCode::BindingResolution,
            format!("binding clause \"{clause}\" has an empty node property"),
        )
        .with_context(json!({ "clause": clause })));
    }
    let input_filters = node_pieces.iter().filter_map(|p| parse_filter(p)).collect();

    let (filters_side, decorates) = match split_top(&state_side, '@') {
        pieces if pieces.len() > 1 => {
            let decorates = pieces[1..]
                .join("@")
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            (pieces[0].to_string(), decorates)
        }
        pieces => (pieces[0].to_string(), Vec::new()),
    };

    let mut state_pieces = split_top(&filters_side, '|');
    let state_path = state_pieces.remove(0).trim().to_string();
    if state_path.is_empty() {
        return Err(StructiveError::new(
            ErrorCode::BindingResolution,
            format!("binding clause \"{clause}\" has an empty state path"),
        )
        .with_context(json!({ "clause": clause })));
    }
    let output_filters = state_pieces.iter().filter_map(|p| parse_filter(p)).collect();

    Ok(ParsedBind {
        node_property,
        input_filters,
        state_path,
        output_filters,
        decorates,
    })
}

/// Parse a full `data-bind` text. Results are interned: the same input
/// string always returns the identical `Rc`.
pub fn parse_bind_text(text: &str) -> Result<Rc<Vec<ParsedBind>>> {
    if let Some(hit) = PARSE_CACHE.with(|cache| cache.borrow().get(text).cloned()) {
        return Ok(hit);
    }
    let mut clauses = Vec::new();
    for clause in split_top(text, ';') {
        let clause = clause.trim();
        if clause.is_empty() {
            continue;
        }
        clauses.push(parse_clause(clause)?);
    }
    let parsed = Rc::new(clauses);
    PARSE_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert(Box::from(text), parsed.clone())
    });
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_clause() {
        let parsed = parse_bind_text("textContent:user.name").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].node_property, "textContent");
        assert_eq!(parsed[0].state_path, "user.name");
        assert!(parsed[0].output_filters.is_empty());
        assert!(parsed[0].decorates.is_empty());
    }

    #[test]
    fn filters_and_decorates() {
        let parsed =
            parse_bind_text("value|trim:draft|defaults,n/a|uc@readonly,prevent").unwrap();
        let clause = &parsed[0];
        assert_eq!(clause.node_property, "value");
        assert_eq!(clause.input_filters.len(), 1);
        assert_eq!(clause.input_filters[0].name, "trim");
        assert_eq!(clause.state_path, "draft");
        assert_eq!(clause.output_filters.len(), 2);
        assert_eq!(clause.output_filters[0].name, "defaults");
        assert_eq!(clause.output_filters[0].options, vec!["n/a".to_string()]);
        assert_eq!(clause.output_filters[1].name, "uc");
        assert_eq!(clause.decorates, vec!["readonly", "prevent"]);
    }

    #[test]
    fn encoded_options_keep_separators() {
        let parsed = parse_bind_text("textContent:label|defaults,#a%2Cb c#").unwrap();
        assert_eq!(
            parsed[0].output_filters[0].options,
            vec!["a,b c".to_string()]
        );
    }

    #[test]
    fn multiple_clauses_split_on_semicolon() {
        let parsed = parse_bind_text("textContent:name; class:kind").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].node_property, "class");
    }

    #[test]
    fn parsing_is_interned() {
        let a = parse_bind_text("textContent:user.name").unwrap();
        let b = parse_bind_text("textContent:user.name").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn malformed_clause_is_rejected() {
        assert_eq!(
            parse_bind_text("textContent").unwrap_err().code,
            ErrorCode::BindingResolution
        );
    }
}
