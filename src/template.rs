//! A small expression language for user-supplied predicates and scores.
//!
//! Templates use `{{ }}` actions with field access, literals, pipelines,
//! and `if`/`else` blocks. They are compiled once into an expression tree;
//! unknown functions and wrong argument counts fail at compile time.
//!
//! Templates drive `template` conditions ([`Template::render_bool`]), score
//! modifiers, scripted metrics, and `bucket_script` metrics
//! ([`Template::render_number`]).
//!
//! # Functions
//!
//! - comparison and logic: `eq ne lt le gt ge and or not len`
//! - math: `log sqrt pow div add mul`
//! - conversion: `toFloat64 toTime now levenshtein`
//!
//! # Examples
//!
//! ```
//! use halberd::template::Template;
//! use serde_json::json;
//!
//! let template = Template::compile("{{ mul .price 1.5 }}").unwrap();
//! let doc = json!({"price": 10}).as_object().cloned().unwrap();
//! assert_eq!(template.render_number(&doc).unwrap(), 15.0);
//!
//! assert!(Template::compile("{{ shout .name }}").is_err());
//! ```

pub mod exec;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::document::Document;
use crate::error::{HalberdError, Result};

pub use parser::{Expr, Node};
pub use value::TemplateValue;

/// A compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Compile template source.
    pub fn compile(source: &str) -> Result<Self> {
        let items = lexer::lex(source)?;
        let nodes = parser::parse(items)?;
        Ok(Template {
            source: source.to_string(),
            nodes,
        })
    }

    /// Source text this template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render against a JSON object.
    pub fn render(&self, data: &Document) -> Result<String> {
        let mut out = String::new();
        exec::render_nodes(&self.nodes, data, &mut out)?;
        Ok(out)
    }

    /// Render and parse the trimmed output as a number.
    pub fn render_number(&self, data: &Document) -> Result<f64> {
        let output = self.render(data)?;
        let trimmed = output.trim();
        trimmed.parse::<f64>().map_err(|_| {
            HalberdError::template(format!("template result '{trimmed}' is not a number"))
        })
    }

    /// Render and interpret the output as a boolean.
    ///
    /// Surrounding quotes, backslashes, and quote characters are stripped;
    /// the remainder must equal `true` ignoring case.
    pub fn render_bool(&self, data: &Document) -> Result<bool> {
        let output = self.render(data)?;
        Ok(is_true_output(&output))
    }
}

fn is_true_output(output: &str) -> bool {
    let trimmed = output.trim();
    let unquoted = ['"', '`', '\'']
        .iter()
        .find_map(|quote| {
            trimmed
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        })
        .unwrap_or(trimmed);
    let cleaned: String = unquoted
        .chars()
        .filter(|c| *c != '\\' && *c != '"')
        .collect();
    cleaned.trim().eq_ignore_ascii_case("true")
}

/// Memoizes compiled templates by source text.
///
/// The cache holds at most `capacity` templates and is cleared when a new
/// entry would exceed that.
#[derive(Debug)]
pub struct TemplateCache {
    templates: RwLock<AHashMap<String, Arc<Template>>>,
    capacity: usize,
}

impl TemplateCache {
    /// Create an empty cache.
    pub fn new(capacity: usize) -> Self {
        TemplateCache {
            templates: RwLock::new(AHashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Return the compiled template for `source`, compiling it on first use.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Template>> {
        if let Some(template) = self.templates.read().get(source) {
            return Ok(Arc::clone(template));
        }

        let template = Arc::new(Template::compile(source)?);
        let mut templates = self.templates.write();
        if templates.len() >= self.capacity {
            templates.clear();
        }
        templates.insert(source.to_string(), Arc::clone(&template));
        Ok(template)
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_render_bool() {
        let template = Template::compile(r#"{{ eq .status "active" }}"#).unwrap();
        assert!(template.render_bool(&doc(json!({"status": "active"}))).unwrap());
        assert!(!template.render_bool(&doc(json!({"status": "closed"}))).unwrap());
    }

    #[test]
    fn test_bool_output_cleaning() {
        assert!(is_true_output("  TRUE \n"));
        assert!(is_true_output("\"true\""));
        assert!(is_true_output("\\\"true\\\""));
        assert!(!is_true_output("yes"));
        assert!(!is_true_output("<no value>"));
    }

    #[test]
    fn test_render_number() {
        let template = Template::compile("{{ add .a .b }}").unwrap();
        assert_eq!(template.render_number(&doc(json!({"a": 1, "b": "2.5"}))).unwrap(), 3.5);

        let text = Template::compile("{{ .name }}").unwrap();
        assert!(text.render_number(&doc(json!({"name": "x"}))).is_err());
    }

    #[test]
    fn test_cache() {
        let cache = TemplateCache::new(2);
        let first = cache.get_or_compile("{{ 1 }}").unwrap();
        let again = cache.get_or_compile("{{ 1 }}").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 1);

        cache.get_or_compile("{{ 2 }}").unwrap();
        cache.get_or_compile("{{ 3 }}").unwrap();
        assert_eq!(cache.len(), 1);

        assert!(cache.get_or_compile("{{ nope }}").is_err());
    }
}
