//! Query templates
//!
//! A query is stored as text with `{name}` placeholders. Three names are
//! reserved and filled per page by the reader: `{page}`, `{page_size}` and
//! `{token}`. Any other name must be bound up front with
//! [`QueryTemplate::bind`].
//!
//! Rendering is a single left-to-right pass, so a substituted value is never
//! itself scanned for placeholders. Every substituted value is XML
//! attribute-escaped; the continuation token in particular contains quotes
//! and angle brackets.

use super::page::ContinuationToken;
use crate::domain::{EngineError, EntityName, Result};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder pattern is valid"))
}

/// Escape a value for use inside an XML attribute
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Query text with named placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    text: String,
    bindings: BTreeMap<String, String>,
}

impl QueryTemplate {
    /// Wrap query text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Bind a non-reserved placeholder
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Raw template text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Produce the query text for one page
    ///
    /// `page` is 1-based. With no token, `{token}` renders empty.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the template references a name that was
    /// never bound.
    pub fn render(
        &self,
        page: usize,
        page_size: usize,
        token: Option<&ContinuationToken>,
    ) -> Result<String> {
        let mut unbound: Vec<String> = Vec::new();

        let rendered = placeholder_regex().replace_all(&self.text, |caps: &Captures<'_>| {
            let name = &caps[1];
            let value = match name {
                "page" => page.to_string(),
                "page_size" => page_size.to_string(),
                "token" => token.map(|t| t.as_str().to_string()).unwrap_or_default(),
                other => match self.bindings.get(other) {
                    Some(value) => value.clone(),
                    None => {
                        unbound.push(other.to_string());
                        return caps[0].to_string();
                    }
                },
            };
            xml_escape(&value)
        });

        if !unbound.is_empty() {
            return Err(EngineError::Validation(format!(
                "Query references unbound placeholder(s): {}",
                unbound.join(", ")
            )));
        }

        Ok(rendered.into_owned())
    }
}

/// A paged query against one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    /// Record type the query returns
    pub entity: EntityName,

    /// Primary key field of `entity`
    pub id_field: String,

    /// Query text
    pub template: QueryTemplate,
}

impl RecordQuery {
    /// Creates a new record query
    pub fn new(entity: EntityName, id_field: impl Into<String>, template: QueryTemplate) -> Self {
        Self {
            entity,
            id_field: id_field.into(),
            template,
        }
    }
}

/// Everything the store needs to fetch one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Record type being read
    pub entity: EntityName,

    /// Primary key field of `entity`
    pub id_field: String,

    /// Fully rendered query text
    pub query: String,

    /// 1-based page number
    pub page: usize,

    /// Records requested per page
    pub page_size: usize,
}
