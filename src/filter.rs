//! Filter expressions for listings
//!
//! A filter is a conjunction of clauses joined by `&&`:
//!
//! ```text
//! style == "openapi/v3"
//! name.startsWith("projects/demo/") && style != "discovery"
//! value_type.contains("Vocabulary")
//! ```
//!
//! Literals are double-quoted; `\"` and `\\` are the only escapes. Each record
//! kind declares the fields it exposes, and a clause naming any other field is
//! rejected when the filter is parsed.

use crate::error::{RegistryError, Result};
use crate::types::{Api, Artifact, Project, Spec, Version};
use once_cell::sync::Lazy;
use regex::Regex;

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([a-z_]+)\s*(==|!=)\s*"((?:[^"\\]|\\.)*)"\s*$"#)
        .expect("comparison pattern compiles")
});

static METHOD_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*([a-z_]+)\.(startsWith|contains)\(\s*"((?:[^"\\]|\\.)*)"\s*\)\s*$"#)
        .expect("method pattern compiles")
});

/// A record that can be listed and filtered
pub trait Filterable {
    /// Fields a filter may reference
    const FIELDS: &'static [&'static str];

    /// Value of a field, if the record has it
    fn field(&self, name: &str) -> Option<String>;

    /// Full resource name; listings are ordered by it
    fn resource_name(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Eq,
    Ne,
    StartsWith,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    field: String,
    op: Op,
    literal: String,
}

impl Clause {
    fn matches(&self, value: &str) -> bool {
        match self.op {
            Op::Eq => value == self.literal,
            Op::Ne => value != self.literal,
            Op::StartsWith => value.starts_with(&self.literal),
            Op::Contains => value.contains(&self.literal),
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Split on `&&` outside quoted literals
fn split_clauses(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut in_literal = false;
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            _ if escaped => escaped = false,
            b'\\' if in_literal => escaped = true,
            b'"' => in_literal = !in_literal,
            b'&' if !in_literal && bytes.get(i + 1) == Some(&b'&') => {
                clauses.push(&expr[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    clauses.push(&expr[start..]);
    clauses
}

impl Filter {
    /// Parse `expr` against the fields a record kind exposes
    pub fn parse(expr: &str, fields: &[&str]) -> Result<Self> {
        if expr.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut clauses = Vec::new();
        for raw in split_clauses(expr) {
            let (field, op, literal) = if let Some(caps) = COMPARISON.captures(raw) {
                let op = if &caps[2] == "==" { Op::Eq } else { Op::Ne };
                (caps[1].to_string(), op, unescape(&caps[3]))
            } else if let Some(caps) = METHOD_CALL.captures(raw) {
                let op = if &caps[2] == "startsWith" {
                    Op::StartsWith
                } else {
                    Op::Contains
                };
                (caps[1].to_string(), op, unescape(&caps[3]))
            } else {
                return Err(RegistryError::invalid(format!(
                    "invalid filter clause {:?}",
                    raw.trim()
                )));
            };

            if !fields.contains(&field.as_str()) {
                return Err(RegistryError::invalid(format!(
                    "unknown filter field {:?} (expected one of {})",
                    field,
                    fields.join(", ")
                )));
            }
            clauses.push(Clause { field, op, literal });
        }
        Ok(Self { clauses })
    }

    /// Parse a filter for the record type `T`
    pub fn for_type<T: Filterable>(expr: &str) -> Result<Self> {
        Self::parse(expr, T::FIELDS)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True when every clause holds for `record`
    pub fn matches<T: Filterable>(&self, record: &T) -> bool {
        self.clauses.iter().all(|clause| {
            record
                .field(&clause.field)
                .map(|value| clause.matches(&value))
                .unwrap_or(false)
        })
    }
}

impl Filterable for Project {
    const FIELDS: &'static [&'static str] = &["name", "display_name", "description"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.to_string()),
            "display_name" => Some(self.display_name.clone()),
            "description" => Some(self.description.clone()),
            _ => None,
        }
    }

    fn resource_name(&self) -> String {
        self.name.to_string()
    }
}

impl Filterable for Api {
    const FIELDS: &'static [&'static str] = &["name", "display_name", "description"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.to_string()),
            "display_name" => Some(self.display_name.clone()),
            "description" => Some(self.description.clone()),
            _ => None,
        }
    }

    fn resource_name(&self) -> String {
        self.name.to_string()
    }
}

impl Filterable for Version {
    const FIELDS: &'static [&'static str] = &["name", "display_name", "description"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.to_string()),
            "display_name" => Some(self.display_name.clone()),
            "description" => Some(self.description.clone()),
            _ => None,
        }
    }

    fn resource_name(&self) -> String {
        self.name.to_string()
    }
}

impl Filterable for Spec {
    const FIELDS: &'static [&'static str] = &["name", "style", "filename", "description"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.to_string()),
            "style" => Some(self.style.clone()),
            "filename" => Some(self.filename.clone()),
            "description" => Some(self.description.clone()),
            _ => None,
        }
    }

    fn resource_name(&self) -> String {
        self.name.to_string()
    }
}

impl Filterable for Artifact {
    const FIELDS: &'static [&'static str] = &["name", "value_type", "subject", "relation"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.to_string()),
            "value_type" => Some(self.value_type.clone()),
            "subject" => Some(self.subject()),
            "relation" => Some(self.relation().to_string()),
            _ => None,
        }
    }

    fn resource_name(&self) -> String {
        self.name.to_string()
    }
}
