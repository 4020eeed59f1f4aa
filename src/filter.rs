//! Include/exclude filtering over parsed records.
//!
//! Rules arrive as TOML values using a shape convention: a string is a pattern
//! bound to the field named by its key, a table requires all of its entries,
//! an array requires any one of its elements. They are compiled once into
//! [`FilterRule`] so evaluation never inspects value shapes.

use std::fmt;

use regex::{Regex, RegexBuilder};
use toml::Value;

use crate::error::{Error, Result};
use crate::record::{Field, LogRecord};

#[derive(Debug, Clone)]
pub enum FilterRule {
    /// Case-insensitive search of `pattern` anywhere in the field value.
    Leaf { field: Field, pattern: Regex },
    All(Vec<FilterRule>),
    Any(Vec<FilterRule>),
}

impl FilterRule {
    pub fn leaf(field: Field, pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| Error::InvalidPattern {
                field: field.to_string(),
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(FilterRule::Leaf { field, pattern })
    }

    /// Parses the CLI form `FIELD=REGEX`.
    pub fn from_assignment(text: &str) -> Result<Self> {
        let (name, pattern) = text
            .split_once('=')
            .ok_or_else(|| Error::InvalidRule(format!("expected FIELD=REGEX, got '{text}'")))?;
        FilterRule::leaf(name.trim().parse()?, pattern)
    }

    /// Compiles one rule value. Values of no recognised shape compile to an
    /// empty disjunction, which never matches.
    pub fn compile(value: &Value) -> Result<Self> {
        match value {
            Value::Table(table) => {
                let mut rules = Vec::with_capacity(table.len());
                for (name, child) in table {
                    match child {
                        Value::String(pattern) => {
                            rules.push(FilterRule::leaf(name.parse()?, pattern)?)
                        }
                        Value::Table(_) | Value::Array(_) => rules.push(FilterRule::compile(child)?),
                        // Entries of other shapes never veto a conjunction.
                        _ => {}
                    }
                }
                Ok(FilterRule::All(rules))
            }
            Value::Array(items) => {
                let rules = items
                    .iter()
                    .map(|item| match item {
                        Value::String(pattern) => Err(Error::UnboundPattern(pattern.clone())),
                        other => FilterRule::compile(other),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FilterRule::Any(rules))
            }
            Value::String(pattern) => Err(Error::UnboundPattern(pattern.clone())),
            _ => Ok(FilterRule::Any(Vec::new())),
        }
    }

    /// Compiles one side (include or exclude) of a filter config. Empty or
    /// falsy values mean the side has no opinion.
    pub fn compile_side(value: &Value) -> Result<Option<Self>> {
        let empty = match value {
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Table(table) => table.is_empty(),
            Value::Boolean(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Datetime(_) => false,
        };
        if empty {
            Ok(None)
        } else {
            FilterRule::compile(value).map(Some)
        }
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        match self {
            FilterRule::Leaf { field, pattern } => pattern.is_match(record.get(*field)),
            FilterRule::All(rules) => rules.iter().all(|rule| rule.matches(record)),
            FilterRule::Any(rules) => rules.iter().any(|rule| rule.matches(record)),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, rules: &[FilterRule]) -> fmt::Result {
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{rule}")?;
    }
    Ok(())
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRule::Leaf { field, pattern } => write!(f, "{field}: '{}'", pattern.as_str()),
            FilterRule::All(rules) => {
                f.write_str("{")?;
                write_joined(f, rules)?;
                f.write_str("}")
            }
            FilterRule::Any(rules) => {
                f.write_str("[")?;
                write_joined(f, rules)?;
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub include: Option<FilterRule>,
    pub exclude: Option<FilterRule>,
}

impl FilterConfig {
    /// Exclude wins over include; an absent side has no opinion.
    pub fn passes(&self, record: &LogRecord) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.matches(record) {
                return false;
            }
        }
        match &self.include {
            Some(include) => include.matches(record),
            None => true,
        }
    }
}

impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |rule: &Option<FilterRule>| match rule {
            Some(rule) => rule.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "include = {}, exclude = {}",
            side(&self.include),
            side(&self.exclude)
        )
    }
}
