//! TOML configuration: default grouping, group presets, always-on filters and
//! selectable filter sets.
//!
//! ```toml
//! group = ["date", "uri", ["ua:50", "ip:20"]]
//!
//! [groups]
//! daily = ["date", ["code", "method", "uri:100"], "ip:20"]
//!
//! [filters]
//! exclude = [{ ip = '^(?:127\.0\.0\.1|192\.168\.0\.1)$' }]
//!
//! [sets]
//! bots = [{ ua = "bot|scan" }]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use toml::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::field::GroupField;
use crate::filter::{FilterConfig, FilterRule};

/// Grouping used when neither the command line nor the config names one.
pub const DEFAULT_GROUP: &[&[&str]] = &[&["date"], &["uri"], &["ua:50", "ip:20"]];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGroupField {
    Single(String),
    Composite(Vec<String>),
}

impl RawGroupField {
    fn compile(&self) -> Result<GroupField> {
        match self {
            RawGroupField::Single(token) => Ok(GroupField::Single(token.parse()?)),
            RawGroupField::Composite(tokens) => GroupField::composite(tokens),
        }
    }
}

fn compile_group(raw: &[RawGroupField]) -> Result<Vec<GroupField>> {
    if raw.is_empty() {
        return Err(Error::EmptyGroup);
    }
    raw.iter().map(RawGroupField::compile).collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFilters {
    include: Option<Value>,
    exclude: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    group: Option<Vec<RawGroupField>>,
    #[serde(default)]
    groups: BTreeMap<String, Vec<RawGroupField>>,
    #[serde(default)]
    filters: RawFilters,
    #[serde(default)]
    sets: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub group: Option<Vec<GroupField>>,
    /// Named group presets, ordered by name.
    pub presets: Vec<(String, Vec<GroupField>)>,
    pub filters: FilterConfig,
    /// Named filter sets, ordered by name.
    pub sets: Vec<(String, FilterRule)>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Config::compile(raw)?;
        debug!(
            path = %path.display(),
            presets = config.presets.len(),
            sets = config.sets.len(),
            "loaded config"
        );
        Ok(config)
    }

    fn compile(raw: RawConfig) -> Result<Self> {
        let group = raw.group.as_deref().map(compile_group).transpose()?;
        let presets = raw
            .groups
            .iter()
            .map(|(name, fields)| Ok((name.clone(), compile_group(fields)?)))
            .collect::<Result<Vec<_>>>()?;
        let filters = FilterConfig {
            include: raw
                .filters
                .include
                .as_ref()
                .map(FilterRule::compile_side)
                .transpose()?
                .flatten(),
            exclude: raw
                .filters
                .exclude
                .as_ref()
                .map(FilterRule::compile_side)
                .transpose()?
                .flatten(),
        };
        let sets = raw
            .sets
            .iter()
            .map(|(name, rules)| Ok((name.clone(), FilterRule::compile(rules)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Config {
            group,
            presets,
            filters,
            sets,
        })
    }

    pub fn preset(&self, token: &str) -> Result<&[GroupField]> {
        let names: Vec<&str> = self.presets.iter().map(|(name, _)| name.as_str()).collect();
        let selection =
            Selection::parse(token, &names).map_err(|_| Error::UnknownPreset(token.to_string()))?;
        if selection.negated {
            return Err(Error::InvalidSelection(token.to_string()));
        }
        Ok(&self.presets[selection.index].1)
    }

    /// Combines the always-on filters, command-line rules and selected sets.
    /// A plain selection excludes the set, a `!` selection includes it.
    pub fn filter_config(
        &self,
        selections: &[String],
        include: Vec<FilterRule>,
        exclude: Vec<FilterRule>,
    ) -> Result<FilterConfig> {
        let mut include_rules: Vec<FilterRule> =
            self.filters.include.iter().cloned().chain(include).collect();
        let mut exclude_rules: Vec<FilterRule> =
            self.filters.exclude.iter().cloned().chain(exclude).collect();

        let names: Vec<&str> = self.sets.iter().map(|(name, _)| name.as_str()).collect();
        for token in selections {
            let selection = Selection::parse(token, &names)?;
            let rule = self.sets[selection.index].1.clone();
            if selection.negated {
                include_rules.push(rule);
            } else {
                exclude_rules.push(rule);
            }
        }

        Ok(FilterConfig {
            include: any_of(include_rules),
            exclude: any_of(exclude_rules),
        })
    }
}

fn any_of(mut rules: Vec<FilterRule>) -> Option<FilterRule> {
    match rules.len() {
        0 => None,
        1 => rules.pop(),
        _ => Some(FilterRule::Any(rules)),
    }
}

pub fn default_group() -> Result<Vec<GroupField>> {
    DEFAULT_GROUP
        .iter()
        .map(|parts| match *parts {
            [single] => Ok(GroupField::Single(single.parse()?)),
            _ => GroupField::composite(*parts),
        })
        .collect()
}

/// A choice picked from an ordered list by `[!]NAME` or `[!]INDEX`.
///
/// Indexes are 1-based and negative values count from the end (`-1` is the
/// last entry); `0` picks the first. The accepted range is `-len < INDEX <= len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub negated: bool,
}

impl Selection {
    pub fn parse<S: AsRef<str>>(token: &str, choices: &[S]) -> Result<Self> {
        let invalid = || Error::InvalidSelection(token.to_string());
        let trimmed = token.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(invalid());
        }

        if let Some(index) = choices.iter().position(|c| c.as_ref() == body) {
            return Ok(Selection { index, negated });
        }

        let len = choices.len() as i64;
        let number: i64 = body.parse().map_err(|_| invalid())?;
        if number > len || number <= -len {
            return Err(invalid());
        }
        let index = match number {
            n if n > 0 => n - 1,
            0 => 0,
            n => len + n,
        };
        Ok(Selection {
            index: index as usize,
            negated,
        })
    }
}
