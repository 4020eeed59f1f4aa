//! Renders a finished [`GroupTree`] as an indented report with subtotals.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

use tracing::warn;

use crate::field::{normalize_date, GroupField, COLUMN_SEPARATOR};
use crate::tree::{Branch, GroupTree, Node};

const INDENT: &str = "\t";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub total: u64,
}

pub fn render(tree: &GroupTree, fields: &[GroupField]) -> Report {
    let mut text = String::new();
    let total = render_level(tree.root(), fields, 0, "", &mut text);
    Report { text, total }
}

/// Rewrites `DD/Mon/YYYY` date components so keys sort chronologically.
/// Only the date components of a composite key are touched.
fn rewrite_date_key(key: &str, field: &GroupField, positions: &[usize]) -> String {
    match field {
        GroupField::Single(_) => normalize_date(key),
        GroupField::Composite(_) => {
            let mut parts: Vec<Cow<'_, str>> =
                key.split(COLUMN_SEPARATOR).map(Cow::Borrowed).collect();
            for &position in positions {
                if let Some(part) = parts.get_mut(position) {
                    *part = Cow::Owned(normalize_date(part));
                }
            }
            let separator = COLUMN_SEPARATOR.to_string();
            parts.join(separator.as_str())
        }
    }
}

fn sorted_children<'a>(
    branch: &'a Branch,
    field: Option<&GroupField>,
) -> BTreeMap<Cow<'a, str>, &'a Node> {
    let positions: Vec<usize> = field.map(|f| f.date_positions().collect()).unwrap_or_default();
    let Some(field) = field.filter(|_| !positions.is_empty()) else {
        return branch
            .iter()
            .map(|(key, node)| (Cow::Borrowed(key.as_str()), node))
            .collect();
    };

    let mut children = BTreeMap::new();
    let mut collisions = 0usize;
    for (key, node) in branch {
        // Keys that collide after rewriting keep the later entry's value.
        if children
            .insert(Cow::Owned(rewrite_date_key(key, field, &positions)), node)
            .is_some()
        {
            collisions += 1;
        }
    }
    if collisions > 0 {
        warn!(collisions, "date normalisation collapsed report keys");
    }
    children
}

fn render_level(
    branch: &Branch,
    fields: &[GroupField],
    level: usize,
    pad: &str,
    out: &mut String,
) -> u64 {
    let mut sum = 0;
    for (key, node) in sorted_children(branch, fields.get(level)) {
        match node {
            Node::Branch(children) => {
                let _ = writeln!(out, "{pad}{key}");
                let child_pad = format!("{pad}{INDENT}");
                sum += render_level(children, fields, level + 1, &child_pad, out);
            }
            Node::Leaf(count) => {
                let _ = writeln!(out, "{pad}{count}\t{key}");
                sum += count;
            }
        }
    }
    let _ = writeln!(out, "{pad}... total: {sum}\n");
    let _ = writeln!(out);
    sum
}
