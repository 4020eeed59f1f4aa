//! Nested count tree keyed by successive rendered group-field values.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub type Branch = BTreeMap<String, Node>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(u64),
    Branch(Branch),
}

impl Node {
    /// Sum of every leaf count beneath this node.
    pub fn total(&self) -> u64 {
        match self {
            Node::Leaf(count) => *count,
            Node::Branch(children) => children.values().map(Node::total).sum(),
        }
    }
}

/// Every root-to-leaf path has exactly `depth` edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTree {
    depth: usize,
    root: Branch,
}

impl GroupTree {
    pub fn new(depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(Error::EmptyGroup);
        }
        Ok(Self {
            depth,
            root: Branch::new(),
        })
    }

    pub fn root(&self) -> &Branch {
        &self.root
    }

    pub fn total(&self) -> u64 {
        self.root.values().map(Node::total).sum()
    }

    /// Walks `path`, creating branches and a zero leaf on first visit, then
    /// increments the leaf. Returns the new leaf count.
    pub fn insert<S: AsRef<str>>(&mut self, path: &[S]) -> Result<u64> {
        let depth = self.depth;
        let Some((last, parents)) = path.split_last() else {
            return Err(Error::KeyPathDepth {
                expected: depth,
                actual: 0,
            });
        };
        if path.len() != depth {
            return Err(Error::KeyPathDepth {
                expected: depth,
                actual: path.len(),
            });
        }

        let mut level = &mut self.root;
        for key in parents {
            let node = level
                .entry(key.as_ref().to_string())
                .or_insert_with(|| Node::Branch(Branch::new()));
            level = match node {
                Node::Branch(children) => children,
                Node::Leaf(_) => {
                    return Err(Error::KeyPathDepth {
                        expected: depth,
                        actual: path.len(),
                    })
                }
            };
        }

        match level
            .entry(last.as_ref().to_string())
            .or_insert(Node::Leaf(0))
        {
            Node::Leaf(count) => {
                *count += 1;
                Ok(*count)
            }
            Node::Branch(_) => Err(Error::KeyPathDepth {
                expected: depth,
                actual: path.len(),
            }),
        }
    }
}
