//! Chord finger table

use std::slice::Iter;

use crate::common::{ring, Id, Node, ID_BITS};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
/// Row `k` of a finger table: the interval `[n + 2^(k-1), n + 2^k)` and the node
/// currently believed to be the successor of its start.
pub struct FingerEntry {
    start: Id,
    end: Id,
    node: Node,
}

impl FingerEntry {
    /// Creates the `k`-th entry of node `n`, `k` in `1..=m`.
    ///
    /// The `m`-th entry's interval ends at `n` itself.
    pub fn new(n: &Id, k: usize, node: Node) -> Result<FingerEntry> {
        if !(1..=ID_BITS).contains(&k) {
            return Err(invalid_index(k));
        }

        Ok(FingerEntry::at(n, k, node))
    }

    fn at(n: &Id, k: usize, node: Node) -> FingerEntry {
        let end = if k < ID_BITS { n.finger_start(k + 1) } else { *n };

        FingerEntry {
            start: n.finger_start(k),
            end,
            node,
        }
    }

    pub fn start(&self) -> &Id {
        &self.start
    }

    pub fn end(&self) -> &Id {
        &self.end
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Returns `true` if `id` is within this finger's interval.
    pub fn contains(&self, id: &Id) -> bool {
        ring::contains(id, &self.start, &self.end)
    }
}

#[derive(Debug, Clone)]
/// Routing table of `m` shortcut entries, indexed from `1` to `m`.
pub struct FingerTable {
    owner: Node,
    entries: Vec<FingerEntry>,
}

impl FingerTable {
    /// Create a [FingerTable] for `owner` where every entry points back at the
    /// owner, which is the routing state of a ring with a single node.
    pub fn new(owner: Node) -> Self {
        let entries = (1..=ID_BITS)
            .map(|k| FingerEntry::at(&owner.id, k, owner.clone()))
            .collect();

        FingerTable { owner, entries }
    }

    /// Returns the node this table routes for.
    pub fn owner(&self) -> &Node {
        &self.owner
    }

    /// Returns the `k`-th entry, `k` in `1..=m`.
    pub fn entry(&self, k: usize) -> Result<&FingerEntry> {
        k.checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .ok_or_else(|| invalid_index(k))
    }

    /// Points the `k`-th entry at `node`.
    pub fn set_node(&mut self, k: usize, node: Node) -> Result<()> {
        let entry = k
            .checked_sub(1)
            .and_then(|index| self.entries.get_mut(index))
            .ok_or_else(|| invalid_index(k))?;

        entry.node = node;

        Ok(())
    }

    /// The first finger is the successor.
    pub fn successor(&self) -> &Node {
        &self.entries[0].node
    }

    pub fn set_successor(&mut self, node: Node) {
        self.entries[0].node = node;
    }

    /// Returns the finger target that most closely precedes `id`, scanning from
    /// the `m`-th entry down, or the owner if no target lies in `(owner, id)`.
    ///
    /// When several entries point at the same node the highest index wins.
    pub fn closest_preceding_finger(&self, id: &Id) -> &Node {
        self.entries
            .iter()
            .rev()
            .map(|entry| &entry.node)
            .find(|node| node.id.in_open(&self.owner.id, id))
            .unwrap_or(&self.owner)
    }

    /// Returns an iterator over the entries, from the first to the `m`-th.
    pub fn iter(&self) -> Iter<'_, FingerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn invalid_index(k: usize) -> Error {
    Error::InvalidArgument(format!("finger index {} is not in 1..={}", k, ID_BITS))
}
