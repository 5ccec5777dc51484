use std::collections::BTreeMap;
use std::ops::Bound;

use indexmap::IndexMap;
use md5::{Digest, Md5};

/// Digest function placing nodes and lookup keys on the ring. Must be
/// deterministic; selection is a pure function of `(weights, hasher)`.
pub type Hasher = fn(&str) -> String;

/// Default ring hasher: lowercase 32-digit MD5 hex.
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// An immutable, weighted consistent hash ring.
///
/// Each node occupies `weight` positions on the ring, one per virtual
/// replica, at `hasher("<node>-<i>")`. Virtual replicas smooth the key
/// distribution and keep remapping small when the node set changes:
/// removing a node reassigns only the keys that landed on its replicas.
///
/// Node changes are copy-on-write: `with_node`, `with_weighted_node` and
/// `without_node` rebuild a new ring and leave the original untouched.
#[derive(Clone)]
pub struct HashRing {
    hasher: Hasher,
    weights: IndexMap<String, u32>,
    entries: BTreeMap<String, String>,
}

impl HashRing {
    /// An empty ring with the default MD5 hasher.
    pub fn new() -> HashRing {
        Self::with_hasher(md5_hex)
    }

    pub fn with_hasher(hasher: Hasher) -> HashRing {
        Self::build(hasher, IndexMap::new())
    }

    /// Build a ring holding every element at weight 1.
    pub fn from_elements<I>(hasher: Hasher, elements: I) -> HashRing
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut weights = IndexMap::new();
        for element in elements {
            weights.insert(element.into(), 1);
        }
        Self::build(hasher, weights)
    }

    fn build(hasher: Hasher, weights: IndexMap<String, u32>) -> HashRing {
        let mut entries = BTreeMap::new();
        for (node, &weight) in &weights {
            for replica in 0..weight {
                // colliding hashes silently overwrite; with a well
                // distributed hasher this does not happen in practice
                entries.insert(hasher(&format!("{node}-{replica}")), node.clone());
            }
        }
        HashRing {
            hasher,
            weights,
            entries,
        }
    }

    /// Number of distinct nodes (not ring entries).
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// A new ring with `node` present at weight 1.
    pub fn with_node(&self, node: &str) -> HashRing {
        self.with_weighted_node(node, 1)
    }

    /// A new ring with `node` present at the given weight, added or
    /// replaced. A weight of zero leaves the ring unchanged.
    pub fn with_weighted_node(&self, node: &str, weight: u32) -> HashRing {
        if weight == 0 {
            return self.clone();
        }

        let mut weights = self.weights.clone();
        weights.insert(node.to_string(), weight);
        Self::build(self.hasher, weights)
    }

    /// A new ring with `node` removed.
    pub fn without_node(&self, node: &str) -> HashRing {
        let mut weights = self.weights.clone();
        weights.shift_remove(node);
        Self::build(self.hasher, weights)
    }

    /// Select up to `n` distinct nodes for `key`, deterministically.
    ///
    /// Entries are scanned in ascending hash order starting strictly after
    /// `hasher(key)`, wrapping around from the smallest entry up through the
    /// needle, collecting each distinct node in encounter order. When fewer
    /// than `n` distinct nodes exist, all of them are returned.
    pub fn get_nodes(&self, key: &str, n: usize) -> Vec<String> {
        if self.weights.is_empty() || n == 0 {
            return Vec::new();
        }

        let needle = (self.hasher)(key);
        let after = self
            .entries
            .range::<str, _>((Bound::Excluded(needle.as_str()), Bound::Unbounded));
        let wrapped = self
            .entries
            .range::<str, _>((Bound::Unbounded, Bound::Included(needle.as_str())));

        let mut nodes: Vec<String> = Vec::with_capacity(n.min(self.weights.len()));
        for (_, node) in after.chain(wrapped) {
            if !nodes.iter().any(|seen| seen == node) {
                nodes.push(node.clone());
                if nodes.len() == n {
                    break;
                }
            }
        }
        nodes
    }

    /// The single node `key` maps to, or `None` on an empty ring.
    pub fn get_node(&self, key: &str) -> Option<String> {
        self.get_nodes(key, 1).into_iter().next()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}
