//! Raw identifier to dense index mapping
//!
//! Users and items arrive with arbitrary keys (integers, strings, UUIDs). Parameter
//! arrays are addressed by a dense zero-based index assigned in ascending key order,
//! so the mapping does not depend on the order the keys were seen in.

use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

/// Key types usable as raw user or item identifiers
pub trait RawId: Hash + Ord + Clone {}

impl<T: Hash + Ord + Clone> RawId for T {}

/// Bidirectional mapping between raw identifiers and dense indices in `[0, len)`
///
/// Unknown identifiers map to `None`, which is the only sentinel the model accepts.
#[derive(Debug, Clone)]
pub struct IdentifierIndex<K> {
    forward: HashMap<K, usize>,
    reverse: Vec<K>,
}

impl<K> Default for IdentifierIndex<K> {
    fn default() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: Vec::new(),
        }
    }
}

impl<K: RawId> IdentifierIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the mapping from scratch, replacing any previous one
    ///
    /// Indices follow the ascending order of the distinct ids; repeats are ignored.
    pub fn fit(&mut self, ids: &[K]) -> &mut Self {
        let distinct: BTreeSet<&K> = ids.iter().collect();

        self.reverse = distinct.into_iter().cloned().collect();
        self.forward = self
            .reverse
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index))
            .collect();

        self
    }

    /// Map each id to its index, `None` for ids never fitted
    pub fn transform(&self, ids: &[K]) -> Vec<Option<usize>> {
        ids.iter().map(|id| self.get(id)).collect()
    }

    /// Fit on `ids`, then return the index of every entry of `ids`
    pub fn fit_transform(&mut self, ids: &[K]) -> Vec<usize> {
        self.fit(ids);
        ids.iter().map(|id| self.forward[id]).collect()
    }

    /// Map indices back to ids, `None` for indices never assigned
    pub fn inverse_transform(&self, indices: &[usize]) -> Vec<Option<K>> {
        indices
            .iter()
            .map(|&index| self.reverse.get(index).cloned())
            .collect()
    }

    /// Extend the mapping with ids not yet present
    ///
    /// Existing indices are left untouched. New ids receive `len(), len() + 1, ...` in
    /// ascending order among themselves.
    pub fn fit_update(&mut self, ids: &[K]) -> &mut Self {
        let fresh: BTreeSet<&K> = ids
            .iter()
            .filter(|id| !self.forward.contains_key(*id))
            .collect();

        for id in fresh {
            self.forward.insert(id.clone(), self.reverse.len());
            self.reverse.push(id.clone());
        }

        self
    }

    pub fn get<Q>(&self, id: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.forward.get(id).copied()
    }

    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.forward.contains_key(id)
    }

    /// Raw id stored at `index`
    pub fn id(&self, index: usize) -> Option<&K> {
        self.reverse.get(index)
    }

    /// All known ids, position `k` holding the id with index `k`
    pub fn ids(&self) -> &[K] {
        &self.reverse
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
