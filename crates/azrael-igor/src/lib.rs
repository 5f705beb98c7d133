// SPDX-License-Identifier: Apache-2.0
//! Constraint Registry for the Azrael simulation control plane.
//!
//! Constraints are kept in a separate store keyed by body-ID pairs rather
//! than embedded in object documents, so object removal never needs to walk
//! constraint references.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

use std::collections::{BTreeMap, BTreeSet};

use azrael_types::{Constraint, ConstraintKey, ObjId};
use parking_lot::RwLock;

/// Set-semantics constraint store with a write-through local cache.
///
/// `store` is the durable record; `cache` is what `get_constraints` and
/// `unique_pairs` actually read. Writers (`add_constraints`,
/// `remove_constraints`) update both atomically, so the cache only lags the
/// store if something else mutates the backing store directly — which, for
/// this in-process implementation, nothing does. `update_local_cache`
/// remains available for callers (e.g. a future networked store) that need
/// to force a resync.
#[derive(Default)]
pub struct ConstraintRegistry {
    store: RwLock<BTreeMap<ConstraintKey, Constraint>>,
    cache: RwLock<BTreeMap<ConstraintKey, Constraint>>,
}

impl ConstraintRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { store: RwLock::new(BTreeMap::new()), cache: RwLock::new(BTreeMap::new()) }
    }

    /// Upsert constraints by identity key. Returns the count of keys that
    /// were newly inserted (not already present).
    pub fn add_constraints(&self, constraints: Vec<Constraint>) -> usize {
        let mut store = self.store.write();
        let mut cache = self.cache.write();
        let mut inserted = 0;
        for constraint in constraints {
            let key = constraint.identity_key();
            if store.insert(key.clone(), constraint.clone()).is_none() {
                inserted += 1;
            }
            cache.insert(key, constraint);
        }
        inserted
    }

    /// Delete constraints by identity key. Returns the count actually
    /// removed.
    pub fn remove_constraints(&self, constraints: &[Constraint]) -> usize {
        let mut store = self.store.write();
        let mut cache = self.cache.write();
        let mut removed = 0;
        for constraint in constraints {
            let key = constraint.identity_key();
            if store.remove(&key).is_some() {
                removed += 1;
            }
            cache.remove(&key);
        }
        removed
    }

    /// Constraints referencing any of `ids`, or every constraint if `ids` is
    /// `None`. Reads from the local cache.
    #[must_use]
    pub fn get_constraints(&self, ids: Option<&[ObjId]>) -> Vec<Constraint> {
        let cache = self.cache.read();
        match ids {
            None => cache.values().cloned().collect(),
            Some(ids) => {
                cache.values().filter(|c| ids.iter().any(|&id| c.references(id))).cloned().collect()
            }
        }
    }

    /// Every unordered body-ID pair linked by at least one constraint.
    #[must_use]
    pub fn unique_pairs(&self) -> BTreeSet<(ObjId, ObjId)> {
        self.cache
            .read()
            .values()
            .map(|c| if c.rb_a <= c.rb_b { (c.rb_a, c.rb_b) } else { (c.rb_b, c.rb_a) })
            .collect()
    }

    /// Reload the local cache from the backing store. Returns the resulting
    /// cache size.
    pub fn update_local_cache(&self) -> usize {
        let store = self.store.read();
        let mut cache = self.cache.write();
        *cache = store.clone();
        cache.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use azrael_types::{Aid, ConstraintKind, P2PConstraint, Vec3};

    fn p2p(a: u64, b: u64, aid: &str) -> Constraint {
        Constraint::new(
            Aid::new(aid).unwrap(),
            ObjId::new(a),
            ObjId::new(b),
            ConstraintKind::P2P(P2PConstraint { pivot_a: Vec3::ZERO, pivot_b: Vec3::ZERO }),
        )
    }

    #[test]
    fn add_constraints_reports_new_insertions_only() {
        let registry = ConstraintRegistry::new();
        assert_eq!(registry.add_constraints(vec![p2p(1, 2, "c0")]), 1);
        assert_eq!(registry.add_constraints(vec![p2p(1, 2, "c0")]), 0);
    }

    #[test]
    fn add_is_order_independent_on_body_pair() {
        let registry = ConstraintRegistry::new();
        registry.add_constraints(vec![p2p(1, 2, "c0")]);
        assert_eq!(registry.add_constraints(vec![p2p(2, 1, "c0")]), 0);
    }

    #[test]
    fn remove_constraints_reports_deletions() {
        let registry = ConstraintRegistry::new();
        registry.add_constraints(vec![p2p(1, 2, "c0")]);
        assert_eq!(registry.remove_constraints(&[p2p(1, 2, "c0")]), 1);
        assert_eq!(registry.remove_constraints(&[p2p(1, 2, "c0")]), 0);
    }

    #[test]
    fn get_constraints_filters_by_referenced_body() {
        let registry = ConstraintRegistry::new();
        registry.add_constraints(vec![p2p(1, 2, "c0"), p2p(3, 4, "c1")]);
        let found = registry.get_constraints(Some(&[ObjId::new(1)]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].aid, Aid::new("c0").unwrap());
    }

    #[test]
    fn get_constraints_none_returns_all() {
        let registry = ConstraintRegistry::new();
        registry.add_constraints(vec![p2p(1, 2, "c0"), p2p(3, 4, "c1")]);
        assert_eq!(registry.get_constraints(None).len(), 2);
    }

    #[test]
    fn unique_pairs_dedupes_and_normalises_order() {
        let registry = ConstraintRegistry::new();
        registry.add_constraints(vec![p2p(1, 2, "c0"), p2p(2, 1, "c1")]);
        let pairs = registry.unique_pairs();
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&(ObjId::new(1), ObjId::new(2))));
    }

    #[test]
    fn update_local_cache_returns_size() {
        let registry = ConstraintRegistry::new();
        registry.add_constraints(vec![p2p(1, 2, "c0")]);
        assert_eq!(registry.update_local_cache(), 1);
    }

    #[test]
    fn removal_does_not_cascade_across_other_constraints() {
        let registry = ConstraintRegistry::new();
        registry.add_constraints(vec![p2p(1, 2, "c0"), p2p(1, 3, "c1")]);
        registry.remove_constraints(&[p2p(1, 2, "c0")]);
        assert_eq!(registry.get_constraints(Some(&[ObjId::new(1)])).len(), 1);
    }
}
