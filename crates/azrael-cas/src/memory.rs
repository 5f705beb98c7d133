// SPDX-License-Identifier: Apache-2.0
//! In-memory Asset Store implementation.
//!
//! [`MemoryAssetStore`] is the Phase 1 [`AssetStore`](crate::AssetStore)
//! implementation — sufficient for a standalone Gateway and for tests. Disk
//! and cold tiers are deferred; the core only ever sees the trait.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use azrael_types::{Aid, ObjId};
use parking_lot::Mutex;

use crate::{AssetStore, CasError, FragmentFileOp, FragmentFiles, UrlFrag};

/// A 32-byte BLAKE3 content hash, used only to deduplicate stored bytes.
/// Never exposed outside this module.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct BlobHash([u8; 32]);

fn blob_hash(bytes: &[u8]) -> BlobHash {
    BlobHash(*blake3::hash(bytes).as_bytes())
}

fn template_prefix(template_aid: &Aid) -> String {
    format!("templates/{template_aid}")
}

fn instance_prefix(obj_id: ObjId) -> String {
    format!("instances/{obj_id}")
}

struct Inner {
    blobs: HashMap<BlobHash, Arc<[u8]>>,
    /// Full opaque path -> content hash. Path shape is
    /// `{template|instance prefix}/{fragment aid}/{filename}`; the core
    /// never parses it, so the shape is free to change.
    files: BTreeMap<String, BlobHash>,
    template_bundles: HashSet<Aid>,
    instance_bundles: HashSet<ObjId>,
}

/// In-memory [`AssetStore`](crate::AssetStore).
///
/// Interior mutability via [`parking_lot::Mutex`] (the pack's idiom for
/// shared mutable state) lets the store be held behind a plain `&self` /
/// `Arc`, matching how the Gateway shares its other store handles.
pub struct MemoryAssetStore {
    inner: Mutex<Inner>,
}

impl MemoryAssetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                blobs: HashMap::new(),
                files: BTreeMap::new(),
                template_bundles: HashSet::new(),
                instance_bundles: HashSet::new(),
            }),
        }
    }

    /// Total number of distinct byte blobs retained (after dedup).
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.inner.lock().blobs.len()
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for MemoryAssetStore {
    fn put(
        &self,
        template_aid: &Aid,
        fragments: &BTreeMap<Aid, FragmentFiles>,
    ) -> Result<UrlFrag, CasError> {
        let prefix = template_prefix(template_aid);
        let mut inner = self.inner.lock();
        for (fragname, files) in fragments {
            for (filename, bytes) in files {
                let hash = blob_hash(bytes);
                inner.blobs.entry(hash).or_insert_with(|| Arc::from(bytes.as_slice()));
                inner.files.insert(format!("{prefix}/{fragname}/{filename}"), hash);
            }
        }
        inner.template_bundles.insert(template_aid.clone());
        Ok(prefix)
    }

    fn spawn_instance(&self, obj_id: ObjId, template_aid: &Aid) -> Result<UrlFrag, CasError> {
        let mut inner = self.inner.lock();
        if !inner.template_bundles.contains(template_aid) {
            return Err(CasError::UnknownTemplate(template_aid.clone()));
        }
        let src_prefix = template_prefix(template_aid);
        let dst_prefix = instance_prefix(obj_id);
        let copies: Vec<(String, BlobHash)> = inner
            .files
            .iter()
            .filter_map(|(path, hash)| {
                path.strip_prefix(&src_prefix).map(|rest| (format!("{dst_prefix}{rest}"), *hash))
            })
            .collect();
        for (path, hash) in copies {
            inner.files.insert(path, hash);
        }
        inner.instance_bundles.insert(obj_id);
        Ok(dst_prefix)
    }

    fn update_fragments(
        &self,
        obj_id: ObjId,
        fragments: &BTreeMap<Aid, FragmentFileOp>,
    ) -> Result<(), CasError> {
        let mut inner = self.inner.lock();
        if !inner.instance_bundles.contains(&obj_id) {
            return Err(CasError::UnknownInstance(obj_id));
        }
        let prefix = instance_prefix(obj_id);
        for (fragname, op) in fragments {
            for (filename, bytes) in &op.put {
                let hash = blob_hash(bytes);
                inner.blobs.entry(hash).or_insert_with(|| Arc::from(bytes.as_slice()));
                inner.files.insert(format!("{prefix}/{fragname}/{filename}"), hash);
            }
            for filename in &op.del {
                inner.files.remove(&format!("{prefix}/{fragname}/{filename}"));
            }
        }
        Ok(())
    }

    fn delete_instance(&self, obj_id: ObjId) {
        let mut inner = self.inner.lock();
        let prefix = instance_prefix(obj_id);
        inner.files.retain(|path, _| !path.starts_with(&prefix));
        inner.instance_bundles.remove(&obj_id);
    }

    fn get(&self, urls: &[String]) -> BTreeMap<String, Option<Arc<[u8]>>> {
        let inner = self.inner.lock();
        urls.iter()
            .map(|url| {
                let bytes = inner.files.get(url).and_then(|hash| inner.blobs.get(hash)).cloned();
                (url.clone(), bytes)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = MemoryAssetStore::new();
        let tmpl = Aid::new("tmpl").unwrap();
        let frag = Aid::new("frag").unwrap();
        let mut fragments = BTreeMap::new();
        fragments.insert(frag, BTreeMap::from([("mesh.dae".to_string(), b"hello".to_vec())]));
        let url = store.put(&tmpl, &fragments).unwrap();
        assert_eq!(url, "templates/tmpl");
        let got = store.get(&[format!("{url}/frag/mesh.dae")]);
        assert_eq!(got.values().next().unwrap().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn spawn_instance_requires_known_template() {
        let store = MemoryAssetStore::new();
        let tmpl = Aid::new("ghost").unwrap();
        assert!(store.spawn_instance(ObjId::new(1), &tmpl).is_err());
    }

    #[test]
    fn spawn_instance_copies_template_files() {
        let store = MemoryAssetStore::new();
        let tmpl = Aid::new("tmpl").unwrap();
        let frag = Aid::new("frag").unwrap();
        let mut fragments = BTreeMap::new();
        fragments.insert(frag, BTreeMap::from([("a.raw".to_string(), b"data".to_vec())]));
        store.put(&tmpl, &fragments).unwrap();
        let url = store.spawn_instance(ObjId::new(1), &tmpl).unwrap();
        assert_eq!(url, "instances/1");
        let got = store.get(&[format!("{url}/frag/a.raw")]);
        assert_eq!(got.values().next().unwrap().as_deref(), Some(&b"data"[..]));
    }

    #[test]
    fn update_fragments_requires_known_instance() {
        let store = MemoryAssetStore::new();
        let frag = Aid::new("frag").unwrap();
        let mut subset = BTreeMap::new();
        subset.insert(frag, FragmentFileOp::default());
        assert!(store.update_fragments(ObjId::new(99), &subset).is_err());
    }

    #[test]
    fn update_fragments_applies_put_and_del() {
        let store = MemoryAssetStore::new();
        let tmpl = Aid::new("tmpl").unwrap();
        store.put(&tmpl, &BTreeMap::new()).unwrap();
        store.spawn_instance(ObjId::new(1), &tmpl).unwrap();
        let frag = Aid::new("frag").unwrap();

        let mut op = FragmentFileOp::default();
        op.put.insert("a.raw".to_string(), b"v1".to_vec());
        let mut subset = BTreeMap::new();
        subset.insert(frag.clone(), op);
        store.update_fragments(ObjId::new(1), &subset).unwrap();
        let got = store.get(&["instances/1/frag/a.raw".to_string()]);
        assert!(got.values().next().unwrap().is_some());

        let mut op2 = FragmentFileOp::default();
        op2.del.push("a.raw".to_string());
        let mut subset2 = BTreeMap::new();
        subset2.insert(frag, op2);
        store.update_fragments(ObjId::new(1), &subset2).unwrap();
        let got2 = store.get(&["instances/1/frag/a.raw".to_string()]);
        assert!(got2.values().next().unwrap().is_none());
    }

    #[test]
    fn delete_instance_is_idempotent() {
        let store = MemoryAssetStore::new();
        store.delete_instance(ObjId::new(404));
        let tmpl = Aid::new("tmpl").unwrap();
        store.put(&tmpl, &BTreeMap::new()).unwrap();
        store.spawn_instance(ObjId::new(1), &tmpl).unwrap();
        store.delete_instance(ObjId::new(1));
        store.delete_instance(ObjId::new(1));
    }
}
