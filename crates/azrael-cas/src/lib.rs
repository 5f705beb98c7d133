// SPDX-License-Identifier: Apache-2.0
//! Asset Store adapter for the Azrael simulation control plane.
//!
//! `azrael-cas` provides the [`AssetStore`] trait the core consumes to put,
//! copy, patch, and delete the fragment file bundles attached to templates
//! and object instances. Phase 1 ships [`MemoryAssetStore`] — a single-process
//! in-memory implementation sufficient for tests and a standalone Gateway.
//!
//! # Hash Domain Policy
//!
//! Internally, file bytes are deduplicated by `BLAKE3(bytes)` — identical
//! bytes under two different filenames share storage. This is purely an
//! implementation detail: the store's public contract never exposes a hash,
//! only opaque `url_frag` strings the core must treat as unstructured
//! identity.
//!
//! # Determinism Invariant
//!
//! No public API exposes store iteration order; [`get`](AssetStore::get)
//! returns a map keyed by the caller's own request list.
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

mod memory;
pub use memory::MemoryAssetStore;

use std::collections::BTreeMap;

use azrael_types::{Aid, ObjId};

/// Opaque retrieval handle for a scoped asset bundle (a template's or an
/// instance's fragment files). The core never inspects its structure.
pub type UrlFrag = String;

/// A bundle of file contents to write for one fragment, keyed by filename.
pub type FragmentFiles = BTreeMap<String, Vec<u8>>;

/// A per-fragment file-level edit, as driven by the Object Store's
/// `setFragments`: add/overwrite files via `put`, remove files via `del`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentFileOp {
    /// Files to write, overwriting any existing file of the same name.
    pub put: BTreeMap<String, Vec<u8>>,
    /// Filenames to remove.
    pub del: Vec<String>,
}

/// Errors surfaced by [`AssetStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CasError {
    /// `spawnInstance` was called for a template that has never been `put`.
    #[error("no assets on record for template {0}")]
    UnknownTemplate(Aid),
    /// `updateFragments` was called for an instance that was never spawned.
    #[error("no assets on record for instance {0}")]
    UnknownInstance(ObjId),
}

/// Contract the core consumes from the external Asset Store.
///
/// Implementations store fragment file bytes under a path scoped by either a
/// template AID or an object instance ID and hand back an opaque
/// [`UrlFrag`] for later retrieval. The core never parses a `UrlFrag`; it is
/// round-tripped verbatim into the Object Store and back out to clients.
pub trait AssetStore {
    /// Store each fragment's files under a path scoped by `template_aid`.
    ///
    /// # Errors
    ///
    /// Implementations may surface storage-layer failures; the in-memory
    /// reference implementation never fails.
    fn put(
        &self,
        template_aid: &Aid,
        fragments: &BTreeMap<Aid, FragmentFiles>,
    ) -> Result<UrlFrag, CasError>;

    /// Copy `template_aid`'s stored assets to a path scoped by `obj_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::UnknownTemplate`] if `template_aid` was never
    /// `put`.
    fn spawn_instance(&self, obj_id: ObjId, template_aid: &Aid) -> Result<UrlFrag, CasError>;

    /// Apply a per-fragment set of file puts/deletes to an instance's asset
    /// bundle.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::UnknownInstance`] if `obj_id` was never spawned.
    fn update_fragments(
        &self,
        obj_id: ObjId,
        fragments: &BTreeMap<Aid, FragmentFileOp>,
    ) -> Result<(), CasError>;

    /// Delete an instance's entire asset bundle. Idempotent: deleting an
    /// instance with no recorded assets is not an error — `removeObjects`
    /// silently accepts non-existent IDs.
    fn delete_instance(&self, obj_id: ObjId);

    /// Resolve a batch of opaque retrieval keys to their bytes. Absence is
    /// represented as `None`, never as an error.
    fn get(&self, urls: &[String]) -> BTreeMap<String, Option<std::sync::Arc<[u8]>>>;
}
