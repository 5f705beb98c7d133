// SPDX-License-Identifier: Apache-2.0
//! Template Registry, Object Store, and ID Allocator for the Azrael
//! simulation control plane.
//!
//! [`InMemoryStore`] is the single in-process implementation backing all
//! three components (C3/C4/C7): a store interface is threaded through the
//! Gateway and the Physics Worker rather than reached for as a process-wide
//! global, so both stay hermetic to test.
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

mod error;
pub use error::StoreError;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use azrael_cas::{AssetStore, FragmentFileOp, FragmentFiles};
use azrael_queue::CommandQueue;
use azrael_types::{
    compute_aabbs, Aabb, Aid, BoosterCommand, FactoryCommand, FragType, FragmentMeta, FragmentOp,
    ObjId, ObjectDocument, Quat, RigidBody, RigidBodyPatch, Template, Vec3, MAX_CUSTOM_DATA_BYTES,
};
use parking_lot::RwLock;

/// Monotone unique object-ID generator (C7).
pub trait IdAllocator {
    /// Allocate `n` strictly increasing, never-reused identifiers.
    fn allocate(&self, n: u64) -> Vec<ObjId>;
}

/// Process-lifetime atomic counter implementation of [`IdAllocator`].
pub struct AtomicIdAllocator {
    next: AtomicU64,
}

impl AtomicIdAllocator {
    /// Create an allocator that hands out IDs starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }
}

impl Default for AtomicIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for AtomicIdAllocator {
    fn allocate(&self, n: u64) -> Vec<ObjId> {
        let first = self.next.fetch_add(n, Ordering::Relaxed);
        (0..n).map(|i| ObjId::new(first + i)).collect()
    }
}

/// A stored template plus its Asset Store retrieval handle.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateEntry {
    /// The template, with fragment file bytes stripped.
    pub template: Template,
    /// Opaque retrieval handle returned by the Asset Store's `put`.
    pub url_frag: String,
}

/// One template submitted to `addTemplates`, paired with the fragment file
/// bytes the Asset Store needs (stripped from `template` itself before
/// persistence).
#[derive(Debug, Clone)]
pub struct TemplateInput {
    /// The template to register.
    pub template: Template,
    /// Fragment file bytes to forward to the Asset Store, keyed by fragment
    /// AID.
    pub files: BTreeMap<Aid, FragmentFiles>,
}

/// One element of a `spawn` request.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// The template to instantiate.
    pub template_id: Aid,
    /// Fields to overlay onto the template's default rigid body.
    pub rbs_patch: Option<RigidBodyPatch>,
}

/// Pose projection of one fragment, as returned by `getObjectStates`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FragmentState {
    /// Visual scale.
    pub scale: f64,
    /// Position relative to the owning body.
    pub position: Vec3,
    /// Rotation relative to the owning body.
    pub rotation: Quat,
}

/// Rendering-relevant rigid-body projection, as returned by
/// `getObjectStates`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RigidBodyState {
    /// Visual scale.
    pub scale: f64,
    /// World-space position.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Linear velocity.
    pub velocity_lin: Vec3,
    /// Angular velocity.
    pub velocity_rot: Vec3,
    /// Monotone geometry version.
    pub version: u64,
}

/// Bandwidth-efficient rendering projection of one object, as returned by
/// `getObjectStates`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ObjectState {
    /// Per-fragment pose, keyed by fragment AID.
    pub frag: BTreeMap<Aid, FragmentState>,
    /// The object's rigid-body projection.
    pub rbs: RigidBodyState,
}

/// Retrieval metadata for one fragment, as returned by `getFragments`. Never
/// carries geometry bytes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FragmentView {
    /// Visual scale.
    pub scale: f64,
    /// Position relative to the owning body.
    pub position: Vec3,
    /// Rotation relative to the owning body.
    pub rotation: Quat,
    /// Geometry tag.
    pub fragtype: FragType,
    /// Opaque retrieval handle for this fragment's files.
    pub url_frag: String,
}

/// In-memory implementation of the Template Registry, Object Store, and ID
/// Allocator, wired to an Asset Store and a Command Queue.
pub struct InMemoryStore {
    templates: RwLock<BTreeMap<Aid, TemplateEntry>>,
    objects: RwLock<BTreeMap<ObjId, ObjectDocument>>,
    ids: AtomicIdAllocator,
    assets: Arc<dyn AssetStore + Send + Sync>,
    queue: Arc<CommandQueue>,
}

impl InMemoryStore {
    /// Create an empty store wired to the given Asset Store and Command
    /// Queue.
    #[must_use]
    pub fn new(assets: Arc<dyn AssetStore + Send + Sync>, queue: Arc<CommandQueue>) -> Self {
        Self {
            templates: RwLock::new(BTreeMap::new()),
            objects: RwLock::new(BTreeMap::new()),
            ids: AtomicIdAllocator::new(),
            assets,
            queue,
        }
    }

    // ---- Template Registry (C3) -----------------------------------------

    /// Register templates, creating their Asset Store bundles first.
    ///
    /// Returns `aid -> bool` reporting whether each template was newly
    /// inserted; pre-existing templates are reported as `false` and left
    /// untouched. An empty input succeeds with an empty result.
    ///
    /// # Errors
    ///
    /// Fails the whole call (inserting nothing) only if the Asset Store
    /// itself errors; per-template validation already happened when each
    /// [`Template`] was built, so this never rejects on content.
    pub fn add_templates(
        &self,
        inputs: Vec<TemplateInput>,
    ) -> Result<BTreeMap<Aid, bool>, StoreError> {
        if inputs.is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut entries = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let url_frag = self
                .assets
                .put(&input.template.aid, &input.files)
                .map_err(|err| StoreError::AssetStore(err.to_string()))?;
            entries.push((input.template.clone(), url_frag));
        }

        let mut templates = self.templates.write();
        let mut report = BTreeMap::new();
        for (template, url_frag) in entries {
            let aid = template.aid.clone();
            let newly_inserted = !templates.contains_key(&aid);
            if newly_inserted {
                templates.insert(aid.clone(), TemplateEntry { template, url_frag });
            }
            report.insert(aid, newly_inserted);
        }
        Ok(report)
    }

    /// Look up templates by AID. Fails the whole call if any requested AID
    /// is missing. Duplicate AIDs in the request are de-duplicated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTemplate`] naming the first missing AID.
    pub fn get_templates(&self, aids: &[Aid]) -> Result<BTreeMap<Aid, TemplateEntry>, StoreError> {
        let templates = self.templates.read();
        let mut out = BTreeMap::new();
        for aid in aids {
            let entry =
                templates.get(aid).cloned().ok_or_else(|| StoreError::UnknownTemplate(aid.clone()))?;
            out.insert(aid.clone(), entry);
        }
        Ok(out)
    }

    // ---- Object Store (C4) ----------------------------------------------

    /// Spawn one object per request. Fails the whole call if any referenced
    /// template is unknown; an Asset Store failure for one object skips
    /// only that object (logged by the caller, not here) and continues.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTemplate`] if any `template_id` is not
    /// registered.
    pub fn spawn(&self, requests: Vec<SpawnRequest>) -> Result<Vec<ObjId>, StoreError> {
        {
            let templates = self.templates.read();
            for req in &requests {
                if !templates.contains_key(&req.template_id) {
                    return Err(StoreError::UnknownTemplate(req.template_id.clone()));
                }
            }
        }

        let ids = self.ids.allocate(requests.len() as u64);
        let mut spawned = Vec::with_capacity(requests.len());
        let mut objects = self.objects.write();
        let templates = self.templates.read();

        for (obj_id, req) in ids.into_iter().zip(requests) {
            let Some(entry) = templates.get(&req.template_id) else { continue };
            let mut template = entry.template.clone();
            if let Some(patch) = &req.rbs_patch {
                let Ok(patched) = patch.apply(&template.rbs) else { continue };
                template.rbs = patched;
            }
            template.rbs.version = 0;

            let Ok(url_frag) = self.assets.spawn_instance(obj_id, &req.template_id) else {
                continue;
            };

            let aabbs: Vec<Aabb> = compute_aabbs(&template.rbs.cshapes).unwrap_or_default();
            self.queue.push(azrael_types::QueuedCommand::Spawn {
                obj_id,
                rbs: template.rbs.clone(),
                aabbs,
            });

            objects.insert(
                obj_id,
                ObjectDocument {
                    obj_id,
                    template_id: req.template_id,
                    version: 0,
                    template,
                    custom: String::new(),
                    url_frag,
                },
            );
            spawned.push(obj_id);
        }
        Ok(spawned)
    }

    /// Remove objects immediately from the store and Asset Store, and queue
    /// their removal for the Physics Worker's world. Non-existent IDs are
    /// silently accepted.
    pub fn remove_objects(&self, ids: &[ObjId]) {
        let mut objects = self.objects.write();
        for &obj_id in ids {
            self.queue.push(azrael_types::QueuedCommand::Remove { obj_id });
            self.assets.delete_instance(obj_id);
            objects.remove(&obj_id);
        }
    }

    /// Rigid-body state for `ids`, or every object if `ids` is `None`.
    /// Missing IDs map to `None`.
    #[must_use]
    pub fn get_rigid_bodies(&self, ids: Option<&[ObjId]>) -> BTreeMap<ObjId, Option<RigidBody>> {
        let objects = self.objects.read();
        match ids {
            None => objects.values().map(|doc| (doc.obj_id, Some(doc.rigid_body()))).collect(),
            Some(ids) => ids
                .iter()
                .map(|&id| (id, objects.get(&id).map(ObjectDocument::rigid_body)))
                .collect(),
        }
    }

    /// Overwrite an object's position/rotation/velocities after a physics
    /// step. Update-only: does nothing and returns `false` if `obj_id` does
    /// not already exist. Physics results are never allowed to create an
    /// object that was removed mid-step.
    pub fn writeback_rigid_body(
        &self,
        obj_id: ObjId,
        position: Vec3,
        rotation: Quat,
        velocity_lin: Vec3,
        velocity_rot: Vec3,
    ) -> bool {
        let mut objects = self.objects.write();
        let Some(doc) = objects.get_mut(&obj_id) else { return false };
        doc.template.rbs.position = position;
        doc.template.rbs.rotation = rotation;
        doc.template.rbs.velocity_lin = velocity_lin;
        doc.template.rbs.velocity_rot = velocity_rot;
        true
    }

    /// Apply a partial rigid-body update per object, and queue a matching
    /// `modify` command for the Physics Worker. Returns the IDs that did not
    /// exist (and were therefore skipped).
    pub fn set_rigid_bodies(&self, patches: BTreeMap<ObjId, RigidBodyPatch>) -> Vec<ObjId> {
        let mut objects = self.objects.write();
        let mut missing = Vec::new();
        for (obj_id, patch) in patches {
            let Some(doc) = objects.get_mut(&obj_id) else {
                missing.push(obj_id);
                continue;
            };
            let Ok(patched) = patch.apply(&doc.template.rbs) else {
                missing.push(obj_id);
                continue;
            };
            doc.template.rbs = patched;
            let aabbs = if patch.cshapes.is_some() {
                Some(compute_aabbs(&doc.template.rbs.cshapes).unwrap_or_default())
            } else {
                None
            };
            self.queue.push(azrael_types::QueuedCommand::Modify {
                obj_id,
                partial_rbs: patch,
                aabbs,
            });
        }
        missing
    }

    /// Rendering-efficient per-object projection (rigid body plus fragment
    /// poses), for `ids`, or every object if `ids` is `None`.
    #[must_use]
    pub fn get_object_states(&self, ids: Option<&[ObjId]>) -> BTreeMap<ObjId, Option<ObjectState>> {
        let objects = self.objects.read();
        let project = |doc: &ObjectDocument| -> ObjectState {
            let rbs = doc.rigid_body();
            ObjectState {
                frag: doc
                    .template
                    .fragments
                    .iter()
                    .map(|(aid, meta)| {
                        (
                            aid.clone(),
                            FragmentState { scale: meta.scale, position: meta.position, rotation: meta.rotation },
                        )
                    })
                    .collect(),
                rbs: RigidBodyState {
                    scale: rbs.scale,
                    position: rbs.position,
                    rotation: rbs.rotation,
                    velocity_lin: rbs.velocity_lin,
                    velocity_rot: rbs.velocity_rot,
                    version: rbs.version,
                },
            }
        };
        match ids {
            None => objects.values().map(|doc| (doc.obj_id, Some(project(doc)))).collect(),
            Some(ids) => ids.iter().map(|&id| (id, objects.get(&id).map(project))).collect(),
        }
    }

    /// Retrieval metadata for every fragment of each object in `ids`. An
    /// object absent from the store maps to `None`.
    #[must_use]
    pub fn get_fragments(&self, ids: &[ObjId]) -> BTreeMap<ObjId, Option<BTreeMap<Aid, FragmentView>>> {
        let objects = self.objects.read();
        ids.iter()
            .map(|&id| {
                let views = objects.get(&id).map(|doc| {
                    doc.template
                        .fragments
                        .iter()
                        .map(|(aid, meta)| {
                            let view = FragmentView {
                                scale: meta.scale,
                                position: meta.position,
                                rotation: meta.rotation,
                                fragtype: meta.fragtype,
                                url_frag: format!("{}/{aid}", doc.url_frag),
                            };
                            (aid.clone(), view)
                        })
                        .collect()
                });
                (id, views)
            })
            .collect()
    }

    /// Apply a batch of per-fragment edits. Returns the
    /// number of objects for which at least one fragment edit succeeded;
    /// objects where every edit was invalid contribute nothing and are left
    /// untouched.
    pub fn set_fragments(&self, cmd: BTreeMap<ObjId, BTreeMap<Aid, FragmentOp>>) -> usize {
        let mut objects = self.objects.write();
        let mut updated = 0;
        for (obj_id, frag_ops) in cmd {
            let Some(doc) = objects.get_mut(&obj_id) else { continue };
            let mut any_applied = false;
            let mut any_geometry_changed = false;
            let mut asset_ops: BTreeMap<Aid, FragmentFileOp> = BTreeMap::new();

            for (fragname, op) in &frag_ops {
                let Ok((changed, file_op)) = apply_fragment_op(&mut doc.template, fragname, op) else {
                    continue;
                };
                any_applied = true;
                any_geometry_changed |= changed;
                asset_ops.insert(fragname.clone(), file_op);
            }

            if any_applied {
                updated += 1;
                if !asset_ops.is_empty() {
                    let _ = self.assets.update_fragments(obj_id, &asset_ops);
                }
                if any_geometry_changed {
                    doc.version += 1;
                }
            }
        }
        updated
    }

    /// The template an object was spawned from, or `None` if unknown.
    #[must_use]
    pub fn get_template_id(&self, id: ObjId) -> Option<Aid> {
        self.objects.read().get(&id).map(|doc| doc.template_id.clone())
    }

    /// Every currently live object ID.
    #[must_use]
    pub fn get_all_object_ids(&self) -> Vec<ObjId> {
        self.objects.read().keys().copied().collect()
    }

    /// Set each object's opaque custom payload. Returns the IDs that could
    /// not be updated: unknown objects, or payloads longer than
    /// [`MAX_CUSTOM_DATA_BYTES`].
    pub fn set_custom_data(&self, data: BTreeMap<ObjId, String>) -> Vec<ObjId> {
        let mut objects = self.objects.write();
        let mut invalid = Vec::new();
        for (obj_id, custom) in data {
            if custom.len() > MAX_CUSTOM_DATA_BYTES {
                invalid.push(obj_id);
                continue;
            }
            match objects.get_mut(&obj_id) {
                Some(doc) => doc.custom = custom,
                None => invalid.push(obj_id),
            }
        }
        invalid
    }

    /// Each object's custom payload, or every object's if `ids` is `None`.
    /// Missing IDs map to `None`.
    #[must_use]
    pub fn get_custom_data(&self, ids: Option<&[ObjId]>) -> BTreeMap<ObjId, Option<String>> {
        let objects = self.objects.read();
        match ids {
            None => objects.values().map(|doc| (doc.obj_id, Some(doc.custom.clone()))).collect(),
            Some(ids) => {
                ids.iter().map(|&id| (id, objects.get(&id).map(|doc| doc.custom.clone()))).collect()
            }
        }
    }

    /// Apply a world-frame force at offset `rpos` from `obj_id`'s centre of
    /// mass. Computes `torque = rpos × force` and enqueues a
    /// `direct_force` command.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownObject`] if `obj_id` is not on record.
    pub fn set_force(&self, obj_id: ObjId, force: Vec3, rpos: Vec3) -> Result<(), StoreError> {
        if !self.objects.read().contains_key(&obj_id) {
            return Err(StoreError::UnknownObject(obj_id));
        }
        let torque = rpos.cross(force);
        self.queue.push(azrael_types::QueuedCommand::DirectForce { obj_id, force, torque });
        Ok(())
    }

    /// Fire and/or retune `obj_id`'s boosters and factories.
    ///
    /// Validates every referenced part name exists on the object's template
    /// before mutating anything. Boosters update their stored `force`
    /// scalar and tally into a single local-frame `booster_force` command;
    /// factories are reported back as [`FactorySpawn`]s in world
    /// coordinates, for the caller to forward to [`Self::spawn`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownObject`] if `obj_id` is not on record,
    /// or [`StoreError::Validation`] if any part name is unknown.
    pub fn control_parts(
        &self,
        obj_id: ObjId,
        cmd_boosters: &BTreeMap<Aid, BoosterCommand>,
        cmd_factories: &BTreeMap<Aid, FactoryCommand>,
    ) -> Result<Vec<FactorySpawn>, StoreError> {
        let mut objects = self.objects.write();
        let doc = objects.get_mut(&obj_id).ok_or(StoreError::UnknownObject(obj_id))?;

        for aid in cmd_boosters.keys() {
            doc.template.require_booster(aid)?;
        }
        for aid in cmd_factories.keys() {
            doc.template.require_factory(aid)?;
        }

        let mut force_vec = Vec3::default();
        let mut torque_vec = Vec3::default();
        for (aid, cmd) in cmd_boosters {
            let Some(booster) = doc.template.boosters.get_mut(aid) else { continue };
            booster.force = cmd.force;
            force_vec = force_vec + booster.direction.scale(booster.force);
            torque_vec = torque_vec + booster.pos.cross(booster.direction.scale(booster.force));
        }
        if !cmd_boosters.is_empty() {
            self.queue.push(azrael_types::QueuedCommand::BoosterForce {
                obj_id,
                force: force_vec,
                torque: torque_vec,
            });
        }

        let parent_rbs = doc.rigid_body();
        let mut spawns = Vec::with_capacity(cmd_factories.len());
        for (aid, cmd) in cmd_factories {
            let Some(factory) = doc.template.factories.get(aid) else { continue };
            let position = parent_rbs.position + parent_rbs.rotation.rotate(factory.pos);
            let velocity_lin = parent_rbs.velocity_lin
                + parent_rbs.rotation.rotate(factory.direction).scale(cmd.exit_speed);
            spawns.push(FactorySpawn {
                template_id: factory.template_id.clone(),
                position,
                velocity_lin,
                rotation: parent_rbs.rotation,
            });
        }
        Ok(spawns)
    }
}

/// One factory's ejected spawn parameters in world coordinates, as computed
/// by [`InMemoryStore::control_parts`] step 4.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FactorySpawn {
    /// Template the factory ejects.
    pub template_id: Aid,
    /// World-frame spawn position.
    pub position: Vec3,
    /// World-frame spawn linear velocity.
    pub velocity_lin: Vec3,
    /// World-frame spawn rotation (copies the parent's).
    pub rotation: Quat,
}

/// Apply one fragment op to `template`, returning whether the fragment's
/// geometry changed (and so the object's version must bump) plus the
/// corresponding Asset Store file edit. Returns `Err(())` for an invalid
/// sub-op (a `mod`/`del` of a fragment that does not exist, or a `put`
/// missing its file set) so the caller can skip it.
fn apply_fragment_op(
    template: &mut Template,
    fragname: &Aid,
    op: &FragmentOp,
) -> Result<(bool, FragmentFileOp), ()> {
    match op {
        FragmentOp::Del => {
            let meta = template.fragments.remove(fragname).ok_or(())?;
            Ok((true, FragmentFileOp { put: BTreeMap::new(), del: meta.filenames.into_iter().collect() }))
        }
        FragmentOp::Put { fragtype, scale, position, rotation, files } => {
            if !op.can_create() {
                return Err(());
            }
            let meta = FragmentMeta {
                fragtype: *fragtype,
                scale: *scale,
                position: *position,
                rotation: *rotation,
                filenames: files.keys().cloned().collect(),
            };
            template.fragments.insert(fragname.clone(), meta);
            Ok((true, FragmentFileOp { put: files.clone(), del: Vec::new() }))
        }
        FragmentOp::Mod { fragtype, scale, position, rotation, put, del } => {
            let existing = template.fragments.get_mut(fragname).ok_or(())?;
            let mut changed = false;
            if let Some(ft) = fragtype {
                changed |= *ft != existing.fragtype;
                existing.fragtype = *ft;
            }
            if let Some(s) = scale {
                existing.scale = *s;
            }
            if let Some(p) = position {
                existing.position = *p;
            }
            if let Some(r) = rotation {
                existing.rotation = *r;
            }
            if !put.is_empty() {
                changed = true;
                for filename in put.keys() {
                    existing.filenames.insert(filename.clone());
                }
            }
            for filename in del {
                changed |= existing.filenames.remove(filename);
            }
            Ok((changed, FragmentFileOp { put: put.clone(), del: del.clone() }))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use azrael_cas::MemoryAssetStore;
    use azrael_types::{CollisionShape, RigidBody};

    fn store() -> InMemoryStore {
        InMemoryStore::new(Arc::new(MemoryAssetStore::new()), Arc::new(CommandQueue::new()))
    }

    fn template_input(aid: &str) -> TemplateInput {
        let rbs = RigidBody::builder().build().unwrap();
        let template = Template::builder(Aid::new(aid).unwrap(), rbs).build().unwrap();
        TemplateInput { template, files: BTreeMap::new() }
    }

    #[test]
    fn add_templates_empty_list_succeeds() {
        let store = store();
        assert_eq!(store.add_templates(Vec::new()).unwrap(), BTreeMap::new());
    }

    #[test]
    fn add_templates_reports_new_then_existing() {
        let store = store();
        let first = store.add_templates(vec![template_input("t1")]).unwrap();
        assert_eq!(first[&Aid::new("t1").unwrap()], true);
        let second = store.add_templates(vec![template_input("t1")]).unwrap();
        assert_eq!(second[&Aid::new("t1").unwrap()], false);
    }

    #[test]
    fn get_templates_fails_whole_call_on_missing_aid() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let result = store.get_templates(&[Aid::new("t1").unwrap(), Aid::new("ghost").unwrap()]);
        assert!(result.is_err());
    }

    #[test]
    fn spawn_allocates_monotone_ids_and_copies_rbs() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store
            .spawn(vec![
                SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None },
                SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None },
            ])
            .unwrap();
        assert_eq!(ids, vec![ObjId::new(1), ObjId::new(2)]);
        assert_eq!(store.get_all_object_ids().len(), 2);
    }

    #[test]
    fn spawn_overlays_patch_on_template_rbs() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let patch = RigidBodyPatch { imass: Some(5.0), ..Default::default() };
        let ids = store
            .spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: Some(patch) }])
            .unwrap();
        let bodies = store.get_rigid_bodies(Some(&ids));
        assert_eq!(bodies[&ids[0]].as_ref().unwrap().imass, 5.0);
    }

    #[test]
    fn spawn_fails_whole_call_on_unknown_template() {
        let store = store();
        let result = store.spawn(vec![SpawnRequest { template_id: Aid::new("ghost").unwrap(), rbs_patch: None }]);
        assert!(result.is_err());
    }

    #[test]
    fn remove_objects_is_silently_idempotent_for_missing_ids() {
        let store = store();
        store.remove_objects(&[ObjId::new(404)]);
    }

    #[test]
    fn writeback_rigid_body_never_upserts() {
        let store = store();
        assert!(!store.writeback_rigid_body(
            ObjId::new(404),
            Vec3::ZERO,
            Quat::IDENTITY,
            Vec3::ZERO,
            Vec3::ZERO
        ));
        assert!(store.get_rigid_bodies(Some(&[ObjId::new(404)]))[&ObjId::new(404)].is_none());
    }

    #[test]
    fn writeback_rigid_body_updates_existing_object() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();
        let moved = Vec3::new(1.0, 2.0, 3.0);
        assert!(store.writeback_rigid_body(ids[0], moved, Quat::IDENTITY, Vec3::ZERO, Vec3::ZERO));
        let bodies = store.get_rigid_bodies(Some(&ids));
        assert_eq!(bodies[&ids[0]].as_ref().unwrap().position, moved);
    }

    #[test]
    fn set_rigid_bodies_reports_missing_objects() {
        let store = store();
        let mut patches = BTreeMap::new();
        patches.insert(ObjId::new(1), RigidBodyPatch::default());
        assert_eq!(store.set_rigid_bodies(patches), vec![ObjId::new(1)]);
    }

    #[test]
    fn set_rigid_bodies_preserves_version() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();
        let mut patches = BTreeMap::new();
        patches.insert(ids[0], RigidBodyPatch { imass: Some(9.0), ..Default::default() });
        store.set_rigid_bodies(patches);
        let bodies = store.get_rigid_bodies(Some(&ids));
        let body = bodies[&ids[0]].as_ref().unwrap();
        assert_eq!(body.imass, 9.0);
        assert_eq!(body.version, 0);
    }

    #[test]
    fn set_custom_data_rejects_oversized_payload() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();
        let mut data = BTreeMap::new();
        data.insert(ids[0], "x".repeat(MAX_CUSTOM_DATA_BYTES));
        assert_eq!(store.set_custom_data(data), vec![ids[0]]);
    }

    #[test]
    fn set_custom_data_accepts_boundary_payload() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();
        let mut data = BTreeMap::new();
        data.insert(ids[0], "x".repeat(MAX_CUSTOM_DATA_BYTES - 1));
        assert!(store.set_custom_data(data).is_empty());
    }

    #[test]
    fn set_fragments_mod_scale_only_does_not_bump_version() {
        let store = store();
        let mut shapes = BTreeMap::new();
        shapes.insert(Aid::new("s").unwrap(), CollisionShape::sphere(1.0, Vec3::ZERO, Quat::IDENTITY).unwrap());
        let rbs = RigidBody::builder().cshapes(shapes).build().unwrap();
        let mut template = Template::builder(Aid::new("t1").unwrap(), rbs).build().unwrap();
        template.fragments.insert(
            Aid::new("f").unwrap(),
            FragmentMeta {
                fragtype: FragType::Raw,
                scale: 1.0,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                filenames: std::collections::BTreeSet::from(["a.raw".to_string()]),
            },
        );
        store.add_templates(vec![TemplateInput { template, files: BTreeMap::new() }]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let mut cmd = BTreeMap::new();
        let mut frag_ops = BTreeMap::new();
        frag_ops.insert(
            Aid::new("f").unwrap(),
            FragmentOp::Mod { fragtype: None, scale: Some(2.0), position: None, rotation: None, put: BTreeMap::new(), del: Vec::new() },
        );
        cmd.insert(ids[0], frag_ops);
        assert_eq!(store.set_fragments(cmd), 1);
        let bodies = store.get_rigid_bodies(Some(&ids));
        assert_eq!(bodies[&ids[0]].as_ref().unwrap().version, 0);
    }

    #[test]
    fn set_fragments_mod_fragtype_bumps_version() {
        let store = store();
        let rbs = RigidBody::builder().build().unwrap();
        let mut template = Template::builder(Aid::new("t1").unwrap(), rbs).build().unwrap();
        template.fragments.insert(
            Aid::new("f").unwrap(),
            FragmentMeta {
                fragtype: FragType::Raw,
                scale: 1.0,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                filenames: std::collections::BTreeSet::from(["a.raw".to_string()]),
            },
        );
        store.add_templates(vec![TemplateInput { template, files: BTreeMap::new() }]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let mut cmd = BTreeMap::new();
        let mut frag_ops = BTreeMap::new();
        frag_ops.insert(
            Aid::new("f").unwrap(),
            FragmentOp::Mod {
                fragtype: Some(FragType::Dae),
                scale: None,
                position: None,
                rotation: None,
                put: BTreeMap::new(),
                del: Vec::new(),
            },
        );
        cmd.insert(ids[0], frag_ops);
        assert_eq!(store.set_fragments(cmd), 1);
        let bodies = store.get_rigid_bodies(Some(&ids));
        assert_eq!(bodies[&ids[0]].as_ref().unwrap().version, 1);
    }

    #[test]
    fn set_fragments_skips_invalid_sub_ops_only() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let mut cmd = BTreeMap::new();
        let mut frag_ops = BTreeMap::new();
        // "mod" of a non-existent fragment: invalid, skipped.
        frag_ops.insert(
            Aid::new("ghost").unwrap(),
            FragmentOp::Mod { fragtype: None, scale: Some(1.0), position: None, rotation: None, put: BTreeMap::new(), del: Vec::new() },
        );
        // valid "put" creating a new fragment.
        frag_ops.insert(
            Aid::new("f").unwrap(),
            FragmentOp::Put {
                fragtype: FragType::Raw,
                scale: 1.0,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                files: BTreeMap::from([("a.raw".to_string(), b"x".to_vec())]),
            },
        );
        cmd.insert(ids[0], frag_ops);
        assert_eq!(store.set_fragments(cmd), 1);
    }

    #[test]
    fn set_fragments_all_invalid_counts_object_as_not_updated() {
        let store = store();
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let mut cmd = BTreeMap::new();
        let mut frag_ops = BTreeMap::new();
        frag_ops.insert(
            Aid::new("ghost").unwrap(),
            FragmentOp::Mod { fragtype: None, scale: Some(1.0), position: None, rotation: None, put: BTreeMap::new(), del: Vec::new() },
        );
        cmd.insert(ids[0], frag_ops);
        assert_eq!(store.set_fragments(cmd), 0);
    }

    fn template_with_parts(aid: &str, booster: &str, factory: &str, factory_target: &str) -> TemplateInput {
        let rbs = RigidBody::builder().build().unwrap();
        let b = azrael_types::Booster::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), -1.0, 1.0, 0.0).unwrap();
        let f = azrael_types::Factory::new(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Aid::new(factory_target).unwrap(),
            0.0,
            10.0,
        )
        .unwrap();
        let template = Template::builder(Aid::new(aid).unwrap(), rbs)
            .boosters(BTreeMap::from([(Aid::new(booster).unwrap(), b)]))
            .factories(BTreeMap::from([(Aid::new(factory).unwrap(), f)]))
            .build()
            .unwrap();
        TemplateInput { template, files: BTreeMap::new() }
    }

    #[test]
    fn set_force_enqueues_cross_product_torque() {
        let queue = Arc::new(CommandQueue::new());
        let store = InMemoryStore::new(Arc::new(MemoryAssetStore::new()), queue.clone());
        store.add_templates(vec![template_input("t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        store.set_force(ids[0], Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();

        let queued = queue.drain_all();
        assert_eq!(queued.len(), 1);
        let azrael_types::QueuedCommand::DirectForce { obj_id, force, torque } = &queued[0] else {
            unreachable!("expected a DirectForce command")
        };
        assert_eq!(*obj_id, ids[0]);
        assert_eq!(*force, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(*torque, Vec3::new(1.0, 0.0, 0.0).cross(Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn set_force_fails_for_unknown_object() {
        let store = store();
        assert!(store.set_force(ObjId::new(404), Vec3::ZERO, Vec3::ZERO).is_err());
    }

    #[test]
    fn control_parts_updates_booster_force_and_tallies_net_force() {
        let queue = Arc::new(CommandQueue::new());
        let store = InMemoryStore::new(Arc::new(MemoryAssetStore::new()), queue.clone());
        store.add_templates(vec![template_with_parts("t1", "b0", "f0", "t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let mut cmd_boosters = BTreeMap::new();
        cmd_boosters.insert(Aid::new("b0").unwrap(), azrael_types::BoosterCommand { force: 5.0 });
        let spawns = store.control_parts(ids[0], &cmd_boosters, &BTreeMap::new()).unwrap();
        assert!(spawns.is_empty());

        let queued = queue.drain_all();
        assert_eq!(queued.len(), 1);
        let azrael_types::QueuedCommand::BoosterForce { force, .. } = &queued[0] else {
            unreachable!("expected a BoosterForce command")
        };
        assert_eq!(*force, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn control_parts_rejects_unknown_part_before_mutating_anything() {
        let store = store();
        store.add_templates(vec![template_with_parts("t1", "b0", "f0", "t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let mut cmd_boosters = BTreeMap::new();
        cmd_boosters.insert(Aid::new("ghost").unwrap(), azrael_types::BoosterCommand { force: 5.0 });
        assert!(store.control_parts(ids[0], &cmd_boosters, &BTreeMap::new()).is_err());

        let rbs = store.get_rigid_bodies(Some(&ids));
        assert!(rbs[&ids[0]].is_some());
    }

    #[test]
    fn control_parts_factory_computes_world_frame_spawn() {
        let store = store();
        store.add_templates(vec![template_with_parts("t1", "b0", "f0", "t1")]).unwrap();
        let ids = store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let mut cmd_factories = BTreeMap::new();
        cmd_factories.insert(Aid::new("f0").unwrap(), azrael_types::FactoryCommand { exit_speed: 2.0 });
        let spawns = store.control_parts(ids[0], &BTreeMap::new(), &cmd_factories).unwrap();

        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].template_id, Aid::new("t1").unwrap());
        assert_eq!(spawns[0].position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(spawns[0].velocity_lin, Vec3::new(0.0, 0.0, 2.0));
    }
}
