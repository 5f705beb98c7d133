// SPDX-License-Identifier: Apache-2.0
//! Physics Worker contract for the Azrael simulation control plane (C9).
//!
//! The Physics Worker is treated as an external collaborator: this crate
//! only fixes the contract it drains and the writeback discipline it must
//! honour. [`PhysicsWorld`] is that contract;
//! [`SemiImplicitEulerWorld`] is a reference implementation sufficient for
//! tests, not a production integrator (the specific kinematic integrator is
//! explicitly out of scope).
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

use std::collections::BTreeMap;

use azrael_queue::CommandQueue;
use azrael_store::InMemoryStore;
use azrael_types::{Aabb, ObjId, QueuedCommand, Quat, RigidBody, RigidBodyPatch, Vec3};

/// The working contract a Physics Worker's in-memory simulation must meet.
///
/// Each method corresponds to one [`QueuedCommand`] variant, applied as the
/// worker drains the Command Queue; `step` advances the simulation by one
/// tick once every drained command has been applied.
pub trait PhysicsWorld {
    /// Materialise a newly spawned body in the world.
    fn spawn(&mut self, obj_id: ObjId, rbs: RigidBody, aabbs: Vec<Aabb>);
    /// Delete a body from the world.
    fn remove(&mut self, obj_id: ObjId);
    /// Overlay a partial rigid-body update onto a live body. Unknown bodies
    /// are ignored: a `modify` for a body the worker has not yet spawned can
    /// only arrive from a race the Gateway already tolerates.
    fn modify(&mut self, obj_id: ObjId, patch: &RigidBodyPatch);
    /// Apply a world-frame force/torque at the body's centre of mass.
    fn apply_direct_force(&mut self, obj_id: ObjId, force: Vec3, torque: Vec3);
    /// Apply a local-frame force/torque, rotated into world coordinates by
    /// the body's current orientation before being applied.
    fn apply_booster_force(&mut self, obj_id: ObjId, force: Vec3, torque: Vec3);
    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f64);
    /// Snapshot of every live body's current kinematic state, for writeback.
    fn snapshot(&self) -> Vec<(ObjId, Vec3, Quat, Vec3, Vec3)>;
}

/// One body as tracked by [`SemiImplicitEulerWorld`].
#[derive(Debug, Clone)]
struct Body {
    rbs: RigidBody,
    force_accum: Vec3,
    torque_accum: Vec3,
}

/// Reference [`PhysicsWorld`] implementation: semi-implicit (symplectic)
/// Euler integration of linear and angular motion, with per-axis motion
/// locks honoured via `RigidBody::axes_lock_lin`/`axes_lock_rot`.
#[derive(Debug, Clone, Default)]
pub struct SemiImplicitEulerWorld {
    bodies: BTreeMap<ObjId, Body>,
}

impl SemiImplicitEulerWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self { bodies: BTreeMap::new() }
    }

    /// Number of bodies currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the world currently tracks no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

fn lock(v: Vec3, mask: Vec3) -> Vec3 {
    Vec3::new(v.x * mask.x, v.y * mask.y, v.z * mask.z)
}

impl PhysicsWorld for SemiImplicitEulerWorld {
    fn spawn(&mut self, obj_id: ObjId, rbs: RigidBody, _aabbs: Vec<Aabb>) {
        self.bodies.insert(obj_id, Body { rbs, force_accum: Vec3::ZERO, torque_accum: Vec3::ZERO });
    }

    fn remove(&mut self, obj_id: ObjId) {
        self.bodies.remove(&obj_id);
    }

    fn modify(&mut self, obj_id: ObjId, patch: &RigidBodyPatch) {
        let Some(body) = self.bodies.get_mut(&obj_id) else { return };
        if let Ok(patched) = patch.apply(&body.rbs) {
            body.rbs = patched;
        }
    }

    fn apply_direct_force(&mut self, obj_id: ObjId, force: Vec3, torque: Vec3) {
        let Some(body) = self.bodies.get_mut(&obj_id) else { return };
        body.force_accum = body.force_accum + force;
        body.torque_accum = body.torque_accum + torque;
    }

    fn apply_booster_force(&mut self, obj_id: ObjId, force: Vec3, torque: Vec3) {
        let Some(body) = self.bodies.get_mut(&obj_id) else { return };
        let world_force = body.rbs.rotation.rotate(force);
        let world_torque = body.rbs.rotation.rotate(torque);
        body.force_accum = body.force_accum + world_force;
        body.torque_accum = body.torque_accum + world_torque;
    }

    fn step(&mut self, dt: f64) {
        for body in self.bodies.values_mut() {
            let rbs = &mut body.rbs;
            let linear_accel = body.force_accum.scale(rbs.imass);
            let angular_accel = body.torque_accum.scale(rbs.imass);

            rbs.velocity_lin = lock(rbs.velocity_lin + linear_accel.scale(dt), rbs.axes_lock_lin);
            rbs.velocity_rot = lock(rbs.velocity_rot + angular_accel.scale(dt), rbs.axes_lock_rot);

            rbs.position = rbs.position + rbs.velocity_lin.scale(dt);

            let spin = Quat::new(
                rbs.velocity_rot.x * 0.5 * dt,
                rbs.velocity_rot.y * 0.5 * dt,
                rbs.velocity_rot.z * 0.5 * dt,
                0.0,
            );
            rbs.rotation = quat_add(rbs.rotation, quat_mul(spin, rbs.rotation));
            rbs.rotation = quat_normalize(rbs.rotation);

            body.force_accum = Vec3::ZERO;
            body.torque_accum = Vec3::ZERO;
        }
    }

    fn snapshot(&self) -> Vec<(ObjId, Vec3, Quat, Vec3, Vec3)> {
        self.bodies
            .iter()
            .map(|(&id, body)| {
                (id, body.rbs.position, body.rbs.rotation, body.rbs.velocity_lin, body.rbs.velocity_rot)
            })
            .collect()
    }
}

fn quat_add(a: Quat, b: Quat) -> Quat {
    Quat::new(a.x + b.x, a.y + b.y, a.z + b.z, a.w + b.w)
}

fn quat_mul(a: Quat, b: Quat) -> Quat {
    Quat::new(
        a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
        a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
        a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
    )
}

fn quat_normalize(q: Quat) -> Quat {
    let norm = (q.x * q.x + q.y * q.y + q.z * q.z + q.w * q.w).sqrt();
    if norm < 1e-9 {
        return Quat::IDENTITY;
    }
    Quat::new(q.x / norm, q.y / norm, q.z / norm, q.w / norm)
}

/// Drain the Command Queue, apply every command to `world`, step it by
/// `dt`, then write each surviving body's kinematic state back to `store`
/// (update-only; a body the store no longer has an object document for is
/// silently skipped, never recreated).
pub fn tick<W: PhysicsWorld>(world: &mut W, queue: &CommandQueue, store: &InMemoryStore, dt: f64) {
    for command in queue.drain_all() {
        match command {
            QueuedCommand::Spawn { obj_id, rbs, aabbs } => world.spawn(obj_id, rbs, aabbs),
            QueuedCommand::Remove { obj_id } => world.remove(obj_id),
            QueuedCommand::Modify { obj_id, partial_rbs, .. } => world.modify(obj_id, &partial_rbs),
            QueuedCommand::DirectForce { obj_id, force, torque } => {
                world.apply_direct_force(obj_id, force, torque);
            }
            QueuedCommand::BoosterForce { obj_id, force, torque } => {
                world.apply_booster_force(obj_id, force, torque);
            }
        }
    }

    world.step(dt);

    for (obj_id, position, rotation, velocity_lin, velocity_rot) in world.snapshot() {
        store.writeback_rigid_body(obj_id, position, rotation, velocity_lin, velocity_rot);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use azrael_cas::MemoryAssetStore;
    use azrael_store::{SpawnRequest, TemplateInput};
    use azrael_types::{Aid, Template};
    use std::sync::Arc;

    fn rig(aid: &str) -> TemplateInput {
        let rbs = RigidBody::builder().build().unwrap();
        let template = Template::builder(Aid::new(aid).unwrap(), rbs).build().unwrap();
        TemplateInput { template, files: std::collections::BTreeMap::new() }
    }

    #[test]
    fn direct_force_moves_body_after_step() {
        let mut world = SemiImplicitEulerWorld::new();
        let id = ObjId::new(1);
        let rbs = RigidBody::builder().imass(1.0).build().unwrap();
        world.spawn(id, rbs, Vec::new());
        world.apply_direct_force(id, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        world.step(1.0);
        let snap = world.snapshot();
        let (_, position, ..) = snap.iter().find(|(oid, ..)| *oid == id).unwrap();
        assert!(position.x > 0.0);
    }

    #[test]
    fn locked_axis_blocks_motion() {
        let mut world = SemiImplicitEulerWorld::new();
        let id = ObjId::new(1);
        let rbs =
            RigidBody::builder().imass(1.0).axes_lock_lin(Vec3::new(0.0, 1.0, 1.0)).build().unwrap();
        world.spawn(id, rbs, Vec::new());
        world.apply_direct_force(id, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        world.step(1.0);
        let snap = world.snapshot();
        let (_, position, ..) = snap.iter().find(|(oid, ..)| *oid == id).unwrap();
        assert_eq!(position.x, 0.0);
    }

    #[test]
    fn remove_drops_body_from_snapshot() {
        let mut world = SemiImplicitEulerWorld::new();
        let id = ObjId::new(1);
        world.spawn(id, RigidBody::builder().build().unwrap(), Vec::new());
        world.remove(id);
        assert!(world.is_empty());
    }

    #[test]
    fn tick_drains_queue_and_writes_back_only_existing_objects() {
        let store = InMemoryStore::new(Arc::new(MemoryAssetStore::new()), Arc::new(CommandQueue::new()));
        store.add_templates(vec![rig("t1")]).unwrap();
        let ids =
            store.spawn(vec![SpawnRequest { template_id: Aid::new("t1").unwrap(), rbs_patch: None }]).unwrap();

        let queue = CommandQueue::new();
        queue.push(QueuedCommand::DirectForce {
            obj_id: ids[0],
            force: Vec3::new(1.0, 0.0, 0.0),
            torque: Vec3::ZERO,
        });

        let mut world = SemiImplicitEulerWorld::new();
        world.spawn(ids[0], store.get_rigid_bodies(Some(&ids))[&ids[0]].clone().unwrap(), Vec::new());

        tick(&mut world, &queue, &store, 1.0);

        let bodies = store.get_rigid_bodies(Some(&ids));
        assert!(bodies[&ids[0]].as_ref().unwrap().position.x > 0.0);
        assert!(queue.is_empty());
    }

    #[test]
    fn tick_writeback_skips_bodies_without_a_store_document() {
        let store = InMemoryStore::new(Arc::new(MemoryAssetStore::new()), Arc::new(CommandQueue::new()));
        let queue = CommandQueue::new();
        let mut world = SemiImplicitEulerWorld::new();
        world.spawn(ObjId::new(999), RigidBody::builder().build().unwrap(), Vec::new());
        // Should not panic and should not create a document for 999.
        tick(&mut world, &queue, &store, 1.0);
        assert!(store.get_all_object_ids().is_empty());
    }
}
