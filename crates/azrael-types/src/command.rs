// SPDX-License-Identifier: Apache-2.0
//! Commands queued by the Gateway for the Physics Worker to apply on its
//! next drain.

use serde::{Deserialize, Serialize};

use crate::{Aabb, ObjId, RigidBody, RigidBodyPatch, Vec3};

/// A single queued instruction, destined for the Command Queue (C6) and
/// consumed exactly once by the Physics Worker's `dequeueCommands`.
///
/// Each variant's doc notes which queue key ([`CommandKind`]) it upserts
/// under; see `azrael-queue` for the upsert-by-`(kind, objID)` semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueuedCommand {
    /// Materialise a new body in the worker's world.
    Spawn {
        /// The newly allocated object id.
        obj_id: ObjId,
        /// Initial rigid-body state.
        rbs: RigidBody,
        /// Precomputed AABBs for the body's collision shapes (§4.4.1).
        aabbs: Vec<Aabb>,
    },
    /// Delete a body from the worker's world.
    Remove {
        /// The object to remove.
        obj_id: ObjId,
    },
    /// Overlay a partial rigid-body update onto a live body.
    Modify {
        /// The object to modify.
        obj_id: ObjId,
        /// The fields to overlay.
        partial_rbs: RigidBodyPatch,
        /// Recomputed AABBs, if the patch touched `cshapes`.
        aabbs: Option<Vec<Aabb>>,
    },
    /// Apply a world-frame force/torque at the body's centre of mass.
    DirectForce {
        /// The object to apply to.
        obj_id: ObjId,
        /// Force, in world coordinates.
        force: Vec3,
        /// Torque, in world coordinates.
        torque: Vec3,
    },
    /// Apply a local-frame force/torque; the worker rotates it into world
    /// coordinates using the body's current orientation before applying.
    BoosterForce {
        /// The object to apply to.
        obj_id: ObjId,
        /// Force, in the body's local frame.
        force: Vec3,
        /// Torque, in the body's local frame.
        torque: Vec3,
    },
}

/// The queue-key discriminant of a [`QueuedCommand`], used by the Command
/// Queue to decide which earlier entry (if any) a new command for the same
/// object overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    /// See [`QueuedCommand::Spawn`].
    Spawn,
    /// See [`QueuedCommand::Remove`].
    Remove,
    /// See [`QueuedCommand::Modify`].
    Modify,
    /// See [`QueuedCommand::DirectForce`].
    DirectForce,
    /// See [`QueuedCommand::BoosterForce`].
    BoosterForce,
}

impl QueuedCommand {
    /// The object this command targets.
    #[must_use]
    pub const fn obj_id(&self) -> ObjId {
        match self {
            Self::Spawn { obj_id, .. }
            | Self::Remove { obj_id }
            | Self::Modify { obj_id, .. }
            | Self::DirectForce { obj_id, .. }
            | Self::BoosterForce { obj_id, .. } => *obj_id,
        }
    }

    /// This command's queue key.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Spawn { .. } => CommandKind::Spawn,
            Self::Remove { .. } => CommandKind::Remove,
            Self::Modify { .. } => CommandKind::Modify,
            Self::DirectForce { .. } => CommandKind::DirectForce,
            Self::BoosterForce { .. } => CommandKind::BoosterForce,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_obj_id_match_variant() {
        let cmd = QueuedCommand::Remove { obj_id: ObjId::new(7) };
        assert_eq!(cmd.kind(), CommandKind::Remove);
        assert_eq!(cmd.obj_id(), ObjId::new(7));
    }
}
