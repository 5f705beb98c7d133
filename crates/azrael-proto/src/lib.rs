// SPDX-License-Identifier: Apache-2.0
//! Wire schema for the Azrael control plane's request/reply socket.
//!
//! Every request is a tagged [`Command`] carrying its own payload; every
//! reply is a [`Reply`] of `{ok, msg, data}`. [`wire`] frames either as
//! length-prefixed CBOR for transport over a stream socket.

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

pub mod wire;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use azrael_types::{
    Aid, BoosterCommand, Constraint, FactoryCommand, FragmentOp, ObjId, RigidBodyPatch, Template,
    Vec3,
};

/// Default Unix socket path for the Gateway.
///
/// Prefers a per-user runtime dir (`XDG_RUNTIME_DIR`) and falls back to
/// `/tmp` when unavailable.
#[must_use]
pub fn default_socket_path() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("azrael-gateway.sock")
}

/// Raw file bytes accompanying a template submission, keyed by file name
/// within the fragment.
pub type FragmentFilePayload = BTreeMap<String, Vec<u8>>;

/// One template submitted to `add_templates`: its record plus, for each of
/// its fragments, the file bytes the Asset Store should hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePayload {
    /// The template record (geometry metadata, parts, default rigid body).
    pub template: Template,
    /// Fragment name to file-name-to-bytes map.
    pub files: BTreeMap<Aid, FragmentFilePayload>,
}

/// One spawn request, as submitted to the `spawn` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPayload {
    /// The template to instantiate.
    pub template_id: Aid,
    /// Fields overlaid onto the template's default rigid body.
    #[serde(default)]
    pub rbs_patch: Option<RigidBodyPatch>,
}

/// Payload for `set_force`: apply `force` at world-frame offset `rpos` from
/// the body's centre of mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetForcePayload {
    /// Target object.
    pub obj_id: ObjId,
    /// Force, in world coordinates.
    pub force: Vec3,
    /// Offset from the centre of mass the force acts at.
    pub rpos: Vec3,
}

/// Payload for `control_parts`: fire and/or retune the named parts of a
/// single object's template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPartsPayload {
    /// Target object.
    pub obj_id: ObjId,
    /// Booster name to new commanded force.
    #[serde(default)]
    pub cmd_boosters: BTreeMap<Aid, BoosterCommand>,
    /// Factory name to ejection command.
    #[serde(default)]
    pub cmd_factories: BTreeMap<Aid, FactoryCommand>,
}

/// Payload for `set_fragments`: per-object, per-fragment edits.
pub type SetFragmentsPayload = BTreeMap<ObjId, BTreeMap<Aid, FragmentOp>>;

/// Payload for `set_rigid_bodies`: per-object partial overlays.
pub type SetRigidBodiesPayload = BTreeMap<ObjId, RigidBodyPatch>;

/// Payload for `set_custom`: per-object opaque custom strings.
pub type SetCustomPayload = BTreeMap<ObjId, String>;

/// A request, tagged by command name. Serializes as `{cmd, data}`; the
/// length-prefixed wire framing carries this same shape as CBOR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data", rename_all = "snake_case")]
pub enum Command {
    /// Liveness probe. No payload, echoes back `ok:true`.
    Ping,
    /// Register one or more templates.
    AddTemplates(Vec<TemplatePayload>),
    /// Fetch templates by AID.
    GetTemplates(Vec<Aid>),
    /// Fetch the template an object was spawned from.
    GetTemplateId(ObjId),
    /// Instantiate one or more objects from registered templates.
    Spawn(Vec<SpawnPayload>),
    /// Destroy one or more objects.
    RemoveObjects(Vec<ObjId>),
    /// List every live object id.
    GetAllObjids,
    /// Fetch the fragment + rigid-body state of the given objects (or all,
    /// if `None`).
    GetObjectStates(Option<Vec<ObjId>>),
    /// Fetch the rigid-body record of the given objects (or all, if
    /// `None`).
    GetRigidBodies(Option<Vec<ObjId>>),
    /// Apply partial rigid-body overlays.
    SetRigidBodies(SetRigidBodiesPayload),
    /// Fetch fragment metadata for the given objects.
    GetFragments(Vec<ObjId>),
    /// Apply fragment edits.
    SetFragments(SetFragmentsPayload),
    /// Apply a world-frame force at an offset from an object's centre of
    /// mass.
    SetForce(SetForcePayload),
    /// Fire and/or retune an object's boosters and factories.
    ControlParts(ControlPartsPayload),
    /// Register one or more constraints.
    AddConstraints(Vec<Constraint>),
    /// Fetch constraints referencing any of the given objects (or all, if
    /// `None`).
    GetConstraints(Option<Vec<ObjId>>),
    /// Remove one or more constraints.
    DeleteConstraints(Vec<Constraint>),
    /// Attach opaque per-object custom strings.
    SetCustom(SetCustomPayload),
    /// Fetch opaque per-object custom strings for the given objects.
    GetCustom(Vec<ObjId>),
}

impl Command {
    /// The command's wire name, as carried in the `cmd` field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::AddTemplates(_) => "add_templates",
            Self::GetTemplates(_) => "get_templates",
            Self::GetTemplateId(_) => "get_template_id",
            Self::Spawn(_) => "spawn",
            Self::RemoveObjects(_) => "remove_objects",
            Self::GetAllObjids => "get_all_objids",
            Self::GetObjectStates(_) => "get_object_states",
            Self::GetRigidBodies(_) => "get_rigid_bodies",
            Self::SetRigidBodies(_) => "set_rigid_bodies",
            Self::GetFragments(_) => "get_fragments",
            Self::SetFragments(_) => "set_fragments",
            Self::SetForce(_) => "set_force",
            Self::ControlParts(_) => "control_parts",
            Self::AddConstraints(_) => "add_constraints",
            Self::GetConstraints(_) => "get_constraints",
            Self::DeleteConstraints(_) => "delete_constraints",
            Self::SetCustom(_) => "set_custom",
            Self::GetCustom(_) => "get_custom",
        }
    }
}

/// An opaque reply payload. Each command's handler fills this with
/// whatever shape its own result takes; callers decode it against the
/// command they issued.
pub type ReplyData = ciborium::value::Value;

/// A reply: `{ok, msg, data}`. `msg` is populated on failure (and may carry
/// detail on success); `data` is the command-specific result, `None` when
/// there is none or the call failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Human-readable detail; populated on failure.
    pub msg: Option<String>,
    /// Command-specific result payload.
    pub data: Option<ReplyData>,
}

impl Reply {
    /// Build a success reply with no payload.
    #[must_use]
    pub const fn ok_empty() -> Self {
        Self { ok: true, msg: None, data: None }
    }

    /// Build a success reply carrying `data`.
    #[must_use]
    pub const fn ok_with(data: ReplyData) -> Self {
        Self { ok: true, msg: None, data: Some(data) }
    }

    /// Build a failure reply with a human-readable message.
    #[must_use]
    pub fn err(msg: impl Into<String>) -> Self {
        Self { ok: false, msg: Some(msg.into()), data: None }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{Command, Reply};

    #[test]
    fn command_name_matches_tag() {
        assert_eq!(Command::Ping.name(), "ping");
        assert_eq!(Command::GetAllObjids.name(), "get_all_objids");
        assert_eq!(Command::RemoveObjects(vec![]).name(), "remove_objects");
    }

    #[test]
    fn ping_round_trips_through_cbor() {
        let cmd = Command::Ping;
        let mut buf = Vec::new();
        ciborium::into_writer(&cmd, &mut buf).unwrap();
        let decoded: Command = ciborium::from_reader(buf.as_slice()).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn reply_err_has_no_data() {
        let reply = Reply::err("boom");
        assert!(!reply.ok);
        assert_eq!(reply.msg.as_deref(), Some("boom"));
        assert!(reply.data.is_none());
    }

    #[test]
    fn reply_ok_empty_round_trips() {
        let reply = Reply::ok_empty();
        let mut buf = Vec::new();
        ciborium::into_writer(&reply, &mut buf).unwrap();
        let decoded: Reply = ciborium::from_reader(buf.as_slice()).unwrap();
        assert_eq!(decoded, reply);
    }
}
