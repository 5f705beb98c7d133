// SPDX-License-Identifier: Apache-2.0
//! Request dispatch: maps each [`Command`] onto the Template Registry,
//! Object Store, and Constraint Registry, and packs the result into a
//! [`Reply`].

use std::collections::BTreeMap;
use std::sync::Arc;

use azrael_igor::ConstraintRegistry;
use azrael_proto::{Command, Reply, ReplyData};
use azrael_store::{InMemoryStore, SpawnRequest, StoreError, TemplateInput};
use azrael_types::{Aid, ObjId};
use ciborium::value::Value;

/// Dispatches decoded [`Command`]s against the shared store and constraint
/// registry, and encodes their results as [`Reply`].
pub struct Clerk {
    store: Arc<InMemoryStore>,
    constraints: Arc<ConstraintRegistry>,
}

impl Clerk {
    /// Wire a dispatcher to the given store and constraint registry.
    #[must_use]
    pub const fn new(store: Arc<InMemoryStore>, constraints: Arc<ConstraintRegistry>) -> Self {
        Self { store, constraints }
    }

    /// Handle one request, never panicking: every store error is mapped to
    /// `Reply::err`.
    #[must_use]
    pub fn dispatch(&self, cmd: Command) -> Reply {
        match cmd {
            Command::Ping => Reply::ok_empty(),
            Command::AddTemplates(payloads) => self.add_templates(payloads),
            Command::GetTemplates(aids) => self.get_templates(&aids),
            Command::GetTemplateId(obj_id) => ok_opt(self.store.get_template_id(obj_id)),
            Command::Spawn(payloads) => self.spawn(payloads),
            Command::RemoveObjects(ids) => {
                self.store.remove_objects(&ids);
                Reply::ok_empty()
            }
            Command::GetAllObjids => ok_value(self.store.get_all_object_ids()),
            Command::GetObjectStates(ids) => ok_value(self.store.get_object_states(ids.as_deref())),
            Command::GetRigidBodies(ids) => ok_value(self.store.get_rigid_bodies(ids.as_deref())),
            Command::SetRigidBodies(patches) => ok_value(self.store.set_rigid_bodies(patches)),
            Command::GetFragments(ids) => ok_value(self.store.get_fragments(&ids)),
            Command::SetFragments(cmd) => ok_value(self.store.set_fragments(cmd)),
            Command::SetForce(payload) => self.set_force(payload),
            Command::ControlParts(payload) => self.control_parts(payload),
            Command::AddConstraints(constraints) => {
                ok_value(self.constraints.add_constraints(constraints))
            }
            Command::GetConstraints(ids) => ok_value(self.constraints.get_constraints(ids.as_deref())),
            Command::DeleteConstraints(constraints) => {
                ok_value(self.constraints.remove_constraints(&constraints))
            }
            Command::SetCustom(data) => ok_value(self.store.set_custom_data(data)),
            Command::GetCustom(ids) => ok_value(self.store.get_custom_data(Some(&ids))),
        }
    }

    fn add_templates(&self, payloads: Vec<azrael_proto::TemplatePayload>) -> Reply {
        let inputs =
            payloads.into_iter().map(|p| TemplateInput { template: p.template, files: p.files }).collect();
        match self.store.add_templates(inputs) {
            Ok(report) => ok_value(report),
            Err(err) => store_err(&err),
        }
    }

    fn get_templates(&self, aids: &[Aid]) -> Reply {
        match self.store.get_templates(aids) {
            Ok(entries) => ok_value(entries),
            Err(err) => store_err(&err),
        }
    }

    fn spawn(&self, payloads: Vec<azrael_proto::SpawnPayload>) -> Reply {
        let requests = payloads
            .into_iter()
            .map(|p| SpawnRequest { template_id: p.template_id, rbs_patch: p.rbs_patch })
            .collect();
        match self.store.spawn(requests) {
            Ok(ids) => ok_value(ids),
            Err(err) => store_err(&err),
        }
    }

    fn set_force(&self, payload: azrael_proto::SetForcePayload) -> Reply {
        match self.store.set_force(payload.obj_id, payload.force, payload.rpos) {
            Ok(()) => Reply::ok_empty(),
            Err(err) => store_err(&err),
        }
    }

    /// Run `control_parts` and, for every factory that fired, immediately
    /// spawn the ejected instance from the world-frame parameters it
    /// computed. Returns the newly spawned object IDs, in factory-AID order.
    fn control_parts(&self, payload: azrael_proto::ControlPartsPayload) -> Reply {
        let outcome =
            self.store.control_parts(payload.obj_id, &payload.cmd_boosters, &payload.cmd_factories);
        let spawns = match outcome {
            Ok(spawns) => spawns,
            Err(err) => return store_err(&err),
        };

        let mut spawned = Vec::with_capacity(spawns.len());
        for spawn in spawns {
            let rbs_patch = azrael_types::RigidBodyPatch {
                position: Some(spawn.position),
                velocity_lin: Some(spawn.velocity_lin),
                rotation: Some(spawn.rotation),
                ..Default::default()
            };
            let request =
                SpawnRequest { template_id: spawn.template_id, rbs_patch: Some(rbs_patch) };
            match self.store.spawn(vec![request]) {
                Ok(ids) => spawned.extend(ids),
                Err(err) => return store_err(&err),
            }
        }
        ok_value(spawned)
    }
}

fn store_err(err: &StoreError) -> Reply {
    Reply::err(err.to_string())
}

fn ok_value<T: serde::Serialize>(value: T) -> Reply {
    match Value::serialized(&value) {
        Ok(data) => Reply::ok_with(data),
        Err(err) => Reply::err(format!("failed to encode reply: {err:?}")),
    }
}

fn ok_opt<T: serde::Serialize>(value: Option<T>) -> Reply {
    value.map_or_else(Reply::ok_empty, ok_value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use azrael_cas::MemoryAssetStore;
    use azrael_proto::TemplatePayload;
    use azrael_queue::CommandQueue;
    use azrael_types::{RigidBody, Template};

    fn clerk() -> Clerk {
        let store = Arc::new(InMemoryStore::new(Arc::new(MemoryAssetStore::new()), Arc::new(CommandQueue::new())));
        Clerk::new(store, Arc::new(ConstraintRegistry::new()))
    }

    fn rig(aid: &str) -> TemplatePayload {
        let rbs = RigidBody::builder().build().unwrap();
        let template = Template::builder(Aid::new(aid).unwrap(), rbs).build().unwrap();
        TemplatePayload { template, files: BTreeMap::new() }
    }

    #[test]
    fn ping_replies_ok_with_no_data() {
        let reply = clerk().dispatch(Command::Ping);
        assert!(reply.ok);
        assert!(reply.data.is_none());
    }

    #[test]
    fn add_templates_then_spawn_round_trips_an_object_id() {
        let clerk = clerk();
        let added = clerk.dispatch(Command::AddTemplates(vec![rig("t1")]));
        assert!(added.ok);

        let spawned = clerk.dispatch(Command::Spawn(vec![azrael_proto::SpawnPayload {
            template_id: Aid::new("t1").unwrap(),
            rbs_patch: None,
        }]));
        assert!(spawned.ok);
        let ids: Vec<ObjId> =
            ciborium::value::Value::deserialized(&spawned.data.unwrap()).unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn unknown_template_spawn_reports_failure() {
        let clerk = clerk();
        let spawned = clerk.dispatch(Command::Spawn(vec![azrael_proto::SpawnPayload {
            template_id: Aid::new("nope").unwrap(),
            rbs_patch: None,
        }]));
        assert!(!spawned.ok);
    }

    #[test]
    fn get_all_objids_starts_empty() {
        let reply = clerk().dispatch(Command::GetAllObjids);
        assert!(reply.ok);
        let ids: Vec<ObjId> = ciborium::value::Value::deserialized(&reply.data.unwrap()).unwrap();
        assert!(ids.is_empty());
    }
}
