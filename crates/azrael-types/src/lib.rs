// SPDX-License-Identifier: Apache-2.0
//! Typed records and validating constructors for Azrael's simulation data
//! model (bodies, fragments, templates, constraints, queued commands).
//!
//! Every constructor that can fail returns a [`ValidationError`] rather than
//! panicking; callers (ultimately the Gateway) turn that into a
//! user-visible `{ok:false, msg, data:null}` reply instead of letting a bad
//! request unwind through the stack.

mod aabb;
mod aid;
mod booster;
mod command;
mod constraint;
mod error;
mod fragment;
mod object;
mod objid;
mod rigid_body;
mod shape;
mod template;
mod vector;

pub use aabb::{compute_aabbs, shape_aabb, Aabb};
pub use aid::Aid;
pub use booster::{Booster, BoosterCommand, Factory, FactoryCommand};
pub use command::{CommandKind, QueuedCommand};
pub use constraint::{
    Constraint, ConstraintKey, ConstraintKind, Dof6, Frame, P2PConstraint, SixDofSpring2Constraint,
};
pub use error::ValidationError;
pub use fragment::{FragType, FragmentMeta, FragmentOp};
pub use object::{ObjectDocument, MAX_CUSTOM_DATA_BYTES};
pub use objid::ObjId;
pub use rigid_body::{RigidBody, RigidBodyBuilder, RigidBodyPatch};
pub use shape::{CollisionShape, ShapeKind};
pub use template::{Template, TemplateBuilder};
pub use vector::{Quat, Vec3, Vec4};
