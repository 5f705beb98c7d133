// SPDX-License-Identifier: Apache-2.0
//! Constraints linking pairs of rigid bodies.

use serde::{Deserialize, Serialize};

use crate::{Aid, ObjId, Quat, Vec3};

/// A point-to-point constraint: pins a point on body A to a point on body B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct P2PConstraint {
    /// Pivot point in body A's local frame.
    pub pivot_a: Vec3,
    /// Pivot point in body B's local frame.
    pub pivot_b: Vec3,
}

/// A pose expressed as position + rotation, used for the 6-DOF spring
/// constraint's per-body attachment frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position component.
    pub position: Vec3,
    /// Rotation component.
    pub rotation: Quat,
}

/// Per-axis limits or spring coefficients for the six degrees of freedom
/// (three linear, three angular) of a [`SixDofSpring2Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dof6<T> {
    /// Linear-axis values.
    pub lin: T,
    /// Angular-axis values.
    pub ang: T,
}

/// A generic 6-degree-of-freedom spring constraint between two bodies' local
/// attachment frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SixDofSpring2Constraint {
    /// Attachment frame in body A's local space.
    pub frame_in_a: Frame,
    /// Attachment frame in body B's local space.
    pub frame_in_b: Frame,
    /// Spring stiffness per degree of freedom.
    pub stiffness: Dof6<Vec3>,
    /// Spring damping per degree of freedom.
    pub damping: Dof6<Vec3>,
    /// Spring equilibrium point per degree of freedom.
    pub equilibrium: Dof6<Vec3>,
    /// Lower linear limit.
    pub lin_lo: Vec3,
    /// Upper linear limit.
    pub lin_hi: Vec3,
    /// Lower angular limit.
    pub rot_lo: Vec3,
    /// Upper angular limit.
    pub rot_hi: Vec3,
    /// Restitution on limit contact.
    pub bounce: Vec3,
    /// Per-degree-of-freedom spring enable flags.
    pub enable_spring: [bool; 6],
}

/// The type-specific payload of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Point-to-point.
    P2P(P2PConstraint),
    /// 6-DOF spring.
    SixDofSpring2(SixDofSpring2Constraint),
}

impl ConstraintKind {
    /// The wire-level type tag for this variant.
    #[must_use]
    pub const fn contype(&self) -> &'static str {
        match self {
            Self::P2P(_) => "P2P",
            Self::SixDofSpring2(_) => "6DOFSPRING2",
        }
    }
}

/// A constraint linking two bodies, as stored in the Constraint Registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// The constraint's own name.
    pub aid: Aid,
    /// First linked body.
    pub rb_a: ObjId,
    /// Second linked body.
    pub rb_b: ObjId,
    /// Type-specific data.
    pub data: ConstraintKind,
}

/// The registry identity key of a constraint: `(contype, sorted(rb_a,
/// rb_b), aid)`. Two constraints with equal keys are the same registry
/// entry regardless of which order `rb_a`/`rb_b` were supplied in.
pub type ConstraintKey = (&'static str, (ObjId, ObjId), Aid);

impl Constraint {
    /// Construct a constraint record.
    #[must_use]
    pub const fn new(aid: Aid, rb_a: ObjId, rb_b: ObjId, data: ConstraintKind) -> Self {
        Self { aid, rb_a, rb_b, data }
    }

    /// Compute this constraint's registry identity key.
    #[must_use]
    pub fn identity_key(&self) -> ConstraintKey {
        let pair = if self.rb_a <= self.rb_b { (self.rb_a, self.rb_b) } else { (self.rb_b, self.rb_a) };
        (self.data.contype(), pair, self.aid.clone())
    }

    /// Whether this constraint references `obj`.
    #[must_use]
    pub fn references(&self, obj: ObjId) -> bool {
        self.rb_a == obj || self.rb_b == obj
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p2p(a: u64, b: u64, aid: &str) -> Constraint {
        Constraint::new(
            Aid::new(aid).unwrap(),
            ObjId::new(a),
            ObjId::new(b),
            ConstraintKind::P2P(P2PConstraint { pivot_a: Vec3::ZERO, pivot_b: Vec3::ZERO }),
        )
    }

    #[test]
    fn identity_key_is_order_independent() {
        let c1 = p2p(1, 2, "c0");
        let c2 = p2p(2, 1, "c0");
        assert_eq!(c1.identity_key(), c2.identity_key());
    }

    #[test]
    fn identity_key_distinguishes_aid() {
        let c1 = p2p(1, 2, "c0");
        let c2 = p2p(1, 2, "c1");
        assert_ne!(c1.identity_key(), c2.identity_key());
    }

    #[test]
    fn references_checks_either_body() {
        let c = p2p(1, 2, "c0");
        assert!(c.references(ObjId::new(1)));
        assert!(c.references(ObjId::new(2)));
        assert!(!c.references(ObjId::new(3)));
    }
}
