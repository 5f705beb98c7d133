// SPDX-License-Identifier: Apache-2.0
//! Axis-aligned bounding box precomputation for collision shapes.

use serde::{Deserialize, Serialize};

use crate::{CollisionShape, ShapeKind, ValidationError, Vec3};

/// Slack factor applied to box half-extents so the box's AABB stays valid
/// under arbitrary rotation without needing a rebuild when only the body's
/// rotation changes. `sqrt(3.1)` rather than the tight `sqrt(3)` per the
/// source's own comment on this trade-off.
const BOX_AABB_SLACK: f64 = 1.760_681_686_165_901_7; // sqrt(3.1)

/// An axis-aligned bounding box: half-extents about a centre point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Centre of the box, in the body's local frame.
    pub center: Vec3,
    /// Half-extent along each axis.
    pub half_extents: Vec3,
}

/// Compute the AABB for a single collision shape at the given pose.
///
/// Returns `None` for [`ShapeKind::Empty`] (no AABB is emitted for it).
///
/// # Errors
///
/// This function itself cannot fail; shape/plane exclusivity is enforced at
/// [`crate::RigidBody`] construction time, not here. Use
/// [`compute_aabbs`] to validate and compute AABBs for a whole shape set.
#[must_use]
pub fn shape_aabb(shape: &CollisionShape) -> Option<Aabb> {
    match shape.kind {
        ShapeKind::Empty => None,
        ShapeKind::Sphere { radius } => Some(Aabb {
            center: shape.rotation.rotate(shape.position),
            half_extents: Vec3::new(radius, radius, radius),
        }),
        ShapeKind::Box { half_x, half_y, half_z } => {
            let h = Vec3::new(half_x, half_y, half_z).max_component() * BOX_AABB_SLACK;
            Some(Aabb {
                center: shape.rotation.rotate(shape.position),
                half_extents: Vec3::new(h, h, h),
            })
        }
        ShapeKind::Plane { .. } => Some(Aabb { center: Vec3::ZERO, half_extents: Vec3::ZERO }),
    }
}

/// Compute the AABB list for a validated `cshapes` map (see
/// [`crate::RigidBody::check_plane_exclusivity`] for the invariant this
/// relies on having already been enforced).
///
/// # Errors
///
/// Returns [`ValidationError::PlaneExclusivityViolation`] if `cshapes`
/// violates the plane-exclusivity invariant; callers normally hold a
/// `RigidBody` that already enforces this, in which case the error path is
/// unreachable.
pub fn compute_aabbs(
    cshapes: &std::collections::BTreeMap<crate::Aid, CollisionShape>,
) -> Result<Vec<Aabb>, ValidationError> {
    crate::RigidBody::check_plane_exclusivity(cshapes)?;
    Ok(cshapes.values().filter_map(shape_aabb).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Quat;

    #[test]
    fn sphere_aabb_is_cubical() {
        let shape = CollisionShape::sphere(2.0, Vec3::ZERO, Quat::IDENTITY).unwrap();
        let aabb = shape_aabb(&shape).unwrap();
        assert_eq!(aabb.half_extents, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn box_aabb_uses_slack_factor() {
        let shape = CollisionShape::cuboid(1.0, 2.0, 3.0, Vec3::ZERO, Quat::IDENTITY).unwrap();
        let aabb = shape_aabb(&shape).unwrap();
        let expected = 3.0 * BOX_AABB_SLACK;
        assert!((aabb.half_extents.x - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_shape_has_no_aabb() {
        let shape = CollisionShape::empty(Vec3::ZERO, Quat::IDENTITY);
        assert!(shape_aabb(&shape).is_none());
    }

    #[test]
    fn plane_aabb_is_degenerate() {
        let shape = CollisionShape::plane(Vec3::new(0.0, 1.0, 0.0), 0.0);
        let aabb = shape_aabb(&shape).unwrap();
        assert_eq!(aabb.half_extents, Vec3::ZERO);
    }
}
