// SPDX-License-Identifier: Apache-2.0
//! Collision shapes.

use serde::{Deserialize, Serialize};

use crate::{Quat, ValidationError, Vec3};

/// The shape-specific payload of a collision shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// No collision geometry.
    Empty,
    /// A sphere with the given radius.
    Sphere {
        /// Radius, must be non-negative.
        radius: f64,
    },
    /// An axis-aligned box specified by half-extents.
    Box {
        /// Half-extent along X, must be non-negative.
        half_x: f64,
        /// Half-extent along Y, must be non-negative.
        half_y: f64,
        /// Half-extent along Z, must be non-negative.
        half_z: f64,
    },
    /// An infinite plane.
    Plane {
        /// Plane normal.
        normal: Vec3,
        /// Offset along the normal.
        offset: f64,
    },
}

/// A collision shape plus the pose at which it is attached to its body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionShape {
    /// The shape payload.
    pub kind: ShapeKind,
    /// Position of the shape relative to the body's centre of mass.
    pub position: Vec3,
    /// Rotation of the shape relative to the body.
    pub rotation: Quat,
}

impl CollisionShape {
    /// Construct an `Empty` shape at the given pose.
    #[must_use]
    pub const fn empty(position: Vec3, rotation: Quat) -> Self {
        Self { kind: ShapeKind::Empty, position, rotation }
    }

    /// Construct a `Sphere` shape, rejecting a negative radius.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeDimension`] if `radius < 0.0`.
    pub fn sphere(radius: f64, position: Vec3, rotation: Quat) -> Result<Self, ValidationError> {
        if radius < 0.0 {
            return Err(ValidationError::NegativeDimension("sphere radius"));
        }
        Ok(Self { kind: ShapeKind::Sphere { radius }, position, rotation })
    }

    /// Construct a `Box` shape, rejecting negative half-extents.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeDimension`] if any half-extent is
    /// negative.
    pub fn cuboid(
        half_x: f64,
        half_y: f64,
        half_z: f64,
        position: Vec3,
        rotation: Quat,
    ) -> Result<Self, ValidationError> {
        if half_x < 0.0 || half_y < 0.0 || half_z < 0.0 {
            return Err(ValidationError::NegativeDimension("box half-extent"));
        }
        Ok(Self { kind: ShapeKind::Box { half_x, half_y, half_z }, position, rotation })
    }

    /// Construct a `Plane` shape at the identity pose (the only pose a plane
    /// may legally have; see [`crate::RigidBody`]'s exclusivity invariant).
    #[must_use]
    pub const fn plane(normal: Vec3, offset: f64) -> Self {
        Self {
            kind: ShapeKind::Plane { normal, offset },
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    /// Whether this shape is a [`ShapeKind::Plane`].
    #[must_use]
    pub const fn is_plane(&self) -> bool {
        matches!(self.kind, ShapeKind::Plane { .. })
    }

    /// Whether this shape sits at the identity pose (zero position, identity
    /// rotation).
    #[must_use]
    pub fn is_default_pose(&self) -> bool {
        self.position.is_zero() && self.rotation.is_identity()
    }
}
