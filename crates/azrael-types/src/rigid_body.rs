// SPDX-License-Identifier: Apache-2.0
//! Rigid body state and its partial-update ("patch") counterpart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Aid, CollisionShape, Quat, ValidationError, Vec3};

/// The Newtonian state of a single rigid body, plus its attached collision
/// geometry.
///
/// `version` is monotone per object and bumped only when a fragment's
/// *geometry* changes (see [`crate::FragmentMeta`] and the Object Store's
/// `setFragments` operation) — never by changes to this struct's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    /// Uniform visual/physical scale. Must be non-negative.
    pub scale: f64,
    /// Inverse mass (`0` means infinite mass / immovable). Must be
    /// non-negative.
    pub imass: f64,
    /// Coefficient of restitution. Must be non-negative.
    pub restitution: f64,
    /// Orientation.
    pub rotation: Quat,
    /// World-space position.
    pub position: Vec3,
    /// Linear velocity.
    pub velocity_lin: Vec3,
    /// Angular velocity.
    pub velocity_rot: Vec3,
    /// Attached collision shapes, keyed by part AID.
    pub cshapes: BTreeMap<Aid, CollisionShape>,
    /// Per-axis linear motion lock (0 = locked, 1 = free; source convention).
    pub axes_lock_lin: Vec3,
    /// Per-axis rotational motion lock.
    pub axes_lock_rot: Vec3,
    /// Monotone geometry version (see struct docs).
    pub version: u64,
}

impl RigidBody {
    /// Start building a `RigidBody` with the library's defaults (unit scale,
    /// zero motion, no shapes, version 0).
    #[must_use]
    pub fn builder() -> RigidBodyBuilder {
        RigidBodyBuilder::default()
    }

    /// Validate the `cshapes` plane-exclusivity invariant: if any shape is a
    /// `Plane`, it must be the body's only shape, at the identity pose.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PlaneExclusivityViolation`] on violation.
    pub fn check_plane_exclusivity(
        cshapes: &BTreeMap<Aid, CollisionShape>,
    ) -> Result<(), ValidationError> {
        let planes = cshapes.values().filter(|s| s.is_plane()).count();
        if planes == 0 {
            return Ok(());
        }
        if cshapes.len() == 1 {
            if let Some(only) = cshapes.values().next() {
                if only.is_default_pose() {
                    return Ok(());
                }
            }
        }
        Err(ValidationError::PlaneExclusivityViolation)
    }
}

/// Validating builder for [`RigidBody`].
#[derive(Debug, Clone)]
pub struct RigidBodyBuilder {
    scale: f64,
    imass: f64,
    restitution: f64,
    rotation: Quat,
    position: Vec3,
    velocity_lin: Vec3,
    velocity_rot: Vec3,
    cshapes: BTreeMap<Aid, CollisionShape>,
    axes_lock_lin: Vec3,
    axes_lock_rot: Vec3,
    version: u64,
}

impl Default for RigidBodyBuilder {
    fn default() -> Self {
        Self {
            scale: 1.0,
            imass: 1.0,
            restitution: 0.9,
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            velocity_lin: Vec3::ZERO,
            velocity_rot: Vec3::ZERO,
            cshapes: BTreeMap::new(),
            axes_lock_lin: Vec3::new(1.0, 1.0, 1.0),
            axes_lock_rot: Vec3::new(1.0, 1.0, 1.0),
            version: 0,
        }
    }
}

impl RigidBodyBuilder {
    /// Set the scale.
    #[must_use]
    pub const fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the inverse mass.
    #[must_use]
    pub const fn imass(mut self, imass: f64) -> Self {
        self.imass = imass;
        self
    }

    /// Set the restitution.
    #[must_use]
    pub const fn restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the rotation.
    #[must_use]
    pub const fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the position.
    #[must_use]
    pub const fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the linear velocity.
    #[must_use]
    pub const fn velocity_lin(mut self, v: Vec3) -> Self {
        self.velocity_lin = v;
        self
    }

    /// Set the angular velocity.
    #[must_use]
    pub const fn velocity_rot(mut self, v: Vec3) -> Self {
        self.velocity_rot = v;
        self
    }

    /// Set the attached collision shapes.
    #[must_use]
    pub fn cshapes(mut self, cshapes: BTreeMap<Aid, CollisionShape>) -> Self {
        self.cshapes = cshapes;
        self
    }

    /// Set the linear motion lock.
    #[must_use]
    pub const fn axes_lock_lin(mut self, v: Vec3) -> Self {
        self.axes_lock_lin = v;
        self
    }

    /// Set the rotational motion lock.
    #[must_use]
    pub const fn axes_lock_rot(mut self, v: Vec3) -> Self {
        self.axes_lock_rot = v;
        self
    }

    /// Set the geometry version.
    #[must_use]
    pub const fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Validate and construct the `RigidBody`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeDimension`] if `scale`, `imass`, or
    /// `restitution` is negative, or
    /// [`ValidationError::PlaneExclusivityViolation`] per
    /// [`RigidBody::check_plane_exclusivity`].
    pub fn build(self) -> Result<RigidBody, ValidationError> {
        if self.scale < 0.0 {
            return Err(ValidationError::NegativeDimension("scale"));
        }
        if self.imass < 0.0 {
            return Err(ValidationError::NegativeDimension("imass"));
        }
        if self.restitution < 0.0 {
            return Err(ValidationError::NegativeDimension("restitution"));
        }
        RigidBody::check_plane_exclusivity(&self.cshapes)?;
        Ok(RigidBody {
            scale: self.scale,
            imass: self.imass,
            restitution: self.restitution,
            rotation: self.rotation,
            position: self.position,
            velocity_lin: self.velocity_lin,
            velocity_rot: self.velocity_rot,
            cshapes: self.cshapes,
            axes_lock_lin: self.axes_lock_lin,
            axes_lock_rot: self.axes_lock_rot,
            version: self.version,
        })
    }
}

/// A partial update to a [`RigidBody`]: every field is optional, and only
/// the present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyPatch {
    /// New scale, if provided.
    pub scale: Option<f64>,
    /// New inverse mass, if provided.
    pub imass: Option<f64>,
    /// New restitution, if provided.
    pub restitution: Option<f64>,
    /// New rotation, if provided.
    pub rotation: Option<Quat>,
    /// New position, if provided.
    pub position: Option<Vec3>,
    /// New linear velocity, if provided.
    pub velocity_lin: Option<Vec3>,
    /// New angular velocity, if provided.
    pub velocity_rot: Option<Vec3>,
    /// New collision shape set, if provided (replaces the whole map).
    pub cshapes: Option<BTreeMap<Aid, CollisionShape>>,
    /// New linear motion lock, if provided.
    pub axes_lock_lin: Option<Vec3>,
    /// New rotational motion lock, if provided.
    pub axes_lock_rot: Option<Vec3>,
}

impl RigidBodyPatch {
    /// Whether this patch carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scale.is_none()
            && self.imass.is_none()
            && self.restitution.is_none()
            && self.rotation.is_none()
            && self.position.is_none()
            && self.velocity_lin.is_none()
            && self.velocity_rot.is_none()
            && self.cshapes.is_none()
            && self.axes_lock_lin.is_none()
            && self.axes_lock_rot.is_none()
    }

    /// Validate this patch's present fields against the same rules
    /// [`RigidBodyBuilder::build`] enforces.
    ///
    /// # Errors
    ///
    /// See [`RigidBodyBuilder::build`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(scale) = self.scale {
            if scale < 0.0 {
                return Err(ValidationError::NegativeDimension("scale"));
            }
        }
        if let Some(imass) = self.imass {
            if imass < 0.0 {
                return Err(ValidationError::NegativeDimension("imass"));
            }
        }
        if let Some(restitution) = self.restitution {
            if restitution < 0.0 {
                return Err(ValidationError::NegativeDimension("restitution"));
            }
        }
        if let Some(cshapes) = &self.cshapes {
            RigidBody::check_plane_exclusivity(cshapes)?;
        }
        Ok(())
    }

    /// Apply this patch on top of `base`, overlaying only the present
    /// fields. `base.version` is always preserved — version bumps are the
    /// Object Store's responsibility, driven by fragment geometry changes,
    /// never by a rigid-body patch.
    ///
    /// # Errors
    ///
    /// See [`Self::validate`].
    pub fn apply(&self, base: &RigidBody) -> Result<RigidBody, ValidationError> {
        self.validate()?;
        Ok(RigidBody {
            scale: self.scale.unwrap_or(base.scale),
            imass: self.imass.unwrap_or(base.imass),
            restitution: self.restitution.unwrap_or(base.restitution),
            rotation: self.rotation.unwrap_or(base.rotation),
            position: self.position.unwrap_or(base.position),
            velocity_lin: self.velocity_lin.unwrap_or(base.velocity_lin),
            velocity_rot: self.velocity_rot.unwrap_or(base.velocity_rot),
            cshapes: self.cshapes.clone().unwrap_or_else(|| base.cshapes.clone()),
            axes_lock_lin: self.axes_lock_lin.unwrap_or(base.axes_lock_lin),
            axes_lock_rot: self.axes_lock_rot.unwrap_or(base.axes_lock_rot),
            version: base.version,
        })
    }
}
