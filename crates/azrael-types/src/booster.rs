// SPDX-License-Identifier: Apache-2.0
//! Force generators (`Booster`) and spawners (`Factory`) attached to a
//! template's parts.

use serde::{Deserialize, Serialize};

use crate::{Aid, ValidationError, Vec3};

/// A force generator mounted at a fixed point on a body, firing along a
/// fixed local-frame direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Booster {
    /// Mount position, in the body's local frame.
    pub pos: Vec3,
    /// Firing direction, in the body's local frame. Always unit length.
    pub direction: Vec3,
    /// Minimum allowed commanded force.
    pub minval: f64,
    /// Maximum allowed commanded force.
    pub maxval: f64,
    /// Current commanded force scalar (updated by `control_parts`).
    pub force: f64,
}

impl Booster {
    /// Construct a `Booster`, normalising `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DegenerateDirection`] if `direction` is too
    /// close to zero to normalise.
    pub fn new(
        pos: Vec3,
        direction: Vec3,
        minval: f64,
        maxval: f64,
        force: f64,
    ) -> Result<Self, ValidationError> {
        let direction = direction.normalized().ok_or(ValidationError::DegenerateDirection)?;
        Ok(Self { pos, direction, minval, maxval, force })
    }
}

/// A spawn point mounted on a body: ejects new instances of `template_id`
/// along a fixed local-frame direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    /// Mount position, in the body's local frame.
    pub pos: Vec3,
    /// Ejection direction, in the body's local frame. Always unit length.
    pub direction: Vec3,
    /// Template instantiated on each fire.
    pub template_id: Aid,
    /// Minimum allowed ejection speed.
    pub exit_speed_min: f64,
    /// Maximum allowed ejection speed.
    pub exit_speed_max: f64,
}

impl Factory {
    /// Construct a `Factory`, normalising `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DegenerateDirection`] if `direction` is too
    /// close to zero to normalise.
    pub fn new(
        pos: Vec3,
        direction: Vec3,
        template_id: Aid,
        exit_speed_min: f64,
        exit_speed_max: f64,
    ) -> Result<Self, ValidationError> {
        let direction = direction.normalized().ok_or(ValidationError::DegenerateDirection)?;
        Ok(Self { pos, direction, template_id, exit_speed_min, exit_speed_max })
    }
}

/// One entry of a `control_parts` request's `cmd_boosters` map: set booster
/// `aid`'s commanded force to `force`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoosterCommand {
    /// New commanded force scalar.
    pub force: f64,
}

/// One entry of a `control_parts` request's `cmd_factories` map: fire
/// factory `aid` at the given exit speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactoryCommand {
    /// Commanded ejection speed.
    pub exit_speed: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn booster_rejects_zero_direction() {
        assert!(Booster::new(Vec3::ZERO, Vec3::ZERO, 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn booster_normalises_direction() {
        let b = Booster::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 0.0, 1.0, 0.0).unwrap();
        assert!((b.direction.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn factory_rejects_zero_direction() {
        let aid = Aid::new("f0").unwrap();
        assert!(Factory::new(Vec3::ZERO, Vec3::ZERO, aid, 0.0, 1.0).is_err());
    }
}
