// SPDX-License-Identifier: Apache-2.0
//! Reusable object blueprints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Aid, Booster, Factory, FragmentMeta, RigidBody, ValidationError};

/// A reusable blueprint from which object instances are spawned.
///
/// Every field arrives pre-validated by its own constructor ([`RigidBody`],
/// [`Booster`], [`Factory`]); `Template`'s own builder only asserts that the
/// parts are internally consistent as a set (see
/// [`TemplateBuilder::build`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// The template's name; unique within the Template Registry.
    pub aid: Aid,
    /// Default rigid-body state new instances start from.
    pub rbs: RigidBody,
    /// Visual fragments, keyed by fragment name.
    pub fragments: BTreeMap<Aid, FragmentMeta>,
    /// Force generators, keyed by part name.
    pub boosters: BTreeMap<Aid, Booster>,
    /// Spawn points, keyed by part name.
    pub factories: BTreeMap<Aid, Factory>,
    /// Opaque client-supplied payload, carried through unmodified.
    pub custom: String,
}

impl Template {
    /// Start building a `Template`.
    #[must_use]
    pub fn builder(aid: Aid, rbs: RigidBody) -> TemplateBuilder {
        TemplateBuilder {
            aid,
            rbs,
            fragments: BTreeMap::new(),
            boosters: BTreeMap::new(),
            factories: BTreeMap::new(),
            custom: String::new(),
        }
    }

    /// Look up a booster or factory part by name, distinguishing "no such
    /// part" from "wrong kind of part" the way `control_parts` needs to.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownPart`] if `part` names neither a
    /// booster nor a factory on this template.
    pub fn require_booster(&self, part: &Aid) -> Result<&Booster, ValidationError> {
        self.boosters.get(part).ok_or_else(|| ValidationError::UnknownPart {
            template: self.aid.to_string(),
            part: part.to_string(),
        })
    }

    /// See [`Self::require_booster`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownPart`] if `part` does not name a
    /// factory on this template.
    pub fn require_factory(&self, part: &Aid) -> Result<&Factory, ValidationError> {
        self.factories.get(part).ok_or_else(|| ValidationError::UnknownPart {
            template: self.aid.to_string(),
            part: part.to_string(),
        })
    }
}

/// Builder for [`Template`].
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    aid: Aid,
    rbs: RigidBody,
    fragments: BTreeMap<Aid, FragmentMeta>,
    boosters: BTreeMap<Aid, Booster>,
    factories: BTreeMap<Aid, Factory>,
    custom: String,
}

impl TemplateBuilder {
    /// Set the fragment set.
    #[must_use]
    pub fn fragments(mut self, fragments: BTreeMap<Aid, FragmentMeta>) -> Self {
        self.fragments = fragments;
        self
    }

    /// Set the booster set.
    #[must_use]
    pub fn boosters(mut self, boosters: BTreeMap<Aid, Booster>) -> Self {
        self.boosters = boosters;
        self
    }

    /// Set the factory set.
    #[must_use]
    pub fn factories(mut self, factories: BTreeMap<Aid, Factory>) -> Self {
        self.factories = factories;
        self
    }

    /// Set the opaque custom payload.
    #[must_use]
    pub fn custom(mut self, custom: impl Into<String>) -> Self {
        self.custom = custom.into();
        self
    }

    /// Finish construction.
    ///
    /// Every sub-part (`rbs`, each fragment, booster, factory) is already
    /// valid by construction, so this step cannot currently fail; it returns
    /// a `Result` so future cross-part invariants (e.g. factory
    /// `template_id` cycles, checked by the registry, not here) can be added
    /// without breaking callers.
    ///
    /// # Errors
    ///
    /// Currently infallible; reserved for future cross-part checks.
    pub fn build(self) -> Result<Template, ValidationError> {
        Ok(Template {
            aid: self.aid,
            rbs: self.rbs,
            fragments: self.fragments,
            boosters: self.boosters,
            factories: self.factories,
            custom: self.custom,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::RigidBody;

    #[test]
    fn builder_assembles_parts() {
        let aid = Aid::new("tmpl").unwrap();
        let rbs = RigidBody::builder().build().unwrap();
        let tmpl = Template::builder(aid.clone(), rbs).custom("hello").build().unwrap();
        assert_eq!(tmpl.aid, aid);
        assert_eq!(tmpl.custom, "hello");
        assert!(tmpl.fragments.is_empty());
    }

    #[test]
    fn unknown_part_lookup_fails() {
        let aid = Aid::new("tmpl").unwrap();
        let rbs = RigidBody::builder().build().unwrap();
        let tmpl = Template::builder(aid, rbs).build().unwrap();
        let missing = Aid::new("nope").unwrap();
        assert!(tmpl.require_booster(&missing).is_err());
        assert!(tmpl.require_factory(&missing).is_err());
    }
}
