// SPDX-License-Identifier: Apache-2.0
//! The per-instance object document owned by the Object Store.

use serde::{Deserialize, Serialize};

use crate::{Aid, ObjId, Template};

/// The canonical persisted record of one spawned object instance.
///
/// `template.rbs` carries this instance's authoritative rigid-body state;
/// `version` lives both here and (redundantly, at spawn time) inside
/// `template.rbs.version` — reads always trust this top-level field and
/// overwrite the embedded one with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDocument {
    /// This instance's identifier.
    pub obj_id: ObjId,
    /// The template this instance was spawned from.
    pub template_id: Aid,
    /// Monotone geometry version; see [`crate::RigidBody`]'s doc comment.
    pub version: u64,
    /// The instance's own copy of its template, carrying live rigid-body
    /// state and any `setFragments`/`setCustom` edits. Fragment file bytes
    /// are never present here.
    pub template: Template,
    /// Opaque client-supplied payload, distinct from the template's own
    /// `custom` field; limited to 65535 bytes.
    pub custom: String,
    /// Opaque retrieval handle for this instance's asset-scoped fragment
    /// files, as returned by the Asset Store's `spawnInstance`.
    pub url_frag: String,
}

/// Maximum length, in bytes, of an object's `custom` payload. A payload of
/// exactly this length is accepted; one byte longer is rejected.
pub const MAX_CUSTOM_DATA_BYTES: usize = 65535;

impl ObjectDocument {
    /// The instance's authoritative rigid-body state, with `version`
    /// overwritten by this document's own `version` field (see struct doc).
    #[must_use]
    pub fn rigid_body(&self) -> crate::RigidBody {
        let mut rbs = self.template.rbs.clone();
        rbs.version = self.version;
        rbs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Aid, RigidBody};

    #[test]
    fn rigid_body_uses_document_version() {
        let aid = Aid::new("t").unwrap();
        let rbs = RigidBody::builder().version(99).build().unwrap();
        let template = Template::builder(aid.clone(), rbs).build().unwrap();
        let doc = ObjectDocument {
            obj_id: ObjId::new(1),
            template_id: aid,
            version: 5,
            template,
            custom: String::new(),
            url_frag: String::new(),
        };
        assert_eq!(doc.rigid_body().version, 5);
    }
}
