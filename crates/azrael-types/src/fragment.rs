// SPDX-License-Identifier: Apache-2.0
//! Visual fragments: named geometry pieces attached to a body.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{Quat, ValidationError, Vec3};

/// A fragment's geometry tag.
///
/// `Del` is a tombstone value used only inside [`FragmentOp`]; it never
/// appears on a persisted [`FragmentMeta`] (a deleted fragment is removed
/// outright, not stored with this tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragType {
    /// Raw point/triangle soup.
    Raw,
    /// COLLADA mesh.
    Dae,
    /// Wavefront OBJ mesh.
    Obj,
}

impl FragType {
    /// Parse a fragment type tag, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownFragType`] for anything other than
    /// `RAW`, `DAE`, or `OBJ`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.to_ascii_uppercase().as_str() {
            "RAW" => Ok(Self::Raw),
            "DAE" => Ok(Self::Dae),
            "OBJ" => Ok(Self::Obj),
            other => Err(ValidationError::UnknownFragType(other.to_string())),
        }
    }
}

/// Persisted fragment metadata: pose plus the set of filenames stored in the
/// Asset Store. File bytes never live here; callers that need bytes go
/// through the Asset Store directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentMeta {
    /// Geometry tag.
    pub fragtype: FragType,
    /// Visual scale.
    pub scale: f64,
    /// Position relative to the owning body.
    pub position: Vec3,
    /// Rotation relative to the owning body.
    pub rotation: Quat,
    /// Filenames stored for this fragment in the Asset Store.
    pub filenames: BTreeSet<String>,
}

/// A client-supplied patch to one fragment, as used by `setFragments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FragmentOp {
    /// Replace the fragment wholesale. Must be fully specified: every state
    /// field plus a non-empty file set.
    Put {
        /// New geometry tag.
        fragtype: FragType,
        /// New scale.
        scale: f64,
        /// New position.
        position: Vec3,
        /// New rotation.
        rotation: Quat,
        /// Files to write, replacing the fragment's entire file set.
        files: BTreeMap<String, Vec<u8>>,
    },
    /// Modify an existing fragment in place. Absent fields are left
    /// untouched; `put` adds/overwrites files, `del` removes them.
    Mod {
        /// New geometry tag, if changing.
        fragtype: Option<FragType>,
        /// New scale, if changing.
        scale: Option<f64>,
        /// New position, if changing.
        position: Option<Vec3>,
        /// New rotation, if changing.
        rotation: Option<Quat>,
        /// Files to add or overwrite.
        put: BTreeMap<String, Vec<u8>>,
        /// Filenames to remove.
        del: Vec<String>,
    },
    /// Remove the fragment (metadata and all files).
    Del,
}

impl FragmentOp {
    /// Whether this op, applied to a not-yet-existing fragment, carries
    /// enough information to create one. Only `Put` with a non-empty file
    /// set qualifies; `Mod`/`Del` require a pre-existing fragment.
    #[must_use]
    pub fn can_create(&self) -> bool {
        matches!(self, Self::Put { files, .. } if !files.is_empty())
    }
}
