// SPDX-License-Identifier: Apache-2.0
//! Object instance identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an object instance, allocated by the ID Allocator (C7).
///
/// The source treats object IDs as opaque non-empty strings; this port uses
/// a transparent `u64` newtype instead (see DESIGN.md, "Open Questions
/// decided"). `Display` renders the decimal value, so callers that only ever
/// observe object IDs through their string form (e.g. `"1"`, `"2"`) see
/// identical behaviour.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjId(pub u64);

impl ObjId {
    /// Construct an `ObjId` from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObjId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
