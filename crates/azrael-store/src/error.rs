// SPDX-License-Identifier: Apache-2.0
//! Errors surfaced by the Template Registry and Object Store.

use azrael_types::{Aid, ObjId, ValidationError};

/// Errors surfaced by whole-or-nothing store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// A requested template AID is not on record.
    #[error("unknown template {0}")]
    UnknownTemplate(Aid),
    /// A requested object ID is not on record.
    #[error("unknown object {0}")]
    UnknownObject(ObjId),
    /// One of the submitted templates failed its own validation.
    #[error("template validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// The Asset Store rejected a call; treated as an upstream failure.
    #[error("asset store error: {0}")]
    AssetStore(String),
}
