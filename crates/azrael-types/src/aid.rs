// SPDX-License-Identifier: Apache-2.0
//! Azrael identifier strings (`AID`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ValidationError;

/// A validated identifier: 1..32 characters drawn from `[a-zA-Z0-9_]`.
///
/// Used for template names, fragment names, and booster/factory part names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Aid(String);

impl Aid {
    /// Validate and construct an `Aid` from an owned `String`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAid`] if `value` is empty, longer
    /// than 32 characters, or contains a character outside
    /// `[a-zA-Z0-9_]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() || value.len() > 32 {
            return Err(ValidationError::InvalidAid(value));
        }
        let valid = value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
        if !valid {
            return Err(ValidationError::InvalidAid(value));
        }
        Ok(Self(value))
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Aid {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Aid> for String {
    fn from(aid: Aid) -> Self {
        aid.0
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for Aid {
    fn borrow(&self) -> &str {
        &self.0
    }
}
