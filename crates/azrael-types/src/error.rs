// SPDX-License-Identifier: Apache-2.0
//! The single validation error type shared by every builder in this crate.

/// Failure returned by a validating constructor.
///
/// Builders never panic on malformed input: every constructor that can fail
/// returns this type, and callers (ultimately the Gateway) map it to a
/// user-visible `{ok:false, msg, data:null}` reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// An AID failed the `[a-zA-Z0-9_]{1,32}` check.
    #[error("invalid AID: {0:?}")]
    InvalidAid(String),
    /// A vector did not have the required arity.
    #[error("expected a {expected}-vector, got {actual} components")]
    WrongArity {
        /// Number of components required.
        expected: usize,
        /// Number of components actually supplied.
        actual: usize,
    },
    /// A scalar that must be non-negative was negative.
    #[error("{0} must be non-negative")]
    NegativeDimension(&'static str),
    /// A direction vector was too close to zero to normalize.
    #[error("direction vector is degenerate (norm < 1e-5)")]
    DegenerateDirection,
    /// A body contained a `Plane` shape alongside other shapes, or a `Plane`
    /// shape at a non-identity pose.
    #[error("a Plane collision shape must be the body's sole shape, at the identity pose")]
    PlaneExclusivityViolation,
    /// A fragment's `fragtype` tag was not a recognised value.
    #[error("unrecognised fragment type: {0:?}")]
    UnknownFragType(String),
    /// A custom data blob exceeded the 65535-byte limit.
    #[error("custom data exceeds 65535 bytes ({0} bytes supplied)")]
    CustomDataTooLarge(usize),
    /// A constraint kind was not a recognised value.
    #[error("unrecognised constraint type: {0:?}")]
    UnknownConstraintType(String),
    /// A factory/template reference named an AID not present on the
    /// template.
    #[error("no such part {part:?} on template {template:?}")]
    UnknownPart {
        /// The template the lookup was performed against.
        template: String,
        /// The part AID that was not found.
        part: String,
    },
}
