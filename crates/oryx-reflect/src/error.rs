//! Access-control errors
//!
//! All four variants are terminal for the current call: none are transient,
//! the same inputs always produce the same verdict.

use thiserror::Error;

/// Errors surfaced by the access-control engine and the reflected handles
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The external permission gate refused the suppress-checks capability
    #[error("Permission denied: {reason}")]
    PermissionDenied {
        /// Reason supplied by the gate
        reason: String,
    },

    /// `set_accessible` was denied by the suppression policy
    #[error("Unable to make {member} accessible: {reason}")]
    Inaccessible {
        /// Member the caller tried to widen
        member: String,
        /// Exports-vs-opens deficiency, rendered for humans
        reason: String,
    },

    /// Receiver/staticness mismatch in `can_access`; a caller error, not a
    /// policy failure
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// What was mismatched
        reason: String,
    },

    /// The cached fast-path check denied on the slow path; used by the
    /// invocation machinery
    #[error("Access to {member} denied for caller {caller}")]
    IllegalAccess {
        /// Member being used
        member: String,
        /// Denied caller type
        caller: String,
    },
}
