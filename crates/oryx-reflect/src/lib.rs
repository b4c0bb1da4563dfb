//! Reflective Access Control
//!
//! Decides whether a caller may suppress language-level access checks for a
//! reflected member ("make always-accessible") and, absent suppression,
//! whether the caller may touch the member right now. Enforcement of the
//! actual field read/write or invocation lives with the invocation
//! machinery; this crate only authorizes the attempt.
//!
//! Three pieces, leaves first:
//! - the visibility model (units, packages, opens/exports) lives in
//!   `oryx-types` and is consumed read-only here;
//! - [`decision`] holds the pure verdict functions;
//! - [`handle`] holds the stateful [`ReflectedMember`] wrapper with its
//!   override flag and access-check cache.

pub mod context;
pub mod decision;
pub mod error;
pub mod handle;

pub use context::{
    AccessContext, AccessRules, CallerResolver, DiagnosticsSink, ExposureEvent, FixedCaller,
    OpenGate, PermissionGate,
};
pub use decision::{decide_suppress, DenyReason, ExposureKind, StandardRules, SuppressVerdict};
pub use error::AccessError;
pub use handle::{set_accessible_all, Reflected, ReflectedMember};
