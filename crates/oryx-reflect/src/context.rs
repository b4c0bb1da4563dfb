//! External collaborators of the access-control engine
//!
//! The engine itself is pure; everything environmental comes in through the
//! traits here: the permission gate consulted before any override-flag
//! mutation, caller resolution from the call stack, the ordinary
//! language-access rules, and an optional audit sink. [`AccessContext`]
//! bundles them with the metadata registries for one call.

use oryx_types::{Modifiers, TypeId, TypeTable, UnitId, UnitRegistry};

use crate::decision::{ExposureKind, StandardRules};
use crate::error::AccessError;

/// Gate consulted before any override-flag mutation
///
/// The one-time "may I even attempt to change accessibility" capability;
/// owned by the embedding runtime's security policy.
pub trait PermissionGate {
    /// Check the suppress-checks capability for the current execution context
    fn check_suppress(&self) -> Result<(), AccessError>;
}

/// Gate used when no security policy is installed; always allows
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl PermissionGate for OpenGate {
    fn check_suppress(&self) -> Result<(), AccessError> {
        Ok(())
    }
}

/// Resolves the type of the code invoking the current public operation
pub trait CallerResolver {
    /// Type of the immediate caller
    fn current_caller(&self) -> TypeId;
}

/// Caller resolved out of band by the embedder; also used in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedCaller(pub TypeId);

impl CallerResolver for FixedCaller {
    fn current_caller(&self) -> TypeId {
        self.0
    }
}

/// The host language-access-rule check
///
/// Answers "is this member visible to this caller under ordinary rules".
/// The engine routes to it and caches the outcome; it never re-derives the
/// micro-rules itself.
pub trait AccessRules {
    /// Verify ordinary member access for `caller` on `declaring`'s member
    ///
    /// `target` is the runtime type the member is used on: the declaring
    /// type for constructors, absent for static members, the receiver's
    /// type otherwise.
    fn verify_member_access(
        &self,
        types: &TypeTable,
        units: &UnitRegistry,
        caller: TypeId,
        declaring: TypeId,
        target: Option<TypeId>,
        modifiers: Modifiers,
    ) -> bool;
}

/// Audit event: a suppress grant that only exists through dynamically added
/// exposure, i.e. one that would have failed under the static declarations
#[derive(Debug, Clone, Copy)]
pub struct ExposureEvent<'e> {
    /// Unit of the caller that was granted suppression
    pub caller_unit: UnitId,
    /// Unit declaring the member
    pub declaring_unit: UnitId,
    /// Package the grant went through
    pub package: &'e str,
    /// Member name
    pub member: &'e str,
    /// Relation that carried the grant
    pub via: ExposureKind,
}

/// Optional migration-audit sink; never influences the verdict
pub trait DiagnosticsSink {
    /// Called after a suppress grant that relied on dynamic widening
    fn exposure_widened(&self, event: &ExposureEvent<'_>);
}

/// Everything a handle operation needs from the environment
#[derive(Clone, Copy)]
pub struct AccessContext<'a> {
    /// Runtime type table
    pub types: &'a TypeTable,
    /// Unit registry (visibility model)
    pub units: &'a UnitRegistry,
    /// Permission gate
    pub gate: &'a dyn PermissionGate,
    /// Caller resolution
    pub caller: &'a dyn CallerResolver,
    /// Ordinary language-access rules
    pub rules: &'a dyn AccessRules,
    /// Audit sink, if instrumentation is enabled
    pub diagnostics: Option<&'a dyn DiagnosticsSink>,
}

impl<'a> AccessContext<'a> {
    /// Context with the open gate, standard rules, and no diagnostics
    pub fn new(
        types: &'a TypeTable,
        units: &'a UnitRegistry,
        caller: &'a dyn CallerResolver,
    ) -> Self {
        AccessContext {
            types,
            units,
            gate: &OpenGate,
            caller,
            rules: &StandardRules,
            diagnostics: None,
        }
    }

    /// Replace the permission gate
    pub fn with_gate(mut self, gate: &'a dyn PermissionGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the language-access rules
    pub fn with_rules(mut self, rules: &'a dyn AccessRules) -> Self {
        self.rules = rules;
        self
    }

    /// Install an audit sink
    pub fn with_diagnostics(mut self, sink: &'a dyn DiagnosticsSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}
