//! Access decision engine
//!
//! Pure verdict functions. [`decide_suppress`] answers whether a caller may
//! suppress language-level access checks for a member; [`StandardRules`]
//! answers whether ordinary access rules admit the caller right now. Neither
//! holds state; caching is the handle's concern, and only for the
//! access-now decision (suppression is a one-time act).

use std::fmt;

use oryx_types::{Modifiers, TypeId, TypeTable, UnitId, UnitRegistry, Visibility};

use crate::context::AccessRules;

/// Which package relation a verdict refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureKind {
    /// The "opened to" relation
    Opens,
    /// The "exported to" relation
    Exports,
}

impl fmt::Display for ExposureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExposureKind::Opens => write!(f, "opens"),
            ExposureKind::Exports => write!(f, "exports"),
        }
    }
}

/// Why suppression was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The declaring unit lacks the needed relation to the caller's unit
    NotExposed {
        /// Relation whose absence caused the denial
        missing: ExposureKind,
        /// Package the member's declaring type lives in
        package: String,
        /// Unit declaring the member
        declaring_unit: UnitId,
        /// Unit of the denied caller
        caller_unit: UnitId,
    },
    /// Metadata for one of the involved types is missing from the table
    UnknownType(TypeId),
}

impl DenyReason {
    /// Render the reason with registry names, for error messages
    pub fn render(&self, units: &UnitRegistry) -> String {
        match self {
            DenyReason::NotExposed {
                missing,
                package,
                declaring_unit,
                caller_unit,
            } => format!(
                "{} does not \"{} {}\" to {}",
                units.describe(*declaring_unit),
                missing,
                package,
                units.describe(*caller_unit),
            ),
            DenyReason::UnknownType(ty) => format!("no metadata for {}", ty),
        }
    }
}

/// Verdict of [`decide_suppress`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressVerdict {
    /// Suppression permitted
    Allow {
        /// `Some` when the grant exists only through dynamically added
        /// exposure; drives the audit sink, never the verdict
        widened: Option<ExposureKind>,
    },
    /// Suppression denied
    Deny(DenyReason),
}

impl SuppressVerdict {
    /// Whether the verdict permits suppression
    pub fn is_allow(&self) -> bool {
        matches!(self, SuppressVerdict::Allow { .. })
    }
}

/// Decide whether `caller` may suppress access checks for a member of
/// `declaring` with the given modifiers
///
/// Rule order is fixed, first match wins:
/// 1. caller and declaring type share a unit;
/// 2. the caller's unit is the trusted unit;
/// 3. the declaring unit is unnamed;
/// 4. the declaring package is open to the caller's unit;
/// 5. the declaring package is exported to the caller's unit, the declaring
///    type is public, and the member is public, or protected-static with
///    the caller a subclass of the declaring type.
///
/// Anything else is a denial naming the exports-vs-opens deficiency.
pub fn decide_suppress(
    types: &TypeTable,
    units: &UnitRegistry,
    caller: TypeId,
    declaring: TypeId,
    modifiers: Modifiers,
) -> SuppressVerdict {
    let declaring_def = match types.get(declaring) {
        Some(def) => def,
        None => return SuppressVerdict::Deny(DenyReason::UnknownType(declaring)),
    };
    let caller_unit = match types.unit_of(caller) {
        Some(unit) => unit,
        None => return SuppressVerdict::Deny(DenyReason::UnknownType(caller)),
    };
    let declaring_unit = declaring_def.unit;

    if caller_unit == declaring_unit {
        return SuppressVerdict::Allow { widened: None };
    }
    if units.is_trusted(caller_unit) {
        return SuppressVerdict::Allow { widened: None };
    }
    if !units.is_named(declaring_unit) {
        return SuppressVerdict::Allow { widened: None };
    }

    let package = declaring_def.package.as_str();
    if units.is_open(declaring_unit, package, caller_unit) {
        let widened = (!units.is_open_statically(declaring_unit, package, caller_unit))
            .then_some(ExposureKind::Opens);
        return SuppressVerdict::Allow { widened };
    }

    if declaring_def.is_public && units.is_exported(declaring_unit, package, caller_unit) {
        let allowed = modifiers.is_public()
            || (modifiers.is_protected()
                && modifiers.is_static
                && types.is_subclass_of(caller, declaring));
        if allowed {
            let widened = (!units.is_exported_statically(declaring_unit, package, caller_unit))
                .then_some(ExposureKind::Exports);
            return SuppressVerdict::Allow { widened };
        }
    }

    let missing = if declaring_def.is_public && modifiers.is_public() {
        ExposureKind::Exports
    } else {
        ExposureKind::Opens
    };
    SuppressVerdict::Deny(DenyReason::NotExposed {
        missing,
        package: package.to_string(),
        declaring_unit,
        caller_unit,
    })
}

/// Ordinary language access rules, with readability assumed
///
/// The one variation from plain language access: the caller's unit is
/// assumed to read the declaring unit, so unit-level access reduces to the
/// declaring package being exported or open to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl AccessRules for StandardRules {
    fn verify_member_access(
        &self,
        types: &TypeTable,
        units: &UnitRegistry,
        caller: TypeId,
        declaring: TypeId,
        target: Option<TypeId>,
        modifiers: Modifiers,
    ) -> bool {
        if caller == declaring {
            return true;
        }
        let (caller_def, declaring_def) = match (types.get(caller), types.get(declaring)) {
            (Some(c), Some(d)) => (c, d),
            _ => return false,
        };

        if caller_def.unit != declaring_def.unit {
            let reachable = !units.is_named(declaring_def.unit)
                || units.is_exported(declaring_def.unit, &declaring_def.package, caller_def.unit)
                || units.is_open(declaring_def.unit, &declaring_def.package, caller_def.unit);
            if !reachable {
                return false;
            }
        }

        let same_package = types.same_runtime_package(caller, declaring);
        if !declaring_def.is_public && !same_package {
            return false;
        }

        let visible = match modifiers.visibility {
            Visibility::Public => true,
            Visibility::Protected => same_package || types.is_subclass_of(caller, declaring),
            Visibility::Package => same_package,
            Visibility::Private => false,
        };
        if !visible {
            return false;
        }

        // protected instance access narrows to targets assignable to the caller
        if modifiers.is_protected() && !same_package {
            if let Some(target) = target {
                if target != caller && !types.is_subclass_of(target, caller) {
                    return false;
                }
            }
        }

        true
    }
}
