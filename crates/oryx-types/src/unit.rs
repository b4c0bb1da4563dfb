//! Units, packages, and their exposure relations
//!
//! A unit is a deployable grouping of packages (the module analogue). Each
//! package a unit declares carries two independent relations: "opened to"
//! (reflective access without regard to visibility modifiers) and "exported
//! to" (ordinary use of public members by other units). The registry answers
//! the open/export queries consumed by the access-control engine and also
//! records exposure widened dynamically at runtime, which is tracked
//! separately so that migration auditing can tell static declarations from
//! runtime grants.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

use crate::error::MetaError;

/// Unique identifier for a unit in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(pub(crate) u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// To whom a package relation (opens or exports) is granted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Exposure {
    /// Not granted to anyone
    #[default]
    None,
    /// Granted unconditionally
    ToAll,
    /// Granted to a specific set of units
    ToUnits(FxHashSet<UnitId>),
}

impl Exposure {
    /// Check whether the relation reaches `requester`
    pub fn reaches(&self, requester: UnitId) -> bool {
        match self {
            Exposure::None => false,
            Exposure::ToAll => true,
            Exposure::ToUnits(units) => units.contains(&requester),
        }
    }

    /// Widen the relation: `None` target means "to all"
    fn grant(&mut self, to: Option<UnitId>) {
        match to {
            None => *self = Exposure::ToAll,
            Some(unit) => match self {
                Exposure::ToAll => {}
                Exposure::ToUnits(units) => {
                    units.insert(unit);
                }
                Exposure::None => {
                    let mut units = FxHashSet::default();
                    units.insert(unit);
                    *self = Exposure::ToUnits(units);
                }
            },
        }
    }
}

/// Static relations a unit declares for one of its packages
#[derive(Debug, Clone, Default)]
struct PackageDef {
    opens: Exposure,
    exports: Exposure,
}

/// A unit definition: an optional name plus its declared packages
///
/// Built fluently before registration:
///
/// ```
/// # use oryx_types::Unit;
/// let unit = Unit::named("oryx.base")
///     .exports("oryx/util")
///     .opens("oryx/internal");
/// ```
#[derive(Debug, Clone)]
pub struct Unit {
    name: Option<String>,
    packages: FxHashMap<String, PackageDef>,
}

impl Unit {
    /// Create a named unit with no packages
    pub fn named(name: impl Into<String>) -> Self {
        Unit {
            name: Some(name.into()),
            packages: FxHashMap::default(),
        }
    }

    /// Create an unnamed unit
    ///
    /// Every package of an unnamed unit reads as open and exported to all.
    pub fn unnamed() -> Self {
        Unit {
            name: None,
            packages: FxHashMap::default(),
        }
    }

    /// Declare a package with no exposure
    pub fn with_package(mut self, package: &str) -> Self {
        self.packages.entry(package.to_string()).or_default();
        self
    }

    /// Open a package to all units
    pub fn opens(mut self, package: &str) -> Self {
        self.packages.entry(package.to_string()).or_default().opens = Exposure::ToAll;
        self
    }

    /// Open a package to a specific set of units
    pub fn opens_to(mut self, package: &str, units: &[UnitId]) -> Self {
        self.packages.entry(package.to_string()).or_default().opens =
            Exposure::ToUnits(units.iter().copied().collect());
        self
    }

    /// Export a package to all units
    pub fn exports(mut self, package: &str) -> Self {
        self.packages.entry(package.to_string()).or_default().exports = Exposure::ToAll;
        self
    }

    /// Export a package to a specific set of units
    pub fn exports_to(mut self, package: &str, units: &[UnitId]) -> Self {
        self.packages.entry(package.to_string()).or_default().exports =
            Exposure::ToUnits(units.iter().copied().collect());
        self
    }

    /// Whether this unit has a name
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Unit name, if named
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn package(&self, name: &str) -> Option<&PackageDef> {
        self.packages.get(name)
    }
}

/// Exposure added at runtime, tracked per (unit, package)
#[derive(Debug, Default)]
struct DynamicExposure {
    opens: FxHashMap<UnitId, FxHashMap<String, Exposure>>,
    exports: FxHashMap<UnitId, FxHashMap<String, Exposure>>,
}

/// Registry of all units known to the runtime
///
/// Static unit definitions are immutable once registered; dynamic widening
/// (`add_opens`/`add_exports`) goes through an interior lock so concurrent
/// readers never observe a partially applied grant. Queries are referentially
/// transparent between mutations.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    names: FxHashMap<String, UnitId>,
    trusted: Option<UnitId>,
    dynamic: RwLock<DynamicExposure>,
}

impl UnitRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit, returning its id
    ///
    /// Named units must be unique; unnamed units may be registered freely.
    pub fn add_unit(&mut self, unit: Unit) -> Result<UnitId, MetaError> {
        if let Some(name) = unit.name() {
            if self.names.contains_key(name) {
                return Err(MetaError::DuplicateUnit {
                    name: name.to_string(),
                });
            }
        }
        let id = UnitId(self.units.len() as u32);
        if let Some(name) = unit.name() {
            self.names.insert(name.to_string(), id);
        }
        self.units.push(unit);
        Ok(id)
    }

    /// Get a unit by id
    pub fn get(&self, unit: UnitId) -> Option<&Unit> {
        self.units.get(unit.0 as usize)
    }

    /// Look up a unit id by name
    pub fn lookup(&self, name: &str) -> Option<UnitId> {
        self.names.get(name).copied()
    }

    /// Display name for diagnostics
    pub fn describe(&self, unit: UnitId) -> String {
        match self.get(unit).and_then(|u| u.name()) {
            Some(name) => format!("unit {}", name),
            None => "unnamed unit".to_string(),
        }
    }

    /// Whether the unit is named
    ///
    /// Unknown ids read as named so that no implicit grant follows from a
    /// stale or foreign id.
    pub fn is_named(&self, unit: UnitId) -> bool {
        self.get(unit).map_or(true, |u| u.is_named())
    }

    /// Designate the trusted unit (the platform's own base unit)
    pub fn set_trusted(&mut self, unit: UnitId) -> Result<(), MetaError> {
        if self.get(unit).is_none() {
            return Err(MetaError::UnknownUnit(unit));
        }
        self.trusted = Some(unit);
        Ok(())
    }

    /// The trusted unit, if designated
    pub fn trusted(&self) -> Option<UnitId> {
        self.trusted
    }

    /// Whether `unit` is the trusted unit
    pub fn is_trusted(&self, unit: UnitId) -> bool {
        self.trusted == Some(unit)
    }

    /// Whether `package` in `unit` is open to `requester`
    ///
    /// True for every package of an unnamed unit, for statically declared
    /// opens, and for opens added dynamically.
    pub fn is_open(&self, unit: UnitId, package: &str, requester: UnitId) -> bool {
        if self.is_open_statically(unit, package, requester) {
            return true;
        }
        self.dynamic
            .read()
            .opens
            .get(&unit)
            .and_then(|packages| packages.get(package))
            .is_some_and(|exposure| exposure.reaches(requester))
    }

    /// Whether `package` in `unit` is exported to `requester`
    pub fn is_exported(&self, unit: UnitId, package: &str, requester: UnitId) -> bool {
        if self.is_exported_statically(unit, package, requester) {
            return true;
        }
        self.dynamic
            .read()
            .exports
            .get(&unit)
            .and_then(|packages| packages.get(package))
            .is_some_and(|exposure| exposure.reaches(requester))
    }

    /// Whether the open relation holds without any dynamic widening
    pub fn is_open_statically(&self, unit: UnitId, package: &str, requester: UnitId) -> bool {
        match self.get(unit) {
            Some(u) if u.is_named() => u
                .package(package)
                .is_some_and(|p| p.opens.reaches(requester)),
            Some(_) => true,
            None => false,
        }
    }

    /// Whether the export relation holds without any dynamic widening
    pub fn is_exported_statically(&self, unit: UnitId, package: &str, requester: UnitId) -> bool {
        match self.get(unit) {
            Some(u) if u.is_named() => u
                .package(package)
                .is_some_and(|p| p.exports.reaches(requester)),
            Some(_) => true,
            None => false,
        }
    }

    /// Open `package` in `unit` at runtime; `to: None` opens it to all units
    pub fn add_opens(
        &self,
        unit: UnitId,
        package: &str,
        to: Option<UnitId>,
    ) -> Result<(), MetaError> {
        if self.get(unit).is_none() {
            return Err(MetaError::UnknownUnit(unit));
        }
        let mut dynamic = self.dynamic.write();
        dynamic
            .opens
            .entry(unit)
            .or_default()
            .entry(package.to_string())
            .or_default()
            .grant(to);
        Ok(())
    }

    /// Export `package` in `unit` at runtime; `to: None` exports it to all units
    pub fn add_exports(
        &self,
        unit: UnitId,
        package: &str,
        to: Option<UnitId>,
    ) -> Result<(), MetaError> {
        if self.get(unit).is_none() {
            return Err(MetaError::UnknownUnit(unit));
        }
        let mut dynamic = self.dynamic.write();
        dynamic
            .exports
            .entry(unit)
            .or_default()
            .entry(package.to_string())
            .or_default()
            .grant(to);
        Ok(())
    }

    /// Number of registered units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
