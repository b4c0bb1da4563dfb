//! Runtime type table
//!
//! Types are stored in an append-only arena keyed by `TypeId`. The table
//! records the declaring unit, the package, the public flag, and an optional
//! superclass used for subclass walks. Hierarchies are acyclic by the host
//! type system's own invariant; the walk here does not re-verify that.

use std::fmt;

use crate::unit::UnitId;

/// Unique identifier for a type in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// A runtime type definition
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Fully qualified type name
    pub name: String,
    /// Declaring unit
    pub unit: UnitId,
    /// Package the type lives in
    pub package: String,
    /// Whether the type itself is public
    pub is_public: bool,
    /// Superclass, if any (single-parent chain)
    pub superclass: Option<TypeId>,
}

impl TypeDef {
    /// Create a non-public type with no superclass
    pub fn new(name: impl Into<String>, unit: UnitId, package: impl Into<String>) -> Self {
        TypeDef {
            name: name.into(),
            unit,
            package: package.into(),
            is_public: false,
            superclass: None,
        }
    }

    /// Mark the type public
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: TypeId) -> Self {
        self.superclass = Some(superclass);
        self
    }
}

/// Arena of runtime types
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Vec<TypeDef>,
    class_type: Option<TypeId>,
}

impl TypeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type, returning its id
    pub fn add_type(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(def);
        id
    }

    /// Get a type by id
    pub fn get(&self, ty: TypeId) -> Option<&TypeDef> {
        self.types.get(ty.0 as usize)
    }

    /// Type name for diagnostics; unknown ids render as the raw id
    pub fn describe(&self, ty: TypeId) -> String {
        match self.get(ty) {
            Some(def) => def.name.clone(),
            None => ty.to_string(),
        }
    }

    /// Declaring unit of a type
    pub fn unit_of(&self, ty: TypeId) -> Option<UnitId> {
        self.get(ty).map(|def| def.unit)
    }

    /// Check whether `sub` is `sup` or a transitive subclass of it
    pub fn is_subclass_of(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut current = Some(sub);
        while let Some(ty) = current {
            if ty == sup {
                return true;
            }
            current = self.get(ty).and_then(|def| def.superclass);
        }
        false
    }

    /// Whether two types share a runtime package (same unit, same package name)
    pub fn same_runtime_package(&self, a: TypeId, b: TypeId) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => a.unit == b.unit && a.package == b.package,
            _ => false,
        }
    }

    /// Designate the runtime's own class-object type
    ///
    /// Suppressing access checks on this type's constructor is never granted.
    pub fn set_class_type(&mut self, ty: TypeId) {
        self.class_type = Some(ty);
    }

    /// The designated class-object type, if any
    pub fn class_type(&self) -> Option<TypeId> {
        self.class_type
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
