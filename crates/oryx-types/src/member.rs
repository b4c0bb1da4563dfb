//! Member descriptors
//!
//! A member is a field, method, or constructor declared by exactly one type.
//! Only the pieces the access-control engine reads are modelled: visibility,
//! staticness, and the declaring type.

use std::fmt;

use crate::ty::TypeId;

/// Language-level visibility of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Accessible everywhere the declaring type is
    Public,
    /// Accessible in the declaring package and in subclasses
    Protected,
    /// Accessible in the declaring runtime package only
    Package,
    /// Accessible in the declaring type only
    Private,
}

/// Member modifiers read by access checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    /// Visibility of the member
    pub visibility: Visibility,
    /// Whether the member is static
    pub is_static: bool,
}

impl Modifiers {
    /// Instance member with the given visibility
    pub const fn new(visibility: Visibility) -> Self {
        Modifiers {
            visibility,
            is_static: false,
        }
    }

    /// Make the member static
    pub const fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Whether the member is public
    pub const fn is_public(&self) -> bool {
        matches!(self.visibility, Visibility::Public)
    }

    /// Whether the member is protected
    pub const fn is_protected(&self) -> bool {
        matches!(self.visibility, Visibility::Protected)
    }
}

/// Kind of reflected member, used for dispatch and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// A field
    Field,
    /// A method
    Method,
    /// A constructor
    Constructor,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => write!(f, "field"),
            MemberKind::Method => write!(f, "method"),
            MemberKind::Constructor => write!(f, "constructor"),
        }
    }
}

/// A member declared by a runtime type
#[derive(Debug, Clone)]
pub struct MemberDef {
    /// Member name
    pub name: String,
    /// Declaring type
    pub declaring: TypeId,
    /// Modifiers read by access checks
    pub modifiers: Modifiers,
}

impl MemberDef {
    /// Create a member descriptor
    pub fn new(name: impl Into<String>, declaring: TypeId, modifiers: Modifiers) -> Self {
        MemberDef {
            name: name.into(),
            declaring,
            modifiers,
        }
    }
}
