//! Oryx Runtime Metadata
//!
//! Units (the module analogue), packages and their exposure relations,
//! runtime types, and member descriptors. This crate is pure data: it is
//! queried by the reflection access-control engine but decides nothing
//! itself.

#![warn(missing_docs)]

pub mod error;
pub mod member;
pub mod ty;
pub mod unit;

pub use error::MetaError;
pub use member::{MemberDef, MemberKind, Modifiers, Visibility};
pub use ty::{TypeDef, TypeId, TypeTable};
pub use unit::{Exposure, Unit, UnitId, UnitRegistry};
