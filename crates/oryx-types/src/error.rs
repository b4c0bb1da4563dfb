//! Metadata registry errors

use crate::ty::TypeId;
use crate::unit::UnitId;
use thiserror::Error;

/// Errors that can occur while building or mutating the metadata registries
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetaError {
    /// A unit with the same name is already registered
    #[error("Unit '{name}' already registered")]
    DuplicateUnit {
        /// Conflicting unit name
        name: String,
    },

    /// Unit id does not resolve to a registered unit
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    /// Type id does not resolve to a registered type
    #[error("Unknown type: {0}")]
    UnknownType(TypeId),
}
