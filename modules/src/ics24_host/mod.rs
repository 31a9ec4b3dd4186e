//! ICS 24: Host Requirements. Identifier validation and the path space under which the
//! IBC module persists (and proves) its records.

pub mod error;
pub mod identifier;
pub mod path;
pub mod validate;
