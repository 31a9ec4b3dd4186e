//! ICS 02: Client implementation for verifying remote IBC-enabled chains.

pub mod client_type;
pub mod context;
pub mod error;
pub mod handler;
pub mod height;
pub mod msgs;
pub mod status;
