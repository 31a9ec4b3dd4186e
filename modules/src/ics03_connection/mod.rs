//! ICS 03: Connection implementation for establishing a connection between two chains, each
//! tracking the other with a light client.

pub mod connection;
pub mod context;
pub mod error;
pub mod handler;
pub mod msgs;
pub mod version;
