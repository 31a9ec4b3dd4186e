//! ICS 26: Routing module. Dispatches messages to the client, connection and channel handlers,
//! routes packets to the application bound to their port, and persists the results.

pub mod context;
pub mod error;
pub mod handler;
pub mod host;
pub mod msgs;
