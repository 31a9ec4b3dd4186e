#![forbid(unsafe_code)]
#![deny(
    // warnings,
    // missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications,
    rust_2018_idioms
)]

//! IBC relayer: follows two chains, completes connection and channel handshakes between them,
//! and carries packets, acknowledgements and timeouts across open channels.

pub mod chain;
pub mod channel;
pub mod components;
pub mod config;
pub mod connection;
pub mod error;
pub mod event_monitor;
pub mod foreign_client;
pub mod supervisor;
pub mod tracker;
pub mod util;
pub mod worker;

#[cfg(test)]
mod testing;
