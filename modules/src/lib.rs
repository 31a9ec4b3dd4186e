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
#![allow(clippy::large_enum_variant)]

//! Implementation of the Inter-Blockchain Communication Protocol (IBC).
//!
//! This crate comprises the on-chain data structures and logic of the following modules:
//!
//! - ICS 02: Client
//! - ICS 03: Connection
//! - ICS 04: Channel (handshake and packets)
//! - ICS 07: Tendermint Client
//! - ICS 23: Vector Commitment Scheme (proof verification, multi-store proofs)
//! - ICS 24: Host Requirements (identifiers, paths)
//! - ICS 26: Routing (host context and message delivery)

pub mod events;
pub mod handler;
pub mod ics02_client;
pub mod ics03_connection;
pub mod ics04_channel;
pub mod ics07_tendermint;
pub mod ics23_commitment;
pub mod ics24_host;
pub mod ics26_routing;
pub mod proofs;
pub mod proto;
pub mod store;
pub mod timestamp;

#[cfg(any(test, feature = "mocks"))]
pub mod mock;

pub use ics02_client::height::Height;
