//! ICS 23: Vector Commitments. Verification of ICS-23 existence and non-existence proofs,
//! and of multi-store proofs chaining a module store root into the application hash.

pub mod commitment;
pub mod error;
pub mod merkle;
pub mod multistore;
pub mod specs;
pub mod verify;

pub use commitment::{CommitmentPrefix, CommitmentProofBytes, CommitmentRoot};
