//! Implementations of the host and chain capabilities for tests: an in-memory context with
//! builders, a block-producing chain serving real proofs, and the Merkle trees behind them.

pub mod context;
pub mod host;
pub mod tree;
