//! This module defines the various errors that be raised in the relayer.

use anomaly::{BoxError, Context};
use thiserror::Error;

use ibc::ics02_client::height::Height;
use ibc::ics24_host::identifier::ChainId;

/// An error that can be raised by the relayer.
pub type Error = anomaly::Error<Kind>;

/// Various kinds of errors that can be raiser by the relayer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Kind {
    /// I/O error
    #[error("I/O error")]
    Io,

    /// Invalid configuration
    #[error("invalid configuration")]
    Config,

    /// The logging subscriber could not be installed
    #[error("failed to initialize tracing")]
    Tracing,

    /// A path or handshake names a chain with no configuration or handle
    #[error("chain {0} is not configured")]
    UnknownChain(ChainId),

    /// The chain could not be reached or did not answer in time
    #[error("chain {0} is unavailable")]
    Unavailable(ChainId),

    /// A query failed or returned nothing
    #[error("query on chain {0} failed")]
    Query(ChainId),

    /// No proof could be produced for a path
    #[error("no proof on chain {0} for {1} at height {2}")]
    MissingProof(ChainId, String, Height),

    /// The chain processed the message and rejected it
    #[error("chain {0} rejected {1}")]
    Rejected(ChainId, &'static str),

    /// The chain rejected a message because a proof did not verify
    #[error("proof verification failed on chain {0}")]
    VerificationFailed(ChainId),

    /// The client on a chain could not be brought up to date
    #[error("failed to update client {0}")]
    ClientUpdate(String),

    /// A handshake step did not produce the expected end state
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A packet was moved to a state its lifecycle does not allow
    #[error("packet {0}: cannot move from {1} to {2}")]
    InvalidTransition(String, String, String),

    /// An internal queue was closed before the work was handed off
    #[error("worker channel closed")]
    ChannelClosed,

    /// Every retry was used up
    #[error("gave up after {0} attempts")]
    MaxRetry(u32),
}

impl Kind {
    /// Add a given source error as context for this error kind
    ///
    /// This is typically use with `map_err` as follows:
    ///
    /// ```ignore
    /// let x = self.something.do_stuff()
    ///     .map_err(|e| error::Kind::Config.context(e))?;
    /// ```
    pub fn context(self, source: impl Into<BoxError>) -> Context<Self> {
        Context::new(self, Some(source.into()))
    }

    /// Failures that may go away on their own: the same message can be sent again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Kind::Io | Kind::Unavailable(_) | Kind::Query(_) | Kind::MissingProof(..)
        )
    }

    /// The destination refused a proof. Usually the client there is behind the proof height.
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Kind::VerificationFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Kind;
    use ibc::ics24_host::identifier::ChainId;

    #[test]
    fn classification() {
        let chain = ChainId::new("chain-a".to_string(), 0);

        assert!(Kind::Unavailable(chain.clone()).is_transient());
        assert!(Kind::Query(chain.clone()).is_transient());
        assert!(!Kind::Rejected(chain.clone(), "recv_packet").is_transient());
        assert!(!Kind::VerificationFailed(chain.clone()).is_transient());
        assert!(Kind::VerificationFailed(chain).is_verification_failure());
        assert!(!Kind::MaxRetry(3).is_verification_failure());
    }
}
