//! Message definitions for the connection handshake datagrams.

use std::time::Duration;

use crate::ics03_connection::connection::Counterparty;
use crate::ics03_connection::version::Version;
use crate::ics24_host::identifier::{ClientId, ConnectionId};
use crate::proofs::Proofs;

/// Enumeration of all possible messages that the ICS3 protocol processes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionMsg {
    ConnectionOpenInit(MsgConnectionOpenInit),
    ConnectionOpenTry(Box<MsgConnectionOpenTry>),
    ConnectionOpenAck(Box<MsgConnectionOpenAck>),
    ConnectionOpenConfirm(MsgConnectionOpenConfirm),
}

/// Starts a handshake. The counterparty connection id is not known yet; `version`, if set,
/// restricts the offer to a single supported version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgConnectionOpenInit {
    pub client_id: ClientId,
    pub counterparty: Counterparty,
    pub version: Option<Version>,
    pub delay_period: Duration,
}

/// Answers an Init on the counterparty, proving the counterparty end is in state Init.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgConnectionOpenTry {
    pub client_id: ClientId,
    pub counterparty: Counterparty,
    pub counterparty_versions: Vec<Version>,
    pub delay_period: Duration,
    pub proofs: Proofs,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgConnectionOpenAck {
    pub connection_id: ConnectionId,
    pub counterparty_connection_id: ConnectionId,
    pub version: Version,
    pub proofs: Proofs,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgConnectionOpenConfirm {
    pub connection_id: ConnectionId,
    pub proofs: Proofs,
}
