//! Message definitions for the client handlers.

use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics07_tendermint::header::Header;
use crate::ics07_tendermint::misbehaviour::Misbehaviour;
use crate::ics24_host::identifier::ClientId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMsg {
    CreateClient(MsgCreateClient),
    UpdateClient(MsgUpdateClient),
    SubmitMisbehaviour(MsgSubmitMisbehaviour),
}

/// Creates a client tracking the chain in `client_state`, trusting `consensus_state` at its
/// latest height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgCreateClient {
    pub client_state: ClientState,
    pub consensus_state: ConsensusState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgUpdateClient {
    pub client_id: ClientId,
    pub header: Header,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgSubmitMisbehaviour {
    pub client_id: ClientId,
    pub misbehaviour: Misbehaviour,
}
