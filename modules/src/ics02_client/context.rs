//! ICS2 (client) context. The two traits `ClientReader` and `ClientKeeper` define the interface
//! that any host chain must implement to be able to process any `ClientMsg`.

use crate::ics02_client::error::Error;
use crate::ics02_client::handler::ClientResult;
use crate::ics02_client::height::Height;
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics24_host::identifier::ClientId;
use crate::timestamp::Timestamp;

/// Defines the read-only part of ICS2 (client functions) context.
pub trait ClientReader {
    fn client_state(&self, client_id: &ClientId) -> Option<ClientState>;

    fn consensus_state(&self, client_id: &ClientId, height: Height) -> Option<ConsensusState>;

    /// Heights at which the client holds a consensus state, in increasing order.
    fn consensus_heights(&self, client_id: &ClientId) -> Vec<Height>;

    /// Number of clients created so far; the next client gets this counter.
    fn client_counter(&self) -> u64;

    fn host_height(&self) -> Height;

    fn host_timestamp(&self) -> Timestamp;
}

/// Defines the write-only part of ICS2 (client functions) context.
pub trait ClientKeeper {
    fn store_client_result(&self, handler_res: ClientResult) -> Result<(), Error> {
        match handler_res {
            ClientResult::Create(res) => {
                self.store_client_state(res.client_id.clone(), res.client_state.clone())?;
                self.store_consensus_state(
                    res.client_id,
                    res.client_state.latest_height(),
                    res.consensus_state,
                )?;
                self.increase_client_counter();
            }
            ClientResult::Update(res) => {
                self.store_client_state(res.client_id.clone(), res.client_state.clone())?;
                if let Some(consensus_state) = res.consensus_state {
                    self.store_consensus_state(
                        res.client_id.clone(),
                        res.client_state.latest_height(),
                        consensus_state,
                    )?;
                }
                for height in res.pruned {
                    self.delete_consensus_state(res.client_id.clone(), height)?;
                }
            }
            ClientResult::Misbehaviour(res) => {
                self.store_client_state(res.client_id, res.client_state)?;
            }
        }
        Ok(())
    }

    fn store_client_state(&self, client_id: ClientId, client_state: ClientState) -> Result<(), Error>;

    fn store_consensus_state(
        &self,
        client_id: ClientId,
        height: Height,
        consensus_state: ConsensusState,
    ) -> Result<(), Error>;

    fn delete_consensus_state(&self, client_id: ClientId, height: Height) -> Result<(), Error>;

    fn increase_client_counter(&self);
}
