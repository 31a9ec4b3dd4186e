//! ICS3 (connection) context. The two traits `ConnectionReader` and `ConnectionKeeper` define
//! the interface that any host chain must implement to be able to process any `ConnectionMsg`.

use crate::ics02_client::height::Height;
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics03_connection::error::Error;
use crate::ics03_connection::handler::{ConnectionIdState, ConnectionResult};
use crate::ics03_connection::version::Version;
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics23_commitment::commitment::CommitmentPrefix;
use crate::ics24_host::identifier::{ClientId, ConnectionId};
use crate::timestamp::Timestamp;

/// A context supplying all the necessary read-only dependencies for processing any `ConnectionMsg`.
pub trait ConnectionReader {
    /// Returns the ConnectionEnd for the given identifier `conn_id`.
    fn connection_end(&self, conn_id: &ConnectionId) -> Option<ConnectionEnd>;

    /// Returns the ClientState for the given identifier `client_id`.
    fn client_state(&self, client_id: &ClientId) -> Option<ClientState>;

    /// Returns the ConsensusState that the given client stores at a specific height.
    fn client_consensus_state(&self, client_id: &ClientId, height: Height)
        -> Option<ConsensusState>;

    /// Returns the current height of the local chain.
    fn host_current_height(&self) -> Height;

    /// Returns the current timestamp of the local chain.
    fn host_timestamp(&self) -> Timestamp;

    /// Returns the prefix that the local chain uses in the KV store.
    fn commitment_prefix(&self) -> CommitmentPrefix;

    /// Function required by ICS 03. Returns the list of all possible versions that the connection
    /// handshake protocol supports.
    fn get_compatible_versions(&self) -> Vec<Version>;

    /// Returns a counter on how many connections have been created thus far.
    fn connection_counter(&self) -> u64;
}

/// A context supplying all the necessary write-only dependencies (i.e., storage functionalities)
/// for processing any `ConnectionMsg`.
pub trait ConnectionKeeper {
    fn store_connection_result(&self, result: ConnectionResult) -> Result<(), Error> {
        self.store_connection(&result.connection_id, &result.connection_end)?;

        // If we generated an identifier, increase the counter & associate this new identifier
        // with the client id.
        if result.connection_id_state == ConnectionIdState::Generated {
            self.increase_connection_counter();

            self.store_connection_to_client(
                &result.connection_id,
                result.connection_end.client_id(),
            )?;
        }

        Ok(())
    }

    /// Stores the given connection_end at a path associated with the connection_id.
    fn store_connection(
        &self,
        connection_id: &ConnectionId,
        connection_end: &ConnectionEnd,
    ) -> Result<(), Error>;

    /// Stores the given connection_id at a path associated with the client_id.
    fn store_connection_to_client(
        &self,
        connection_id: &ConnectionId,
        client_id: &ClientId,
    ) -> Result<(), Error>;

    /// Called upon connection identifier creation (Init or Try process).
    /// Increases the counter which keeps track of how many connections have been created.
    fn increase_connection_counter(&self);
}
