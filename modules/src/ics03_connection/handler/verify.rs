//! ICS3 verification functions, common across the Try, Ack and Confirm handlers of ICS3.

use crate::ics02_client::status::Status;
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics03_connection::context::ConnectionReader;
use crate::ics03_connection::error::{Error, Kind};
use crate::ics07_tendermint::client_def::TendermintClient;
use crate::ics24_host::identifier::ConnectionId;
use crate::proofs::Proofs;

/// Verifies that the counterparty holds `expected_conn` under `counterparty_connection_id`,
/// using the client of the local end `connection_end`.
pub fn verify_connection_proof(
    ctx: &dyn ConnectionReader,
    connection_end: &ConnectionEnd,
    counterparty_connection_id: &ConnectionId,
    expected_conn: &ConnectionEnd,
    proofs: &Proofs,
) -> Result<(), Error> {
    let client_id = connection_end.client_id();

    // Fetch the client state (IBC client on the local chain).
    let client_state = ctx
        .client_state(client_id)
        .ok_or_else(|| Kind::MissingClient(client_id.clone()))?;

    if client_state.is_frozen() {
        return Err(Kind::FrozenClient(client_id.clone()).into());
    }

    let latest = ctx
        .client_consensus_state(client_id, client_state.latest_height())
        .ok_or_else(|| {
            Kind::MissingClientConsensusState(client_id.clone(), client_state.latest_height())
        })?;
    if client_state.status(latest.timestamp, ctx.host_timestamp()) != Status::Active {
        return Err(Kind::InactiveClient(client_id.clone()).into());
    }

    let consensus_state = ctx
        .client_consensus_state(client_id, proofs.height())
        .ok_or_else(|| Kind::MissingClientConsensusState(client_id.clone(), proofs.height()))?;

    // Verify the proof for the connection state against the expected connection end.
    TendermintClient::default()
        .verify_connection_state(
            &client_state,
            &consensus_state,
            connection_end.counterparty().prefix(),
            proofs.object_proof(),
            proofs.height(),
            counterparty_connection_id,
            expected_conn,
        )
        .map_err(|e| Kind::InvalidProof.context(e).into())
}
