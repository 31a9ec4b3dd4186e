//! ICS4 verification functions, common across the channel handshake and packet handlers. Each
//! one resolves the client behind a connection end and checks a counterparty proof with it.

use crate::ics02_client::height::Height;
use crate::ics02_client::status::Status;
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics04_channel::channel::ChannelEnd;
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::packet::{ack_commitment, Packet, Sequence};
use crate::ics07_tendermint::client_def::TendermintClient;
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics24_host::identifier::{ChannelId, PortId};
use crate::proofs::Proofs;

/// The client of `connection_end`, which must be neither frozen nor expired, together with its
/// consensus state at `height`.
pub fn client_at_height(
    ctx: &dyn ChannelReader,
    connection_end: &ConnectionEnd,
    height: Height,
) -> Result<(ClientState, ConsensusState), Error> {
    let client_id = connection_end.client_id();

    let client_state = ctx
        .client_state(client_id)
        .ok_or_else(|| Kind::MissingClient(client_id.clone()))?;

    if client_state.is_frozen() {
        return Err(Kind::FrozenClient(client_id.clone()).into());
    }

    let latest_height = client_state.latest_height();
    let latest = ctx
        .client_consensus_state(client_id, latest_height)
        .ok_or_else(|| Kind::MissingClientConsensusState(client_id.clone(), latest_height))?;
    if client_state.status(latest.timestamp, ctx.host_timestamp()) != Status::Active {
        return Err(Kind::InactiveClient(client_id.clone()).into());
    }

    let consensus_state = ctx
        .client_consensus_state(client_id, height)
        .ok_or_else(|| Kind::MissingClientConsensusState(client_id.clone(), height))?;

    Ok((client_state, consensus_state))
}

/// Entry point for verifying all proofs bundled in any ICS4 channel handshake message.
pub fn verify_channel_proofs(
    ctx: &dyn ChannelReader,
    connection_end: &ConnectionEnd,
    port_id: &PortId,
    channel_id: &ChannelId,
    expected_chan: &ChannelEnd,
    proofs: &Proofs,
) -> Result<(), Error> {
    let (client_state, consensus_state) = client_at_height(ctx, connection_end, proofs.height())?;

    TendermintClient::default()
        .verify_channel_state(
            &client_state,
            &consensus_state,
            connection_end.counterparty().prefix(),
            proofs.object_proof(),
            proofs.height(),
            port_id,
            channel_id,
            expected_chan,
        )
        .map_err(|e| Kind::InvalidProof.context(e).into())
}

/// Verifies that the source chain committed `packet`.
pub fn verify_packet_recv_proofs(
    ctx: &dyn ChannelReader,
    packet: &Packet,
    connection_end: &ConnectionEnd,
    proofs: &Proofs,
) -> Result<(), Error> {
    let (client_state, consensus_state) = client_at_height(ctx, connection_end, proofs.height())?;

    TendermintClient::default()
        .verify_packet_commitment(
            &client_state,
            &consensus_state,
            connection_end.counterparty().prefix(),
            proofs.object_proof(),
            proofs.height(),
            &packet.source_port,
            &packet.source_channel,
            packet.sequence,
            &packet.commitment(),
        )
        .map_err(|e| Kind::InvalidProof.context(e).into())
}

/// Verifies that the destination chain wrote `acknowledgement` for `packet`.
pub fn verify_packet_acknowledgement_proofs(
    ctx: &dyn ChannelReader,
    packet: &Packet,
    acknowledgement: &[u8],
    connection_end: &ConnectionEnd,
    proofs: &Proofs,
) -> Result<(), Error> {
    let (client_state, consensus_state) = client_at_height(ctx, connection_end, proofs.height())?;

    TendermintClient::default()
        .verify_packet_acknowledgement(
            &client_state,
            &consensus_state,
            connection_end.counterparty().prefix(),
            proofs.object_proof(),
            proofs.height(),
            &packet.destination_port,
            &packet.destination_channel,
            packet.sequence,
            &ack_commitment(acknowledgement),
        )
        .map_err(|e| Kind::InvalidProof.context(e).into())
}

/// Verifies the next receive sequence of the destination end of an ordered channel.
pub fn verify_next_sequence_recv(
    ctx: &dyn ChannelReader,
    packet: &Packet,
    next_sequence_recv: Sequence,
    connection_end: &ConnectionEnd,
    proofs: &Proofs,
) -> Result<(), Error> {
    let (client_state, consensus_state) = client_at_height(ctx, connection_end, proofs.height())?;

    TendermintClient::default()
        .verify_next_sequence_recv(
            &client_state,
            &consensus_state,
            connection_end.counterparty().prefix(),
            proofs.object_proof(),
            proofs.height(),
            &packet.destination_port,
            &packet.destination_channel,
            next_sequence_recv,
        )
        .map_err(|e| Kind::InvalidProof.context(e).into())
}

/// Verifies that the destination end of an unordered channel holds no receipt for `packet`.
pub fn verify_packet_receipt_absence(
    ctx: &dyn ChannelReader,
    packet: &Packet,
    connection_end: &ConnectionEnd,
    proofs: &Proofs,
) -> Result<(), Error> {
    let (client_state, consensus_state) = client_at_height(ctx, connection_end, proofs.height())?;

    TendermintClient::default()
        .verify_packet_receipt_absence(
            &client_state,
            &consensus_state,
            connection_end.counterparty().prefix(),
            proofs.object_proof(),
            proofs.height(),
            &packet.destination_port,
            &packet.destination_channel,
            packet.sequence,
        )
        .map_err(|e| Kind::InvalidProof.context(e).into())
}

/// The single connection a channel runs over, which must exist and be open.
pub fn open_connection_of(
    ctx: &dyn ChannelReader,
    channel_end: &ChannelEnd,
) -> Result<ConnectionEnd, Error> {
    let hops = channel_end.connection_hops();
    if hops.len() != 1 {
        return Err(Kind::InvalidConnectionHopsLength(hops.len()).into());
    }

    let connection_end = ctx
        .connection_end(&hops[0])
        .ok_or_else(|| Kind::MissingConnection(hops[0].clone()))?;
    if !connection_end.is_open() {
        return Err(Kind::ConnectionNotOpen(hops[0].clone()).into());
    }

    Ok(connection_end)
}
