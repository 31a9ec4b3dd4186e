//! Protocol logic specific to ICS4 messages of type `MsgTimeout`.

use crate::events::{ChannelAttributes, IBCEvent, PacketAttributes};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics04_channel::channel::{Order, State};
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::verify::{
    client_at_height, open_connection_of, verify_next_sequence_recv,
    verify_packet_receipt_absence,
};
use crate::ics04_channel::handler::{PacketResult, TimeoutPacketResult};
use crate::ics04_channel::msgs::MsgTimeout;

pub fn process(ctx: &dyn ChannelReader, msg: MsgTimeout) -> HandlerResult<PacketResult, Error> {
    let mut output = HandlerOutput::builder();

    let packet = &msg.packet;

    let mut source_channel_end = ctx
        .channel_end(&packet.source_port, &packet.source_channel)
        .ok_or_else(|| {
            Kind::ChannelNotFound(packet.source_port.clone(), packet.source_channel.clone())
        })?;

    if !source_channel_end.is_open() {
        return Err(Kind::InvalidChannelState(
            packet.source_channel.clone(),
            source_channel_end.state(),
        )
        .into());
    }

    let counterparty = source_channel_end.counterparty();
    if counterparty.port_id() != &packet.destination_port
        || counterparty.channel_id() != Some(&packet.destination_channel)
    {
        return Err(Kind::InvalidPacketCounterparty(
            packet.destination_port.clone(),
            packet.destination_channel.clone(),
        )
        .into());
    }

    let connection_end = open_connection_of(ctx, &source_channel_end)?;

    let packet_commitment = ctx
        .get_packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence)
        .ok_or_else(|| Kind::PacketCommitmentNotFound(packet.sequence))?;

    if packet_commitment != packet.commitment() {
        return Err(Kind::IncorrectPacketCommitment(packet.sequence).into());
    }

    // The destination must be past the timeout at the proof height, by its height or by the
    // time of the consensus state the client holds there.
    let proof_height = msg.proofs.height();
    let (_, consensus_state) = client_at_height(ctx, &connection_end, proof_height)?;
    if !packet.timed_out(proof_height, consensus_state.timestamp) {
        return Err(Kind::PacketTimeoutNotReached(packet.sequence).into());
    }

    let channel = if source_channel_end.order_matches(Order::Ordered) {
        if packet.sequence < msg.next_sequence_recv {
            return Err(Kind::PacketAlreadyReceived(packet.sequence).into());
        }
        verify_next_sequence_recv(
            ctx,
            packet,
            msg.next_sequence_recv,
            &connection_end,
            &msg.proofs,
        )?;

        source_channel_end.set_state(State::Closed);
        Some(source_channel_end)
    } else {
        verify_packet_receipt_absence(ctx, packet, &connection_end, &msg.proofs)?;
        None
    };

    output.log(format!("success: packet {} timed out", packet));

    if let Some(closed) = &channel {
        output.emit(IBCEvent::CloseChannel(ChannelAttributes {
            port_id: packet.source_port.clone(),
            channel_id: packet.source_channel.clone(),
            connection_id: closed.connection_hops()[0].clone(),
            counterparty_port_id: packet.destination_port.clone(),
            counterparty_channel_id: Some(packet.destination_channel.clone()),
        }));
    }

    let result = PacketResult::Timeout(TimeoutPacketResult {
        port_id: packet.source_port.clone(),
        channel_id: packet.source_channel.clone(),
        seq: packet.sequence,
        channel,
    });

    output.emit(IBCEvent::TimeoutPacketChannel(PacketAttributes {
        packet: msg.packet,
    }));

    Ok(output.with_result(result))
}
