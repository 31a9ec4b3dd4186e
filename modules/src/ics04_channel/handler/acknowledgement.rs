//! Protocol logic specific to ICS4 messages of type `MsgAcknowledgement`.

use crate::events::{IBCEvent, PacketAttributes};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics04_channel::channel::Order;
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::verify::{
    open_connection_of, verify_packet_acknowledgement_proofs,
};
use crate::ics04_channel::handler::{AckPacketResult, PacketResult};
use crate::ics04_channel::msgs::MsgAcknowledgement;

pub fn process(
    ctx: &dyn ChannelReader,
    msg: MsgAcknowledgement,
) -> HandlerResult<PacketResult, Error> {
    let mut output = HandlerOutput::builder();

    let packet = &msg.packet;

    let source_channel_end = ctx
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

    // Only packets this chain sent and has not settled yet can be acknowledged.
    let packet_commitment = ctx
        .get_packet_commitment(&packet.source_port, &packet.source_channel, packet.sequence)
        .ok_or_else(|| Kind::PacketCommitmentNotFound(packet.sequence))?;

    if packet_commitment != packet.commitment() {
        return Err(Kind::IncorrectPacketCommitment(packet.sequence).into());
    }

    verify_packet_acknowledgement_proofs(
        ctx,
        packet,
        &msg.acknowledgement,
        &connection_end,
        &msg.proofs,
    )?;

    output.log("success: packet acknowledgement verification passed");

    let seq_number = if source_channel_end.order_matches(Order::Ordered) {
        let next_seq_ack = ctx
            .get_next_sequence_ack(&packet.source_port, &packet.source_channel)
            .ok_or_else(|| {
                Kind::MissingNextSequence(packet.source_port.clone(), packet.source_channel.clone())
            })?;

        if packet.sequence != next_seq_ack {
            return Err(Kind::InvalidPacketSequence {
                given: packet.sequence,
                expected: next_seq_ack,
            }
            .into());
        }

        Some(next_seq_ack.increment())
    } else {
        None
    };

    let result = PacketResult::Ack(AckPacketResult {
        port_id: packet.source_port.clone(),
        channel_id: packet.source_channel.clone(),
        seq: packet.sequence,
        seq_number,
    });

    output.emit(IBCEvent::AcknowledgePacketChannel(PacketAttributes {
        packet: msg.packet,
    }));

    Ok(output.with_result(result))
}
