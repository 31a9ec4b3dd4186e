//! Writes the acknowledgement a module produced for a received packet.

use crate::events::{IBCEvent, WriteAckAttributes};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::{PacketResult, WriteAckPacketResult};
use crate::ics04_channel::packet::{ack_commitment, Packet};

pub fn process(
    ctx: &dyn ChannelReader,
    packet: Packet,
    ack: Vec<u8>,
) -> HandlerResult<PacketResult, Error> {
    let mut output = HandlerOutput::builder();

    if ack.is_empty() {
        return Err(Kind::EmptyAcknowledgement.into());
    }

    check(ctx, &packet)?;

    output.log(format!("success: acknowledgement written for packet {}", packet));

    let result = PacketResult::WriteAck(WriteAckPacketResult {
        port_id: packet.destination_port.clone(),
        channel_id: packet.destination_channel.clone(),
        seq: packet.sequence,
        ack_commitment: ack_commitment(&ack),
    });

    output.emit(IBCEvent::WriteAcknowledgementChannel(WriteAckAttributes {
        packet,
        ack,
    }));

    Ok(output.with_result(result))
}

/// Fails if an acknowledgement is already written for `packet`. Callable before the module
/// produces one.
pub fn check(ctx: &dyn ChannelReader, packet: &Packet) -> Result<(), Error> {
    if ctx
        .get_packet_acknowledgement(
            &packet.destination_port,
            &packet.destination_channel,
            packet.sequence,
        )
        .is_some()
    {
        return Err(Kind::AcknowledgementExists(packet.sequence).into());
    }
    Ok(())
}
