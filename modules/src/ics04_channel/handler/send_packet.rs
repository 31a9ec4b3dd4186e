//! Protocol logic for sending a packet: the source chain commits to it so that a relayer can
//! prove it to the destination.

use crate::events::{IBCEvent, PacketAttributes};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics04_channel::channel::State;
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::verify::open_connection_of;
use crate::ics04_channel::handler::{PacketResult, SendPacketResult};
use crate::ics04_channel::packet::Packet;

pub fn send_packet(ctx: &dyn ChannelReader, packet: Packet) -> HandlerResult<PacketResult, Error> {
    let mut output = HandlerOutput::builder();

    let source_channel_end = ctx
        .channel_end(&packet.source_port, &packet.source_channel)
        .ok_or_else(|| {
            Kind::ChannelNotFound(packet.source_port.clone(), packet.source_channel.clone())
        })?;

    if source_channel_end.state_matches(State::Closed) {
        return Err(Kind::ChannelClosed(packet.source_channel).into());
    }
    if !source_channel_end.is_open() {
        return Err(
            Kind::InvalidChannelState(packet.source_channel, source_channel_end.state()).into(),
        );
    }

    let counterparty = source_channel_end.counterparty();
    if counterparty.port_id() != &packet.destination_port
        || counterparty.channel_id() != Some(&packet.destination_channel)
    {
        return Err(Kind::InvalidPacketCounterparty(
            packet.destination_port,
            packet.destination_channel,
        )
        .into());
    }

    let connection_end = open_connection_of(ctx, &source_channel_end)?;
    let client_id = connection_end.client_id();
    let client_state = ctx
        .client_state(client_id)
        .ok_or_else(|| Kind::MissingClient(client_id.clone()))?;
    if client_state.is_frozen() {
        return Err(Kind::FrozenClient(client_id.clone()).into());
    }

    if !packet.has_timeout() {
        return Err(Kind::InvalidPacket(
            "packet has neither a height nor a timestamp timeout".to_string(),
        )
        .into());
    }

    // The packet must not already be timed out on the destination, as far as the client
    // knows the destination.
    let latest_height = client_state.latest_height();
    if !packet.timeout_height.is_zero() && latest_height >= packet.timeout_height {
        return Err(Kind::LowPacketHeight {
            height: latest_height,
            timeout: packet.timeout_height,
        }
        .into());
    }
    let latest_consensus = ctx
        .client_consensus_state(client_id, latest_height)
        .ok_or_else(|| Kind::MissingClientConsensusState(client_id.clone(), latest_height))?;
    if packet.timeout_timestamp.is_set()
        && latest_consensus.timestamp >= packet.timeout_timestamp
    {
        return Err(Kind::LowPacketTimestamp {
            timestamp: latest_consensus.timestamp,
            timeout: packet.timeout_timestamp,
        }
        .into());
    }

    let next_seq_send = ctx
        .get_next_sequence_send(&packet.source_port, &packet.source_channel)
        .ok_or_else(|| {
            Kind::MissingNextSequence(packet.source_port.clone(), packet.source_channel.clone())
        })?;
    if packet.sequence != next_seq_send {
        return Err(Kind::InvalidPacketSequence {
            given: packet.sequence,
            expected: next_seq_send,
        }
        .into());
    }

    output.log(format!("success: packet {} committed", packet));

    let result = PacketResult::Send(SendPacketResult {
        port_id: packet.source_port.clone(),
        channel_id: packet.source_channel.clone(),
        seq: packet.sequence,
        seq_number: next_seq_send.increment(),
        commitment: packet.commitment(),
    });

    output.emit(IBCEvent::SendPacketChannel(PacketAttributes { packet }));

    Ok(output.with_result(result))
}

#[cfg(test)]
mod tests {
    use crate::events::IBCEvent;
    use crate::ics02_client::height::Height;
    use crate::ics04_channel::channel::{ChannelEnd, Counterparty, Order, State};
    use crate::ics04_channel::context::{ChannelKeeper, ChannelReader};
    use crate::ics04_channel::error::Kind;
    use crate::ics04_channel::handler::send_packet::send_packet;
    use crate::ics04_channel::handler::test_util::open_connection;
    use crate::ics04_channel::handler::PacketResult;
    use crate::ics04_channel::packet::test_utils::dummy_packet;
    use crate::ics04_channel::packet::{Packet, Sequence};
    use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
    use crate::mock::context::MockContext;
    use crate::mock::host::block_time;
    use crate::timestamp::Timestamp;

    fn channel(state: State) -> ChannelEnd {
        ChannelEnd::new(
            state,
            Order::Unordered,
            Counterparty::new(PortId::transfer(), Some(ChannelId::new(1))),
            vec![ConnectionId::new(0)],
            "ics20-1".to_string(),
        )
    }

    fn context(state: State) -> MockContext {
        MockContext::default()
            .with_client(&ClientId::default(), Height::new(0, 10))
            .with_connection(ConnectionId::new(0), open_connection())
            .with_channel(PortId::transfer(), ChannelId::new(0), channel(state))
            .with_send_sequence(PortId::transfer(), ChannelId::new(0), 1.into())
    }

    #[test]
    fn send_packet_processing() {
        struct Test {
            name: String,
            ctx: MockContext,
            packet: Packet,
            want: Result<(), Kind>,
        }

        let tests: Vec<Test> = vec![
            Test {
                name: "Good parameters".to_string(),
                ctx: context(State::Open),
                packet: dummy_packet(1),
                want: Ok(()),
            },
            Test {
                name: "Sequence is not the next one".to_string(),
                ctx: context(State::Open),
                packet: dummy_packet(2),
                want: Err(Kind::InvalidPacketSequence {
                    given: Sequence::from(2),
                    expected: Sequence::from(1),
                }),
            },
            Test {
                name: "Timeout height already reached by the counterparty".to_string(),
                ctx: context(State::Open),
                packet: Packet {
                    timeout_height: Height::new(0, 10),
                    ..dummy_packet(1)
                },
                want: Err(Kind::LowPacketHeight {
                    height: Height::new(0, 10),
                    timeout: Height::new(0, 10),
                }),
            },
            Test {
                name: "Timeout timestamp already reached by the counterparty".to_string(),
                ctx: context(State::Open),
                packet: Packet {
                    timeout_height: Height::zero(),
                    timeout_timestamp: block_time(10),
                    ..dummy_packet(1)
                },
                want: Err(Kind::LowPacketTimestamp {
                    timestamp: block_time(10),
                    timeout: block_time(10),
                }),
            },
            Test {
                name: "No timeout at all".to_string(),
                ctx: context(State::Open),
                packet: Packet {
                    timeout_height: Height::zero(),
                    timeout_timestamp: Timestamp::none(),
                    ..dummy_packet(1)
                },
                want: Err(Kind::InvalidPacket(
                    "packet has neither a height nor a timestamp timeout".to_string(),
                )),
            },
            Test {
                name: "Destination is not the channel counterparty".to_string(),
                ctx: context(State::Open),
                packet: Packet {
                    destination_channel: ChannelId::new(7),
                    ..dummy_packet(1)
                },
                want: Err(Kind::InvalidPacketCounterparty(
                    PortId::transfer(),
                    ChannelId::new(7),
                )),
            },
            Test {
                name: "Channel is closed".to_string(),
                ctx: context(State::Closed),
                packet: dummy_packet(1),
                want: Err(Kind::ChannelClosed(ChannelId::new(0))),
            },
            Test {
                name: "Channel does not exist".to_string(),
                ctx: MockContext::default(),
                packet: dummy_packet(1),
                want: Err(Kind::ChannelNotFound(PortId::transfer(), ChannelId::new(0))),
            },
        ];

        for test in tests {
            let res = send_packet(&test.ctx, test.packet.clone());
            match (res, test.want) {
                (Ok(output), Ok(())) => {
                    assert!(matches!(output.events[0], IBCEvent::SendPacketChannel(_)));
                    match output.result {
                        PacketResult::Send(res) => {
                            assert_eq!(res.seq_number, Sequence::from(2));
                            assert_eq!(res.commitment, test.packet.commitment());
                        }
                        _ => panic!("send_packet: unexpected result for test: {}", test.name),
                    }
                }
                (Err(e), Err(kind)) => {
                    assert_eq!(e.kind(), &kind, "send_packet: {}", test.name);
                }
                (res, want) => panic!(
                    "send_packet: unexpected outcome for test: {}: got ok = {}, want ok = {}",
                    test.name,
                    res.is_ok(),
                    want.is_ok()
                ),
            }
        }
    }

    #[test]
    fn stored_send_advances_sequence() {
        let ctx = context(State::Open);
        let port_id = PortId::transfer();
        let channel_id = ChannelId::new(0);

        for seq in 1..=3 {
            let output = send_packet(&ctx, dummy_packet(seq)).unwrap();
            ctx.store_packet_result(output.result).unwrap();
        }

        assert_eq!(
            ctx.get_next_sequence_send(&port_id, &channel_id),
            Some(Sequence::from(4))
        );
        assert_eq!(
            ctx.get_packet_commitment(&port_id, &channel_id, Sequence::from(2)),
            Some(dummy_packet(2).commitment())
        );
    }
}
