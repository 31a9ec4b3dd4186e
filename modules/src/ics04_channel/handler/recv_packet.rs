//! Protocol logic specific to ICS4 messages of type `MsgRecvPacket`.

use crate::events::{IBCEvent, PacketAttributes};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics04_channel::channel::Order;
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::verify::{open_connection_of, verify_packet_recv_proofs};
use crate::ics04_channel::handler::{PacketResult, RecvPacketResult};
use crate::ics04_channel::msgs::MsgRecvPacket;

pub fn process(ctx: &dyn ChannelReader, msg: MsgRecvPacket) -> HandlerResult<PacketResult, Error> {
    let mut output = HandlerOutput::builder();

    let packet = &msg.packet;

    let dest_channel_end = ctx
        .channel_end(&packet.destination_port, &packet.destination_channel)
        .ok_or_else(|| {
            Kind::ChannelNotFound(
                packet.destination_port.clone(),
                packet.destination_channel.clone(),
            )
        })?;

    if !dest_channel_end.is_open() {
        return Err(Kind::InvalidChannelState(
            packet.destination_channel.clone(),
            dest_channel_end.state(),
        )
        .into());
    }

    let counterparty = dest_channel_end.counterparty();
    if counterparty.port_id() != &packet.source_port
        || counterparty.channel_id() != Some(&packet.source_channel)
    {
        return Err(Kind::InvalidPacketCounterparty(
            packet.source_port.clone(),
            packet.source_channel.clone(),
        )
        .into());
    }

    let connection_end = open_connection_of(ctx, &dest_channel_end)?;

    let host_height = ctx.host_height();
    if !packet.timeout_height.is_zero() && host_height >= packet.timeout_height {
        return Err(Kind::LowPacketHeight {
            height: host_height,
            timeout: packet.timeout_height,
        }
        .into());
    }
    let host_timestamp = ctx.host_timestamp();
    if packet.timeout_timestamp.is_set() && host_timestamp >= packet.timeout_timestamp {
        return Err(Kind::LowPacketTimestamp {
            timestamp: host_timestamp,
            timeout: packet.timeout_timestamp,
        }
        .into());
    }

    verify_packet_recv_proofs(ctx, packet, &connection_end, &msg.proofs)?;

    output.log("success: packet receive proof verification passed");

    let result = if dest_channel_end.order_matches(Order::Ordered) {
        let next_seq_recv = ctx
            .get_next_sequence_recv(&packet.destination_port, &packet.destination_channel)
            .ok_or_else(|| {
                Kind::MissingNextSequence(
                    packet.destination_port.clone(),
                    packet.destination_channel.clone(),
                )
            })?;

        if packet.sequence != next_seq_recv {
            return Err(Kind::InvalidPacketSequence {
                given: packet.sequence,
                expected: next_seq_recv,
            }
            .into());
        }

        RecvPacketResult::Ordered {
            port_id: packet.destination_port.clone(),
            channel_id: packet.destination_channel.clone(),
            next_seq_recv: next_seq_recv.increment(),
        }
    } else {
        if ctx.get_packet_receipt(
            &packet.destination_port,
            &packet.destination_channel,
            packet.sequence,
        ) {
            return Err(Kind::PacketAlreadyReceived(packet.sequence).into());
        }

        RecvPacketResult::Unordered {
            port_id: packet.destination_port.clone(),
            channel_id: packet.destination_channel.clone(),
            sequence: packet.sequence,
        }
    };

    output.emit(IBCEvent::ReceivePacketChannel(PacketAttributes {
        packet: msg.packet,
    }));

    Ok(output.with_result(PacketResult::Recv(result)))
}

#[cfg(test)]
mod tests {
    use crate::events::IBCEvent;
    use crate::ics02_client::height::Height;
    use crate::ics04_channel::channel::{ChannelEnd, Counterparty, Order, State};
    use crate::ics04_channel::context::ChannelKeeper;
    use crate::ics04_channel::error::Kind;
    use crate::ics04_channel::handler::test_util::context_tracking;
    use crate::ics04_channel::handler::{packet_dispatch, PacketResult, RecvPacketResult};
    use crate::ics04_channel::msgs::{MsgRecvPacket, PacketMsg};
    use crate::ics04_channel::packet::test_utils::dummy_packet;
    use crate::ics04_channel::packet::{Packet, Sequence};
    use crate::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
    use crate::ics24_host::path::Path;
    use crate::mock::context::MockContext;
    use crate::mock::host::{mock_chain_id, MockChainHost};
    use crate::proofs::Proofs;

    fn channel(ordering: Order) -> ChannelEnd {
        ChannelEnd::new(
            State::Open,
            ordering,
            Counterparty::new(PortId::transfer(), Some(ChannelId::new(0))),
            vec![ConnectionId::new(0)],
            "ics20-1".to_string(),
        )
    }

    /// The sending chain, with the commitment of `packet` in its latest block.
    fn sender_with(packet: &Packet) -> MockChainHost {
        let mut chain = MockChainHost::new(mock_chain_id());
        chain
            .ibc()
            .store_packet_commitment(
                &packet.source_port,
                &packet.source_channel,
                packet.sequence,
                packet.commitment(),
            )
            .unwrap();
        chain.commit_block();
        chain
    }

    fn recv_msg(chain: &MockChainHost, packet: Packet) -> PacketMsg {
        let committed = dummy_packet(u64::from(packet.sequence));
        let height = chain.latest_height();
        let proof = chain
            .proof(
                &Path::Commitments {
                    port_id: committed.source_port.clone(),
                    channel_id: committed.source_channel.clone(),
                    sequence: committed.sequence,
                },
                height,
            )
            .unwrap();
        PacketMsg::RecvPacket(MsgRecvPacket {
            packet,
            proofs: Proofs::new(proof, height).unwrap(),
        })
    }

    fn receiver(chain: &MockChainHost, ordering: Order, next_seq_recv: u64) -> MockContext {
        context_tracking(chain)
            .with_channel(PortId::transfer(), ChannelId::new(1), channel(ordering))
            .with_recv_sequence(PortId::transfer(), ChannelId::new(1), next_seq_recv.into())
    }

    #[test]
    fn recv_packet_processing() {
        struct Test {
            name: String,
            ctx: MockContext,
            msg: PacketMsg,
            want: Result<(), Kind>,
        }

        let chain = sender_with(&dummy_packet(1));

        let tests: Vec<Test> = vec![
            Test {
                name: "Unordered channel".to_string(),
                ctx: receiver(&chain, Order::Unordered, 1),
                msg: recv_msg(&chain, dummy_packet(1)),
                want: Ok(()),
            },
            Test {
                name: "Ordered channel, next expected sequence".to_string(),
                ctx: receiver(&chain, Order::Ordered, 1),
                msg: recv_msg(&chain, dummy_packet(1)),
                want: Ok(()),
            },
            Test {
                name: "Ordered channel, out of order".to_string(),
                ctx: receiver(&chain, Order::Ordered, 2),
                msg: recv_msg(&chain, dummy_packet(1)),
                want: Err(Kind::InvalidPacketSequence {
                    given: Sequence::from(1),
                    expected: Sequence::from(2),
                }),
            },
            Test {
                name: "Packet data differs from the commitment".to_string(),
                ctx: receiver(&chain, Order::Unordered, 1),
                msg: recv_msg(
                    &chain,
                    Packet {
                        data: b"forged".to_vec(),
                        ..dummy_packet(1)
                    },
                ),
                want: Err(Kind::InvalidProof),
            },
            Test {
                name: "Host is past the timeout height".to_string(),
                ctx: receiver(&chain, Order::Unordered, 1),
                msg: recv_msg(
                    &chain,
                    Packet {
                        timeout_height: Height::new(0, 50),
                        ..dummy_packet(1)
                    },
                ),
                want: Err(Kind::LowPacketHeight {
                    height: Height::new(0, 100),
                    timeout: Height::new(0, 50),
                }),
            },
            Test {
                name: "Packet from a channel that is not the counterparty".to_string(),
                ctx: receiver(&chain, Order::Unordered, 1),
                msg: recv_msg(
                    &chain,
                    Packet {
                        source_channel: ChannelId::new(5),
                        ..dummy_packet(1)
                    },
                ),
                want: Err(Kind::InvalidPacketCounterparty(
                    PortId::transfer(),
                    ChannelId::new(5),
                )),
            },
        ];

        for test in tests {
            let res = packet_dispatch(&test.ctx, test.msg.clone());
            match (res, test.want) {
                (Ok(output), Ok(())) => {
                    assert!(matches!(output.events[0], IBCEvent::ReceivePacketChannel(_)));
                    assert!(matches!(output.result, PacketResult::Recv(_)));
                }
                (Err(e), Err(kind)) => {
                    assert_eq!(e.kind(), &kind, "recv_packet: {}", test.name);
                }
                (res, want) => panic!(
                    "recv_packet: unexpected outcome for test: {}: got ok = {}, want ok = {}",
                    test.name,
                    res.is_ok(),
                    want.is_ok()
                ),
            }
        }
    }

    #[test]
    fn unordered_packet_is_received_once() {
        let chain = sender_with(&dummy_packet(1));
        let ctx = receiver(&chain, Order::Unordered, 1);

        let output = packet_dispatch(&ctx, recv_msg(&chain, dummy_packet(1))).unwrap();
        match &output.result {
            PacketResult::Recv(RecvPacketResult::Unordered { sequence, .. }) => {
                assert_eq!(*sequence, Sequence::from(1))
            }
            _ => panic!("unexpected result type"),
        }
        ctx.store_packet_result(output.result).unwrap();

        let err = packet_dispatch(&ctx, recv_msg(&chain, dummy_packet(1))).unwrap_err();
        assert_eq!(err.kind(), &Kind::PacketAlreadyReceived(Sequence::from(1)));
    }
}
