use std::sync::Arc;

use crate::handler::HandlerOutput;
use crate::ics02_client::handler::{dispatch as ics2_msg_dispatcher, ClientResult};
use crate::ics03_connection::handler::{dispatch as ics3_msg_dispatcher, ConnectionResult};
use crate::ics04_channel::handler::{
    acknowledgement, channel_dispatch as ics4_msg_dispatcher, recv_packet, send_packet, timeout,
    write_acknowledgement, ChannelResult, PacketResult,
};
use crate::ics04_channel::msgs::PacketMsg;
use crate::ics04_channel::packet::Packet;
use crate::ics24_host::identifier::PortId;
use crate::ics26_routing::context::{Ics26Context, Module};
use crate::ics26_routing::error::{Error, Kind};
use crate::ics26_routing::msgs::Ics26Envelope;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ics26Result {
    Client(ClientResult),
    Connection(ConnectionResult),
    Channel(ChannelResult),
    /// Every packet state change that was persisted, and the acknowledgement written when the
    /// message was a receive.
    Packet {
        results: Vec<PacketResult>,
        acknowledgement: Option<Vec<u8>>,
    },
}

/// Top-level ICS dispatch function. Routes incoming IBC messages to their corresponding module
/// and persists the result. Returns an error, with no state change, if the message is
/// rejected.
pub fn dispatch<Ctx>(ctx: &Ctx, msg: Ics26Envelope) -> Result<HandlerOutput<Ics26Result>, Error>
where
    Ctx: Ics26Context,
{
    let output = match msg {
        Ics26Envelope::Ics2Msg(msg) => {
            let handler_output = ics2_msg_dispatcher(ctx, msg).map_err(Kind::client)?;

            ctx.store_client_result(handler_output.result.clone())
                .map_err(Kind::client)?;

            handler_output.map(Ics26Result::Client)
        }

        Ics26Envelope::Ics3Msg(msg) => {
            let handler_output = ics3_msg_dispatcher(ctx, msg).map_err(Kind::connection)?;

            ctx.store_connection_result(handler_output.result.clone())
                .map_err(Kind::connection)?;

            handler_output.map(Ics26Result::Connection)
        }

        Ics26Envelope::Ics4Msg(msg) => {
            let handler_output = ics4_msg_dispatcher(ctx, msg).map_err(Kind::channel)?;

            ctx.store_channel_result(handler_output.result.clone())
                .map_err(Kind::channel)?;

            handler_output.map(Ics26Result::Channel)
        }

        Ics26Envelope::Ics4PacketMsg(msg) => packet_msg_dispatcher(ctx, msg)?,
    };

    Ok(output)
}

/// Commits an outgoing packet on behalf of the application bound to its source port.
pub fn send<Ctx>(ctx: &Ctx, packet: Packet) -> Result<HandlerOutput<Ics26Result>, Error>
where
    Ctx: Ics26Context,
{
    bound_module(ctx, &packet.source_port)?;

    let handler_output = send_packet::send_packet(ctx, packet).map_err(Kind::channel)?;
    ctx.store_packet_result(handler_output.result.clone())
        .map_err(Kind::channel)?;

    Ok(handler_output.map(|result| Ics26Result::Packet {
        results: vec![result],
        acknowledgement: None,
    }))
}

fn packet_msg_dispatcher<Ctx>(ctx: &Ctx, msg: PacketMsg) -> Result<HandlerOutput<Ics26Result>, Error>
where
    Ctx: Ics26Context,
{
    match msg {
        PacketMsg::RecvPacket(msg) => {
            let packet = msg.packet.clone();
            let recv = recv_packet::process(ctx, msg).map_err(Kind::channel)?;
            write_acknowledgement::check(ctx, &packet).map_err(Kind::channel)?;

            let module = bound_module(ctx, &packet.destination_port)?;
            let ack = module
                .on_recv_packet(&packet)
                .map_err(|e| Kind::ModuleError.context(e))?;

            let write = write_acknowledgement::process(ctx, packet, ack.clone())
                .map_err(Kind::channel)?;

            let results = vec![recv.result, write.result];
            for result in &results {
                ctx.store_packet_result(result.clone())
                    .map_err(Kind::channel)?;
            }

            Ok(HandlerOutput::builder()
                .with_log(recv.log)
                .with_log(write.log)
                .with_events(recv.events)
                .with_events(write.events)
                .with_result(Ics26Result::Packet {
                    results,
                    acknowledgement: Some(ack),
                }))
        }

        PacketMsg::AckPacket(msg) => {
            let packet = msg.packet.clone();
            let acknowledgement = msg.acknowledgement.clone();
            let handler_output = acknowledgement::process(ctx, msg).map_err(Kind::channel)?;

            bound_module(ctx, &packet.source_port)?
                .on_acknowledgement_packet(&packet, &acknowledgement)
                .map_err(|e| Kind::ModuleError.context(e))?;

            ctx.store_packet_result(handler_output.result.clone())
                .map_err(Kind::channel)?;

            Ok(handler_output.map(|result| Ics26Result::Packet {
                results: vec![result],
                acknowledgement: None,
            }))
        }

        PacketMsg::TimeoutPacket(msg) => {
            let packet = msg.packet.clone();
            let handler_output = timeout::process(ctx, msg).map_err(Kind::channel)?;

            bound_module(ctx, &packet.source_port)?
                .on_timeout_packet(&packet)
                .map_err(|e| Kind::ModuleError.context(e))?;

            ctx.store_packet_result(handler_output.result.clone())
                .map_err(Kind::channel)?;

            Ok(handler_output.map(|result| Ics26Result::Packet {
                results: vec![result],
                acknowledgement: None,
            }))
        }
    }
}

fn bound_module<Ctx>(ctx: &Ctx, port_id: &PortId) -> Result<Arc<dyn Module>, Error>
where
    Ctx: Ics26Context,
{
    ctx.module(port_id)
        .ok_or_else(|| Kind::UnboundPort(port_id.clone()).into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anomaly::BoxError;

    use crate::ics02_client::height::Height;
    use crate::ics02_client::msgs::{ClientMsg, MsgCreateClient};
    use crate::ics04_channel::channel::{ChannelEnd, Counterparty, Order, State};
    use crate::ics04_channel::context::{ChannelKeeper, ChannelReader};
    use crate::ics04_channel::error::Kind as ChannelKind;
    use crate::ics04_channel::handler::test_util::{context_tracking, open_connection};
    use crate::ics04_channel::msgs::{MsgRecvPacket, PacketMsg};
    use crate::ics04_channel::packet::test_utils::dummy_packet;
    use crate::ics04_channel::packet::{ack_commitment, Packet};
    use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
    use crate::ics24_host::path::Path;
    use crate::ics26_routing::context::Module;
    use crate::ics26_routing::error::Kind;
    use crate::ics26_routing::handler::{dispatch, Ics26Result};
    use crate::ics26_routing::msgs::Ics26Envelope;
    use crate::mock::context::{MockContext, MockModule};
    use crate::mock::host::{mock_chain_id, mock_client_state, mock_consensus_state, MockChainHost};
    use crate::proofs::Proofs;

    struct RejectingModule;

    impl Module for RejectingModule {
        fn on_recv_packet(&self, _packet: &Packet) -> Result<Vec<u8>, BoxError> {
            Err("rejected".into())
        }

        fn on_acknowledgement_packet(&self, _packet: &Packet, _ack: &[u8]) -> Result<(), BoxError> {
            Err("rejected".into())
        }

        fn on_timeout_packet(&self, _packet: &Packet) -> Result<(), BoxError> {
            Err("rejected".into())
        }
    }

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

    fn recv(chain: &MockChainHost, packet: Packet) -> Ics26Envelope {
        let height = chain.latest_height();
        let proof = chain
            .proof(
                &Path::Commitments {
                    port_id: packet.source_port.clone(),
                    channel_id: packet.source_channel.clone(),
                    sequence: packet.sequence,
                },
                height,
            )
            .unwrap();
        Ics26Envelope::Ics4PacketMsg(PacketMsg::RecvPacket(MsgRecvPacket {
            packet,
            proofs: Proofs::new(proof, height).unwrap(),
        }))
    }

    fn open_channel() -> ChannelEnd {
        ChannelEnd::new(
            State::Open,
            Order::Unordered,
            Counterparty::new(PortId::transfer(), Some(ChannelId::new(0))),
            vec![ConnectionId::new(0)],
            "ics20-1".to_string(),
        )
    }

    #[test]
    fn recv_routes_to_the_bound_module_and_writes_its_ack() {
        let packet = dummy_packet(1);
        let chain = sender_with(&packet);
        let ctx = context_tracking(&chain).with_channel(
            PortId::transfer(),
            ChannelId::new(1),
            open_channel(),
        );

        let output = dispatch(&ctx, recv(&chain, packet.clone())).unwrap();
        let ack = match output.result {
            Ics26Result::Packet {
                results,
                acknowledgement: Some(ack),
            } => {
                assert_eq!(results.len(), 2);
                ack
            }
            other => panic!("unexpected result: {:?}", other),
        };
        assert_eq!(output.events.len(), 2);
        assert!(ctx.get_packet_receipt(&PortId::transfer(), &ChannelId::new(1), packet.sequence));
        assert!(ctx
            .get_packet_acknowledgement(&PortId::transfer(), &ChannelId::new(1), packet.sequence)
            .is_some());
        assert!(!ack.is_empty());
    }

    #[test]
    fn module_failure_leaves_no_state_behind() {
        let packet = dummy_packet(1);
        let chain = sender_with(&packet);
        let ctx = MockContext::default()
            .with_counterparty_client(&ClientId::default(), &chain)
            .with_connection(ConnectionId::new(0), open_connection())
            .with_channel(PortId::transfer(), ChannelId::new(1), open_channel());
        ctx.bind_port(PortId::transfer(), Arc::new(RejectingModule))
            .unwrap();

        let err = dispatch(&ctx, recv(&chain, packet.clone())).unwrap_err();
        assert_eq!(err.kind(), &Kind::ModuleError);
        assert!(!ctx.get_packet_receipt(&PortId::transfer(), &ChannelId::new(1), packet.sequence));
    }

    #[test]
    fn recv_with_an_ack_already_written_skips_the_module() {
        let packet = dummy_packet(1);
        let chain = sender_with(&packet);
        let module = Arc::new(MockModule::default());
        let ctx = MockContext::default()
            .with_counterparty_client(&ClientId::default(), &chain)
            .with_connection(ConnectionId::new(0), open_connection())
            .with_channel(PortId::transfer(), ChannelId::new(1), open_channel());
        ctx.bind_port(PortId::transfer(), module.clone()).unwrap();
        ctx.store_packet_acknowledgement(
            &PortId::transfer(),
            &ChannelId::new(1),
            packet.sequence,
            ack_commitment(b"earlier"),
        )
        .unwrap();

        let err = dispatch(&ctx, recv(&chain, packet.clone())).unwrap_err();
        assert_eq!(
            err.kind(),
            &Kind::Channel(ChannelKind::AcknowledgementExists(packet.sequence))
        );
        assert!(module.received().is_empty());
        assert!(!ctx.get_packet_receipt(&PortId::transfer(), &ChannelId::new(1), packet.sequence));
    }

    #[test]
    fn recv_on_an_unbound_port_is_rejected() {
        let packet = dummy_packet(1);
        let chain = sender_with(&packet);
        let ctx = MockContext::default()
            .with_counterparty_client(&ClientId::default(), &chain)
            .with_connection(ConnectionId::new(0), open_connection())
            .with_channel(PortId::transfer(), ChannelId::new(1), open_channel());

        let err = dispatch(&ctx, recv(&chain, packet)).unwrap_err();
        assert_eq!(err.kind(), &Kind::UnboundPort(PortId::transfer()));
    }

    #[test]
    fn handler_errors_keep_their_module_kind() {
        let ctx = MockContext::default();
        let mut client_state = mock_client_state(mock_chain_id(), Height::new(0, 5));
        client_state.latest_height = Height::zero();

        let err = dispatch(
            &ctx,
            Ics26Envelope::Ics2Msg(ClientMsg::CreateClient(MsgCreateClient {
                client_state,
                consensus_state: mock_consensus_state(5, vec![1; 32]),
            })),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), Kind::Client(_)));
    }
}
