//! Protocol logic specific to ICS4 messages of type `MsgChannelOpenTry`.

use crate::events::{ChannelAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics04_channel::channel::{ChannelEnd, Counterparty, State};
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::chan_open_init::check_ordering;
use crate::ics04_channel::handler::verify::{open_connection_of, verify_channel_proofs};
use crate::ics04_channel::handler::{ChannelIdState, ChannelResult};
use crate::ics04_channel::msgs::MsgChannelOpenTry;
use crate::ics24_host::identifier::ChannelId;

pub(crate) fn process(
    ctx: &dyn ChannelReader,
    msg: MsgChannelOpenTry,
) -> HandlerResult<ChannelResult, Error> {
    let mut output = HandlerOutput::builder();

    let counterparty_channel_id = msg.counterparty.channel_id().cloned().ok_or_else(|| {
        Kind::InvalidCounterparty("the counterparty channel id is missing".to_string())
    })?;

    let new_channel_end = ChannelEnd::new(
        State::TryOpen,
        msg.ordering,
        msg.counterparty.clone(),
        msg.connection_hops.clone(),
        msg.version.clone(),
    );

    let connection_end = open_connection_of(ctx, &new_channel_end)?;
    let connection_id = msg.connection_hops[0].clone();
    check_ordering(&connection_end, &connection_id, msg.ordering)?;

    if !ctx.port_bound(&msg.port_id) {
        return Err(Kind::PortNotBound(msg.port_id).into());
    }

    let counterparty_connection_id =
        connection_end.counterparty().connection_id().cloned().ok_or_else(|| {
            Kind::InvalidCounterparty(format!(
                "connection {} has no counterparty connection id",
                connection_id
            ))
        })?;

    // The counterparty end as it must look after its Init step.
    let expected_channel_end = ChannelEnd::new(
        State::Init,
        msg.ordering,
        Counterparty::new(msg.port_id.clone(), None),
        vec![counterparty_connection_id],
        msg.counterparty_version.clone(),
    );

    verify_channel_proofs(
        ctx,
        &connection_end,
        msg.counterparty.port_id(),
        &counterparty_channel_id,
        &expected_channel_end,
        &msg.proofs,
    )?;

    output.log("success: channel open try verification passed");

    let channel_id = ChannelId::new(ctx.channel_counter());
    if ctx.channel_end(&msg.port_id, &channel_id).is_some() {
        return Err(Kind::ChannelExistsAlready(channel_id).into());
    }

    output.emit(IBCEvent::OpenTryChannel(ChannelAttributes {
        port_id: msg.port_id.clone(),
        channel_id: channel_id.clone(),
        connection_id,
        counterparty_port_id: msg.counterparty.port_id().clone(),
        counterparty_channel_id: Some(counterparty_channel_id),
    }));

    Ok(output.with_result(ChannelResult {
        port_id: msg.port_id,
        channel_id,
        channel_id_state: ChannelIdState::Generated,
        channel_end: new_channel_end,
    }))
}

#[cfg(test)]
mod tests {
    use crate::events::IBCEvent;
    use crate::ics03_connection::connection::State as ConnectionState;
    use crate::ics04_channel::channel::{ChannelEnd, Counterparty, Order, State};
    use crate::ics04_channel::error::Kind;
    use crate::ics04_channel::handler::test_util::{
        context_tracking, counterparty_with_channel, open_connection,
    };
    use crate::ics04_channel::handler::{channel_dispatch, ChannelResult};
    use crate::ics04_channel::msgs::{ChannelMsg, MsgChannelOpenTry};
    use crate::ics24_host::identifier::{ChannelId, ClientId, ConnectionId, PortId};
    use crate::ics24_host::path::Path;
    use crate::mock::context::MockContext;
    use crate::proofs::Proofs;

    #[test]
    fn chan_open_try_msg_processing() {
        struct Test {
            name: String,
            ctx: MockContext,
            msg: ChannelMsg,
            want: Result<(), Kind>,
        }

        let port_id = PortId::transfer();
        let counterparty_chan_id = ChannelId::new(0);
        let conn_id = ConnectionId::new(0);

        let counterparty_init = ChannelEnd::new(
            State::Init,
            Order::Unordered,
            Counterparty::new(port_id.clone(), None),
            vec![conn_id.clone()],
            "ics20-1".to_string(),
        );
        let chain = counterparty_with_channel(&port_id, &counterparty_chan_id, &counterparty_init);
        let proof_height = chain.latest_height();
        let proof = chain
            .proof(
                &Path::ChannelEnds(port_id.clone(), counterparty_chan_id.clone()),
                proof_height,
            )
            .unwrap();

        let context = context_tracking(&chain);

        let try_msg = |ordering: Order, cp_chan: Option<ChannelId>, cp_version: &str| {
            ChannelMsg::ChannelOpenTry(Box::new(MsgChannelOpenTry {
                port_id: port_id.clone(),
                ordering,
                counterparty: Counterparty::new(port_id.clone(), cp_chan),
                connection_hops: vec![conn_id.clone()],
                version: "ics20-1".to_string(),
                counterparty_version: cp_version.to_string(),
                proofs: Proofs::new(proof.clone(), proof_height).unwrap(),
            }))
        };

        let mut init_connection = open_connection();
        init_connection.set_state(ConnectionState::Init);

        let tests: Vec<Test> = vec![
            Test {
                name: "Good parameters".to_string(),
                ctx: context.clone(),
                msg: try_msg(Order::Unordered, Some(counterparty_chan_id.clone()), "ics20-1"),
                want: Ok(()),
            },
            Test {
                name: "Counterparty was initialized with another version".to_string(),
                ctx: context.clone(),
                msg: try_msg(Order::Unordered, Some(counterparty_chan_id.clone()), "ics20-2"),
                want: Err(Kind::InvalidProof),
            },
            Test {
                name: "Counterparty was initialized with another ordering".to_string(),
                ctx: context.clone(),
                msg: try_msg(Order::Ordered, Some(counterparty_chan_id.clone()), "ics20-1"),
                want: Err(Kind::InvalidProof),
            },
            Test {
                name: "Counterparty channel id missing".to_string(),
                ctx: context,
                msg: try_msg(Order::Unordered, None, "ics20-1"),
                want: Err(Kind::InvalidCounterparty(
                    "the counterparty channel id is missing".to_string(),
                )),
            },
            Test {
                name: "Connection is not open".to_string(),
                ctx: MockContext::default()
                    .with_counterparty_client(&ClientId::default(), &chain)
                    .with_connection(conn_id.clone(), init_connection)
                    .with_port_capability(port_id.clone()),
                msg: try_msg(Order::Unordered, Some(counterparty_chan_id.clone()), "ics20-1"),
                want: Err(Kind::ConnectionNotOpen(conn_id.clone())),
            },
            Test {
                name: "Port has no module bound".to_string(),
                ctx: MockContext::default()
                    .with_counterparty_client(&ClientId::default(), &chain)
                    .with_connection(conn_id.clone(), open_connection()),
                msg: try_msg(Order::Unordered, Some(counterparty_chan_id.clone()), "ics20-1"),
                want: Err(Kind::PortNotBound(port_id.clone())),
            },
        ];

        for test in tests {
            let res = channel_dispatch(&test.ctx, test.msg.clone());
            match (res, test.want) {
                (Ok(output), Ok(())) => {
                    assert!(matches!(output.events[0], IBCEvent::OpenTryChannel(_)));
                    let res: ChannelResult = output.result;
                    assert_eq!(res.channel_end.state(), State::TryOpen);
                    assert_eq!(
                        res.channel_end.counterparty().channel_id(),
                        Some(&counterparty_chan_id)
                    );
                }
                (Err(e), Err(kind)) => {
                    assert_eq!(e.kind(), &kind, "chan_open_try: {}", test.name);
                }
                (res, want) => panic!(
                    "chan_open_try: unexpected outcome for test: {}: got ok = {}, want ok = {}",
                    test.name,
                    res.is_ok(),
                    want.is_ok()
                ),
            }
        }
    }
}
