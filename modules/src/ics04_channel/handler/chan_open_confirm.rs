//! Protocol logic specific to ICS4 messages of type `MsgChannelOpenConfirm`.

use crate::events::{ChannelAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics04_channel::channel::{ChannelEnd, Counterparty, State};
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::verify::{open_connection_of, verify_channel_proofs};
use crate::ics04_channel::handler::{ChannelIdState, ChannelResult};
use crate::ics04_channel::msgs::MsgChannelOpenConfirm;

pub(crate) fn process(
    ctx: &dyn ChannelReader,
    msg: MsgChannelOpenConfirm,
) -> HandlerResult<ChannelResult, Error> {
    let mut output = HandlerOutput::builder();

    let mut channel_end = ctx
        .channel_end(&msg.port_id, &msg.channel_id)
        .ok_or_else(|| Kind::ChannelNotFound(msg.port_id.clone(), msg.channel_id.clone()))?;

    if !channel_end.state_matches(State::TryOpen) {
        return Err(Kind::InvalidChannelState(msg.channel_id, channel_end.state()).into());
    }

    let connection_end = open_connection_of(ctx, &channel_end)?;
    let counterparty_connection_id =
        connection_end.counterparty().connection_id().cloned().ok_or_else(|| {
            Kind::InvalidCounterparty(format!(
                "connection {} has no counterparty connection id",
                channel_end.connection_hops()[0]
            ))
        })?;
    let counterparty_channel_id = channel_end
        .counterparty()
        .channel_id()
        .cloned()
        .ok_or_else(|| {
            Kind::InvalidCounterparty("the counterparty channel id is missing".to_string())
        })?;

    // The counterparty end as it must look after its Ack step.
    let expected_channel_end = ChannelEnd::new(
        State::Open,
        channel_end.ordering(),
        Counterparty::new(msg.port_id.clone(), Some(msg.channel_id.clone())),
        vec![counterparty_connection_id],
        channel_end.version().to_string(),
    );

    verify_channel_proofs(
        ctx,
        &connection_end,
        channel_end.counterparty().port_id(),
        &counterparty_channel_id,
        &expected_channel_end,
        &msg.proofs,
    )?;

    output.log("success: channel open confirm verification passed");

    channel_end.set_state(State::Open);

    output.emit(IBCEvent::OpenConfirmChannel(ChannelAttributes {
        port_id: msg.port_id.clone(),
        channel_id: msg.channel_id.clone(),
        connection_id: channel_end.connection_hops()[0].clone(),
        counterparty_port_id: channel_end.counterparty().port_id().clone(),
        counterparty_channel_id: Some(counterparty_channel_id),
    }));

    Ok(output.with_result(ChannelResult {
        port_id: msg.port_id,
        channel_id: msg.channel_id,
        channel_id_state: ChannelIdState::Reused,
        channel_end,
    }))
}
