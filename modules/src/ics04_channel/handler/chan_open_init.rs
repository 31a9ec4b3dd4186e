//! Protocol logic specific to ICS4 messages of type `MsgChannelOpenInit`.

use crate::events::{ChannelAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics04_channel::channel::{ChannelEnd, Counterparty, Order, State};
use crate::ics04_channel::context::ChannelReader;
use crate::ics04_channel::error::{Error, Kind};
use crate::ics04_channel::handler::{ChannelIdState, ChannelResult};
use crate::ics04_channel::msgs::MsgChannelOpenInit;
use crate::ics24_host::identifier::{ChannelId, ConnectionId};

pub(crate) fn process(
    ctx: &dyn ChannelReader,
    msg: MsgChannelOpenInit,
) -> HandlerResult<ChannelResult, Error> {
    let mut output = HandlerOutput::builder();

    if msg.connection_hops.len() != 1 {
        return Err(Kind::InvalidConnectionHopsLength(msg.connection_hops.len()).into());
    }
    let connection_id = &msg.connection_hops[0];
    let connection_end = ctx
        .connection_end(connection_id)
        .ok_or_else(|| Kind::MissingConnection(connection_id.clone()))?;

    check_ordering(&connection_end, connection_id, msg.ordering)?;

    if !ctx.port_bound(&msg.port_id) {
        return Err(Kind::PortNotBound(msg.port_id).into());
    }

    let channel_id = ChannelId::new(ctx.channel_counter());
    if ctx.channel_end(&msg.port_id, &channel_id).is_some() {
        return Err(Kind::ChannelExistsAlready(channel_id).into());
    }

    output.log(format!(
        "success: generated new channel identifier: {}",
        channel_id
    ));

    let channel_end = ChannelEnd::new(
        State::Init,
        msg.ordering,
        Counterparty::new(msg.counterparty_port_id.clone(), None),
        msg.connection_hops.clone(),
        msg.version,
    );

    output.emit(IBCEvent::OpenInitChannel(ChannelAttributes {
        port_id: msg.port_id.clone(),
        channel_id: channel_id.clone(),
        connection_id: connection_id.clone(),
        counterparty_port_id: msg.counterparty_port_id,
        counterparty_channel_id: None,
    }));

    Ok(output.with_result(ChannelResult {
        port_id: msg.port_id,
        channel_id,
        channel_id_state: ChannelIdState::Generated,
        channel_end,
    }))
}

/// The ordering must be a feature of the single version negotiated on the connection.
pub(crate) fn check_ordering(
    connection_end: &ConnectionEnd,
    connection_id: &ConnectionId,
    ordering: Order,
) -> Result<(), Error> {
    let unsupported = || Kind::UnsupportedOrdering(ordering.to_string(), connection_id.clone());

    if ordering == Order::None {
        return Err(unsupported().into());
    }
    match connection_end.versions() {
        [version] if version.is_supported_feature(ordering.as_string()) => Ok(()),
        _ => Err(unsupported().into()),
    }
}
