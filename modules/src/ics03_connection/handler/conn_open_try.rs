//! Protocol logic specific to processing ICS3 messages of type `MsgConnectionOpenTry`.

use crate::events::{ConnectionAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics03_connection::connection::{ConnectionEnd, Counterparty, State};
use crate::ics03_connection::context::ConnectionReader;
use crate::ics03_connection::error::{Error, Kind};
use crate::ics03_connection::handler::verify::verify_connection_proof;
use crate::ics03_connection::handler::{ConnectionIdState, ConnectionResult};
use crate::ics03_connection::msgs::MsgConnectionOpenTry;
use crate::ics03_connection::version::pick_version;
use crate::ics24_host::identifier::ConnectionId;

pub(crate) fn process(
    ctx: &dyn ConnectionReader,
    msg: MsgConnectionOpenTry,
) -> HandlerResult<ConnectionResult, Error> {
    let mut output = HandlerOutput::builder();

    let counterparty_connection_id = msg
        .counterparty
        .connection_id()
        .cloned()
        .ok_or_else(|| {
            Kind::InvalidCounterparty("the counterparty connection id is missing".to_string())
        })?;

    let version = pick_version(&ctx.get_compatible_versions(), &msg.counterparty_versions)?;

    let new_connection_end = ConnectionEnd::new(
        State::TryOpen,
        msg.client_id.clone(),
        msg.counterparty.clone(),
        vec![version],
        msg.delay_period,
    );

    // The counterparty end as it must look after its Init step.
    let expected_conn = ConnectionEnd::new(
        State::Init,
        msg.counterparty.client_id().clone(),
        Counterparty::new(msg.client_id.clone(), None, ctx.commitment_prefix()),
        msg.counterparty_versions.clone(),
        msg.delay_period,
    );

    verify_connection_proof(
        ctx,
        &new_connection_end,
        &counterparty_connection_id,
        &expected_conn,
        &msg.proofs,
    )?;

    output.log("success: connection verification passed");

    let conn_id = ConnectionId::new(ctx.connection_counter());
    if ctx.connection_end(&conn_id).is_some() {
        return Err(Kind::ConnectionExistsAlready(conn_id).into());
    }

    output.log(format!(
        "success: generated new connection identifier: {}",
        conn_id
    ));

    output.emit(IBCEvent::OpenTryConnection(ConnectionAttributes {
        connection_id: conn_id.clone(),
        client_id: msg.client_id,
        counterparty_connection_id: Some(counterparty_connection_id),
        counterparty_client_id: msg.counterparty.client_id().clone(),
    }));

    Ok(output.with_result(ConnectionResult {
        connection_id: conn_id,
        connection_id_state: ConnectionIdState::Generated,
        connection_end: new_connection_end,
    }))
}
