//! Protocol logic specific to processing ICS3 messages of type `MsgConnectionOpenConfirm`.

use crate::events::{ConnectionAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics03_connection::connection::{ConnectionEnd, Counterparty, State};
use crate::ics03_connection::context::ConnectionReader;
use crate::ics03_connection::error::{Error, Kind};
use crate::ics03_connection::handler::verify::verify_connection_proof;
use crate::ics03_connection::handler::{ConnectionIdState, ConnectionResult};
use crate::ics03_connection::msgs::MsgConnectionOpenConfirm;

pub(crate) fn process(
    ctx: &dyn ConnectionReader,
    msg: MsgConnectionOpenConfirm,
) -> HandlerResult<ConnectionResult, Error> {
    let mut output = HandlerOutput::builder();

    // Validate the connection end.
    let mut new_conn_end = ctx
        .connection_end(&msg.connection_id)
        .ok_or_else(|| Kind::UninitializedConnection(msg.connection_id.clone()))?;
    // A connection end must be in TryOpen state; otherwise return error.
    if !new_conn_end.state_matches(State::TryOpen) {
        return Err(Kind::ConnectionMismatch(msg.connection_id).into());
    }

    let counterparty_connection_id = new_conn_end
        .counterparty()
        .connection_id()
        .cloned()
        .ok_or_else(|| {
            Kind::InvalidCounterparty("the counterparty connection id is missing".to_string())
        })?;

    // Verify proofs. Assemble the expected connection end: the counterparty is Open.
    let expected_conn = ConnectionEnd::new(
        State::Open,
        new_conn_end.counterparty().client_id().clone(),
        Counterparty::new(
            // The counterparty is the local chain.
            new_conn_end.client_id().clone(),
            Some(msg.connection_id.clone()),
            ctx.commitment_prefix(),
        ),
        new_conn_end.versions().to_vec(),
        new_conn_end.delay_period(),
    );

    verify_connection_proof(
        ctx,
        &new_conn_end,
        &counterparty_connection_id,
        &expected_conn,
        &msg.proofs,
    )?;

    output.log("success: connection verification passed");

    // Transition our own end of the connection to state OPEN.
    new_conn_end.set_state(State::Open);

    output.emit(IBCEvent::OpenConfirmConnection(ConnectionAttributes {
        connection_id: msg.connection_id.clone(),
        client_id: new_conn_end.client_id().clone(),
        counterparty_connection_id: Some(counterparty_connection_id),
        counterparty_client_id: new_conn_end.counterparty().client_id().clone(),
    }));

    Ok(output.with_result(ConnectionResult {
        connection_id: msg.connection_id,
        connection_id_state: ConnectionIdState::Reused,
        connection_end: new_conn_end,
    }))
}
