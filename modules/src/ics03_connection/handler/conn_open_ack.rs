//! Protocol logic specific to processing ICS3 messages of type `MsgConnectionOpenAck`.

use crate::events::{ConnectionAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics03_connection::connection::{ConnectionEnd, Counterparty, State};
use crate::ics03_connection::context::ConnectionReader;
use crate::ics03_connection::error::{Error, Kind};
use crate::ics03_connection::handler::verify::verify_connection_proof;
use crate::ics03_connection::handler::{ConnectionIdState, ConnectionResult};
use crate::ics03_connection::msgs::MsgConnectionOpenAck;
use crate::ics03_connection::version::is_compatible;

pub(crate) fn process(
    ctx: &dyn ConnectionReader,
    msg: MsgConnectionOpenAck,
) -> HandlerResult<ConnectionResult, Error> {
    let mut output = HandlerOutput::builder();

    // A connection end must exist and must be Init; an Open end means the Ack was applied.
    let mut new_conn_end = ctx
        .connection_end(&msg.connection_id)
        .ok_or_else(|| Kind::UninitializedConnection(msg.connection_id.clone()))?;
    if !new_conn_end.state_matches(State::Init) {
        return Err(Kind::ConnectionMismatch(msg.connection_id).into());
    }

    if !is_compatible(new_conn_end.versions(), &msg.version) {
        return Err(Kind::VersionMismatch(format!(
            "{} was not offered on {}",
            msg.version, msg.connection_id
        ))
        .into());
    }

    // The counterparty end as it must look after its Try step.
    let expected_conn = ConnectionEnd::new(
        State::TryOpen,
        new_conn_end.counterparty().client_id().clone(),
        Counterparty::new(
            // The counterparty is the local chain.
            new_conn_end.client_id().clone(),
            Some(msg.connection_id.clone()),
            ctx.commitment_prefix(),
        ),
        vec![msg.version.clone()],
        new_conn_end.delay_period(),
    );

    verify_connection_proof(
        ctx,
        &new_conn_end,
        &msg.counterparty_connection_id,
        &expected_conn,
        &msg.proofs,
    )?;

    output.log("success: connection verification passed");

    new_conn_end.set_state(State::Open);
    new_conn_end.set_version(msg.version.clone());
    new_conn_end.set_counterparty(Counterparty::new(
        new_conn_end.counterparty().client_id().clone(),
        Some(msg.counterparty_connection_id.clone()),
        new_conn_end.counterparty().prefix().clone(),
    ));

    output.emit(IBCEvent::OpenAckConnection(ConnectionAttributes {
        connection_id: msg.connection_id.clone(),
        client_id: new_conn_end.client_id().clone(),
        counterparty_connection_id: Some(msg.counterparty_connection_id),
        counterparty_client_id: new_conn_end.counterparty().client_id().clone(),
    }));

    Ok(output.with_result(ConnectionResult {
        connection_id: msg.connection_id,
        connection_id_state: ConnectionIdState::Reused,
        connection_end: new_conn_end,
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::events::IBCEvent;
    use crate::ics03_connection::connection::{ConnectionEnd, Counterparty, State};
    use crate::ics03_connection::context::ConnectionKeeper;
    use crate::ics03_connection::error::Kind;
    use crate::ics03_connection::handler::test_util::counterparty_with_connection;
    use crate::ics03_connection::handler::dispatch;
    use crate::ics03_connection::msgs::{ConnectionMsg, MsgConnectionOpenAck};
    use crate::ics03_connection::version::{get_compatible_versions, Version};
    use crate::ics24_host::identifier::{ClientId, ConnectionId};
    use crate::ics24_host::path::Path;
    use crate::mock::context::MockContext;
    use crate::proofs::Proofs;

    #[test]
    fn conn_open_ack_msg_processing() {
        struct Test {
            name: String,
            ctx: MockContext,
            msg: ConnectionMsg,
            want: Result<(), Kind>,
        }

        let client_id = ClientId::default();
        let local_conn_id = ConnectionId::new(0);
        let counterparty_conn_id = ConnectionId::new(5);
        let prefix = b"ibc".to_vec();

        let counterparty_try = ConnectionEnd::new(
            State::TryOpen,
            client_id.clone(),
            Counterparty::new(client_id.clone(), Some(local_conn_id.clone()), prefix.clone().into()),
            vec![Version::default()],
            Duration::from_secs(0),
        );
        let chain = counterparty_with_connection(&counterparty_conn_id, &counterparty_try);
        let proof_height = chain.latest_height();
        let proofs = Proofs::new(
            chain
                .proof(&Path::Connections(counterparty_conn_id.clone()), proof_height)
                .unwrap(),
            proof_height,
        )
        .unwrap();

        let local_end = |state: State| {
            ConnectionEnd::new(
                state,
                client_id.clone(),
                Counterparty::new(client_id.clone(), None, prefix.clone().into()),
                get_compatible_versions(),
                Duration::from_secs(0),
            )
        };
        let context = MockContext::default().with_counterparty_client(&client_id, &chain);

        let ack_msg = |version: Version| {
            ConnectionMsg::ConnectionOpenAck(Box::new(MsgConnectionOpenAck {
                connection_id: local_conn_id.clone(),
                counterparty_connection_id: counterparty_conn_id.clone(),
                version,
                proofs: proofs.clone(),
            }))
        };
        let dag = Version::new("1".to_string(), vec!["ORDER_DAG".to_string()]).unwrap();
        let unordered_only =
            Version::new("1".to_string(), vec!["ORDER_UNORDERED".to_string()]).unwrap();

        let tests: Vec<Test> = vec![
            Test {
                name: "Processing fails because the connection does not exist".to_string(),
                ctx: context.clone(),
                msg: ack_msg(Version::default()),
                want: Err(Kind::UninitializedConnection(local_conn_id.clone())),
            },
            Test {
                name: "Good parameters".to_string(),
                ctx: context
                    .clone()
                    .with_connection(local_conn_id.clone(), local_end(State::Init)),
                msg: ack_msg(Version::default()),
                want: Ok(()),
            },
            Test {
                name: "Replayed Ack on an open connection".to_string(),
                ctx: context
                    .clone()
                    .with_connection(local_conn_id.clone(), local_end(State::Open)),
                msg: ack_msg(Version::default()),
                want: Err(Kind::ConnectionMismatch(local_conn_id.clone())),
            },
            Test {
                name: "Version was never offered".to_string(),
                ctx: context
                    .clone()
                    .with_connection(local_conn_id.clone(), local_end(State::Init)),
                msg: ack_msg(dag),
                want: Err(Kind::VersionMismatch(format!(
                    "1[ORDER_DAG] was not offered on {}",
                    local_conn_id
                ))),
            },
            Test {
                name: "Offered version that the counterparty did not pick".to_string(),
                ctx: context.with_connection(local_conn_id.clone(), local_end(State::Init)),
                msg: ack_msg(unordered_only),
                want: Err(Kind::InvalidProof),
            },
        ];

        for test in tests {
            let res = dispatch(&test.ctx, test.msg.clone());
            match (res, test.want) {
                (Ok(output), Ok(())) => {
                    assert!(matches!(output.events[0], IBCEvent::OpenAckConnection(_)));
                    let end = &output.result.connection_end;
                    assert_eq!(end.state(), State::Open);
                    assert_eq!(end.counterparty().connection_id(), Some(&counterparty_conn_id));

                    // Applying the Ack leaves nothing for a replay to do.
                    test.ctx.store_connection_result(output.result).unwrap();
                    assert!(dispatch(&test.ctx, test.msg).is_err());
                }
                (Err(e), Err(kind)) => {
                    assert_eq!(e.kind(), &kind, "conn_open_ack: {}", test.name);
                }
                (res, want) => panic!(
                    "conn_open_ack: unexpected outcome for test: {}: got ok = {}, want ok = {}",
                    test.name,
                    res.is_ok(),
                    want.is_ok()
                ),
            }
        }
    }
}
