//! Protocol logic specific to ICS3 messages of type `MsgConnectionOpenInit`.

use crate::events::{ConnectionAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics03_connection::connection::{ConnectionEnd, State};
use crate::ics03_connection::context::ConnectionReader;
use crate::ics03_connection::error::{Error, Kind};
use crate::ics03_connection::handler::{ConnectionIdState, ConnectionResult};
use crate::ics03_connection::msgs::MsgConnectionOpenInit;
use crate::ics03_connection::version::is_compatible;
use crate::ics24_host::identifier::ConnectionId;

pub(crate) fn process(
    ctx: &dyn ConnectionReader,
    msg: MsgConnectionOpenInit,
) -> HandlerResult<ConnectionResult, Error> {
    let mut output = HandlerOutput::builder();

    // An IBC client running on the local (host) chain should exist.
    if ctx.client_state(&msg.client_id).is_none() {
        return Err(Kind::MissingClient(msg.client_id).into());
    }

    if let Some(id) = msg.counterparty.connection_id() {
        return Err(Kind::InvalidCounterparty(format!(
            "counterparty connection id {} is set before the counterparty chose it",
            id
        ))
        .into());
    }

    let versions = match msg.version {
        Some(version) => {
            if !is_compatible(&ctx.get_compatible_versions(), &version) {
                return Err(Kind::VersionMismatch(format!("{} is not supported", version)).into());
            }
            vec![version]
        }
        None => ctx.get_compatible_versions(),
    };

    let new_connection_end = ConnectionEnd::new(
        State::Init,
        msg.client_id.clone(),
        msg.counterparty.clone(),
        versions,
        msg.delay_period,
    );

    // Construct the identifier for the new connection.
    let id_counter = ctx.connection_counter();
    let conn_id = ConnectionId::new(id_counter);
    if ctx.connection_end(&conn_id).is_some() {
        return Err(Kind::ConnectionExistsAlready(conn_id).into());
    }

    output.log(format!(
        "success: generated new connection identifier: {}",
        conn_id
    ));

    let result = ConnectionResult {
        connection_id: conn_id.clone(),
        connection_id_state: ConnectionIdState::Generated,
        connection_end: new_connection_end,
    };

    output.emit(IBCEvent::OpenInitConnection(ConnectionAttributes {
        connection_id: conn_id,
        client_id: msg.client_id,
        counterparty_connection_id: None,
        counterparty_client_id: msg.counterparty.client_id().clone(),
    }));

    Ok(output.with_result(result))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::events::IBCEvent;
    use crate::ics02_client::height::Height;
    use crate::ics03_connection::connection::{Counterparty, State};
    use crate::ics03_connection::context::ConnectionKeeper;
    use crate::ics03_connection::handler::{dispatch, ConnectionResult};
    use crate::ics03_connection::msgs::{ConnectionMsg, MsgConnectionOpenInit};
    use crate::ics03_connection::version::Version;
    use crate::ics24_host::identifier::{ClientId, ConnectionId};
    use crate::mock::context::MockContext;

    fn init_msg(counterparty_conn: Option<ConnectionId>, version: Option<Version>) -> ConnectionMsg {
        ConnectionMsg::ConnectionOpenInit(MsgConnectionOpenInit {
            client_id: ClientId::default(),
            counterparty: Counterparty::new(
                ClientId::default(),
                counterparty_conn,
                b"ibc".to_vec().into(),
            ),
            version,
            delay_period: Duration::from_secs(0),
        })
    }

    #[test]
    fn conn_open_init_msg_processing() {
        struct Test {
            name: String,
            ctx: MockContext,
            msg: ConnectionMsg,
            want_pass: bool,
        }

        let default_context = MockContext::default();
        let good_context = default_context
            .clone()
            .with_client(&ClientId::default(), Height::new(0, 10));
        let unsupported = Version::new("2".to_string(), vec!["ORDER_ORDERED".to_string()]).unwrap();

        let tests: Vec<Test> = vec![
            Test {
                name: "Processing fails because no client exists in the context".to_string(),
                ctx: default_context,
                msg: init_msg(None, None),
                want_pass: false,
            },
            Test {
                name: "Good parameters".to_string(),
                ctx: good_context.clone(),
                msg: init_msg(None, None),
                want_pass: true,
            },
            Test {
                name: "Good parameters with an explicit version".to_string(),
                ctx: good_context.clone(),
                msg: init_msg(None, Some(Version::default())),
                want_pass: true,
            },
            Test {
                name: "Unsupported version".to_string(),
                ctx: good_context.clone(),
                msg: init_msg(None, Some(unsupported)),
                want_pass: false,
            },
            Test {
                name: "Counterparty connection id must not be chosen yet".to_string(),
                ctx: good_context,
                msg: init_msg(Some(ConnectionId::new(0)), None),
                want_pass: false,
            },
        ];

        for test in tests {
            let res = dispatch(&test.ctx, test.msg.clone());
            // Additionally check the events and the output objects in the result.
            match res {
                Ok(proto_output) => {
                    assert!(
                        test.want_pass,
                        "conn_open_init: test passed but was supposed to fail for test: {}",
                        test.name
                    );
                    assert!(!proto_output.events.is_empty()); // Some events must exist.

                    // The object in the output is a ConnectionEnd, should have init state.
                    let res: ConnectionResult = proto_output.result;
                    assert_eq!(res.connection_end.state(), State::Init);
                    assert_eq!(res.connection_end.versions().len(), 1);

                    for e in proto_output.events.iter() {
                        assert!(matches!(e, &IBCEvent::OpenInitConnection(_)));
                    }
                }
                Err(e) => {
                    assert!(
                        !test.want_pass,
                        "conn_open_init: did not pass test: {}, \nerror: {}",
                        test.name, e
                    );
                }
            }
        }
    }

    #[test]
    fn connection_ids_are_not_reused() {
        let ctx = MockContext::default().with_client(&ClientId::default(), Height::new(0, 10));

        for expected in 0..3 {
            let output = dispatch(&ctx, init_msg(None, None)).unwrap();
            assert_eq!(output.result.connection_id, ConnectionId::new(expected));
            ctx.store_connection_result(output.result).unwrap();
        }
    }
}
