//! Protocol logic specific to processing ICS2 messages of type `MsgSubmitMisbehaviour`.

use crate::events::{ClientAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics02_client::context::ClientReader;
use crate::ics02_client::error::{Error, Kind};
use crate::ics02_client::msgs::MsgSubmitMisbehaviour;
use crate::ics07_tendermint::client_def::TendermintClient;
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics24_host::identifier::ClientId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Result {
    pub client_id: ClientId,
    pub client_state: ClientState,
}

pub fn process(
    ctx: &dyn ClientReader,
    msg: MsgSubmitMisbehaviour,
) -> HandlerResult<Result, Error> {
    let mut output = HandlerOutput::builder();

    let MsgSubmitMisbehaviour {
        client_id,
        misbehaviour,
    } = msg;

    if misbehaviour.client_id != client_id {
        return Err(Kind::MisbehaviourRejected
            .context(format!(
                "evidence is for client {}, submitted to {}",
                misbehaviour.client_id, client_id
            ))
            .into());
    }

    let client_state = ctx
        .client_state(&client_id)
        .ok_or_else(|| Kind::ClientNotFound(client_id.clone()))?;
    if client_state.is_frozen() {
        return Err(Kind::ClientFrozen(client_id).into());
    }

    let trusted_height1 = misbehaviour.header1.trusted_height;
    let trusted_height2 = misbehaviour.header2.trusted_height;
    let trusted1 = ctx
        .consensus_state(&client_id, trusted_height1)
        .ok_or_else(|| Kind::ConsensusStateNotFound(client_id.clone(), trusted_height1))?;
    let trusted2 = ctx
        .consensus_state(&client_id, trusted_height2)
        .ok_or_else(|| Kind::ConsensusStateNotFound(client_id.clone(), trusted_height2))?;

    let client_state = TendermintClient::default()
        .check_misbehaviour(
            &client_state,
            &trusted1,
            &trusted2,
            &misbehaviour,
            ctx.host_timestamp(),
        )
        .map_err(|e| Kind::MisbehaviourRejected.context(e))?;

    output.log(format!(
        "success: client {} frozen at height {}",
        client_id,
        misbehaviour.header1.height()
    ));
    output.emit(IBCEvent::ClientMisbehavior(ClientAttributes {
        client_id: client_id.clone(),
        client_type: client_state.client_type(),
        consensus_height: misbehaviour.header1.height(),
    }));

    Ok(output.with_result(Result {
        client_id,
        client_state,
    }))
}

#[cfg(test)]
mod tests {
    use crate::ics02_client::client_type::ClientType;
    use crate::ics02_client::context::{ClientKeeper, ClientReader};
    use crate::ics02_client::handler::{dispatch, ClientResult};
    use crate::ics02_client::height::Height;
    use crate::ics02_client::msgs::{ClientMsg, MsgSubmitMisbehaviour};
    use crate::ics07_tendermint::misbehaviour::Misbehaviour;
    use crate::ics24_host::identifier::ClientId;
    use crate::mock::context::MockContext;
    use crate::mock::host::{mock_chain_id, mock_header};

    fn evidence(client_id: &ClientId, app_hash1: u8, app_hash2: u8, height2: u64) -> ClientMsg {
        let chain_id = mock_chain_id();
        ClientMsg::SubmitMisbehaviour(MsgSubmitMisbehaviour {
            client_id: client_id.clone(),
            misbehaviour: Misbehaviour {
                client_id: client_id.clone(),
                header1: mock_header(&chain_id, 7, Height::new(0, 5), vec![app_hash1; 32]),
                header2: mock_header(&chain_id, height2, Height::new(0, 5), vec![app_hash2; 32]),
            },
        })
    }

    #[test]
    fn misbehaviour_msg_processing() {
        struct Test {
            name: String,
            ctx: MockContext,
            msg: ClientMsg,
            want_pass: bool,
        }

        let client_id = ClientId::default();
        let context = MockContext::default().with_client(&client_id, Height::new(0, 5));
        let other_client = ClientId::new(ClientType::Tendermint, 9).unwrap();

        let mut mismatched = evidence(&client_id, 1, 2, 7);
        if let ClientMsg::SubmitMisbehaviour(msg) = &mut mismatched {
            msg.misbehaviour.client_id = other_client.clone();
        }

        let tests: Vec<Test> = vec![
            Test {
                name: "Two conflicting headers at the same height".to_string(),
                ctx: context.clone(),
                msg: evidence(&client_id, 1, 2, 7),
                want_pass: true,
            },
            Test {
                name: "Identical headers are not evidence".to_string(),
                ctx: context.clone(),
                msg: evidence(&client_id, 1, 1, 7),
                want_pass: false,
            },
            Test {
                name: "Headers at different heights are not evidence".to_string(),
                ctx: context.clone(),
                msg: evidence(&client_id, 1, 2, 8),
                want_pass: false,
            },
            Test {
                name: "Evidence for another client".to_string(),
                ctx: context.clone(),
                msg: mismatched,
                want_pass: false,
            },
            Test {
                name: "Unknown client".to_string(),
                ctx: context,
                msg: evidence(&other_client, 1, 2, 7),
                want_pass: false,
            },
        ];

        for test in tests {
            let res = dispatch(&test.ctx, test.msg.clone());

            match res {
                Ok(output) => {
                    assert!(
                        test.want_pass,
                        "misbehaviour: test passed but was supposed to fail for test: {}",
                        test.name
                    );
                    match output.result {
                        ClientResult::Misbehaviour(res) => {
                            assert_eq!(res.client_state.frozen_height, Some(Height::new(0, 7)));
                        }
                        _ => panic!("misbehaviour: unexpected result for test: {}", test.name),
                    }
                }
                Err(e) => {
                    assert!(
                        !test.want_pass,
                        "misbehaviour: did not pass test: {}, \nerror: {}",
                        test.name, e
                    );
                }
            }
        }
    }

    #[test]
    fn frozen_client_rejects_further_evidence() {
        let client_id = ClientId::default();
        let ctx = MockContext::default().with_client(&client_id, Height::new(0, 5));

        let output = dispatch(&ctx, evidence(&client_id, 1, 2, 7)).unwrap();
        ctx.store_client_result(output.result).unwrap();
        assert!(ctx.client_state(&client_id).unwrap().is_frozen());

        assert!(dispatch(&ctx, evidence(&client_id, 3, 4, 7)).is_err());
    }
}
