//! Protocol logic specific to processing ICS2 messages of type `MsgCreateClient`.

use crate::events::{ClientAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics02_client::client_type::ClientType;
use crate::ics02_client::context::ClientReader;
use crate::ics02_client::error::{Error, Kind};
use crate::ics02_client::msgs::MsgCreateClient;
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics24_host::identifier::ClientId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Result {
    pub client_id: ClientId,
    pub client_state: ClientState,
    pub consensus_state: ConsensusState,
}

pub fn process(
    ctx: &dyn ClientReader,
    msg: MsgCreateClient,
) -> HandlerResult<Result, Error> {
    let mut output = HandlerOutput::builder();

    let MsgCreateClient {
        client_state,
        consensus_state,
    } = msg;

    // Re-run the constructor checks: the state may have been decoded from the wire.
    let client_state = ClientState::new(
        client_state.chain_id,
        client_state.trust_level,
        client_state.trusting_period,
        client_state.unbonding_period,
        client_state.max_clock_drift,
        client_state.latest_height,
    )
    .map_err(|e| Kind::InvalidClientState.context(e))?;

    if consensus_state.root.is_empty() {
        return Err(Kind::InvalidClientState
            .context("the initial consensus state has an empty commitment root")
            .into());
    }

    let client_id = ClientId::new(ClientType::Tendermint, ctx.client_counter())
        .map_err(|e| Kind::ClientIdentifierOverflow.context(e))?;

    if ctx.client_state(&client_id).is_some() {
        return Err(Kind::ClientAlreadyExists(client_id).into());
    }

    output.log(format!(
        "success: generated new client identifier: {}",
        client_id
    ));

    output.emit(IBCEvent::CreateClient(ClientAttributes {
        client_id: client_id.clone(),
        client_type: ClientType::Tendermint,
        consensus_height: client_state.latest_height(),
    }));

    Ok(output.with_result(Result {
        client_id,
        client_state,
        consensus_state,
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::events::IBCEvent;
    use crate::ics02_client::handler::{dispatch, ClientResult};
    use crate::ics02_client::height::Height;
    use crate::ics02_client::msgs::{ClientMsg, MsgCreateClient};
    use crate::ics07_tendermint::client_state::{ClientState, TrustThreshold};
    use crate::ics07_tendermint::consensus_state::ConsensusState;
    use crate::ics23_commitment::commitment::CommitmentRoot;
    use crate::ics24_host::identifier::{ChainId, ClientId};
    use crate::mock::context::MockContext;
    use crate::timestamp::Timestamp;

    fn msg(latest_height: u64) -> MsgCreateClient {
        MsgCreateClient {
            client_state: ClientState {
                chain_id: ChainId::new("chainB".to_string(), 0),
                trust_level: TrustThreshold::ONE_THIRD,
                trusting_period: Duration::from_secs(64000),
                unbonding_period: Duration::from_secs(128000),
                max_clock_drift: Duration::from_secs(3),
                latest_height: Height::new(0, latest_height),
                frozen_height: None,
            },
            consensus_state: ConsensusState::new(
                Timestamp::from_seconds(10),
                CommitmentRoot::from_bytes(&[1; 32]),
                vec![2; 32],
            ),
        }
    }

    #[test]
    fn test_create_client_ok() {
        let ctx = MockContext::default();

        let output = dispatch(&ctx, ClientMsg::CreateClient(msg(42)));

        match output {
            Ok(output) => {
                let expected_client_id = "07-tendermint-0".parse::<ClientId>().unwrap();
                assert!(!output.log.is_empty());
                assert!(matches!(
                    &output.events[0],
                    IBCEvent::CreateClient(attrs) if attrs.client_id == expected_client_id
                ));
                match output.result {
                    ClientResult::Create(res) => {
                        assert_eq!(res.client_id, expected_client_id);
                        assert_eq!(res.client_state.latest_height(), Height::new(0, 42));
                    }
                    _ => panic!("unexpected result type: expected ClientResult::CreateResult!"),
                }
            }
            Err(err) => {
                panic!("unexpected error: {}", err);
            }
        }
    }

    #[test]
    fn test_create_client_ids_are_sequential() {
        let ctx = MockContext::default();

        for expected in &["07-tendermint-0", "07-tendermint-1", "07-tendermint-2"] {
            let client_id = ctx
                .create_client(msg(10))
                .expect("client creation should succeed");
            assert_eq!(client_id.as_str(), *expected);
        }
    }

    #[test]
    fn test_create_client_rejects_invalid_parameters() {
        let ctx = MockContext::default();

        let mut zero_height = msg(0);
        zero_height.client_state.latest_height = Height::zero();

        let mut bad_periods = msg(10);
        bad_periods.client_state.trusting_period = Duration::from_secs(200000);

        let mut empty_root = msg(10);
        empty_root.consensus_state.root = CommitmentRoot::from_bytes(&[]);

        for bad in vec![zero_height, bad_periods, empty_root] {
            assert!(dispatch(&ctx, ClientMsg::CreateClient(bad)).is_err());
        }
    }
}
