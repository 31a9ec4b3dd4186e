//! Protocol logic specific to processing ICS2 messages of type `MsgUpdateClient`.

use crate::events::{ClientAttributes, IBCEvent};
use crate::handler::{HandlerOutput, HandlerResult};
use crate::ics02_client::context::ClientReader;
use crate::ics02_client::error::{Error, Kind};
use crate::ics02_client::height::Height;
use crate::ics02_client::msgs::MsgUpdateClient;
use crate::ics02_client::status::Status;
use crate::ics07_tendermint::client_def::{TendermintClient, UpdateOutcome};
use crate::ics07_tendermint::client_state::ClientState;
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics24_host::identifier::ClientId;

/// The new client state; `consensus_state` is `None` when the header proved misbehaviour and
/// froze the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Result {
    pub client_id: ClientId,
    pub client_state: ClientState,
    pub consensus_state: Option<ConsensusState>,
    pub pruned: Vec<Height>,
}

pub fn process(
    ctx: &dyn ClientReader,
    msg: MsgUpdateClient,
) -> HandlerResult<Result, Error> {
    let mut output = HandlerOutput::builder();

    let MsgUpdateClient { client_id, header } = msg;

    let client_state = ctx
        .client_state(&client_id)
        .ok_or_else(|| Kind::ClientNotFound(client_id.clone()))?;

    if client_state.is_frozen() {
        return Err(Kind::ClientFrozen(client_id).into());
    }

    let now = ctx.host_timestamp();
    let latest_height = client_state.latest_height();
    let latest = ctx
        .consensus_state(&client_id, latest_height)
        .ok_or_else(|| Kind::ConsensusStateNotFound(client_id.clone(), latest_height))?;
    if client_state.status(latest.timestamp, now) == Status::Expired {
        return Err(Kind::ClientExpired(client_id).into());
    }

    let trusted = ctx
        .consensus_state(&client_id, header.trusted_height)
        .ok_or_else(|| Kind::ConsensusStateNotFound(client_id.clone(), header.trusted_height))?;
    let existing = ctx.consensus_state(&client_id, header.height());

    let outcome = TendermintClient::default()
        .check_header_and_update_state(&client_state, &trusted, existing.as_ref(), &header, now)
        .map_err(Kind::light_client)?;

    let attributes = ClientAttributes {
        client_id: client_id.clone(),
        client_type: client_state.client_type(),
        consensus_height: header.height(),
    };

    match outcome {
        UpdateOutcome::Updated {
            client_state,
            consensus_state,
        } => {
            let pruned = expired_heights(ctx, &client_id, &client_state, header.height());

            output.log(format!(
                "success: client {} updated to height {}, pruned {} consensus states",
                client_id,
                header.height(),
                pruned.len()
            ));
            output.emit(IBCEvent::UpdateClient(attributes));

            Ok(output.with_result(Result {
                client_id,
                client_state,
                consensus_state: Some(consensus_state),
                pruned,
            }))
        }
        UpdateOutcome::Frozen { client_state } => {
            output.log(format!(
                "client {} frozen: conflicting header at height {}",
                client_id,
                header.height()
            ));
            output.emit(IBCEvent::ClientMisbehavior(attributes));

            Ok(output.with_result(Result {
                client_id,
                client_state,
                consensus_state: None,
                pruned: vec![],
            }))
        }
    }
}

/// Consensus states that fell out of the trusting period. The latest height and the height
/// being written are always kept.
fn expired_heights(
    ctx: &dyn ClientReader,
    client_id: &ClientId,
    client_state: &ClientState,
    new_height: Height,
) -> Vec<Height> {
    let now = ctx.host_timestamp();

    ctx.consensus_heights(client_id)
        .into_iter()
        .filter(|h| *h != client_state.latest_height() && *h != new_height)
        .filter(|h| {
            ctx.consensus_state(client_id, *h)
                .map(|cs| client_state.expired(cs.timestamp, now))
                .unwrap_or(false)
        })
        .collect()
}
