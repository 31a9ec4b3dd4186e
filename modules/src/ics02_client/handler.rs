//! This module implements the processing logic for ICS2 (client abstractions and functions) msgs.

use crate::handler::HandlerOutput;
use crate::ics02_client::context::ClientReader;
use crate::ics02_client::error::Error;
use crate::ics02_client::msgs::ClientMsg;

pub mod create_client;
pub mod misbehaviour;
pub mod update_client;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientResult {
    Create(create_client::Result),
    Update(update_client::Result),
    Misbehaviour(misbehaviour::Result),
}

/// General entry point for processing any message related to ICS2 (client functions) protocols.
pub fn dispatch<Ctx>(ctx: &Ctx, msg: ClientMsg) -> Result<HandlerOutput<ClientResult>, Error>
where
    Ctx: ClientReader,
{
    match msg {
        ClientMsg::CreateClient(msg) => {
            let output = create_client::process(ctx, msg)?;
            Ok(output.map(ClientResult::Create))
        }
        ClientMsg::UpdateClient(msg) => {
            let output = update_client::process(ctx, msg)?;
            Ok(output.map(ClientResult::Update))
        }
        ClientMsg::SubmitMisbehaviour(msg) => {
            let output = misbehaviour::process(ctx, msg)?;
            Ok(output.map(ClientResult::Misbehaviour))
        }
    }
}
