//! Drives the channel handshake over an open connection.

use tracing::info;

use ibc::events::IBCEvent;
use ibc::ics04_channel::channel::{Counterparty, Order, State};
use ibc::ics04_channel::msgs::{
    ChannelMsg, MsgChannelOpenAck, MsgChannelOpenConfirm, MsgChannelOpenInit, MsgChannelOpenTry,
};
use ibc::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use ibc::ics24_host::path::Path;
use ibc::ics26_routing::msgs::Ics26Envelope;

use crate::config::RelayConfig;
use crate::error::{Error, Kind};
use crate::foreign_client::ForeignClient;
use crate::util::retry::retry_transient;

/// One end of the channel to open.
#[derive(Clone, Debug)]
pub struct ChannelSide {
    /// The client on this side's chain, tracking the other side.
    pub client: ForeignClient,
    pub connection_id: ConnectionId,
    pub port_id: PortId,
}

#[derive(Clone, Debug)]
pub struct ChannelHandshake {
    a: ChannelSide,
    b: ChannelSide,
    ordering: Order,
    version: String,
    config: RelayConfig,
}

impl ChannelHandshake {
    pub fn new(a: ChannelSide, b: ChannelSide, ordering: Order, version: String, config: RelayConfig) -> Self {
        Self {
            a,
            b,
            ordering,
            version,
            config,
        }
    }

    /// Runs Init on A, Try on B, Ack on A and Confirm on B. Returns the channel ids on A and B.
    pub async fn open(&self) -> Result<(ChannelId, ChannelId), Error> {
        let a_chan = retry_transient(&self.config, "chan_open_init", || self.init()).await?;
        let b_chan = retry_transient(&self.config, "chan_open_try", || self.try_open(&a_chan)).await?;
        retry_transient(&self.config, "chan_open_ack", || self.ack(&a_chan, &b_chan)).await?;
        retry_transient(&self.config, "chan_open_confirm", || self.confirm(&a_chan, &b_chan)).await?;

        for (side, id) in &[(&self.a, &a_chan), (&self.b, &b_chan)] {
            let chain = side.client.host();
            let end = chain
                .query_channel(&side.port_id, id)
                .await?
                .ok_or_else(|| Kind::Handshake(format!("{}/{} vanished from {}", side.port_id, id, chain.id())))?;
            if end.state() != State::Open {
                return Err(Kind::Handshake(format!(
                    "{}/{} on {} ended in state {}",
                    side.port_id,
                    id,
                    chain.id(),
                    end.state().as_string()
                ))
                .into());
            }
        }

        info!(
            "channel open: {}/{} on {} <-> {}/{} on {}",
            self.a.port_id,
            a_chan,
            self.a.client.host().id(),
            self.b.port_id,
            b_chan,
            self.b.client.host().id()
        );
        Ok((a_chan, b_chan))
    }

    async fn init(&self) -> Result<ChannelId, Error> {
        let msg = MsgChannelOpenInit {
            port_id: self.a.port_id.clone(),
            ordering: self.ordering,
            counterparty_port_id: self.b.port_id.clone(),
            connection_hops: vec![self.a.connection_id.clone()],
            version: self.version.clone(),
        };

        let events = self
            .a
            .client
            .host()
            .submit(Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenInit(msg)))
            .await?;
        channel_id(events, "chan_open_init", |e| match e {
            IBCEvent::OpenInitChannel(attrs) => Some(attrs.channel_id),
            _ => None,
        })
    }

    async fn try_open(&self, a_chan: &ChannelId) -> Result<ChannelId, Error> {
        let proofs = self
            .b
            .client
            .prove(&Path::ChannelEnds(self.a.port_id.clone(), a_chan.clone()))
            .await?;
        let msg = MsgChannelOpenTry {
            port_id: self.b.port_id.clone(),
            ordering: self.ordering,
            counterparty: Counterparty::new(self.a.port_id.clone(), Some(a_chan.clone())),
            connection_hops: vec![self.b.connection_id.clone()],
            version: self.version.clone(),
            counterparty_version: self.version.clone(),
            proofs,
        };

        let events = self
            .b
            .client
            .host()
            .submit(Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenTry(Box::new(msg))))
            .await?;
        channel_id(events, "chan_open_try", |e| match e {
            IBCEvent::OpenTryChannel(attrs) => Some(attrs.channel_id),
            _ => None,
        })
    }

    async fn ack(&self, a_chan: &ChannelId, b_chan: &ChannelId) -> Result<(), Error> {
        let proofs = self
            .a
            .client
            .prove(&Path::ChannelEnds(self.b.port_id.clone(), b_chan.clone()))
            .await?;
        let msg = MsgChannelOpenAck {
            port_id: self.a.port_id.clone(),
            channel_id: a_chan.clone(),
            counterparty_channel_id: b_chan.clone(),
            counterparty_version: self.version.clone(),
            proofs,
        };

        self.a
            .client
            .host()
            .submit(Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenAck(Box::new(msg))))
            .await?;
        Ok(())
    }

    async fn confirm(&self, a_chan: &ChannelId, b_chan: &ChannelId) -> Result<(), Error> {
        let proofs = self
            .b
            .client
            .prove(&Path::ChannelEnds(self.a.port_id.clone(), a_chan.clone()))
            .await?;
        let msg = MsgChannelOpenConfirm {
            port_id: self.b.port_id.clone(),
            channel_id: b_chan.clone(),
            proofs,
        };

        self.b
            .client
            .host()
            .submit(Ics26Envelope::Ics4Msg(ChannelMsg::ChannelOpenConfirm(msg)))
            .await?;
        Ok(())
    }
}

fn channel_id(
    events: Vec<IBCEvent>,
    step: &str,
    pick: impl Fn(IBCEvent) -> Option<ChannelId>,
) -> Result<ChannelId, Error> {
    events
        .into_iter()
        .find_map(pick)
        .ok_or_else(|| Kind::Handshake(format!("{} produced no channel", step)).into())
}
