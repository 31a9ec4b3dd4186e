//! Drives the connection handshake between two chains, given a client on each that tracks
//! the other.

use std::time::Duration;

use tracing::info;

use ibc::events::IBCEvent;
use ibc::ics03_connection::connection::{Counterparty, State};
use ibc::ics03_connection::msgs::{
    ConnectionMsg, MsgConnectionOpenAck, MsgConnectionOpenConfirm, MsgConnectionOpenInit,
    MsgConnectionOpenTry,
};
use ibc::ics03_connection::version::get_compatible_versions;
use ibc::ics24_host::identifier::ConnectionId;
use ibc::ics24_host::path::Path;
use ibc::ics26_routing::msgs::Ics26Envelope;

use crate::config::RelayConfig;
use crate::error::{Error, Kind};
use crate::foreign_client::ForeignClient;
use crate::util::retry::retry_transient;

#[derive(Clone, Debug)]
pub struct ConnectionHandshake {
    /// Lives on chain A and tracks chain B.
    a_client: ForeignClient,
    /// Lives on chain B and tracks chain A.
    b_client: ForeignClient,
    delay_period: Duration,
    config: RelayConfig,
}

impl ConnectionHandshake {
    pub fn new(
        a_client: ForeignClient,
        b_client: ForeignClient,
        delay_period: Duration,
        config: RelayConfig,
    ) -> Result<Self, Error> {
        if a_client.host().id() != b_client.tracked().id()
            || b_client.host().id() != a_client.tracked().id()
        {
            return Err(Kind::Handshake(format!(
                "clients {} and {} do not track each other's chains",
                a_client, b_client
            ))
            .into());
        }

        Ok(Self {
            a_client,
            b_client,
            delay_period,
            config,
        })
    }

    /// Runs Init on A, Try on B, Ack on A and Confirm on B. Returns the connection ids on A
    /// and B.
    pub async fn open(&self) -> Result<(ConnectionId, ConnectionId), Error> {
        let a_conn = retry_transient(&self.config, "conn_open_init", || self.init()).await?;
        let b_conn = retry_transient(&self.config, "conn_open_try", || self.try_open(&a_conn)).await?;
        retry_transient(&self.config, "conn_open_ack", || self.ack(&a_conn, &b_conn)).await?;
        retry_transient(&self.config, "conn_open_confirm", || self.confirm(&b_conn)).await?;

        for (client, id) in &[(&self.a_client, &a_conn), (&self.b_client, &b_conn)] {
            let end = client
                .host()
                .query_connection(id)
                .await?
                .ok_or_else(|| Kind::Handshake(format!("{} vanished from {}", id, client.host().id())))?;
            if end.state() != State::Open {
                return Err(Kind::Handshake(format!(
                    "{} on {} ended in state {}",
                    id,
                    client.host().id(),
                    end.state().as_string()
                ))
                .into());
            }
        }

        info!(
            "connection open: {} on {} <-> {} on {}",
            a_conn,
            self.a_client.host().id(),
            b_conn,
            self.b_client.host().id()
        );
        Ok((a_conn, b_conn))
    }

    async fn init(&self) -> Result<ConnectionId, Error> {
        let msg = MsgConnectionOpenInit {
            client_id: self.a_client.id().clone(),
            counterparty: Counterparty::new(
                self.b_client.id().clone(),
                None,
                self.b_client.host().commitment_prefix(),
            ),
            version: None,
            delay_period: self.delay_period,
        };

        let events = self
            .a_client
            .host()
            .submit(Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenInit(msg)))
            .await?;
        connection_id(events, "conn_open_init", |e| match e {
            IBCEvent::OpenInitConnection(attrs) => Some(attrs.connection_id),
            _ => None,
        })
    }

    async fn try_open(&self, a_conn: &ConnectionId) -> Result<ConnectionId, Error> {
        let proofs = self.b_client.prove(&Path::Connections(a_conn.clone())).await?;
        let msg = MsgConnectionOpenTry {
            client_id: self.b_client.id().clone(),
            counterparty: Counterparty::new(
                self.a_client.id().clone(),
                Some(a_conn.clone()),
                self.a_client.host().commitment_prefix(),
            ),
            counterparty_versions: get_compatible_versions(),
            delay_period: self.delay_period,
            proofs,
        };

        let events = self
            .b_client
            .host()
            .submit(Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenTry(Box::new(msg))))
            .await?;
        connection_id(events, "conn_open_try", |e| match e {
            IBCEvent::OpenTryConnection(attrs) => Some(attrs.connection_id),
            _ => None,
        })
    }

    async fn ack(&self, a_conn: &ConnectionId, b_conn: &ConnectionId) -> Result<(), Error> {
        // The version B settled on at Try is the one A has to accept.
        let b_end = self
            .b_client
            .host()
            .query_connection(b_conn)
            .await?
            .ok_or_else(|| Kind::Query(self.b_client.host().id().clone()))?;
        let version = b_end
            .versions()
            .first()
            .cloned()
            .ok_or_else(|| Kind::Handshake(format!("{} has no version", b_conn)))?;

        let proofs = self.a_client.prove(&Path::Connections(b_conn.clone())).await?;
        let msg = MsgConnectionOpenAck {
            connection_id: a_conn.clone(),
            counterparty_connection_id: b_conn.clone(),
            version,
            proofs,
        };

        self.a_client
            .host()
            .submit(Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenAck(Box::new(msg))))
            .await?;
        Ok(())
    }

    async fn confirm(&self, b_conn: &ConnectionId) -> Result<(), Error> {
        let a_conn = self
            .b_client
            .host()
            .query_connection(b_conn)
            .await?
            .and_then(|end| end.counterparty().connection_id().cloned())
            .ok_or_else(|| Kind::Handshake(format!("{} has no counterparty connection", b_conn)))?;

        let proofs = self.b_client.prove(&Path::Connections(a_conn)).await?;
        let msg = MsgConnectionOpenConfirm {
            connection_id: b_conn.clone(),
            proofs,
        };

        self.b_client
            .host()
            .submit(Ics26Envelope::Ics3Msg(ConnectionMsg::ConnectionOpenConfirm(msg)))
            .await?;
        Ok(())
    }
}

fn connection_id(
    events: Vec<IBCEvent>,
    step: &str,
    pick: impl Fn(IBCEvent) -> Option<ConnectionId>,
) -> Result<ConnectionId, Error> {
    events
        .into_iter()
        .find_map(pick)
        .ok_or_else(|| Kind::Handshake(format!("{} produced no connection", step)).into())
}
