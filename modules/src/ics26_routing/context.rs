use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anomaly::BoxError;

use crate::ics02_client::context::{ClientKeeper, ClientReader};
use crate::ics03_connection::context::{ConnectionKeeper, ConnectionReader};
use crate::ics04_channel::context::{ChannelKeeper, ChannelReader};
use crate::ics04_channel::packet::Packet;
use crate::ics24_host::identifier::PortId;

/// An application bound to a port. The routing module hands it every packet addressed to, or
/// returning to, that port.
pub trait Module: Send + Sync {
    /// Processes an incoming packet and returns the acknowledgement to commit for it.
    fn on_recv_packet(&self, packet: &Packet) -> Result<Vec<u8>, BoxError>;

    fn on_acknowledgement_packet(
        &self,
        packet: &Packet,
        acknowledgement: &[u8],
    ) -> Result<(), BoxError>;

    fn on_timeout_packet(&self, packet: &Packet) -> Result<(), BoxError>;
}

/// The modules bound to ports on the local chain.
#[derive(Clone, Default)]
pub struct Router {
    routes: BTreeMap<PortId, Arc<dyn Module>>,
}

impl Router {
    /// Returns `false`, leaving the existing route in place, if the port is already bound.
    pub fn add_route(&mut self, port_id: PortId, module: Arc<dyn Module>) -> bool {
        if self.routes.contains_key(&port_id) {
            return false;
        }
        self.routes.insert(port_id, module);
        true
    }

    pub fn get_route(&self, port_id: &PortId) -> Option<Arc<dyn Module>> {
        self.routes.get(port_id).cloned()
    }

    pub fn has_route(&self, port_id: &PortId) -> bool {
        self.routes.contains_key(port_id)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.keys()).finish()
    }
}

/// This trait captures all the functional dependencies (i.e., context) which the ICS26 module
/// requires to be able to dispatch messages to their corresponding ICS handler.
pub trait Ics26Context:
    ClientReader + ClientKeeper + ConnectionReader + ConnectionKeeper + ChannelReader + ChannelKeeper
{
    fn module(&self, port_id: &PortId) -> Option<Arc<dyn Module>>;
}
