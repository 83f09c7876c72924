use std::net::SocketAddr;

use tracing::{debug, trace};

use crate::common::{Id, RequestSpecific, ResponseSpecific};
use crate::rpc::RequestHandler;
use crate::Result;

use super::Inner;

impl RequestHandler for Inner {
    /// Serve one request, from a peer or from this node itself.
    ///
    /// The state lock is only held for local reads and writes, never across
    /// a call to another node.
    fn handle_request(
        &self,
        request: RequestSpecific,
        from: SocketAddr,
    ) -> Result<ResponseSpecific> {
        trace!(context = "handle_request", method = request.method(), ?from);

        let response = match request {
            RequestSpecific::Ping => ResponseSpecific::Node(self.me.clone()),
            RequestSpecific::Successor => {
                ResponseSpecific::Node(self.state().successor().clone())
            }
            RequestSpecific::FindSuccessor { id } => {
                ResponseSpecific::Node(self.find_successor(&id)?)
            }
            RequestSpecific::ClosestPrecedingFinger { id } => {
                let state = self.state();

                ResponseSpecific::Node(state.fingers.closest_preceding_finger(&id).clone())
            }
            RequestSpecific::GetPredecessor => {
                ResponseSpecific::Node(self.state().predecessor.clone())
            }
            RequestSpecific::SetPredecessor { node } => {
                debug!(predecessor = %node, "Predecessor changed");

                self.state().predecessor = node;

                ResponseSpecific::Ack
            }
            RequestSpecific::UpdateFingerTable { node, index } => {
                let next = self.state().update_finger(node.clone(), index)?;

                match next {
                    Some(next) => {
                        debug!(index, finger = %node, "Updated finger");

                        ResponseSpecific::Propagate(next)
                    }
                    None => ResponseSpecific::Ack,
                }
            }
            RequestSpecific::PopulateKeys { keys } => {
                let mut state = self.state();

                let foreign = keys.keys().filter(|id| !state.owns(id)).count();
                if foreign > 0 {
                    debug!(foreign, "Populated keys outside of the owned interval");
                }

                state.keys.extend(keys);
                debug!(total = state.keys.len(), "Populated keys");

                ResponseSpecific::Ack
            }
            RequestSpecific::GetKeysFromSuccessor { id } => {
                let keys = self.state().extract_keys_for(&id);

                debug!(to = %id, count = keys.len(), "Handing keys over to new predecessor");

                ResponseSpecific::Keys(keys)
            }
            RequestSpecific::QueryKey { key } => {
                ResponseSpecific::Value(self.lookup(&Id::from_key(&key))?)
            }
            RequestSpecific::GetValueForKey { id } => {
                ResponseSpecific::Value(self.state().keys.get(&id)?)
            }
        };

        Ok(response)
    }
}
