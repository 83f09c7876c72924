//! Joining an existing ring through a reference node.

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;

use tracing::{debug, info};

use crate::common::{ring, Id, Node, ID_BITS};
use crate::{Error, Result};

use super::{Inner, JoinState};

impl Inner {
    /// Start a new ring when `bootstrap` is `None`, otherwise join the ring
    /// the node listening on `bootstrap` belongs to.
    pub(super) fn join(&self, bootstrap: Option<SocketAddr>) -> Result<()> {
        let address = match bootstrap {
            Some(address) => address,
            None => {
                self.set_join_state(JoinState::Serving);
                info!(id = %self.me.id, address = ?self.me.address, "Started a new ring");

                return Ok(());
            }
        };

        let reference = self.ping(address)?;
        if reference.id == self.me.id {
            return Err(Error::InvalidArgument(format!(
                "cannot join through {}, it has this node's id",
                reference
            )));
        }

        self.set_join_state(JoinState::InitializingFingerTable);
        self.init_finger_table(&reference)?;

        self.set_join_state(JoinState::PropagatingToOthers);
        self.update_others()?;

        self.set_join_state(JoinState::TransferringKeys);
        self.transfer_keys_from_successor()?;

        self.set_join_state(JoinState::Serving);

        let (successor, predecessor) = {
            let state = self.state();
            (state.successor().clone(), state.predecessor.clone())
        };
        info!(id = %self.me.id, %reference, %successor, %predecessor, "Joined the ring");

        Ok(())
    }

    fn set_join_state(&self, join_state: JoinState) {
        debug!(%join_state, "Join progress");

        self.state().join_state = join_state;
    }

    /// Learn successor, predecessor and fingers from `reference`, and become
    /// the predecessor of the successor.
    fn init_finger_table(&self, reference: &Node) -> Result<()> {
        let n = self.me.id;

        let successor = self.find_successor_via(reference, &n.finger_start(1))?;
        let predecessor = self.predecessor_of(&successor)?;

        if successor.id == n || predecessor.id == n {
            return Err(Error::InvalidArgument(format!(
                "a node with id {} is already on the ring",
                n
            )));
        }

        {
            let mut state = self.state();
            state.fingers.set_successor(successor.clone());
            state.predecessor = predecessor.clone();
        }

        self.set_predecessor_of(&successor, self.me.clone())?;

        debug!(%successor, %predecessor, "Initialized successor");

        for i in 1..ID_BITS {
            let (start, previous) = {
                let state = self.state();
                (
                    *state.fingers.entry(i + 1)?.start(),
                    state.fingers.entry(i)?.node().clone(),
                )
            };

            // Starts between the predecessor and this node are our own, the
            // rest of the ring has not learned about this node yet.
            let node = if start.in_half_open_right(&predecessor.id, &n) {
                self.me.clone()
            } else if ring::contains(&start, &n, &previous.id) {
                previous
            } else {
                self.find_successor_via(reference, &start)?
            };

            if !self.state().merge_finger(node, i + 1)? {
                debug!(index = i + 1, "Kept a closer finger learned during the join");
            }
        }

        Ok(())
    }

    /// Offer this node as a finger to every node that should now point at it.
    ///
    /// For each index `i` the update starts at the last node preceding
    /// `n - 2^(i-1) + 1` and walks counter-clockwise for as long as nodes
    /// accept it. Pairs of `(node, index)` are visited at most once per join.
    fn update_others(&self) -> Result<()> {
        let n = self.me.id;
        let mut visited: HashSet<(Id, usize)> = HashSet::new();
        let mut updated = 0;

        for i in 1..=ID_BITS {
            let target = n
                .wrapping_sub(&Id::power_of_two(i - 1))
                .wrapping_add(&Id::ONE);

            let mut queue = VecDeque::new();
            queue.push_back(self.find_predecessor(&target)?);

            while let Some(node) = queue.pop_front() {
                if node.id == n || !visited.insert((node.id, i)) {
                    continue;
                }

                if let Some(next) = self.update_finger_table_of(&node, self.me.clone(), i)? {
                    updated += 1;
                    queue.push_back(next);
                }
            }
        }

        debug!(updated, visited = visited.len(), "Propagated to other nodes");

        Ok(())
    }

    /// Take over the keys this node is now responsible for from its successor.
    fn transfer_keys_from_successor(&self) -> Result<()> {
        let successor = self.state().successor().clone();

        let keys = self.keys_from(&successor, &self.me.id)?;
        let count = keys.len();

        self.state().keys.extend(keys);

        debug!(%successor, count, "Received keys from successor");

        Ok(())
    }
}
