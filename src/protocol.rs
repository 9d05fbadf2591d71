use crate::{Action, NodeId, NodeStatus};
use std::fmt::Debug;

/// Per-node state machine for a dissemination algorithm.
///
/// Implementors own all node-local state and decide, for each inbound
/// message, what to forward and whether the node has just converged. Neighbor
/// selection and delivery belong to the actor that drives the protocol.
pub trait Protocol: Send + 'static {
    /// Type of message exchanged between nodes.
    type Message: Debug + Send + 'static;

    /// Identifier of the node running this state machine.
    fn id(&self) -> NodeId;

    /// Applies `message` to the local state.
    ///
    /// Returns the actions to perform, in order.
    fn handle(&mut self, message: Self::Message) -> Vec<Action<Self::Message>>;

    /// Whether the node is still in its active (non-converged) state.
    fn is_active(&self) -> bool;

    /// Snapshot of the local state.
    fn status(&self) -> NodeStatus;
}
