use crate::{protocol::Protocol, selector::Selector, Action, NodeId, NodeStatus, SimError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// Everything a node's mailbox accepts.
#[derive(Debug)]
pub enum Envelope<M> {
    /// Replace the neighbor list. The ack fires once the list is installed.
    SetNeighbors {
        neighbors: Vec<Peer<M>>,
        ack: Option<oneshot::Sender<()>>,
    },

    /// Request a status snapshot.
    Status(oneshot::Sender<NodeStatus>),

    /// Protocol traffic.
    Protocol(M),
}

/// Handle for sending to a node's mailbox.
#[derive(Debug)]
pub struct Peer<M> {
    id: NodeId,
    sender: mpsc::UnboundedSender<Envelope<M>>,
}

impl<M> Clone for Peer<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
        }
    }
}

impl<M> Peer<M> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Enqueues a protocol message. Returns `false` if the node has stopped.
    pub fn send(&self, message: M) -> bool {
        self.sender.send(Envelope::Protocol(message)).is_ok()
    }

    /// Installs `neighbors` on the node.
    ///
    /// The returned receiver resolves once the node has processed the update.
    pub fn set_neighbors(&self, neighbors: Vec<Peer<M>>) -> Result<oneshot::Receiver<()>, SimError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(Envelope::SetNeighbors {
                neighbors,
                ack: Some(ack),
            })
            .map_err(|_| SimError::NodeUnavailable(self.id))?;
        Ok(done)
    }

    /// Fetches a snapshot of the node's state.
    pub async fn status(&self) -> Result<NodeStatus, SimError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Envelope::Status(reply))
            .map_err(|_| SimError::NodeUnavailable(self.id))?;
        response.await.map_err(|_| SimError::NodeUnavailable(self.id))
    }
}

/// An actor driving one [`Protocol`] instance.
pub struct Node<P: Protocol> {
    /// Node-local state machine.
    protocol: P,

    /// Handles of directly connected peers.
    neighbors: Vec<Peer<P::Message>>,

    /// Source of neighbor choices.
    selector: Selector,

    /// Inbound mailbox.
    receiver: mpsc::UnboundedReceiver<Envelope<P::Message>>,

    /// Where to announce convergence, if anyone listens.
    reports: Option<mpsc::UnboundedSender<NodeId>>,
}

impl<P: Protocol> Node<P> {
    /// Creates a node with an empty neighbor list.
    ///
    /// # Returns
    /// A tuple of the node and the handle peers use to reach it.
    pub fn new(
        protocol: P,
        selector: Selector,
        reports: Option<mpsc::UnboundedSender<NodeId>>,
    ) -> (Self, Peer<P::Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let peer = Peer {
            id: protocol.id(),
            sender,
        };
        (
            Self {
                protocol,
                neighbors: Vec::new(),
                selector,
                receiver,
                reports,
            },
            peer,
        )
    }

    /// Runs until every handle to this node is dropped.
    pub async fn run(mut self) {
        while let Some(envelope) = self.receiver.recv().await {
            self.handle(envelope);
        }
        trace!(node = self.protocol.id(), "mailbox closed");
    }

    fn handle(&mut self, envelope: Envelope<P::Message>) {
        match envelope {
            Envelope::SetNeighbors { neighbors, ack } => {
                trace!(node = self.protocol.id(), degree = neighbors.len(), "neighbors set");
                self.neighbors = neighbors;
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            Envelope::Status(reply) => {
                let _ = reply.send(self.protocol.status());
            }
            Envelope::Protocol(message) => {
                for action in self.protocol.handle(message) {
                    self.apply(action);
                }
            }
        }
    }

    fn apply(&mut self, action: Action<P::Message>) {
        let id = self.protocol.id();
        match action {
            Action::Forward(message) => match self.selector.choose(&self.neighbors) {
                Some(peer) => {
                    trace!(from = id, to = peer.id(), ?message, "forward");
                    if !peer.send(message) {
                        trace!(from = id, to = peer.id(), "peer mailbox closed");
                    }
                }
                None => trace!(node = id, "no neighbors, dropping"),
            },
            Action::Converged => {
                debug!(node = id, "converged");
                if let Some(reports) = &self.reports {
                    let _ = reports.send(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GossipMessage, GossipNode, PushSumMessage, PushSumNode};

    #[tokio::test]
    async fn test_status_before_neighbors() {
        let (node, peer) = Node::new(GossipNode::new(3), Selector::new(3), None);
        tokio::spawn(node.run());
        assert_eq!(
            peer.status().await.unwrap(),
            NodeStatus::Gossip { id: 3, rumor_count: 0, active: true }
        );
    }

    #[tokio::test]
    async fn test_isolated_node_counts_but_does_not_forward() {
        let (node, peer) = Node::new(GossipNode::new(0), Selector::new(0), None);
        tokio::spawn(node.run());
        let ack = tokio_test::assert_ok!(peer.set_neighbors(Vec::new()));
        tokio_test::assert_ok!(ack.await);
        assert!(peer.send(GossipMessage::Rumor));
        match peer.status().await.unwrap() {
            NodeStatus::Gossip { rumor_count, .. } => assert_eq!(rumor_count, 1),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_forward_reaches_neighbor_mailbox() {
        let (node, peer) = Node::new(PushSumNode::new(2), Selector::new(2), None);
        tokio::spawn(node.run());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let probe = Peer { id: 9, sender: tx };
        peer.set_neighbors(vec![probe]).unwrap().await.unwrap();
        peer.send(PushSumMessage::StartPushSum);

        match rx.recv().await {
            Some(Envelope::Protocol(PushSumMessage::PushSumPair { s, w })) => {
                assert_eq!((s, w), (1.0, 0.5));
            }
            _ => panic!("expected a push-sum pair"),
        }
    }

    #[tokio::test]
    async fn test_convergence_is_reported() {
        let (reports, mut converged) = mpsc::unbounded_channel();
        let protocol = GossipNode::with_threshold(5, 2).unwrap();
        let (node, peer) = Node::new(protocol, Selector::new(5), Some(reports));
        tokio::spawn(node.run());
        peer.send(GossipMessage::Rumor);
        peer.send(GossipMessage::Rumor);
        assert_eq!(converged.recv().await, Some(5));
    }

    #[tokio::test]
    async fn test_closed_node_is_unavailable() {
        let (node, peer) = Node::new(GossipNode::new(1), Selector::new(1), None);
        drop(node);
        assert!(!peer.send(GossipMessage::Rumor));
        let err = tokio_test::assert_err!(peer.status().await);
        assert!(matches!(err, SimError::NodeUnavailable(1)));
        tokio_test::assert_err!(peer.set_neighbors(Vec::new()));
    }
}
