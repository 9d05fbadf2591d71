use crate::{protocol::Protocol, Action, GossipMessage, NodeId, NodeStatus, SimError};

/// Number of rumor receipts after which a node stops counting.
pub const DEFAULT_RUMOR_THRESHOLD: u32 = 10;

/// Rumor-mongering node.
///
/// Counts receipts while active and relays every rumor it hears, including
/// after convergence, so the rumor keeps moving through converged regions.
#[derive(Debug, Clone)]
pub struct GossipNode {
    /// Unique node identifier.
    id: NodeId,

    /// Rumors heard while active.
    rumor_count: u32,

    /// Cleared once `rumor_count` reaches `threshold`.
    active: bool,

    /// Hearing threshold.
    threshold: u32,
}

impl GossipNode {
    /// Creates an active node with the default threshold.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            rumor_count: 0,
            active: true,
            threshold: DEFAULT_RUMOR_THRESHOLD,
        }
    }

    /// Creates an active node that converges after `threshold` receipts.
    ///
    /// # Errors
    /// Returns an error if `threshold` is zero.
    pub fn with_threshold(id: NodeId, threshold: u32) -> Result<Self, SimError> {
        if threshold == 0 {
            return Err(SimError::InvalidConfig(
                "rumor threshold must be at least 1".into(),
            ));
        }
        Ok(Self {
            threshold,
            ..Self::new(id)
        })
    }

    pub fn rumor_count(&self) -> u32 {
        self.rumor_count
    }
}

impl Protocol for GossipNode {
    type Message = GossipMessage;

    fn id(&self) -> NodeId {
        self.id
    }

    fn handle(&mut self, message: GossipMessage) -> Vec<Action<GossipMessage>> {
        match message {
            GossipMessage::Rumor => {
                if !self.active {
                    return vec![Action::Forward(GossipMessage::Rumor)];
                }
                self.rumor_count += 1;
                let mut actions = vec![Action::Forward(GossipMessage::Rumor)];
                if self.rumor_count >= self.threshold {
                    self.active = false;
                    actions.push(Action::Converged);
                }
                actions
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn status(&self) -> NodeStatus {
        NodeStatus::Gossip {
            id: self.id,
            rumor_count: self.rumor_count,
            active: self.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwards(actions: &[Action<GossipMessage>]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, Action::Forward(GossipMessage::Rumor)))
            .count()
    }

    #[test]
    fn test_counts_and_forwards_below_threshold() {
        let mut node = GossipNode::new(4);
        for expected in 1..10 {
            let actions = node.handle(GossipMessage::Rumor);
            assert_eq!(forwards(&actions), 1);
            assert!(!actions.contains(&Action::Converged));
            assert_eq!(node.rumor_count(), expected);
            assert!(node.is_active());
        }
    }

    #[test]
    fn test_tenth_rumor_converges() {
        let mut node = GossipNode::new(0);
        for _ in 0..9 {
            node.handle(GossipMessage::Rumor);
        }
        let actions = node.handle(GossipMessage::Rumor);
        assert_eq!(
            actions,
            vec![Action::Forward(GossipMessage::Rumor), Action::Converged]
        );
        assert!(!node.is_active());
        assert_eq!(node.rumor_count(), 10);
    }

    #[test]
    fn test_converged_node_keeps_forwarding_without_counting() {
        let mut node = GossipNode::new(0);
        for _ in 0..10 {
            node.handle(GossipMessage::Rumor);
        }
        for _ in 0..5 {
            let actions = node.handle(GossipMessage::Rumor);
            assert_eq!(actions, vec![Action::Forward(GossipMessage::Rumor)]);
        }
        assert_eq!(node.rumor_count(), 10);
        assert_eq!(
            node.status(),
            NodeStatus::Gossip { id: 0, rumor_count: 10, active: false }
        );
    }

    #[test]
    fn test_custom_threshold() {
        let mut node = GossipNode::with_threshold(1, 2).unwrap();
        node.handle(GossipMessage::Rumor);
        assert!(node.is_active());
        let actions = node.handle(GossipMessage::Rumor);
        assert!(actions.contains(&Action::Converged));
        assert!(GossipNode::with_threshold(1, 0).is_err());
    }
}
