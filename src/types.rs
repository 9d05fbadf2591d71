use crate::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Index of a simulated node, equal to its spawn order.
pub type NodeId = usize;

/// Shape of the communication graph between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    /// Every node is connected to every other node.
    #[serde(rename = "full")]
    Full,

    /// Nodes occupy a cube and connect to axis-adjacent cells.
    #[serde(rename = "3D")]
    Grid3D,

    /// Nodes form a chain.
    #[serde(rename = "line")]
    Line,

    /// A 3D grid plus one pseudo-random extra link per node.
    #[serde(rename = "imp3D")]
    ImperfectGrid3D,
}

impl Topology {
    /// Token accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Full => "full",
            Topology::Grid3D => "3D",
            Topology::Line => "line",
            Topology::ImperfectGrid3D => "imp3D",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Topology::Full),
            "3D" | "3d" => Ok(Topology::Grid3D),
            "line" => Ok(Topology::Line),
            "imp3D" | "imp3d" => Ok(Topology::ImperfectGrid3D),
            other => Err(SimError::UnknownTopology(other.to_string())),
        }
    }
}

/// Dissemination algorithm run by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Rumor-mongering with a per-node hearing threshold.
    #[serde(rename = "gossip")]
    Gossip,

    /// Sum/weight averaging.
    #[serde(rename = "push-sum")]
    PushSum,
}

impl Algorithm {
    /// Token accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Gossip => "gossip",
            Algorithm::PushSum => "push-sum",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gossip" => Ok(Algorithm::Gossip),
            "push-sum" => Ok(Algorithm::PushSum),
            other => Err(SimError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Parses a node count token at the boundary.
pub fn parse_node_count(s: &str) -> Result<usize, SimError> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| SimError::InvalidNodeCount(s.to_string()))
}

/// Actions a node takes after handling a protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action<M> {
    /// Send a message to one randomly chosen neighbor.
    Forward(M),

    /// The node just left the active state.
    Converged,
}

/// Messages understood by a gossip node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GossipMessage {
    /// The rumor being disseminated.
    Rumor,
}

/// Messages understood by a push-sum node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushSumMessage {
    /// Kick off the protocol at the origin node.
    StartPushSum,

    /// Half of a peer's mass.
    PushSumPair {
        /// Partial sum.
        s: f64,
        /// Partial weight.
        w: f64,
    },
}

/// Point-in-time view of a node, collected after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeStatus {
    Gossip {
        id: NodeId,
        rumor_count: u32,
        active: bool,
    },
    PushSum {
        id: NodeId,
        s: f64,
        w: f64,
        active: bool,
    },
}

impl NodeStatus {
    pub fn id(&self) -> NodeId {
        match self {
            NodeStatus::Gossip { id, .. } | NodeStatus::PushSum { id, .. } => *id,
        }
    }

    /// `true` once the node has left the active state.
    pub fn is_converged(&self) -> bool {
        match self {
            NodeStatus::Gossip { active, .. } | NodeStatus::PushSum { active, .. } => !active,
        }
    }

    /// Local average estimate `s / w` for push-sum nodes.
    pub fn estimate(&self) -> Option<f64> {
        match self {
            NodeStatus::PushSum { s, w, .. } => Some(s / w),
            NodeStatus::Gossip { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topology_tokens() {
        assert_eq!("full".parse::<Topology>().unwrap(), Topology::Full);
        assert_eq!("3D".parse::<Topology>().unwrap(), Topology::Grid3D);
        assert_eq!("line".parse::<Topology>().unwrap(), Topology::Line);
        assert_eq!("imp3D".parse::<Topology>().unwrap(), Topology::ImperfectGrid3D);
        assert!(matches!(
            "ring".parse::<Topology>(),
            Err(SimError::UnknownTopology(t)) if t == "ring"
        ));
    }

    #[test]
    fn test_parse_algorithm_tokens() {
        assert_eq!("gossip".parse::<Algorithm>().unwrap(), Algorithm::Gossip);
        assert_eq!("push-sum".parse::<Algorithm>().unwrap(), Algorithm::PushSum);
        assert!(matches!(
            "pushsum".parse::<Algorithm>(),
            Err(SimError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_parse_node_count() {
        assert_eq!(parse_node_count("42").unwrap(), 42);
        assert!(matches!(parse_node_count("-3"), Err(SimError::InvalidNodeCount(_))));
        assert!(matches!(parse_node_count("ten"), Err(SimError::InvalidNodeCount(_))));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for t in [Topology::Full, Topology::Grid3D, Topology::Line, Topology::ImperfectGrid3D] {
            assert_eq!(t.to_string().parse::<Topology>().unwrap(), t);
        }
    }

    #[test]
    fn test_status_estimate() {
        let status = NodeStatus::PushSum { id: 1, s: 1.0, w: 2.0, active: false };
        assert_eq!(status.estimate(), Some(0.5));
        assert!(status.is_converged());
        let status = NodeStatus::Gossip { id: 0, rumor_count: 3, active: true };
        assert_eq!(status.estimate(), None);
        assert_eq!(status.id(), 0);
    }
}
