//! Epidemic: a Rust library simulating the Gossip and Push-Sum dissemination algorithms over
//! configurable network topologies. Every simulated node is a Tokio task with its own mailbox;
//! nodes interact only by message passing, and the coordinator measures how long the network
//! takes to converge as a function of its size and shape.
//!
//! # Features
//! - Full, 3D-grid, line and imperfect-3D-grid topologies.
//! - Rumor-mongering with a per-node hearing threshold.
//! - Push-Sum averaging with ratio-stability convergence.
//! - Deterministic, seedable neighbor selection.
//! - Heuristic or signal-driven termination.
//!
//! # Example
//! ```
//! use epidemic::{Algorithm, Simulation, SimulationConfig, SimError, Topology};
//!
//! # async fn example() -> Result<(), SimError> {
//! let config = SimulationConfig::new(27, Topology::Grid3D, Algorithm::Gossip);
//! let report = Simulation::new(config)?.run().await?;
//! println!("{}", report.elapsed_ms);
//! # Ok(())
//! # }
//! ```

mod error;
mod gossip;
mod node;
mod protocol;
mod push_sum;
pub mod selector;
mod simulation;
pub mod topology;
mod types;

pub use error::SimError;
pub use gossip::{GossipNode, DEFAULT_RUMOR_THRESHOLD};
pub use node::{Envelope, Node, Peer};
pub use protocol::Protocol;
pub use push_sum::{PushSumNode, DEFAULT_RATIO_EPSILON};
pub use selector::Selector;
pub use simulation::{wait_duration, ConvergenceMode, RunReport, Simulation, SimulationConfig};
pub use types::{
    parse_node_count, Action, Algorithm, GossipMessage, NodeId, NodeStatus, PushSumMessage,
    Topology,
};

/// Runs one simulation with default parameters and returns the elapsed milliseconds.
pub async fn run(num_nodes: usize, topology: Topology, algorithm: Algorithm) -> Result<u64, SimError> {
    let config = SimulationConfig::new(num_nodes, topology, algorithm);
    let report = Simulation::new(config)?.run().await?;
    Ok(report.elapsed_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_single_node_full_gossip() {
        let wait = wait_duration(Topology::Full, Algorithm::Gossip, 1).as_millis() as u64;
        assert!(wait >= 103 && wait < 203);

        let elapsed = run(1, Topology::Full, Algorithm::Gossip).await.unwrap();
        assert!(elapsed >= wait && elapsed < wait + 5, "elapsed {} vs wait {}", elapsed, wait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_node_has_no_one_to_tell() {
        let config = SimulationConfig::new(1, Topology::Full, Algorithm::Gossip);
        let report = Simulation::new(config).unwrap().run().await.unwrap();
        assert_eq!(
            report.nodes,
            vec![NodeStatus::Gossip { id: 0, rumor_count: 1, active: true }]
        );
    }

    #[tokio::test]
    async fn test_perfect_cube_gossip() {
        assert_eq!(topology::cube_size(8), 2);
        for i in 0..8 {
            assert_eq!(topology::neighbors(Topology::Grid3D, 8, i).len(), 3);
        }

        let config = SimulationConfig::new(8, Topology::Grid3D, Algorithm::Gossip);
        let report = Simulation::new(config).unwrap().run().await.unwrap();
        assert_eq!(report.nodes.len(), 8);
        for (id, status) in report.nodes.iter().enumerate() {
            assert_eq!(status.id(), id);
            assert!(
                matches!(status, NodeStatus::Gossip { rumor_count: 10, active: false, .. }),
                "node {} did not converge: {:?}",
                id,
                status
            );
        }
        assert_eq!(report.converged, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_node_line_push_sum() {
        assert_eq!(topology::neighbors(Topology::Line, 2, 0), vec![1]);
        assert_eq!(topology::neighbors(Topology::Line, 2, 1), vec![0]);

        let config = SimulationConfig::new(2, Topology::Line, Algorithm::PushSum);
        let wait = config.wait_duration().as_millis() as u64;
        let report = Simulation::new(config).unwrap().run().await.unwrap();
        assert!(report.elapsed_ms >= wait);

        for status in &report.nodes {
            let estimate = status.estimate().unwrap();
            assert!((estimate - 0.5).abs() < 0.001, "estimate {}", estimate);
        }
        assert!(report.converged >= 1);

        // No mass is in flight once the pair settles.
        let (s, w) = report.nodes.iter().fold((0.0, 0.0), |(s, w), status| match status {
            NodeStatus::PushSum { s: si, w: wi, .. } => (s + si, w + wi),
            _ => (s, w),
        });
        assert!((s - 1.0).abs() < 1e-9);
        assert!((w - 2.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_same_push_sum_outcome() {
        let config = SimulationConfig::new(27, Topology::ImperfectGrid3D, Algorithm::PushSum)
            .with_seed(11)
            .with_convergence(ConvergenceMode::Signal);
        let first = Simulation::new(config.clone()).unwrap().run().await.unwrap();
        let second = Simulation::new(config).unwrap().run().await.unwrap();
        // One pair is in flight at a time, so the run is fully determined by the seed.
        assert_eq!(first.nodes, second.nodes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_nodes_waits_base_duration() {
        let wait = wait_duration(Topology::Grid3D, Algorithm::Gossip, 0).as_millis() as u64;
        let elapsed = run(0, Topology::Grid3D, Algorithm::Gossip).await.unwrap();
        assert!(elapsed >= wait && elapsed < wait + 5);
    }
}
