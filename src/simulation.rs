use crate::{
    error::SimError,
    gossip::{GossipNode, DEFAULT_RUMOR_THRESHOLD},
    node::{Node, Peer},
    protocol::Protocol,
    push_sum::{PushSumNode, DEFAULT_RATIO_EPSILON},
    selector::{self, Selector},
    topology, Algorithm, GossipMessage, NodeId, NodeStatus, PushSumMessage, Topology,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info};

/// How the coordinator decides a run is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceMode {
    /// Sleep for the formula-driven wait regardless of node state.
    #[default]
    Heuristic,

    /// Stop as soon as every node reports convergence, bounded by the heuristic wait.
    Signal,
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of nodes to spawn.
    pub num_nodes: usize,

    /// Communication graph.
    pub topology: Topology,

    /// Algorithm every node runs.
    pub algorithm: Algorithm,

    /// Offset added to each node's selector seed.
    pub seed: u64,

    /// Gossip receipts before a node converges.
    pub rumor_threshold: u32,

    /// Push-Sum ratio stability threshold.
    pub ratio_epsilon: f64,

    /// Termination strategy.
    pub convergence: ConvergenceMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_nodes: 10,
            topology: Topology::Full,
            algorithm: Algorithm::Gossip,
            seed: 0,
            rumor_threshold: DEFAULT_RUMOR_THRESHOLD,
            ratio_epsilon: DEFAULT_RATIO_EPSILON,
            convergence: ConvergenceMode::Heuristic,
        }
    }
}

impl SimulationConfig {
    pub fn new(num_nodes: usize, topology: Topology, algorithm: Algorithm) -> Self {
        Self {
            num_nodes,
            topology,
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_rumor_threshold(mut self, threshold: u32) -> Self {
        self.rumor_threshold = threshold;
        self
    }

    pub fn with_ratio_epsilon(mut self, epsilon: f64) -> Self {
        self.ratio_epsilon = epsilon;
        self
    }

    pub fn with_convergence(mut self, mode: ConvergenceMode) -> Self {
        self.convergence = mode;
        self
    }

    /// # Errors
    /// Returns an error if the threshold is zero or the epsilon is not positive.
    pub fn validate(&self) -> Result<(), SimError> {
        GossipNode::with_threshold(0, self.rumor_threshold)?;
        PushSumNode::with_epsilon(0, self.ratio_epsilon)?;
        Ok(())
    }

    /// Heuristic wait for this configuration.
    pub fn wait_duration(&self) -> Duration {
        wait_duration(self.topology, self.algorithm, self.num_nodes)
    }
}

/// Formula-driven time allowed for `num_nodes` nodes to converge.
///
/// Base cost grows linearly with the network size, steeper for sparser
/// topologies, plus a jitter seeded by `num_nodes`.
pub fn wait_duration(topology: Topology, algorithm: Algorithm, num_nodes: usize) -> Duration {
    let n = num_nodes as u64;
    let (base, per_node, jitter_cap) = match (algorithm, topology) {
        (Algorithm::Gossip, Topology::Full) => (100, 3, 100),
        (Algorithm::Gossip, Topology::ImperfectGrid3D) => (200, 6, 100),
        (Algorithm::Gossip, Topology::Grid3D) => (300, 10, 100),
        (Algorithm::Gossip, Topology::Line) => (500, 15, 100),
        (Algorithm::PushSum, Topology::Full) => (300, 8, 200),
        (Algorithm::PushSum, Topology::ImperfectGrid3D) => (600, 12, 200),
        (Algorithm::PushSum, Topology::Grid3D) => (1000, 20, 200),
        (Algorithm::PushSum, Topology::Line) => (1500, 30, 200),
    };
    let jitter = selector::next(jitter_cap, n) as u64;
    Duration::from_millis(base + per_node * n + jitter)
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub num_nodes: usize,
    pub topology: Topology,
    pub algorithm: Algorithm,
    pub convergence: ConvergenceMode,

    /// Wall-clock time from start to the end of the wait, in milliseconds.
    pub elapsed_ms: u64,

    /// Nodes that left the active state.
    pub converged: usize,

    /// Per-node snapshots, ordered by id.
    pub nodes: Vec<NodeStatus>,
}

/// Coordinator for one end-to-end run.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    /// # Errors
    /// Returns an error if `config` fails validation.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Spawns the network, injects the first message and waits for it to settle.
    ///
    /// All node tasks are aborted before this returns.
    pub async fn run(&self) -> Result<RunReport, SimError> {
        let cfg = &self.config;
        match cfg.algorithm {
            Algorithm::Gossip => {
                let threshold = cfg.rumor_threshold;
                self.execute(
                    |id| GossipNode::with_threshold(id, threshold),
                    GossipMessage::Rumor,
                )
                .await
            }
            Algorithm::PushSum => {
                let epsilon = cfg.ratio_epsilon;
                self.execute(
                    |id| PushSumNode::with_epsilon(id, epsilon),
                    PushSumMessage::StartPushSum,
                )
                .await
            }
        }
    }

    async fn execute<P, F>(&self, make: F, initial: P::Message) -> Result<RunReport, SimError>
    where
        P: Protocol,
        F: Fn(NodeId) -> Result<P, SimError>,
    {
        let cfg = &self.config;
        let n = cfg.num_nodes;
        let wait = cfg.wait_duration();
        info!(
            nodes = n,
            topology = %cfg.topology,
            algorithm = %cfg.algorithm,
            wait_ms = wait.as_millis() as u64,
            "starting simulation"
        );

        let start = Instant::now();
        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let reports = match cfg.convergence {
            ConvergenceMode::Signal => Some(report_tx),
            ConvergenceMode::Heuristic => None,
        };

        let mut tasks = JoinSet::new();
        let mut peers: Vec<Peer<P::Message>> = Vec::with_capacity(n);
        for id in 0..n {
            let selector = Selector::new(cfg.seed.wrapping_add(id as u64));
            let (node, peer) = Node::new(make(id)?, selector, reports.clone());
            tasks.spawn(node.run());
            peers.push(peer);
        }
        drop(reports);

        self.connect(&peers).await?;

        if let Some(origin) = peers.first() {
            origin.send(initial);
        }

        match cfg.convergence {
            ConvergenceMode::Heuristic => tokio::time::sleep(wait).await,
            ConvergenceMode::Signal => {
                let mut reported = 0;
                let outcome = tokio::time::timeout(wait, async {
                    while reported < n {
                        match report_rx.recv().await {
                            Some(_) => reported += 1,
                            None => break,
                        }
                    }
                })
                .await;
                debug!(reported, timed_out = outcome.is_err(), "convergence wait over");
            }
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let mut nodes = Vec::with_capacity(n);
        for peer in &peers {
            nodes.push(peer.status().await?);
        }
        drop(peers);
        shutdown(tasks).await?;

        let converged = nodes.iter().filter(|s| s.is_converged()).count();
        info!(elapsed_ms, converged, nodes = n, "simulation finished");

        Ok(RunReport {
            num_nodes: n,
            topology: cfg.topology,
            algorithm: cfg.algorithm,
            convergence: cfg.convergence,
            elapsed_ms,
            converged,
            nodes,
        })
    }

    /// Delivers every node its neighbor handles and waits until all are installed.
    async fn connect<M>(&self, peers: &[Peer<M>]) -> Result<(), SimError> {
        let cfg = &self.config;
        let mut acks = Vec::with_capacity(peers.len());
        for peer in peers {
            let neighbors: Vec<Peer<M>> = topology::neighbors(cfg.topology, peers.len(), peer.id())
                .into_iter()
                .filter_map(|j| peers.get(j).cloned())
                .collect();
            acks.push((peer.id(), peer.set_neighbors(neighbors)?));
        }
        for (id, ack) in acks {
            ack.await.map_err(|_| SimError::NodeUnavailable(id))?;
        }
        debug!(nodes = peers.len(), topology = %cfg.topology, "topology wired");
        Ok(())
    }
}

/// Aborts every node and surfaces panics.
async fn shutdown(mut tasks: JoinSet<()>) -> Result<(), SimError> {
    tasks.abort_all();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
