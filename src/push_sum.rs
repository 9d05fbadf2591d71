use crate::{protocol::Protocol, Action, NodeId, NodeStatus, PushSumMessage, SimError};
use std::collections::VecDeque;

/// Maximum difference between consecutive ratios for a node to count as stable.
pub const DEFAULT_RATIO_EPSILON: f64 = 0.001;

/// Number of recent ratios kept for the stability check.
const HISTORY_LEN: usize = 3;

/// Push-Sum averaging node.
///
/// Starts with `s = id`, `w = 1`. Each active receipt folds the incoming pair
/// into the local mass, then either settles (ratio stable across the last
/// three receipts) or halves and forwards half of the mass.
#[derive(Debug, Clone)]
pub struct PushSumNode {
    /// Unique node identifier.
    id: NodeId,

    /// Partial sum.
    s: f64,

    /// Partial weight.
    w: f64,

    /// Most recent `s / w` values, newest first.
    ratios: VecDeque<f64>,

    /// Cleared once the ratio is stable.
    active: bool,

    /// Stability threshold.
    epsilon: f64,
}

impl PushSumNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            s: id as f64,
            w: 1.0,
            ratios: VecDeque::with_capacity(HISTORY_LEN),
            active: true,
            epsilon: DEFAULT_RATIO_EPSILON,
        }
    }

    /// Creates a node with a custom stability threshold.
    ///
    /// # Errors
    /// Returns an error if `epsilon` is not positive.
    pub fn with_epsilon(id: NodeId, epsilon: f64) -> Result<Self, SimError> {
        if epsilon.is_nan() || epsilon <= 0.0 {
            return Err(SimError::InvalidConfig("ratio epsilon must be positive".into()));
        }
        Ok(Self {
            epsilon,
            ..Self::new(id)
        })
    }

    pub fn sum(&self) -> f64 {
        self.s
    }

    pub fn weight(&self) -> f64 {
        self.w
    }

    /// Current estimate of the global average.
    pub fn ratio(&self) -> f64 {
        self.s / self.w
    }

    /// Recorded ratios, newest first.
    pub fn ratios(&self) -> impl Iterator<Item = f64> + '_ {
        self.ratios.iter().copied()
    }

    fn record(&mut self, ratio: f64) {
        self.ratios.push_front(ratio);
        self.ratios.truncate(HISTORY_LEN);
    }

    fn is_stable(&self) -> bool {
        match (self.ratios.front(), self.ratios.get(1), self.ratios.get(2)) {
            (Some(r1), Some(r2), Some(r3)) => {
                (r1 - r2).abs() < self.epsilon && (r2 - r3).abs() < self.epsilon
            }
            _ => false,
        }
    }

    /// Keeps half of the mass and returns the other half as a message.
    fn split(&mut self) -> PushSumMessage {
        self.s /= 2.0;
        self.w /= 2.0;
        PushSumMessage::PushSumPair {
            s: self.s,
            w: self.w,
        }
    }
}

impl Protocol for PushSumNode {
    type Message = PushSumMessage;

    fn id(&self) -> NodeId {
        self.id
    }

    fn handle(&mut self, message: PushSumMessage) -> Vec<Action<PushSumMessage>> {
        match message {
            PushSumMessage::StartPushSum => vec![Action::Forward(self.split())],
            PushSumMessage::PushSumPair { .. } if !self.active => Vec::new(),
            PushSumMessage::PushSumPair { s, w } => {
                self.s += s;
                self.w += w;
                let ratio = self.ratio();
                self.record(ratio);
                if self.is_stable() {
                    self.active = false;
                    vec![Action::Converged]
                } else {
                    vec![Action::Forward(self.split())]
                }
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn status(&self) -> NodeStatus {
        NodeStatus::PushSum {
            id: self.id,
            s: self.s,
            w: self.w,
            active: self.active,
        }
    }
}
