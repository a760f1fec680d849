use super::edges::EdgeId;
use super::message::{FragmentId, Level, NodeState, INFINITY};

/// Per-node algorithm variables. Owned by the engine; nothing else mutates
/// them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlgorithmState {
    pub state: NodeState,
    pub level: Level,
    pub fragment: FragmentId,
    /// Children that have not reported for the current phase yet.
    pub pending_reports: usize,
    /// Edge the current fragment's Initiate arrived on.
    pub parent: Option<EdgeId>,
    pub test_edge: Option<EdgeId>,
    pub best_edge: Option<EdgeId>,
    pub best_weight: u16,
}

impl Default for AlgorithmState {
    fn default() -> Self {
        AlgorithmState {
            state: NodeState::Find,
            level: 0,
            fragment: 0,
            pending_reports: 0,
            parent: None,
            test_edge: None,
            best_edge: None,
            best_weight: INFINITY,
        }
    }
}

impl AlgorithmState {
    /// Forgets the candidate and the probe of the previous phase.
    pub fn reset_search(&mut self) {
        self.test_edge = None;
        self.best_edge = None;
        self.best_weight = INFINITY;
    }
}
