use tracing::{debug, info, warn};

use super::codec;
use super::edges::{EdgeId, EdgeSet, EdgeStatus};
use super::message::{FragmentId, Level, Message, NodeState, INFINITY};
use super::state::AlgorithmState;
use crate::common::error::GhsError;

/*
    Each node runs the same event-driven procedure. A fragment's core edge is
    the edge along which its last combine happened; the two nodes at its ends
    broadcast Initiate through the fragment tree, every node probes its
    cheapest unclassified edge with Test, and the results flow back towards
    the core as Reports. The core then moves the root towards the best edge
    (Change-root) and a Connect goes out over it.

    A fragment at a lower level is absorbed by the fragment it connects to. Two
    fragments at the same level that pick the same edge combine into a
    fragment one level higher whose identity is the weight of that edge.
    Anything that cannot be answered yet (a Connect or Test from a fragment
    further ahead, a Report from the core while still searching) is deferred
    and retried later.
*/

pub type NodeId = usize;

/// Message produced by a handler, to be written on `edge`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub edge: EdgeId,
    pub message: Message,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Handled,
    /// Not answerable in the current state; the caller must requeue the frame.
    Deferred,
    /// Frame could not be decoded and was discarded.
    Dropped,
    /// The whole graph is spanned; the node is done.
    Terminated,
}

pub struct ProtocolEngine {
    pub id: NodeId,
    pub edges: EdgeSet,
    pub state: AlgorithmState,
    outbox: Vec<Outbound>,
    terminated: bool,
}

impl ProtocolEngine {
    pub fn new(id: NodeId, edges: EdgeSet) -> Self {
        ProtocolEngine {
            id,
            edges,
            state: AlgorithmState::default(),
            outbox: Vec::new(),
            terminated: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Messages emitted since the last call, in emission order.
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Level 0 behaviour: join the cheapest edge and ask its other end to
    /// connect.
    pub fn wakeup(&mut self) -> Result<(), GhsError> {
        let lowest = self.edges.lowest().ok_or(GhsError::NoEdges)?;
        self.state = AlgorithmState::default();
        self.edges.classify(lowest, EdgeStatus::Branch);
        info!(
            node = self.id,
            edge = self.edges.weight(lowest),
            degree = self.edges.count(),
            "waking up"
        );
        self.send(lowest, Message::Connect {
            weight: self.edges.weight(lowest),
            level: 0,
        });
        Ok(())
    }

    /// Decodes and processes one frame that arrived on `arrival`.
    pub fn handle(&mut self, arrival: EdgeId, frame: &[u8]) -> Result<Step, GhsError> {
        let message = match codec::decode(frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(node = self.id, error = %err, "dropping malformed frame");
                return Ok(Step::Dropped);
            }
        };
        let edge = self.resolve(arrival, &message)?;

        let step = match message {
            Message::Connect { level, .. } => self.on_connect(edge, level)?,
            Message::Initiate {
                level,
                state,
                fragment,
                ..
            } => {
                self.on_initiate(edge, level, fragment, state)?;
                Step::Handled
            }
            Message::Test {
                level, fragment, ..
            } => self.on_test(edge, level, fragment)?,
            Message::Accept { .. } => {
                self.on_accept(edge)?;
                Step::Handled
            }
            Message::Reject { .. } => {
                self.on_reject(edge)?;
                Step::Handled
            }
            Message::ChangeRoot { .. } => {
                self.change_root()?;
                Step::Handled
            }
            Message::Report { best } => self.on_report(edge, best)?,
        };

        debug!(
            node = self.id,
            kind = ?message.kind(),
            edge = self.edges.weight(edge),
            weight = message.weight_field(),
            level = self.state.level,
            fragment = self.state.fragment,
            state = ?self.state.state,
            ?step,
            "processed message"
        );
        Ok(step)
    }

    fn resolve(&self, arrival: EdgeId, message: &Message) -> Result<EdgeId, GhsError> {
        match message.edge_weight() {
            Some(weight) => self
                .edges
                .find_by_weight(weight)
                .ok_or(GhsError::UnknownEdge(weight)),
            None if arrival < self.edges.count() => Ok(arrival),
            None => Err(GhsError::Protocol("report arrived on an unknown edge")),
        }
    }

    fn on_connect(&mut self, edge: EdgeId, level: Level) -> Result<Step, GhsError> {
        let weight = self.edges.weight(edge);
        if level < self.state.level {
            // Absorb the lower-level fragment.
            self.edges.classify(edge, EdgeStatus::Branch);
            self.send(edge, Message::Initiate {
                weight,
                level: self.state.level,
                state: self.state.state,
                fragment: self.state.fragment,
            });
            if self.state.state == NodeState::Find {
                self.state.pending_reports += 1;
            }
            Ok(Step::Handled)
        } else if self.edges.status(edge) == EdgeStatus::Unknown {
            Ok(Step::Deferred)
        } else {
            // Both ends picked this edge at the same level.
            let level = self
                .state
                .level
                .checked_add(1)
                .ok_or(GhsError::LevelOverflow)?;
            self.send(edge, Message::Initiate {
                weight,
                level,
                state: NodeState::Find,
                fragment: weight,
            });
            Ok(Step::Handled)
        }
    }

    fn on_initiate(
        &mut self,
        edge: EdgeId,
        level: Level,
        fragment: FragmentId,
        state: NodeState,
    ) -> Result<(), GhsError> {
        if level < self.state.level {
            return Err(GhsError::LevelRegression {
                current: self.state.level,
                received: level,
            });
        }
        if level > self.state.level {
            info!(node = self.id, level, fragment, "joined fragment");
        }

        self.state.level = level;
        self.state.fragment = fragment;
        self.state.state = state;
        self.edges.classify(edge, EdgeStatus::Branch);
        self.state.parent = Some(edge);
        self.state.reset_search();

        for branch in self.edges.branches() {
            if branch == edge {
                continue;
            }
            self.send(branch, Message::Initiate {
                weight: self.edges.weight(branch),
                level,
                state,
                fragment,
            });
            if state == NodeState::Find {
                self.state.pending_reports += 1;
            }
        }

        if state == NodeState::Find {
            self.test()?;
        }
        Ok(())
    }

    /// Probes the cheapest unclassified edge, or reports if there is none.
    fn test(&mut self) -> Result<(), GhsError> {
        match self.edges.lowest_unknown() {
            Some(edge) => {
                self.state.test_edge = Some(edge);
                self.send(edge, Message::Test {
                    weight: self.edges.weight(edge),
                    level: self.state.level,
                    fragment: self.state.fragment,
                });
                Ok(())
            }
            None => {
                self.state.test_edge = None;
                self.report()
            }
        }
    }

    fn on_test(
        &mut self,
        edge: EdgeId,
        level: Level,
        fragment: FragmentId,
    ) -> Result<Step, GhsError> {
        if level > self.state.level {
            return Ok(Step::Deferred);
        }

        let weight = self.edges.weight(edge);
        if fragment != self.state.fragment {
            self.send(edge, Message::Accept { weight });
            return Ok(Step::Handled);
        }

        self.edges.classify(edge, EdgeStatus::Rejected);
        if self.state.test_edge != Some(edge) {
            self.send(edge, Message::Reject { weight });
        } else {
            // Both ends probed the same internal edge; move on locally.
            self.test()?;
        }
        Ok(Step::Handled)
    }

    fn on_accept(&mut self, edge: EdgeId) -> Result<(), GhsError> {
        self.state.test_edge = None;
        let weight = self.edges.weight(edge);
        if weight < self.state.best_weight {
            self.state.best_edge = Some(edge);
            self.state.best_weight = weight;
        }
        self.report()
    }

    fn on_reject(&mut self, edge: EdgeId) -> Result<(), GhsError> {
        self.edges.classify(edge, EdgeStatus::Rejected);
        self.test()
    }

    fn report(&mut self) -> Result<(), GhsError> {
        if self.state.pending_reports > 0 || self.state.test_edge.is_some() {
            return Ok(());
        }
        let parent = self
            .state
            .parent
            .ok_or(GhsError::Protocol("report without a parent edge"))?;
        self.state.state = NodeState::Found;
        self.send(parent, Message::Report {
            best: self.state.best_weight,
        });
        Ok(())
    }

    fn on_report(&mut self, edge: EdgeId, weight: u16) -> Result<Step, GhsError> {
        if self.state.parent != Some(edge) {
            self.state.pending_reports = self
                .state
                .pending_reports
                .checked_sub(1)
                .ok_or(GhsError::Protocol("report from a child that owes none"))?;
            if weight < self.state.best_weight {
                self.state.best_weight = weight;
                self.state.best_edge = Some(edge);
            }
            self.report()?;
            return Ok(Step::Handled);
        }

        if self.state.state == NodeState::Find {
            return Ok(Step::Deferred);
        }
        if weight > self.state.best_weight {
            self.change_root()?;
        } else if weight == INFINITY {
            self.terminate();
            return Ok(Step::Terminated);
        }
        Ok(Step::Handled)
    }

    fn change_root(&mut self) -> Result<(), GhsError> {
        let best = self
            .state
            .best_edge
            .ok_or(GhsError::Protocol("change-root without a best edge"))?;
        let weight = self.edges.weight(best);
        if self.edges.status(best) == EdgeStatus::Branch {
            self.send(best, Message::ChangeRoot { weight });
        } else {
            self.send(best, Message::Connect {
                weight,
                level: self.state.level,
            });
            self.edges.classify(best, EdgeStatus::Branch);
        }
        Ok(())
    }

    /// No fragment has an outgoing edge left. Passes the news down the tree.
    fn terminate(&mut self) {
        for branch in self.edges.branches() {
            if Some(branch) != self.state.parent {
                self.send(branch, Message::Report { best: INFINITY });
            }
        }
        self.terminated = true;
        info!(
            node = self.id,
            level = self.state.level,
            fragment = self.state.fragment,
            "spanning tree complete"
        );
    }

    fn send(&mut self, edge: EdgeId, message: Message) {
        self.outbox.push(Outbound { edge, message });
    }
}
