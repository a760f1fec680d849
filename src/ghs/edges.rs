use crate::common::error::GhsError;

use super::message::INFINITY;

/// Stable index of an edge inside its node's [`EdgeSet`].
pub type EdgeId = usize;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeStatus {
    Unknown,
    Branch,
    Rejected,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub weight: u16,
    pub status: EdgeStatus,
}

impl Edge {
    /// Moves an unclassified edge to `status`. A classified edge keeps its
    /// status; returns whether anything changed.
    pub fn classify(&mut self, status: EdgeStatus) -> bool {
        if self.status != EdgeStatus::Unknown || status == EdgeStatus::Unknown {
            return false;
        }
        self.status = status;
        true
    }
}

/// Incident edges of one node. Ids are handed out in insertion order and never
/// change; `order` keeps them sorted by ascending weight.
#[derive(Clone, Debug, Default)]
pub struct EdgeSet {
    edges: Vec<Edge>,
    order: Vec<EdgeId>,
}

impl EdgeSet {
    pub fn new() -> Self {
        EdgeSet::default()
    }

    pub fn add(&mut self, weight: u16) -> Result<EdgeId, GhsError> {
        if weight == 0 || weight == INFINITY {
            return Err(GhsError::ReservedWeight(weight));
        }
        if self.find_by_weight(weight).is_some() {
            return Err(GhsError::DuplicateWeight(weight));
        }

        let id = self.edges.len();
        self.edges.push(Edge {
            weight,
            status: EdgeStatus::Unknown,
        });
        let position = self
            .order
            .iter()
            .position(|&other| self.edges[other].weight > weight)
            .unwrap_or(self.order.len());
        self.order.insert(position, id);
        Ok(id)
    }

    pub fn find_by_weight(&self, weight: u16) -> Option<EdgeId> {
        self.order
            .iter()
            .copied()
            .find(|&id| self.edges[id].weight == weight)
    }

    pub fn lowest(&self) -> Option<EdgeId> {
        self.order.first().copied()
    }

    pub fn lowest_unknown(&self) -> Option<EdgeId> {
        self.order
            .iter()
            .copied()
            .find(|&id| self.edges[id].status == EdgeStatus::Unknown)
    }

    pub fn count(&self) -> usize {
        self.edges.len()
    }

    pub fn get(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn weight(&self, id: EdgeId) -> u16 {
        self.edges[id].weight
    }

    pub fn status(&self, id: EdgeId) -> EdgeStatus {
        self.edges[id].status
    }

    pub fn classify(&mut self, id: EdgeId, status: EdgeStatus) -> bool {
        self.edges[id].classify(status)
    }

    /// Edges in ascending weight order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.order.iter().map(move |&id| (id, &self.edges[id]))
    }

    pub fn branches(&self) -> Vec<EdgeId> {
        self.iter()
            .filter(|(_, edge)| edge.status == EdgeStatus::Branch)
            .map(|(id, _)| id)
            .collect()
    }
}
