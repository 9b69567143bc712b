use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEdge {
    pub parent: DocId,
    pub child: DocId,
}

/// Deduplicated parent -> child hyperlink edges. Only the edge list is
/// persisted; the lookup structures are rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<LinkEdge>", into = "Vec<LinkEdge>")]
pub struct LinkGraph {
    edges: Vec<LinkEdge>,
    seen: HashSet<LinkEdge>,
    children: HashMap<DocId, Vec<DocId>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the ordered pair is already present. Self-loops are kept.
    pub fn add_edge(&mut self, parent: DocId, child: DocId) -> bool {
        let edge = LinkEdge { parent, child };
        if !self.seen.insert(edge) {
            return false;
        }
        self.edges.push(edge);
        self.children.entry(parent).or_default().push(child);
        true
    }

    pub fn contains(&self, parent: DocId, child: DocId) -> bool {
        self.seen.contains(&LinkEdge { parent, child })
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[LinkEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn children(&self, parent: DocId) -> &[DocId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_degree(&self, parent: DocId) -> usize {
        self.children(parent).len()
    }
}

impl From<Vec<LinkEdge>> for LinkGraph {
    fn from(edges: Vec<LinkEdge>) -> Self {
        let mut graph = LinkGraph::new();
        for e in edges {
            graph.add_edge(e.parent, e.child);
        }
        graph
    }
}

impl From<LinkGraph> for Vec<LinkEdge> {
    fn from(graph: LinkGraph) -> Self {
        graph.edges
    }
}
