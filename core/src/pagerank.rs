//! Topic-sensitive PageRank over a per-query candidate subgraph.
//!
//! The transition matrix only covers edges whose endpoints are both
//! candidates. A candidate with no such out-edge is dangling and its mass is
//! dropped each step rather than spread over the other nodes, so scores need
//! not sum to one.

use crate::graph::LinkGraph;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_ALPHA: f64 = 0.2;
pub const DEFAULT_ITERATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicPageRank {
    /// Teleport probability.
    pub alpha: f64,
    /// Fixed number of power iterations; there is no convergence test.
    pub iterations: usize,
}

impl Default for TopicPageRank {
    fn default() -> Self {
        Self { alpha: DEFAULT_ALPHA, iterations: DEFAULT_ITERATIONS }
    }
}

impl TopicPageRank {
    pub fn new(alpha: f64, iterations: usize) -> Self {
        Self { alpha, iterations }
    }

    /// Ranks the candidates of `relevance` (in their given order) by
    /// personalized PageRank, highest first. Ties keep the incoming order.
    pub fn rerank(&self, graph: &LinkGraph, relevance: &[(DocId, f64)]) -> Vec<(DocId, f64)> {
        let n = relevance.len();
        if n == 0 {
            return Vec::new();
        }
        let position: HashMap<DocId, usize> = relevance
            .iter()
            .enumerate()
            .map(|(i, (doc, _))| (*doc, i))
            .collect();

        // column-stochastic M as (child, parent, 1/outdeg) triples
        let mut transitions: Vec<(usize, usize, f64)> = Vec::new();
        for (parent_pos, (parent, _)) in relevance.iter().enumerate() {
            let inside: Vec<usize> = graph
                .children(*parent)
                .iter()
                .filter_map(|child| position.get(child).copied())
                .collect();
            if inside.is_empty() {
                continue;
            }
            let share = 1.0 / inside.len() as f64;
            transitions.extend(inside.into_iter().map(|child_pos| (child_pos, parent_pos, share)));
        }

        let teleport = self.teleport_vector(relevance);
        let mut v = vec![1.0 / n as f64; n];
        let mut next = vec![0.0; n];
        for _ in 0..self.iterations {
            next.copy_from_slice(&teleport);
            for &(child, parent, share) in &transitions {
                next[child] += (1.0 - self.alpha) * share * v[parent];
            }
            std::mem::swap(&mut v, &mut next);
        }

        let mut ranked: Vec<(usize, f64)> = v.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(pos, score)| (relevance[pos].0, score)).collect()
    }

    /// `alpha * relevance / sum(relevance)`; all zeros when nothing is relevant.
    fn teleport_vector(&self, relevance: &[(DocId, f64)]) -> Vec<f64> {
        let total: f64 = relevance.iter().map(|(_, s)| s.max(0.0)).sum();
        relevance
            .iter()
            .map(|(_, s)| if total > 0.0 { self.alpha * s.max(0.0) / total } else { 0.0 })
            .collect()
    }
}
