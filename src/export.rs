//! Force-graph JSON export of a step's contributions
//!
//! Produces `{ "nodes": [{id, group}], "links": [{source, target, value}] }`,
//! one link per contribution record.

use rankstep_core::{GroupOutput, PageId};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: PageId,
    pub group: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: PageId,
    pub target: PageId,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphExport {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Colour group for a page: numeric ids cycle through three groups
pub fn node_group(id: &str) -> u64 {
    id.parse::<u64>().map(|n| n % 3).unwrap_or(0)
}

/// Build the graph from per-source outputs. Nodes are sorted by id.
pub fn export_graph(outputs: &[GroupOutput]) -> GraphExport {
    let mut ids = BTreeSet::new();
    let mut links = Vec::new();

    for output in outputs {
        for record in &output.contributions {
            ids.insert(output.source.clone());
            ids.insert(record.destination.clone());
            links.push(GraphLink {
                source: output.source.clone(),
                target: record.destination.clone(),
                value: record.amount,
            });
        }
    }

    let nodes = ids
        .into_iter()
        .map(|id| GraphNode {
            group: node_group(&id),
            id,
        })
        .collect();

    GraphExport { nodes, links }
}
