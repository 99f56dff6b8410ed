use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::{BranchId, BusId, OptimizationModel};

/// A connected set of buses. The DC model fixes one voltage angle per island.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Island {
    pub island_id: usize,
    /// Members in bus creation order
    pub buses: Vec<BusId>,
}

impl Island {
    /// Angle reference for the island: its first bus in creation order
    pub fn reference(&self) -> BusId {
        self.buses[0]
    }
}

/// Undirected bus graph with one edge per branch (parallel branches kept).
pub fn branch_graph(model: &OptimizationModel) -> UnGraph<BusId, BranchId> {
    let mut graph = UnGraph::with_capacity(model.buses().len(), model.branches().len());
    for bus in model.buses() {
        graph.add_node(bus.id);
    }
    for branch in model.branches() {
        // build() guarantees both ends exist
        if let (Some(from), Some(to)) = (
            model.bus_index(branch.from_bus),
            model.bus_index(branch.to_bus),
        ) {
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), branch.id);
        }
    }
    graph
}

/// Labels connected components of the branch graph.
///
/// Islands are numbered by their first bus, so the result only depends on
/// creation order.
pub fn find_islands(model: &OptimizationModel) -> Vec<Island> {
    let graph = branch_graph(model);
    let mut components = UnionFind::<usize>::new(graph.node_count());
    for edge in graph.edge_references() {
        components.union(edge.source().index(), edge.target().index());
    }

    let mut islands: Vec<Island> = Vec::new();
    let mut island_of_root = HashMap::new();
    for node in graph.node_indices() {
        let root = components.find(node.index());
        let island_id = *island_of_root.entry(root).or_insert_with(|| {
            islands.push(Island {
                island_id: islands.len(),
                buses: Vec::new(),
            });
            islands.len() - 1
        });
        islands[island_id].buses.push(graph[node]);
    }
    islands
}
