use std::collections::HashMap;

use petgraph::visit::{Bfs, Reversed, Walker};

use crate::geofile::feature::AttributeMap;

use super::utils::NodeIndexer;

/// Index type used for nodes of a hydro graph.
pub type NodeIdx = u64;

/// Node of a hydro graph: the coordinate it is keyed by and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNode {
    pub geometry: geo::Coord,
    pub data: AttributeMap,
}

impl GeoNode {
    /// Create new node with given geometry and no attributes.
    pub fn new(geometry: geo::Coord) -> Self {
        Self {
            geometry,
            data: AttributeMap::new(),
        }
    }
}

/// Directed edges keyed by start and end node index. An edge has exactly one attribute set,
/// parallel edges are not kept.
pub type EdgeGraph = petgraph::graphmap::DiGraphMap<NodeIdx, AttributeMap>;

/// Map containing the nodes of a hydro graph, indexed by node index.
pub type NodeMap = HashMap<NodeIdx, GeoNode>;

/// Which way to follow edges when tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    Downstream,
    Upstream,
}

/// Directed graph whose nodes are coordinates and whose edges are line segments.
///
/// Nodes are identified by exact coordinate equality. Edges are stored in a map-based graph
/// indexed by start and end node indices, node data lives in a separate map. The optional
/// `spatial_ref` is the coordinate reference system of the source the graph was read from.
pub struct HydroGraph {
    edge_graph: EdgeGraph,
    node_map: NodeMap,
    node_indexer: NodeIndexer,
    pub spatial_ref: Option<gdal::spatial_ref::SpatialRef>,
}

impl HydroGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            edge_graph: EdgeGraph::new(),
            node_map: HashMap::new(),
            node_indexer: NodeIndexer::new(),
            spatial_ref: None,
        }
    }

    pub fn edge_graph(&self) -> &EdgeGraph {
        &self.edge_graph
    }

    pub fn node_map(&self) -> &NodeMap {
        &self.node_map
    }

    pub fn node_count(&self) -> usize {
        self.node_map.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_graph.edge_count()
    }

    /// Add the node at `coord` if it does not exist yet and merge `attributes` into it.
    /// On field name collisions the incoming value wins.
    pub fn upsert_node(&mut self, coord: geo::Coord, attributes: AttributeMap) -> NodeIdx {
        let idx = self.ensure_node(coord);
        if let Some(node) = self.node_map.get_mut(&idx) {
            node.data.extend(attributes);
        }
        idx
    }

    /// Add or replace the directed edge `start -> end`. Missing endpoint nodes are created with
    /// no attributes. An existing edge has its attributes replaced as a whole, the previous set
    /// is returned.
    pub fn upsert_edge(
        &mut self,
        start: geo::Coord,
        end: geo::Coord,
        attributes: AttributeMap,
    ) -> Option<AttributeMap> {
        let start_idx = self.ensure_node(start);
        let end_idx = self.ensure_node(end);
        self.edge_graph.add_edge(start_idx, end_idx, attributes)
    }

    fn ensure_node(&mut self, coord: geo::Coord) -> NodeIdx {
        let idx = self.node_indexer.get_index_for_coordinate(&coord);
        if !self.node_map.contains_key(&idx) {
            self.node_map.insert(idx, GeoNode::new(coord));
            self.edge_graph.add_node(idx);
        }
        idx
    }

    pub fn node_index(&self, coord: &geo::Coord) -> Option<NodeIdx> {
        self.node_indexer.index_of(coord)
    }

    pub fn contains_node(&self, coord: &geo::Coord) -> bool {
        self.node_index(coord).is_some()
    }

    pub fn node_attributes(&self, coord: &geo::Coord) -> Option<&AttributeMap> {
        self.node_index(coord)
            .and_then(|idx| self.node_map.get(&idx))
            .map(|node| &node.data)
    }

    pub fn edge_attributes(&self, start: &geo::Coord, end: &geo::Coord) -> Option<&AttributeMap> {
        let start_idx = self.node_index(start)?;
        let end_idx = self.node_index(end)?;
        self.edge_graph.edge_weight(start_idx, end_idx)
    }

    /// Nodes in order of first appearance.
    pub fn nodes(&self) -> impl Iterator<Item = &GeoNode> + '_ {
        (0..self.node_indexer.len() as NodeIdx).filter_map(|idx| self.node_map.get(&idx))
    }

    /// Edges as `(start, end, attributes)`.
    pub fn edges(&self) -> impl Iterator<Item = (geo::Coord, geo::Coord, &AttributeMap)> + '_ {
        self.edge_graph
            .all_edges()
            .filter_map(|(start_idx, end_idx, data)| {
                let start = self.node_map.get(&start_idx)?.geometry;
                let end = self.node_map.get(&end_idx)?.geometry;
                Some((start, end, data))
            })
    }

    /// Coordinates directly reachable from `coord` over one outgoing edge.
    pub fn downstream(&self, coord: &geo::Coord) -> Vec<geo::Coord> {
        self.neighbors(coord, petgraph::Direction::Outgoing)
    }

    /// Coordinates with an edge ending at `coord`.
    pub fn upstream(&self, coord: &geo::Coord) -> Vec<geo::Coord> {
        self.neighbors(coord, petgraph::Direction::Incoming)
    }

    fn neighbors(&self, coord: &geo::Coord, direction: petgraph::Direction) -> Vec<geo::Coord> {
        match self.node_index(coord) {
            Some(idx) => self
                .edge_graph
                .neighbors_directed(idx, direction)
                .filter_map(|neighbor| self.node_map.get(&neighbor))
                .map(|node| node.geometry)
                .collect(),
            None => Vec::new(),
        }
    }

    /// All coordinates reachable from `coord` following edges in `direction`, in breadth-first
    /// order. The start coordinate itself is not included, even when the network loops back to it.
    pub fn trace(&self, coord: &geo::Coord, direction: TraceDirection) -> Vec<geo::Coord> {
        let Some(start_idx) = self.node_index(coord) else {
            return Vec::new();
        };
        let visited: Vec<NodeIdx> = match direction {
            TraceDirection::Downstream => Bfs::new(&self.edge_graph, start_idx)
                .iter(&self.edge_graph)
                .collect(),
            TraceDirection::Upstream => {
                let reversed = Reversed(&self.edge_graph);
                Bfs::new(reversed, start_idx).iter(reversed).collect()
            }
        };
        visited
            .into_iter()
            .filter(|idx| *idx != start_idx)
            .filter_map(|idx| self.node_map.get(&idx))
            .map(|node| node.geometry)
            .collect()
    }
}

impl Default for HydroGraph {
    fn default() -> Self {
        Self::new()
    }
}
