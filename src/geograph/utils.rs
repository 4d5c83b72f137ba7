use super::primitives::NodeIdx;

type NodeIndexerPoint = rstar::primitives::GeomWithData<[f64; 2], NodeIdx>;

/// Resolves coordinates to node indices.
///
/// Two coordinates map to the same node only if their `x` and `y` compare exactly equal, no
/// tolerance or snapping is applied. A non-finite coordinate never matches and always gets a
/// fresh index. It is kept out of the R-tree, whose node splits cannot order NaN envelopes.
pub struct NodeIndexer {
    rtree: rstar::RTree<NodeIndexerPoint>,
    current_index: NodeIdx,
}

impl NodeIndexer {
    pub fn new() -> Self {
        Self {
            rtree: rstar::RTree::new(),
            current_index: 0,
        }
    }

    /// Index of an already known coordinate.
    pub fn index_of(&self, coord: &geo::Coord) -> Option<NodeIdx> {
        if !is_finite(coord) {
            return None;
        }
        self.rtree
            .locate_at_point(&[coord.x, coord.y])
            .map(|point| point.data)
    }

    /// Index of the coordinate, allocating the next free index if it has not been seen yet.
    /// Indices are handed out from zero in order of first appearance.
    pub fn get_index_for_coordinate(&mut self, coord: &geo::Coord) -> NodeIdx {
        if let Some(index) = self.index_of(coord) {
            return index;
        }
        if is_finite(coord) {
            self.rtree
                .insert(NodeIndexerPoint::new([coord.x, coord.y], self.current_index));
        }
        self.current_index += 1;
        self.current_index - 1
    }

    pub fn len(&self) -> usize {
        self.current_index as usize
    }

    pub fn is_empty(&self) -> bool {
        self.current_index == 0
    }
}

fn is_finite(coord: &geo::Coord) -> bool {
    coord.x.is_finite() && coord.y.is_finite()
}

impl Default for NodeIndexer {
    fn default() -> Self {
        Self::new()
    }
}
