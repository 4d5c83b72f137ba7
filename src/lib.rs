//! Conversion of point and line features into a directed graph keyed by coordinates, for
//! upstream/downstream tracing over hydrological networks.
//!
//! Points become nodes, lines become edges between their vertices. Nodes are identified by exact
//! coordinate equality, there is no snapping.
extern crate log;
pub mod error;
pub mod geofile;
pub mod geograph;

pub use error::{ConversionError, Result};
pub use geofile::feature::{AttributeMap, AttributeValue, Feature};
pub use geofile::gdal_geofile::convert_geofile;
pub use geograph::builder::{build_graph, build_graph_with_encoder, ConversionOptions};
pub use geograph::decompose::{edges_from_paths, EdgeRecord};
pub use geograph::encoding::{GeometryEncoder, OgrSegmentEncoder};
pub use geograph::primitives::{HydroGraph, TraceDirection};
