use geo::Centroid;
use serde::Deserialize;

use crate::error::{ConversionError, Result};
use crate::geofile::feature::{AttributeMap, Feature};

use super::decompose::edges_from_paths;
use super::encoding::{GeometryEncoder, OgrSegmentEncoder};
use super::primitives::HydroGraph;

/// Options controlling how features become nodes and edges.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ConversionOptions {
    /// Collapse every line path into a single edge between its first and last vertex.
    pub simplify: bool,
    /// Attach `Wkb`, `Wkt` and `Json` fields describing each edge's segment.
    pub geom_attrs: bool,
    /// Fail on features without geometry instead of skipping them.
    pub strict: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            simplify: true,
            geom_attrs: true,
            strict: true,
        }
    }
}

/// Build a graph from features, encoding segment geometry with OGR when requested.
///
/// Points become nodes keyed by their centroid, lines become one or more edges. See
/// [`build_graph_with_encoder`].
pub fn build_graph<I>(features: I, options: &ConversionOptions) -> Result<HydroGraph>
where
    I: IntoIterator<Item = Result<Feature>>,
{
    build_graph_with_encoder(features, options, &OgrSegmentEncoder)
}

/// Build a graph from features in order.
///
/// Features without geometry abort with `MissingGeometry` in strict mode and are skipped
/// otherwise. Geometry other than points and (multi) line strings always aborts with
/// `UnsupportedGeometry`. Errors from the feature source are passed through. Nothing already
/// added is rolled back, the graph is simply not returned.
pub fn build_graph_with_encoder<I>(
    features: I,
    options: &ConversionOptions,
    encoder: &dyn GeometryEncoder,
) -> Result<HydroGraph>
where
    I: IntoIterator<Item = Result<Feature>>,
{
    let mut graph = HydroGraph::new();
    let encoder = options.geom_attrs.then_some(encoder);
    let mut num_skipped = 0;

    for (index, feature) in features.into_iter().enumerate() {
        let Feature {
            geometry,
            attributes,
        } = feature?;

        let geometry = match geometry {
            Some(geometry) => geometry,
            None if options.strict => return Err(ConversionError::MissingGeometry { index }),
            None => {
                log::debug!("Skipping feature {} without geometry", index);
                num_skipped += 1;
                continue;
            }
        };

        match geometry {
            geo::Geometry::Point(point) => {
                graph.upsert_node(point.centroid().0, attributes);
            }
            geo::Geometry::LineString(line) => {
                insert_edges(
                    &mut graph,
                    std::slice::from_ref(&line),
                    &attributes,
                    options,
                    encoder,
                )?;
            }
            geo::Geometry::MultiLineString(lines) => {
                insert_edges(&mut graph, &lines.0, &attributes, options, encoder)?;
            }
            other => {
                return Err(ConversionError::UnsupportedGeometry {
                    index,
                    geometry_type: geometry_type_name(&other).to_string(),
                })
            }
        }
    }

    if num_skipped > 0 {
        log::debug!("Skipped {} features without geometry", num_skipped);
    }
    Ok(graph)
}

fn insert_edges(
    graph: &mut HydroGraph,
    paths: &[geo::LineString],
    attributes: &AttributeMap,
    options: &ConversionOptions,
    encoder: Option<&dyn GeometryEncoder>,
) -> Result<()> {
    for edge in edges_from_paths(paths, attributes, options.simplify, encoder) {
        let edge = edge?;
        graph.upsert_edge(edge.start, edge.end, edge.attributes);
    }
    Ok(())
}

pub fn geometry_type_name(geometry: &geo::Geometry) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
