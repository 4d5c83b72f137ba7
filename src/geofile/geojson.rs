use std::{fs, io, path::Path};

use crate::geograph::primitives::HydroGraph;

use super::feature::AttributeMap;

fn properties(attributes: &AttributeMap) -> geojson::JsonObject {
    attributes
        .iter()
        .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
        .collect()
}

fn geojson_feature(geometry: geojson::Geometry, properties: geojson::JsonObject) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Nodes as Point features followed by edges as LineString features. Binary attribute values
/// are written as hex strings.
pub fn graph_to_feature_collection(graph: &HydroGraph) -> geojson::FeatureCollection {
    let nodes = graph.nodes().map(|node| {
        let point = geo::Point::from(node.geometry);
        geojson_feature(geojson::Geometry::from(&point), properties(&node.data))
    });
    let edges = graph.edges().map(|(start, end, data)| {
        let line = geo::LineString::new(vec![start, end]);
        geojson_feature(geojson::Geometry::from(&line), properties(data))
    });
    nodes.chain(edges).collect()
}

pub fn write_graph_to_geojson(graph: &HydroGraph, output_filepath: &Path) -> io::Result<()> {
    let geojson_contents = geojson::GeoJson::from(graph_to_feature_collection(graph));
    fs::write(output_filepath, geojson_contents.to_string())
}

#[cfg(test)]
mod tests {
    use testdir::testdir;

    use crate::geofile::feature::{AttributeMap, AttributeValue};
    use crate::geograph::primitives::HydroGraph;

    use super::{graph_to_feature_collection, write_graph_to_geojson};

    fn sample_graph() -> HydroGraph {
        let mut graph = HydroGraph::new();
        graph.upsert_node(
            geo::coord! { x: 5.0, y: 5.0 },
            AttributeMap::from([("name".to_string(), AttributeValue::from("A"))]),
        );
        graph.upsert_edge(
            geo::coord! { x: 5.0, y: 5.0 },
            geo::coord! { x: 10.0, y: 10.0 },
            AttributeMap::from([
                ("name".to_string(), AttributeValue::from("B")),
                ("Wkb".to_string(), AttributeValue::Binary(vec![0x01, 0x02])),
            ]),
        );
        graph
    }

    #[test]
    fn test_graph_to_feature_collection() {
        let collection = graph_to_feature_collection(&sample_graph());
        assert_eq!(3, collection.features.len());

        let geometry_types: Vec<&str> = collection
            .features
            .iter()
            .map(|feature| match &feature.geometry.as_ref().unwrap().value {
                geojson::Value::Point(_) => "Point",
                geojson::Value::LineString(_) => "LineString",
                _ => "other",
            })
            .collect();
        assert_eq!(vec!["Point", "Point", "LineString"], geometry_types);

        let edge = &collection.features[2];
        assert_eq!(Some(&serde_json::json!("B")), edge.property("name"));
        assert_eq!(Some(&serde_json::json!("0102")), edge.property("Wkb"));
        assert_eq!(
            geojson::Value::LineString(vec![vec![5.0, 5.0], vec![10.0, 10.0]]),
            edge.geometry.as_ref().unwrap().value
        );
        assert_eq!(Some(&serde_json::json!("A")), collection.features[0].property("name"));
        assert_eq!(0, collection.features[1].properties.as_ref().unwrap().len());
    }

    #[test]
    fn test_write_graph_to_geojson() {
        let filepath = testdir!().join("graph.geojson");
        write_graph_to_geojson(&sample_graph(), &filepath).unwrap();

        let contents = std::fs::read_to_string(&filepath).unwrap();
        let geojson: geojson::GeoJson = contents.parse().unwrap();
        match geojson {
            geojson::GeoJson::FeatureCollection(collection) => {
                assert_eq!(3, collection.features.len())
            }
            _ => panic!("Expected a FeatureCollection"),
        }
    }
}
