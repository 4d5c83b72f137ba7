use crate::error::Result;
use crate::geofile::feature::AttributeMap;

use super::encoding::GeometryEncoder;

/// A directed edge produced from a line feature.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub start: geo::Coord,
    pub end: geo::Coord,
    pub attributes: AttributeMap,
}

/// Segments `(start, end)` of a single path.
///
/// With `simplify` the path collapses into one segment from its first to its last vertex and
/// intermediate vertices are lost. Without it every consecutive vertex pair is a segment. A path
/// with fewer than two vertices has no segments in either mode.
pub fn path_segments(
    path: &geo::LineString,
    simplify: bool,
) -> impl Iterator<Item = (geo::Coord, geo::Coord)> + '_ {
    let simplified = match (simplify, path.0.first(), path.0.last()) {
        (true, Some(first), Some(last)) if path.0.len() >= 2 => Some((*first, *last)),
        _ => None,
    };
    let full = (!simplify)
        .then(|| path.lines().map(|line| (line.start, line.end)))
        .into_iter()
        .flatten();
    simplified.into_iter().chain(full)
}

/// Lazily decompose the paths of a (possibly multi-part) polyline into edge records.
///
/// Parts are handled independently and in order, so parts are never joined into one edge. Each
/// record gets its own copy of `attributes`. When `encoder` is given, the serialized geometry of
/// the record's own segment is added to its attributes. No paths yield no records.
pub fn edges_from_paths<'a>(
    paths: &'a [geo::LineString],
    attributes: &'a AttributeMap,
    simplify: bool,
    encoder: Option<&'a dyn GeometryEncoder>,
) -> impl Iterator<Item = Result<EdgeRecord>> + 'a {
    paths
        .iter()
        .flat_map(move |path| path_segments(path, simplify))
        .map(move |(start, end)| -> Result<EdgeRecord> {
            let mut edge_attributes = attributes.clone();
            if let Some(encoder) = encoder {
                encoder
                    .encode_segment(start, end)?
                    .insert_into(&mut edge_attributes);
            }
            Ok(EdgeRecord {
                start,
                end,
                attributes: edge_attributes,
            })
        })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::error::{ConversionError, Result};
    use crate::geofile::feature::{AttributeMap, AttributeValue};
    use crate::geograph::encoding::{
        GeometryAttributes, GeometryEncoder, OgrSegmentEncoder, WKB_FIELD, WKT_FIELD,
    };

    use super::{edges_from_paths, EdgeRecord};

    fn c(x: f64, y: f64) -> geo::Coord {
        geo::coord! { x: x, y: y }
    }

    fn line(coords: &[(f64, f64)]) -> geo::LineString {
        coords.to_vec().into()
    }

    fn name_attrs(name: &str) -> AttributeMap {
        AttributeMap::from([("name".to_string(), AttributeValue::from(name))])
    }

    fn endpoints(records: &[EdgeRecord]) -> Vec<(geo::Coord, geo::Coord)> {
        records.iter().map(|record| (record.start, record.end)).collect()
    }

    fn decompose(paths: &[geo::LineString], simplify: bool) -> Vec<EdgeRecord> {
        let attributes = name_attrs("flowline");
        edges_from_paths(paths, &attributes, simplify, None)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[rstest]
    #[case(true, vec![(c(0.0, 0.0), c(2.0, 2.0))])]
    #[case(false, vec![(c(0.0, 0.0), c(1.0, 1.0)), (c(1.0, 1.0), c(2.0, 2.0))])]
    fn test_single_part(#[case] simplify: bool, #[case] expected: Vec<(geo::Coord, geo::Coord)>) {
        let paths = vec![line(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])];
        let records = decompose(&paths, simplify);
        assert_eq!(expected, endpoints(&records));
        for record in records {
            assert_eq!(name_attrs("flowline"), record.attributes);
        }
    }

    #[rstest]
    #[case(true, vec![(c(0.0, 0.0), c(1.0, 0.0)), (c(2.0, 2.0), c(3.0, 2.0))])]
    #[case(false, vec![(c(0.0, 0.0), c(1.0, 0.0)), (c(2.0, 2.0), c(3.0, 2.0))])]
    fn test_multi_part_never_merges(
        #[case] simplify: bool,
        #[case] expected: Vec<(geo::Coord, geo::Coord)>,
    ) {
        let paths = vec![
            line(&[(0.0, 0.0), (1.0, 0.0)]),
            line(&[(2.0, 2.0), (3.0, 2.0)]),
        ];
        assert_eq!(expected, endpoints(&decompose(&paths, simplify)));
    }

    #[test]
    fn test_multi_part_keeps_part_order_without_simplify() {
        let paths = vec![
            line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            line(&[(5.0, 5.0)]),
            line(&[(2.0, 2.0), (3.0, 2.0)]),
        ];
        assert_eq!(
            vec![
                (c(0.0, 0.0), c(1.0, 0.0)),
                (c(1.0, 0.0), c(1.0, 1.0)),
                (c(2.0, 2.0), c(3.0, 2.0)),
            ],
            endpoints(&decompose(&paths, false))
        );
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_degenerate_paths(#[case] simplify: bool) {
        assert!(decompose(&[line(&[(4.0, 4.0)])], simplify).is_empty());
        assert!(decompose(&[line(&[])], simplify).is_empty());
        assert!(decompose(&[], simplify).is_empty());
    }

    #[test]
    fn test_closed_path_yields_self_edge_when_simplified() {
        let paths = vec![line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)])];
        assert_eq!(
            vec![(c(0.0, 0.0), c(0.0, 0.0))],
            endpoints(&decompose(&paths, true))
        );
    }

    #[test]
    fn test_attributes_are_copied_per_edge() {
        let paths = vec![line(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])];
        let mut records = decompose(&paths, false);
        records[0]
            .attributes
            .insert("name".to_string(), AttributeValue::from("changed"));
        assert_eq!(name_attrs("flowline"), records[1].attributes);
    }

    #[test]
    fn test_geometry_attributes_describe_own_segment() {
        let paths = vec![line(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])];
        let attributes = name_attrs("flowline");
        let records = edges_from_paths(&paths, &attributes, false, Some(&OgrSegmentEncoder))
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(2, records.len());
        assert_eq!(
            Some(&AttributeValue::from("LINESTRING (0 0,1 1)")),
            records[0].attributes.get(WKT_FIELD)
        );
        assert_eq!(
            Some(&AttributeValue::from("LINESTRING (1 1,2 2)")),
            records[1].attributes.get(WKT_FIELD)
        );
        for record in &records {
            assert!(matches!(
                record.attributes.get(WKB_FIELD),
                Some(AttributeValue::Binary(bytes)) if bytes.len() == 41
            ));
            assert_eq!(
                Some(&AttributeValue::from("flowline")),
                record.attributes.get("name")
            );
        }
    }

    struct FailingEncoder;

    impl GeometryEncoder for FailingEncoder {
        fn encode_segment(&self, _: geo::Coord, _: geo::Coord) -> Result<GeometryAttributes> {
            Err(ConversionError::Encoding("no encoder available".to_string()))
        }
    }

    #[test]
    fn test_encoder_error_is_yielded() {
        let paths = vec![line(&[(0.0, 0.0), (1.0, 1.0)])];
        let attributes = AttributeMap::new();
        let mut records = edges_from_paths(&paths, &attributes, true, Some(&FailingEncoder));
        assert!(matches!(records.next(), Some(Err(ConversionError::Encoding(_)))));
        assert!(records.next().is_none());
    }
}
