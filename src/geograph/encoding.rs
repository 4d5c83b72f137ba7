use crate::error::{ConversionError, Result};
use crate::geofile::feature::{AttributeMap, AttributeValue};

pub const WKB_FIELD: &str = "Wkb";
pub const WKT_FIELD: &str = "Wkt";
pub const JSON_FIELD: &str = "Json";

/// Serialized forms of a single line segment.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAttributes {
    pub wkb: Vec<u8>,
    pub wkt: String,
    pub json: String,
}

impl GeometryAttributes {
    /// Add the encodings to `attributes` under the `Wkb`, `Wkt` and `Json` field names,
    /// replacing source fields of the same name.
    pub fn insert_into(self, attributes: &mut AttributeMap) {
        attributes.insert(WKB_FIELD.to_string(), AttributeValue::Binary(self.wkb));
        attributes.insert(WKT_FIELD.to_string(), AttributeValue::Text(self.wkt));
        attributes.insert(JSON_FIELD.to_string(), AttributeValue::Text(self.json));
    }
}

/// Produces the serialized forms of the segment between two coordinates.
pub trait GeometryEncoder {
    fn encode_segment(&self, start: geo::Coord, end: geo::Coord) -> Result<GeometryAttributes>;
}

/// Encodes segments as OGR would export them: WKB from the `wkb` crate, WKT and GeoJSON
/// produced by GDAL from that WKB.
#[derive(Debug, Default, Clone, Copy)]
pub struct OgrSegmentEncoder;

impl GeometryEncoder for OgrSegmentEncoder {
    fn encode_segment(&self, start: geo::Coord, end: geo::Coord) -> Result<GeometryAttributes> {
        let segment = geo::Geometry::LineString(geo::LineString::new(vec![start, end]));
        let wkb = wkb::geom_to_wkb(&segment).map_err(|err| {
            ConversionError::Encoding(format!("Could not write geometry to WKB, {:?}", err))
        })?;
        let geometry = gdal::vector::Geometry::from_wkb(&wkb)
            .map_err(|err| ConversionError::Encoding(err.to_string()))?;
        let wkt = geometry
            .wkt()
            .map_err(|err| ConversionError::Encoding(err.to_string()))?;
        let json = geometry
            .json()
            .map_err(|err| ConversionError::Encoding(err.to_string()))?;
        Ok(GeometryAttributes { wkb, wkt, json })
    }
}
