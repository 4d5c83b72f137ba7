use std::{
    collections::HashMap,
    ffi::{CStr, CString},
    path::Path,
};

use anyhow::anyhow;
use gdal::vector::LayerAccess;
use indicatif::ProgressBar;

use crate::error::{ConversionError, Result};
use crate::geograph::builder::{build_graph, ConversionOptions};
use crate::geograph::primitives::HydroGraph;

use super::feature::{AttributeMap, AttributeValue, Feature};

pub enum GdalDriverType {
    GeoPackage,
}

impl GdalDriverType {
    pub fn name(&self) -> &'static str {
        match self {
            GdalDriverType::GeoPackage => "GPKG",
        }
    }
}

/// Names of the attribute fields read from a layer, derived once from its definition. The FID
/// column and geometry columns are never part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub field_names: Vec<String>,
}

impl FieldSchema {
    pub fn from_layer<L: LayerAccess>(layer: &L) -> Self {
        let fid_column = fid_column(layer);
        let geometry_columns: Vec<String> = layer
            .defn()
            .geom_fields()
            .map(|field| field.name())
            .collect();
        let field_names = layer
            .defn()
            .fields()
            .map(|field| field.name())
            .filter(|name| Some(name) != fid_column.as_ref() && !geometry_columns.contains(name))
            .collect();
        Self { field_names }
    }
}

fn fid_column<L: LayerAccess>(layer: &L) -> Option<String> {
    let column = unsafe {
        let c_column = gdal_sys::OGR_L_GetFIDColumn(layer.c_layer());
        if c_column.is_null() {
            return None;
        }
        CStr::from_ptr(c_column).to_string_lossy().into_owned()
    };
    (!column.is_empty()).then_some(column)
}

fn open_dataset(filepath: &Path) -> Result<gdal::Dataset> {
    gdal::DriverManager::register_all();
    let mut open_options = gdal::DatasetOptions::default();
    open_options.open_flags = gdal::GdalOpenFlags::GDAL_OF_VECTOR;
    gdal::Dataset::open_ex(filepath, open_options).map_err(|source| {
        ConversionError::SourceUnavailable {
            path: filepath.to_path_buf(),
            source,
        }
    })
}

/// Pick the layer named `layer_name`, or the only layer of the dataset when no name is given.
fn select_layer<'a>(
    dataset: &'a gdal::Dataset,
    filepath: &Path,
    layer_name: Option<&str>,
) -> Result<gdal::vector::Layer<'a>> {
    let layer = match layer_name {
        Some(layer_name) => dataset.layer_by_name(layer_name),
        None => {
            let layer_count = dataset.layer_count();
            if 1 != layer_count {
                return Err(ConversionError::Layer(format!(
                    "Found {} layers in {:?}, a layer name is required unless there is exactly one.",
                    layer_count, filepath
                )));
            }
            dataset.layer(0)
        }
    };
    layer.map_err(|source| ConversionError::SourceUnavailable {
        path: filepath.to_path_buf(),
        source,
    })
}

/// Text form of a field as OGR renders it, used for field types without a scalar counterpart.
fn field_as_string(gdal_feature: &gdal::vector::Feature, field_name: &str) -> Option<String> {
    let c_field_name = CString::new(field_name).ok()?;
    unsafe {
        let c_feature = gdal_feature.c_feature();
        let field_index = gdal_sys::OGR_F_GetFieldIndex(c_feature, c_field_name.as_ptr());
        if field_index < 0 {
            return None;
        }
        let c_value = gdal_sys::OGR_F_GetFieldAsString(c_feature, field_index);
        if c_value.is_null() {
            return None;
        }
        Some(CStr::from_ptr(c_value).to_string_lossy().into_owned())
    }
}

fn attribute_value_from_gdal(
    gdal_feature: &gdal::vector::Feature,
    field_name: &str,
    value: Option<gdal::vector::FieldValue>,
) -> AttributeValue {
    use gdal::vector::FieldValue::*;
    match value {
        None => AttributeValue::Null,
        Some(IntegerValue(value)) => AttributeValue::Integer(value as i64),
        Some(Integer64Value(value)) => AttributeValue::Integer(value),
        Some(RealValue(value)) => AttributeValue::Real(value),
        Some(StringValue(value)) => AttributeValue::Text(value),
        Some(_) => field_as_string(gdal_feature, field_name)
            .map(AttributeValue::Text)
            .unwrap_or(AttributeValue::Null),
    }
}

/// Geometry of a GDAL feature as 2D geo geometry, Z and M values are dropped.
///
/// Only a null geometry is `None`. Empty (multi) line strings become line geometry without
/// paths and yield no edges. An empty point has no geo counterpart and is treated as missing.
fn geometry_from_gdal(
    gdal_feature: &gdal::vector::Feature,
    index: usize,
) -> Result<Option<geo::Geometry>> {
    let c_geometry = unsafe { gdal_sys::OGR_F_GetGeometryRef(gdal_feature.c_feature()) };
    if c_geometry.is_null() {
        return Ok(None);
    }

    let (is_empty, flat_type) = unsafe {
        (
            0 != gdal_sys::OGR_G_IsEmpty(c_geometry),
            gdal_sys::OGR_GT_Flatten(gdal_sys::OGR_G_GetGeometryType(c_geometry)),
        )
    };
    if is_empty {
        use gdal::vector::OGRwkbGeometryType::*;
        match flat_type {
            wkbLineString => {
                return Ok(Some(geo::LineString::new(vec![]).into()));
            }
            wkbMultiLineString => {
                return Ok(Some(geo::MultiLineString::new(vec![]).into()));
            }
            wkbPoint => return Ok(None),
            _ => {}
        }
    }

    let gdal_geometry = gdal_feature.geometry();
    unsafe {
        gdal_sys::OGR_G_FlattenTo2D(gdal_geometry.c_geometry());
    }
    gdal_geometry
        .to_geo()
        .map(Some)
        .map_err(|err| ConversionError::UnsupportedGeometry {
            index,
            geometry_type: format!("{} ({})", geometry_name(gdal_geometry), err),
        })
}

/// WKT name of the geometry's type (`OGR_G_GetGeometryName`); gdal 0.14 has no safe wrapper.
fn geometry_name(gdal_geometry: &gdal::vector::Geometry) -> String {
    let c_name = unsafe { gdal_sys::OGR_G_GetGeometryName(gdal_geometry.c_geometry()) };
    if c_name.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(c_name).to_string_lossy().into_owned() }
    }
}

fn feature_from_gdal(
    gdal_feature: &gdal::vector::Feature,
    index: usize,
    schema: &FieldSchema,
    filepath: &Path,
) -> Result<Feature> {
    let mut attributes = AttributeMap::with_capacity(schema.field_names.len());
    for field_name in &schema.field_names {
        let value = gdal_feature
            .field(field_name)
            .map_err(|source| ConversionError::SourceUnavailable {
                path: filepath.to_path_buf(),
                source,
            })?;
        attributes.insert(
            field_name.clone(),
            attribute_value_from_gdal(gdal_feature, field_name, value),
        );
    }
    Ok(Feature::new(
        geometry_from_gdal(gdal_feature, index)?,
        attributes,
    ))
}

/// Read a vector layer and convert it into a directed graph.
///
/// Points become nodes, lines become edges, see [`build_graph`]. `layer_name` may be omitted
/// when the dataset has exactly one layer. The dataset is closed before returning, whether the
/// conversion succeeded or not.
pub fn convert_geofile(
    filepath: &Path,
    layer_name: Option<&str>,
    options: &ConversionOptions,
) -> Result<HydroGraph> {
    let dataset = open_dataset(filepath)?;
    let mut layer = select_layer(&dataset, filepath, layer_name)?;
    let schema = FieldSchema::from_layer(&layer);
    log::debug!("Reading fields {:?}", schema.field_names);

    let spatial_ref = match layer.spatial_ref() {
        Ok(spatial_ref) => Some(spatial_ref),
        Err(_) => {
            log::warn!("Layer {} has no spatial reference", layer.name());
            None
        }
    };

    let feature_count = layer.feature_count();
    log::info!(
        "Reading {} features from layer {} of {:?}",
        feature_count,
        layer.name(),
        filepath
    );
    let bar = ProgressBar::new(feature_count);
    let features = layer
        .features()
        .enumerate()
        .map(|(index, gdal_feature)| {
            bar.inc(1);
            feature_from_gdal(&gdal_feature, index, &schema, filepath)
        });
    let result = build_graph(features, options);
    bar.finish_and_clear();
    let mut graph = result?;

    graph.spatial_ref = spatial_ref;
    log::info!(
        "Built graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn field_type(value: &AttributeValue) -> Option<gdal::vector::OGRFieldType::Type> {
    use gdal::vector::OGRFieldType::*;
    match value {
        AttributeValue::Null => None,
        AttributeValue::Integer(_) => Some(OFTInteger64),
        AttributeValue::Real(_) => Some(OFTReal),
        AttributeValue::Text(_) | AttributeValue::Binary(_) => Some(OFTString),
    }
}

/// Field definitions for all attributes of all features, sorted by name. A field is typed by
/// its non-null values. Fields whose values disagree in type, or that are null everywhere,
/// become strings.
fn get_field_definitions(features: &[Feature]) -> Vec<(String, gdal::vector::OGRFieldType::Type)> {
    use gdal::vector::OGRFieldType::OFTString;
    let mut field_types: HashMap<&str, Option<gdal::vector::OGRFieldType::Type>> = HashMap::new();
    for feature in features {
        for (key, value) in &feature.attributes {
            let entry = field_types.entry(key.as_str()).or_insert(None);
            match (*entry, field_type(value)) {
                (_, None) => {}
                (None, Some(ty)) => *entry = Some(ty),
                (Some(current), Some(ty)) if current != ty => *entry = Some(OFTString),
                _ => {}
            }
        }
    }
    let mut field_definitions: Vec<(String, gdal::vector::OGRFieldType::Type)> = field_types
        .into_iter()
        .map(|(name, ty)| (name.to_string(), ty.unwrap_or(OFTString)))
        .collect();
    field_definitions.sort();
    field_definitions
}

fn field_value(value: &AttributeValue) -> Option<gdal::vector::FieldValue> {
    use gdal::vector::FieldValue::*;
    match value {
        AttributeValue::Null => None,
        AttributeValue::Integer(value) => Some(Integer64Value(*value)),
        AttributeValue::Real(value) => Some(RealValue(*value)),
        AttributeValue::Text(value) => Some(StringValue(value.clone())),
        AttributeValue::Binary(_) => match serde_json::Value::from(value) {
            serde_json::Value::String(hex) => Some(StringValue(hex)),
            _ => None,
        },
    }
}

fn layer_type(features: &[Feature]) -> gdal::vector::OGRwkbGeometryType::Type {
    use gdal::vector::OGRwkbGeometryType::*;
    let mut types = features.iter().filter_map(|feature| {
        feature.geometry.as_ref().map(|geometry| match geometry {
            geo::Geometry::Point(_) => wkbPoint,
            geo::Geometry::LineString(_) => wkbLineString,
            geo::Geometry::Polygon(_) => wkbPolygon,
            geo::Geometry::MultiPoint(_) => wkbMultiPoint,
            geo::Geometry::MultiLineString(_) => wkbMultiLineString,
            geo::Geometry::MultiPolygon(_) => wkbMultiPolygon,
            _ => wkbUnknown,
        })
    });
    match types.next() {
        Some(first) if types.all(|ty| ty == first) => first,
        _ => wkbUnknown,
    }
}

/// Write features as a new layer of `dataset`. Features without geometry are written with a
/// null geometry.
pub fn write_features_to_layer(
    dataset: &mut gdal::Dataset,
    layer_name: &str,
    features: &[Feature],
    crs: Option<&gdal::spatial_ref::SpatialRef>,
) -> anyhow::Result<()> {
    let layer_options = gdal::LayerOptions {
        name: layer_name,
        srs: crs,
        ty: layer_type(features),
        options: None,
    };
    {
        let mut layer = dataset.create_layer(layer_options)?;
        let field_definitions = get_field_definitions(features);
        let field_definitions: Vec<(&str, gdal::vector::OGRFieldType::Type)> = field_definitions
            .iter()
            .map(|(name, ty)| (name.as_str(), *ty))
            .collect();
        layer.create_defn_fields(&field_definitions)?;
    }

    log::info!("Writing {} features to layer {}", features.len(), layer_name);
    let bar = ProgressBar::new(features.len() as u64);
    let written = if supports_transactions(dataset)? {
        // Committing all features at once is a massive speedup. Dropping the transaction without
        // a commit rolls it back.
        let transaction = dataset.start_transaction()?;
        write_features(&transaction, layer_name, features, &bar).and_then(|_| {
            transaction.commit()?;
            Ok(())
        })
    } else {
        write_features(dataset, layer_name, features, &bar)
    };
    bar.finish_and_clear();
    written
}

fn supports_transactions(dataset: &gdal::Dataset) -> anyhow::Result<bool> {
    let capability = CString::new("Transactions")?;
    let supported =
        unsafe { gdal_sys::GDALDatasetTestCapability(dataset.c_dataset(), capability.as_ptr()) };
    Ok(supported != 0)
}

fn write_features(
    dataset: &gdal::Dataset,
    layer_name: &str,
    features: &[Feature],
    bar: &ProgressBar,
) -> anyhow::Result<()> {
    let layer = dataset.layer_by_name(layer_name)?;
    for feature in features {
        let mut gdal_feature = gdal::vector::Feature::new(layer.defn())?;
        if let Some(geometry) = &feature.geometry {
            let wkb = wkb::geom_to_wkb(geometry)
                .map_err(|err| anyhow!("Could not write geometry to WKB, {:?}", err))?;
            gdal_feature.set_geometry(gdal::vector::Geometry::from_wkb(&wkb)?)?;
        }
        for (key, value) in &feature.attributes {
            if let Some(value) = field_value(value) {
                gdal_feature.set_field(key, &value)?;
            }
        }
        gdal_feature.create(&layer)?;
        bar.inc(1);
    }
    Ok(())
}

/// Write features to a new single-layer geofile.
pub fn write_features_to_geofile(
    features: &[Feature],
    output_filepath: &Path,
    layer_name: &str,
    crs: Option<&gdal::spatial_ref::SpatialRef>,
    driver: &str,
) -> anyhow::Result<()> {
    let driver = gdal::DriverManager::get_driver_by_name(driver)?;
    let mut dataset = driver.create_vector_only(output_filepath)?;
    write_features_to_layer(&mut dataset, layer_name, features, crs)
}

/// Nodes as point features and edges as two-point line features.
pub fn graph_to_features(graph: &HydroGraph) -> (Vec<Feature>, Vec<Feature>) {
    let nodes = graph
        .nodes()
        .map(|node| {
            Feature::new(
                Some(geo::Geometry::Point(node.geometry.into())),
                node.data.clone(),
            )
        })
        .collect();
    let edges = graph
        .edges()
        .map(|(start, end, data)| {
            Feature::new(
                Some(geo::Geometry::LineString(geo::LineString::new(vec![
                    start, end,
                ]))),
                data.clone(),
            )
        })
        .collect();
    (nodes, edges)
}

/// Write a graph to a geofile with a `nodes` and an `edges` layer. The driver must support
/// multiple layers, e.g. GeoPackage.
pub fn write_graph_to_geofile(
    graph: &HydroGraph,
    output_filepath: &Path,
    driver: &str,
) -> anyhow::Result<()> {
    let (nodes, edges) = graph_to_features(graph);
    let driver = gdal::DriverManager::get_driver_by_name(driver)?;
    let mut dataset = driver.create_vector_only(output_filepath)?;
    write_features_to_layer(&mut dataset, "nodes", &nodes, graph.spatial_ref.as_ref())?;
    write_features_to_layer(&mut dataset, "edges", &edges, graph.spatial_ref.as_ref())?;
    Ok(())
}
