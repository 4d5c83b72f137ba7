pub mod feature;
pub mod gdal_geofile;
pub mod geojson;
