use std::path::PathBuf;

/// Errors raised while turning a feature source into a graph.
///
/// Every variant aborts the conversion; no partial graph is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Could not open or read dataset {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: gdal::errors::GdalError,
    },

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Bad data: feature {index} is missing geometry")]
    MissingGeometry { index: usize },

    #[error("Geometry type {geometry_type} of feature {index} is not supported for a graph")]
    UnsupportedGeometry { index: usize, geometry_type: String },

    #[error("Could not encode segment geometry: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
