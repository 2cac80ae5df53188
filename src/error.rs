use std::path::PathBuf;

/// Fatal problems reading the input datasets. None of these are recoverable:
/// the dashboard refuses to start without both datasets.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to open {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Failed to read CSV {path:?}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Failed to read shapefile {path:?}: {source}")]
    Shapefile { path: PathBuf, source: shapefile::Error },

    #[error("Failed to read dBase header {path:?}: {source}")]
    Dbase { path: PathBuf, source: shapefile::dbase::Error },

    #[error("Failed to parse GeoJSON {path:?}: {source}")]
    GeoJson { path: PathBuf, source: serde_json::Error },

    #[error("{path:?} must contain a GeoJSON FeatureCollection")]
    NotAFeatureCollection { path: PathBuf },

    #[error("Unsupported geometry format {extension:?} for {path:?}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("The {dataset} is missing the following required columns: {}", columns.join(", "))]
    MissingColumns { dataset: &'static str, columns: Vec<String> },
}

/// Failures producing a chart artifact. These reach the session that asked
/// for the render.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to draw {chart}: {message}")]
    Draw { chart: &'static str, message: String },

    #[error("Failed to write artifact {path:?}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

impl RenderError {
    pub(crate) fn draw(chart: &'static str, err: impl std::fmt::Display) -> Self {
        RenderError::Draw { chart, message: err.to_string() }
    }
}
