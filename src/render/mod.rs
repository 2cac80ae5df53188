//! SVG rendering of the attendance bar chart and the venue map.
//!
//! Both renderers are pure functions of their inputs and the configured
//! styling. They return an [`ImageArtifact`] that the session keeps in
//! memory and, optionally, writes to disk.

mod bar;
mod map;
mod palette;

pub use bar::{bar_layout, render_bar_chart, Bar};
pub use map::{render_map, Viewport};
pub use palette::{hex_to_rgb, Palette};

use crate::error::RenderError;
use std::fs;
use std::path::{Path, PathBuf};

pub const BAR_CHART_ALT: &str = "School Attendance Rates Bar Chart";
pub const MAP_ALT: &str = "Dynamic Map of Cultural Spaces";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageArtifact {
    pub file_name: &'static str,
    pub alt: &'static str,
    pub svg: String,
}

impl ImageArtifact {
    pub const CONTENT_TYPE: &'static str = "image/svg+xml";

    /// Writes the artifact to `<dir>/<file_name>`, replacing the previous
    /// render.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, RenderError> {
        let path = dir.join(self.file_name);
        fs::create_dir_all(dir).map_err(|source| RenderError::Write { path: dir.to_path_buf(), source })?;
        fs::write(&path, &self.svg).map_err(|source| RenderError::Write { path: path.clone(), source })?;
        Ok(path)
    }
}
