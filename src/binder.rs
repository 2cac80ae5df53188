//! Wiring between the two selector inputs and the derived dashboard outputs.
//!
//! Every output depends on both inputs, so any selector change regenerates
//! the whole view. Department options strictly depend on the province only,
//! and a department change could skip them; recomputing everything keeps the
//! rule trivial at the cost of some redundant work.

use crate::config::{AppConfig, ChartConfig};
use crate::data::Datasets;
use crate::error::RenderError;
use crate::filter::{department_options, filter_records, province_options, DepartmentChoice, ProvinceChoice, Selection};
use crate::index::VenueIndex;
use crate::render::{render_bar_chart, render_map, ImageArtifact, Palette, Viewport};
use crate::summary::{category_cards, mean_attendance, AttendanceMeans, CategoryCard};
use crate::types::VenueRecord;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Province,
    Department,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    DepartmentOptions,
    CategoryCards,
    BarChart,
    Map,
}

const ALL_OUTPUTS: [Output; 4] = [Output::DepartmentOptions, Output::CategoryCards, Output::BarChart, Output::Map];

/// Outputs invalidated by a change to `input`.
pub fn dependents(input: Input) -> &'static [Output] {
    match input {
        Input::Province | Input::Department => &ALL_OUTPUTS,
    }
}

/// A user interaction with one of the selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Province(String),
    Department(String),
}

impl InputEvent {
    pub fn input(&self) -> Input {
        match self {
            InputEvent::Province(_) => Input::Province,
            InputEvent::Department(_) => Input::Department,
        }
    }

    /// The selection after this event. A new province resets the department
    /// to the first option it offers; an unknown department falls back to
    /// the first option too.
    pub fn apply(&self, current: &Selection, venues: &[VenueRecord]) -> Selection {
        let (province, requested) = match self {
            InputEvent::Province(value) => (ProvinceChoice::parse(value), None),
            InputEvent::Department(value) => (current.province().clone(), Some(value.as_str())),
        };
        let options = department_options(venues, &province);
        let department = requested
            .filter(|d| options.iter().any(|o| o == d))
            .or_else(|| options.first().map(String::as_str))
            .map(DepartmentChoice::parse)
            .unwrap_or(DepartmentChoice::TotalProvince);
        Selection::new(province, department)
    }
}

/// Everything a session displays for one selection.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub selection: Selection,
    pub department_options: Vec<String>,
    pub cards: Vec<CategoryCard>,
    pub attendance: AttendanceMeans,
    pub venue_count: usize,
    pub bar_chart: ImageArtifact,
    pub map: ImageArtifact,
}

/// The read-only state shared by all sessions: datasets plus everything
/// derived from them and the configuration at startup.
#[derive(Debug)]
pub struct Dashboard {
    datasets: Datasets,
    province_options: Vec<String>,
    index: VenueIndex,
    palette: Palette,
    viewport: Viewport,
    chart: ChartConfig,
    point_radius: u32,
    artifact_dir: Option<PathBuf>,
}

impl Dashboard {
    pub fn new(datasets: Datasets, config: &AppConfig) -> Self {
        Self {
            province_options: province_options(&datasets.venues),
            index: VenueIndex::build(&datasets.venues),
            palette: Palette::new(&datasets.categories, &datasets.venues, &config.map.colors),
            viewport: Viewport::fit(&config.map),
            chart: config.chart.clone(),
            point_radius: config.map.point_radius,
            artifact_dir: config.output.artifact_dir.clone(),
            datasets,
        }
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn province_options(&self) -> &[String] {
        &self.province_options
    }

    pub fn index(&self) -> &VenueIndex {
        &self.index
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Recomputes every output for `selection`.
    pub fn render(&self, selection: &Selection) -> Result<DashboardView, RenderError> {
        let venues = filter_records(&self.datasets.venues, selection);
        let rows = filter_records(&self.datasets.attendance, selection);
        let attendance = mean_attendance(&rows);

        debug!(
            province = selection.province().as_str(),
            department = selection.department().as_str(),
            venues = venues.len(),
            attendance_rows = rows.len(),
            "Rendering dashboard"
        );

        Ok(DashboardView {
            selection: selection.clone(),
            department_options: department_options(&self.datasets.venues, selection.province()),
            cards: category_cards(&venues, &self.datasets.categories),
            attendance,
            venue_count: venues.len(),
            bar_chart: render_bar_chart(&attendance, &self.chart)?,
            map: render_map(&venues, &self.datasets.basemap, &self.palette, &self.viewport, self.point_radius)?,
        })
    }

    /// Writes both images under `<artifact_dir>/<session>/` when an artifact
    /// directory is configured.
    pub fn persist(&self, session: &str, view: &DashboardView) -> Result<Option<PathBuf>, RenderError> {
        let Some(root) = &self.artifact_dir else {
            return Ok(None);
        };
        let dir = root.join(session);
        write_artifacts(&dir, [&view.bar_chart, &view.map])?;
        Ok(Some(dir))
    }
}

fn write_artifacts<'a>(dir: &Path, artifacts: impl IntoIterator<Item = &'a ImageArtifact>) -> Result<(), RenderError> {
    for artifact in artifacts {
        artifact.write_to(dir)?;
    }
    Ok(())
}
