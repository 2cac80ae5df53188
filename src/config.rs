use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub columns: ColumnsConfig,
    pub map: MapConfig,
    pub chart: ChartConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub attendance_csv: PathBuf,
    pub venues: PathBuf,    // .shp, .json or .geojson
    pub basemap: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            attendance_csv: PathBuf::from("data/attendance.csv"),
            venues: PathBuf::from("data/venues.shp"),
            basemap: None,
        }
    }
}

/// Field names for each dataset. Both datasets expose the same logical
/// fields; only the physical column names differ.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ColumnsConfig {
    pub attendance: AttendanceColumns,
    pub venues: VenueColumns,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AttendanceColumns {
    pub province: String,
    pub department: String,
    pub category: String,
    pub age_4_to_5: String,
    pub age_6_to_11: String,
    pub age_12_to_14: String,
    pub age_15_to_17: String,
    pub average: String,
}

impl Default for AttendanceColumns {
    fn default() -> Self {
        Self {
            province: "province".into(),
            department: "department".into(),
            category: "category".into(),
            age_4_to_5: "4 to 5 years".into(),
            age_6_to_11: "6 to 11 years".into(),
            age_12_to_14: "12 to 14 years".into(),
            age_15_to_17: "15 to 17 years".into(),
            average: "avg attendance rate".into(),
        }
    }
}

impl AttendanceColumns {
    /// Band columns in [`crate::types::AgeBand::ALL`] order.
    pub fn bands(&self) -> [&str; 5] {
        [
            &self.age_4_to_5,
            &self.age_6_to_11,
            &self.age_12_to_14,
            &self.age_15_to_17,
            &self.average,
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VenueColumns {
    pub latitude: String,
    pub longitude: String,
    pub province: String,
    pub department: String,
    pub category: String,
}

impl Default for VenueColumns {
    fn default() -> Self {
        Self {
            latitude: "latitude".into(),
            longitude: "longitude".into(),
            province: "province".into(),
            department: "department".into(),
            category: "category".into(),
        }
    }
}

impl VenueColumns {
    pub fn required(&self) -> [&str; 5] {
        [&self.latitude, &self.longitude, &self.province, &self.department, &self.category]
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub bounds: BoundsConfig,
    pub width: u32,
    pub height: u32,
    pub point_radius: u32,
    pub colors: HashMap<String, String>, // category -> hex code
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: -40.0,
            center_lon: -80.0,
            zoom: 2.7,
            bounds: BoundsConfig::default(),
            width: 640,
            height: 720,
            point_radius: 4,
            colors: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BoundsConfig {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self { west: -85.0, east: -30.0, south: -75.0, north: 0.0 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { width: 720, height: 480 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub artifact_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on live sessions; the least valuable are evicted first.
    pub max_sessions: u64,
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            max_sessions: 10_000,
            session_idle_secs: 30 * 60,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
    }

    /// Dataset paths given on the command line or in the environment win
    /// over the file.
    pub fn with_overrides(mut self, attendance: Option<PathBuf>, venues: Option<PathBuf>) -> Self {
        if let Some(path) = attendance {
            self.input.attendance_csv = path;
        }
        if let Some(path) = venues {
            self.input.venues = path;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [columns.venues]
            department = "departme_1"

            [server]
            port = 9000
            session_idle_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.columns.venues.department, "departme_1");
        assert_eq!(config.columns.venues.latitude, "latitude");
        assert_eq!(config.columns.attendance.department, "department");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.session_idle_secs, 60);
        assert_eq!(config.server.max_sessions, 10_000);
        assert_eq!(config.map.bounds, BoundsConfig::default());
        assert_eq!(config.map.zoom, 2.7);
    }

    #[test]
    fn overrides_replace_dataset_paths() {
        let config = AppConfig::default()
            .with_overrides(Some(PathBuf::from("a.csv")), None);
        assert_eq!(config.input.attendance_csv, PathBuf::from("a.csv"));
        assert_eq!(config.input.venues, PathBuf::from("data/venues.shp"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(AppConfig::from_toml("[server]\nport = \"eighty\"").is_err());
    }
}
