use crate::config::{AppConfig, AttendanceColumns, VenueColumns};
use crate::error::LoadError;
use crate::types::{AttendanceRecord, VenueRecord, UNKNOWN_CATEGORY};
use csv::ReaderBuilder;
use geo::{MultiPolygon, Point};
use geojson::GeoJson;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Everything loaded at startup. Built once and shared read-only by every
/// session.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub attendance: Vec<AttendanceRecord>,
    pub venues: Vec<VenueRecord>,
    /// Distinct attendance categories except "Unknown", in first-seen order.
    pub categories: Vec<String>,
    pub basemap: Vec<MultiPolygon<f64>>,
}

impl Datasets {
    pub fn new(attendance: Vec<AttendanceRecord>, venues: Vec<VenueRecord>) -> Self {
        let categories = category_set(&attendance);
        Self { attendance, venues, categories, basemap: Vec::new() }
    }

    pub fn with_basemap(mut self, basemap: Vec<MultiPolygon<f64>>) -> Self {
        self.basemap = basemap;
        self
    }

    /// Distinct venue provinces in first-seen order.
    pub fn provinces(&self) -> Vec<&str> {
        distinct(self.venues.iter().filter_map(|v| v.province.as_deref()))
    }
}

pub fn load_data(config: &AppConfig) -> Result<Datasets, LoadError> {
    info!("Loading data...");

    let attendance = load_attendance(&config.input.attendance_csv, &config.columns.attendance)?;
    info!("Loaded {} attendance rows", attendance.len());

    let venues = load_venues(&config.input.venues, &config.columns.venues)?;
    info!("Loaded {} venues", venues.len());

    let basemap = match &config.input.basemap {
        Some(path) => load_basemap(path)?,
        None => Vec::new(),
    };

    let datasets = Datasets::new(attendance, venues).with_basemap(basemap);
    info!(
        categories = ?datasets.categories,
        provinces = datasets.provinces().len(),
        basemap_polygons = datasets.basemap.len(),
        "Datasets ready"
    );
    Ok(datasets)
}

pub fn category_set(attendance: &[AttendanceRecord]) -> Vec<String> {
    distinct(
        attendance
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| *c != UNKNOWN_CATEGORY),
    )
    .into_iter()
    .map(str::to_string)
    .collect()
}

pub(crate) fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

pub fn load_attendance(path: &Path, columns: &AttendanceColumns) -> Result<Vec<AttendanceRecord>, LoadError> {
    read_attendance(open(path)?, path, columns)
}

pub(crate) fn read_attendance<R: Read>(
    reader: R,
    path: &Path,
    columns: &AttendanceColumns,
) -> Result<Vec<AttendanceRecord>, LoadError> {
    let csv_err = |source| LoadError::Csv { path: path.to_path_buf(), source };
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers().map_err(csv_err)?.clone();

    let col_indices: HashMap<&str, usize> = headers.iter().enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();

    let mut required = vec![columns.province.as_str(), columns.department.as_str(), columns.category.as_str()];
    required.extend(columns.bands());
    let missing: Vec<String> = required.iter()
        .filter(|c| !col_indices.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns { dataset: "attendance dataset", columns: missing });
    }

    let province_idx = col_indices[columns.province.as_str()];
    let department_idx = col_indices[columns.department.as_str()];
    let category_idx = col_indices[columns.category.as_str()];
    let band_idx = columns.bands().map(|c| col_indices[c]);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let text = |idx: usize| record.get(idx).map(str::trim).filter(|s| !s.is_empty());

        rows.push(AttendanceRecord {
            province: text(province_idx).map(str::to_string),
            department: text(department_idx).map(str::to_string),
            category: text(category_idx).unwrap_or(UNKNOWN_CATEGORY).to_string(),
            rates: band_idx.map(|idx| text(idx).and_then(|s| s.parse::<f64>().ok()).filter(|v| !v.is_nan())),
        });
    }

    Ok(rows)
}

pub fn load_venues(path: &Path, columns: &VenueColumns) -> Result<Vec<VenueRecord>, LoadError> {
    match extension(path).as_str() {
        "shp" => load_venue_shapefile(path, columns),
        "json" | "geojson" => {
            let geojson = read_geojson(path)?;
            venues_from_geojson(geojson, path, columns)
        }
        other => Err(LoadError::UnsupportedFormat { path: path.to_path_buf(), extension: other.to_string() }),
    }
}

fn missing_columns(columns: &VenueColumns, has: impl Fn(&str) -> bool) -> Result<(), LoadError> {
    let missing: Vec<String> = columns.required().into_iter()
        .filter(|c| !has(*c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingColumns { dataset: "venue dataset", columns: missing })
    }
}

fn venue_from_fields<'a, V>(columns: &VenueColumns, get: impl Fn(&str) -> Option<&'a V>, text: fn(&V) -> Option<String>, number: fn(&V) -> Option<f64>) -> VenueRecord
where
    V: 'a,
{
    let lat = get(columns.latitude.as_str()).and_then(number);
    let lon = get(columns.longitude.as_str()).and_then(number);
    VenueRecord {
        location: match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Point::new(lon, lat)),
            _ => None,
        },
        province: get(columns.province.as_str()).and_then(text),
        department: get(columns.department.as_str()).and_then(text),
        category: get(columns.category.as_str()).and_then(text).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
    }
}

/// Field names declared in a dBase header. Read on their own so a table
/// with no records is still checked.
fn dbase_fields(path: &Path) -> Result<Vec<String>, LoadError> {
    let reader = shapefile::dbase::Reader::from_path(path)
        .map_err(|source| LoadError::Dbase { path: path.to_path_buf(), source })?;
    Ok(reader.fields().iter().map(|f| f.name().to_string()).collect())
}

fn load_venue_shapefile(path: &Path, columns: &VenueColumns) -> Result<Vec<VenueRecord>, LoadError> {
    let fields = dbase_fields(&path.with_extension("dbf"))?;
    missing_columns(columns, |c| fields.iter().any(|f| f == c))?;

    let shp_err = |source| LoadError::Shapefile { path: path.to_path_buf(), source };
    let mut reader = Reader::from_path(path).map_err(shp_err)?;

    let mut venues = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (_shape, record) = result.map_err(shp_err)?;
        venues.push(venue_from_fields(columns, |c| record.get(c), dbase_text, dbase_number));
    }

    if venues.is_empty() {
        warn!("Shapefile {:?} has no records", path);
    }
    Ok(venues)
}

fn dbase_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            Some(s.trim().to_string()).filter(|s| !s.is_empty())
        }
        FieldValue::Integer(n) => Some(n.to_string()),
        FieldValue::Numeric(Some(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn dbase_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(n) => n.map(f64::from),
        FieldValue::Double(n) | FieldValue::Currency(n) => Some(*n),
        FieldValue::Integer(n) => Some(f64::from(*n)),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_geojson(path: &Path) -> Result<GeoJson, LoadError> {
    let reader = BufReader::new(open(path)?);
    // Parses the whole file into memory.
    GeoJson::from_reader(reader)
        .map_err(|source| LoadError::GeoJson { path: path.to_path_buf(), source })
}

pub(crate) fn venues_from_geojson(
    geojson: GeoJson,
    path: &Path,
    columns: &VenueColumns,
) -> Result<Vec<VenueRecord>, LoadError> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(LoadError::NotAFeatureCollection { path: path.to_path_buf() }),
    };

    // Features carry their own property sets, so every one is checked. An
    // empty collection has no columns at all.
    if collection.features.is_empty() {
        missing_columns(columns, |_| false)?;
    }

    let empty = serde_json::Map::new();
    let mut venues = Vec::with_capacity(collection.features.len());
    for feature in &collection.features {
        let props = feature.properties.as_ref().unwrap_or(&empty);
        missing_columns(columns, |c| props.contains_key(c))?;
        venues.push(venue_from_fields(columns, |c| props.get(c), json_text, json_number));
    }
    Ok(venues)
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Polygon outlines drawn under the venue points.
pub fn load_basemap(path: &Path) -> Result<Vec<MultiPolygon<f64>>, LoadError> {
    info!("Loading basemap from {:?}...", path);
    let polygons = match extension(path).as_str() {
        "shp" => {
            let shp_err = |source| LoadError::Shapefile { path: path.to_path_buf(), source };
            let shapes = shapefile::read_shapes(path).map_err(shp_err)?;
            shapes.into_iter().filter_map(shape_to_multipolygon).collect()
        }
        "json" | "geojson" => match read_geojson(path)? {
            GeoJson::FeatureCollection(fc) => fc.features.into_iter()
                .filter_map(|f| f.geometry)
                .filter_map(|g| geo::Geometry::<f64>::try_from(g.value).ok())
                .filter_map(|g| match g {
                    geo::Geometry::MultiPolygon(mp) => Some(mp),
                    geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
                    _ => None, // Skip points/lines
                })
                .collect(),
            _ => return Err(LoadError::NotAFeatureCollection { path: path.to_path_buf() }),
        },
        other => {
            return Err(LoadError::UnsupportedFormat { path: path.to_path_buf(), extension: other.to_string() })
        }
    };
    Ok(polygons)
}

fn shape_to_multipolygon(shape: shapefile::Shape) -> Option<MultiPolygon<f64>> {
    match shape {
        shapefile::Shape::Polygon(polygon) => polygon.try_into().ok(),
        shapefile::Shape::PolygonM(polygon) => polygon.try_into().ok(),
        shapefile::Shape::PolygonZ(polygon) => polygon.try_into().ok(),
        _ => None, // Skip non-polygon shapes
    }
}
