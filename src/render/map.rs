use super::palette::Palette;
use super::{ImageArtifact, MAP_ALT};
use crate::config::MapConfig;
use crate::error::RenderError;
use crate::types::VenueRecord;
use geo::{Contains, Coord, MultiPolygon, Point, Rect};
use plotters::prelude::*;
use serde::Serialize;
use std::f64::consts::PI;

const CHART: &str = "map";

// Constants for Web Mercator
const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.051_128_78;

const BACKGROUND: RGBColor = RGBColor(250, 250, 248);
const LAND: RGBColor = RGBColor(234, 234, 230);
const COAST: RGBColor = RGBColor(200, 200, 196);

/// Mercator northing in degrees, so that both axes share one scale.
fn northing(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (PI / 4.0 + lat_rad / 2.0).tan().ln().to_degrees()
}

fn latitude(northing: f64) -> f64 {
    northing.to_radians().sinh().atan().to_degrees()
}

fn clamp_center(center: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi { (lo + hi) / 2.0 } else { center.max(lo).min(hi) }
}

/// The visible window of the map image. `x` is longitude, `y` is Mercator
/// northing; both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Centers the window on the configured point at the configured zoom,
    /// zooming in and sliding the center as needed to stay inside the
    /// bounding box.
    pub fn fit(config: &MapConfig) -> Self {
        let bounds = config.bounds;
        let (width, height) = (config.width.max(1) as f64, config.height.max(1) as f64);
        let (bottom, top) = (northing(bounds.south), northing(bounds.north));

        let fit_x = (width * 360.0 / (TILE_SIZE * (bounds.east - bounds.west))).log2();
        let fit_y = (height * 360.0 / (TILE_SIZE * (top - bottom))).log2();
        let zoom = config.zoom.max(fit_x).max(fit_y);

        let degrees_per_pixel = 360.0 / (TILE_SIZE * 2f64.powf(zoom));
        let half_w = width / 2.0 * degrees_per_pixel;
        let half_h = height / 2.0 * degrees_per_pixel;

        let cx = clamp_center(config.center_lon, bounds.west + half_w, bounds.east - half_w);
        let cy = clamp_center(northing(config.center_lat), bottom + half_h, top - half_h);

        Self {
            west: cx - half_w,
            east: cx + half_w,
            south: latitude(cy - half_h),
            north: latitude(cy + half_h),
            zoom,
            width: config.width,
            height: config.height,
        }
    }

    pub fn project(&self, point: Point<f64>) -> (f64, f64) {
        (point.x(), northing(point.y()))
    }

    pub fn contains(&self, point: Point<f64>) -> bool {
        let rect = Rect::new(
            Coord { x: self.west, y: self.south },
            Coord { x: self.east, y: self.north },
        );
        rect.contains(&point)
    }

    fn x_range(&self) -> std::ops::Range<f64> {
        self.west..self.east
    }

    fn y_range(&self) -> std::ops::Range<f64> {
        northing(self.south)..northing(self.north)
    }
}

/// Draws one point per located venue, colored by category, over the
/// optional basemap outlines.
pub fn render_map(
    venues: &[&VenueRecord],
    basemap: &[MultiPolygon<f64>],
    palette: &Palette,
    viewport: &Viewport,
    radius: u32,
) -> Result<ImageArtifact, RenderError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (viewport.width, viewport.height)).into_drawing_area();
        root.fill(&BACKGROUND).map_err(|e| RenderError::draw(CHART, e))?;

        let mut chart = ChartBuilder::on(&root)
            .build_cartesian_2d(viewport.x_range(), viewport.y_range())
            .map_err(|e| RenderError::draw(CHART, e))?;

        let polygons = basemap.iter().flat_map(|mp| mp.0.iter());
        chart.draw_series(polygons.map(|polygon| {
            let ring: Vec<(f64, f64)> = polygon.exterior().points().map(|p| viewport.project(p)).collect();
            Polygon::new(ring, LAND.filled())
        }))
        .map_err(|e| RenderError::draw(CHART, e))?;

        chart.draw_series(basemap.iter().flat_map(|mp| mp.0.iter()).map(|polygon| {
            let ring: Vec<(f64, f64)> = polygon.exterior().points().map(|p| viewport.project(p)).collect();
            PathElement::new(ring, COAST.stroke_width(1))
        }))
        .map_err(|e| RenderError::draw(CHART, e))?;

        let mut labelled = false;
        for (category, color) in palette.entries() {
            let points: Vec<(f64, f64)> = venues.iter()
                .filter(|v| v.category == category)
                .filter_map(|v| v.location)
                .filter(|p| viewport.contains(*p))
                .map(|p| viewport.project(p))
                .collect();
            if points.is_empty() {
                continue;
            }

            let style = color.mix(0.85).filled();
            chart.draw_series(points.into_iter().map(|p| Circle::new(p, radius, style)))
                .map_err(|e| RenderError::draw(CHART, e))?
                .label(category)
                .legend(move |(x, y)| Circle::new((x, y), 5, style));
            labelled = true;
        }

        if labelled {
            chart.configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK.mix(0.3))
                .label_font(("sans-serif", 13))
                .draw()
                .map_err(|e| RenderError::draw(CHART, e))?;
        }

        root.present().map_err(|e| RenderError::draw(CHART, e))?;
    }

    Ok(ImageArtifact { file_name: "map.svg", alt: MAP_ALT, svg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundsConfig;
    use std::collections::HashMap;

    fn venue(lon: f64, lat: f64, category: &str) -> VenueRecord {
        VenueRecord {
            location: Some(Point::new(lon, lat)),
            province: Some("Buenos Aires".into()),
            department: Some("La Plata".into()),
            category: category.into(),
        }
    }

    #[test]
    fn northing_round_trips() {
        for lat in [-75.0, -40.0, -34.6, 0.0, 12.5] {
            assert!((latitude(northing(lat)) - lat).abs() < 1e-9);
        }
    }

    #[test]
    fn viewport_stays_inside_bounds() {
        let config = MapConfig::default();
        let vp = Viewport::fit(&config);
        let b = BoundsConfig::default();

        assert!(vp.zoom >= config.zoom);
        assert!(vp.west >= b.west - 1e-9 && vp.east <= b.east + 1e-9);
        assert!(vp.south >= b.south - 1e-9 && vp.north <= b.north + 1e-9);
        // The west edge is pinned because the configured center lies near it.
        assert!((vp.west - b.west).abs() < 1e-6);
    }

    #[test]
    fn high_zoom_keeps_requested_center() {
        let config = MapConfig { zoom: 6.0, center_lat: -34.6, center_lon: -58.4, ..MapConfig::default() };
        let vp = Viewport::fit(&config);
        assert_eq!(vp.zoom, 6.0);
        assert!(((vp.west + vp.east) / 2.0 - -58.4).abs() < 1e-9);
        assert!(vp.contains(Point::new(-58.4, -34.6)));
        assert!(!vp.contains(Point::new(-70.0, -34.6)));
    }

    #[test]
    fn map_draws_one_legend_entry_per_present_category() {
        let venues = [venue(-58.4, -34.6, "Theater"), venue(-64.2, -31.4, "Library")];
        let refs: Vec<&VenueRecord> = venues.iter().collect();
        let categories = vec!["Theater".to_string(), "Library".to_string(), "Museum".to_string()];
        let palette = Palette::new(&categories, &venues, &HashMap::new());
        let vp = Viewport::fit(&MapConfig::default());

        let artifact = render_map(&refs, &[], &palette, &vp, 4).unwrap();
        assert_eq!(artifact.alt, "Dynamic Map of Cultural Spaces");
        assert!(artifact.svg.contains("Theater"));
        assert!(artifact.svg.contains("Library"));
        assert!(!artifact.svg.contains("Museum"));
    }

    #[test]
    fn empty_subset_renders_blank_map() {
        let palette = Palette::new(&[], &[], &HashMap::new());
        let vp = Viewport::fit(&MapConfig::default());
        let artifact = render_map(&[], &[], &palette, &vp, 4).unwrap();
        assert!(artifact.svg.contains("<svg"));
    }
}
