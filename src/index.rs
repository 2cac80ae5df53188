use crate::filter::Selection;
use crate::types::VenueRecord;
use geo::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Serialize;
use std::fmt;

// Wrapper for RTree indexing
#[derive(Debug)]
struct VenueEntry {
    index: usize,
    coords: [f64; 2], // lon, lat
}

impl RTreeObject for VenueEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for VenueEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coords[0] - point[0];
        let dy = self.coords[1] - point[1];
        dx * dx + dy * dy
    }
}

/// What the map shows when hovering over a venue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueAnnotation {
    pub category: String,
    pub province: Option<String>,
    pub department: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Spatial index over every located venue, used to resolve hover positions
/// on the map back to venues.
pub struct VenueIndex {
    tree: RTree<VenueEntry>,
}

impl fmt::Debug for VenueIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueIndex").field("len", &self.len()).finish()
    }
}

impl VenueIndex {
    pub fn build(venues: &[VenueRecord]) -> Self {
        let entries = venues.iter().enumerate()
            .filter_map(|(index, venue)| {
                venue.location.map(|p| VenueEntry { index, coords: [p.x(), p.y()] })
            })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The venue closest to `point` among those matching `selection`, no
    /// further than `max_distance` degrees when given. Non-finite points
    /// match nothing.
    pub fn nearest(
        &self,
        venues: &[VenueRecord],
        point: Point<f64>,
        selection: &Selection,
        max_distance: Option<f64>,
    ) -> Option<VenueAnnotation> {
        let query = [point.x(), point.y()];
        if !query.iter().all(|c| c.is_finite()) {
            return None;
        }
        let max_2 = max_distance.map(|d| d * d).unwrap_or(f64::INFINITY);

        self.tree.nearest_neighbor_iter(&query)
            .take_while(|entry| entry.distance_2(&query) <= max_2)
            .filter_map(|entry| venues.get(entry.index))
            .find(|venue| selection.matches(*venue))
            .map(|venue| VenueAnnotation {
                category: venue.category.clone(),
                province: venue.province.clone(),
                department: venue.department.clone(),
                latitude: venue.location.map(|p| p.y()).unwrap_or(f64::NAN),
                longitude: venue.location.map(|p| p.x()).unwrap_or(f64::NAN),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DepartmentChoice, ProvinceChoice};

    fn venue(lon: f64, lat: f64, province: &str, category: &str) -> VenueRecord {
        VenueRecord {
            location: Some(Point::new(lon, lat)),
            province: Some(province.into()),
            department: Some("Capital".into()),
            category: category.into(),
        }
    }

    fn venues() -> Vec<VenueRecord> {
        vec![
            venue(-58.4, -34.6, "Buenos Aires", "Theater"),
            venue(-64.2, -31.4, "Cordoba", "Library"),
            VenueRecord { location: None, province: None, department: None, category: "Museum".into() },
        ]
    }

    #[test]
    fn skips_unlocated_venues() {
        let index = VenueIndex::build(&venues());
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
    }

    #[test]
    fn finds_nearest_venue() {
        let venues = venues();
        let index = VenueIndex::build(&venues);
        let hit = index.nearest(&venues, Point::new(-58.0, -34.0), &Selection::default(), None).unwrap();
        assert_eq!(hit.category, "Theater");
        assert_eq!(hit.province.as_deref(), Some("Buenos Aires"));
        assert_eq!(hit.department.as_deref(), Some("Capital"));
    }

    #[test]
    fn respects_selection_and_distance() {
        let venues = venues();
        let index = VenueIndex::build(&venues);
        let cordoba = Selection::new(ProvinceChoice::parse("Cordoba"), DepartmentChoice::TotalProvince);

        let hit = index.nearest(&venues, Point::new(-58.0, -34.0), &cordoba, None).unwrap();
        assert_eq!(hit.category, "Library");

        assert!(index.nearest(&venues, Point::new(-58.0, -34.0), &cordoba, Some(1.0)).is_none());
    }

    #[test]
    fn non_finite_point_matches_nothing() {
        let venues = venues();
        let index = VenueIndex::build(&venues);
        let all = Selection::default();
        assert!(index.nearest(&venues, Point::new(f64::NAN, f64::NAN), &all, None).is_none());
        assert!(index.nearest(&venues, Point::new(f64::INFINITY, -34.0), &all, None).is_none());
    }
}
