use crate::types::{AgeBand, AttendanceRecord, VenueRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCard {
    pub category: String,
    pub count: usize,
}

pub fn count_category(venues: &[&VenueRecord], category: &str) -> usize {
    venues.iter().filter(|v| v.category == category).count()
}

/// One card per category, in category order. Categories with no venues in
/// the subset still get a card.
pub fn category_cards(venues: &[&VenueRecord], categories: &[String]) -> Vec<CategoryCard> {
    categories.iter()
        .map(|category| CategoryCard { category: category.clone(), count: count_category(venues, category) })
        .collect()
}

/// Mean attendance rate per age band, in percent. NaN where the subset has
/// no values for a band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceMeans {
    pub values: [f64; 5],
}

impl AttendanceMeans {
    pub fn get(&self, band: AgeBand) -> f64 {
        self.values[band.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgeBand, f64)> + '_ {
        AgeBand::ALL.into_iter().map(|band| (band, self.get(band)))
    }
}

pub fn mean_attendance(rows: &[&AttendanceRecord]) -> AttendanceMeans {
    let mut sums = [0.0; 5];
    let mut counts = [0usize; 5];
    for row in rows {
        for (i, rate) in row.rates.iter().enumerate() {
            if let Some(v) = rate {
                sums[i] += v;
                counts[i] += 1;
            }
        }
    }

    let mut values = [f64::NAN; 5];
    for i in 0..5 {
        if counts[i] > 0 {
            values[i] = sums[i] / counts[i] as f64;
        }
    }
    AttendanceMeans { values }
}
