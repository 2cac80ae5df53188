use geo::Point;
use serde::Serialize;

pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One cultural venue from the geospatial dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueRecord {
    pub location: Option<Point<f64>>, // x = longitude, y = latitude
    pub province: Option<String>,
    pub department: Option<String>,
    pub category: String,
}

/// One row of the attendance table.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub province: Option<String>,
    pub department: Option<String>,
    pub category: String,
    pub rates: [Option<f64>; 5], // percentages, AgeBand::ALL order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgeBand {
    FourToFive,
    SixToEleven,
    TwelveToFourteen,
    FifteenToSeventeen,
    Average,
}

impl AgeBand {
    pub const ALL: [AgeBand; 5] = [
        AgeBand::FourToFive,
        AgeBand::SixToEleven,
        AgeBand::TwelveToFourteen,
        AgeBand::FifteenToSeventeen,
        AgeBand::Average,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBand::FourToFive => "4 to 5 years",
            AgeBand::SixToEleven => "6 to 11 years",
            AgeBand::TwelveToFourteen => "12 to 14 years",
            AgeBand::FifteenToSeventeen => "15 to 17 years",
            AgeBand::Average => "avg attendance rate",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Records that carry a province and department and can therefore be
/// narrowed by a selection.
pub trait Regional {
    fn province(&self) -> Option<&str>;
    fn department(&self) -> Option<&str>;
}

impl Regional for VenueRecord {
    fn province(&self) -> Option<&str> {
        self.province.as_deref()
    }

    fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }
}

impl Regional for AttendanceRecord {
    fn province(&self) -> Option<&str> {
        self.province.as_deref()
    }

    fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }
}
