//! Selection state and the pure functions that narrow records by it.

use crate::data::distinct;
use crate::types::{Regional, VenueRecord};

pub const TOTAL_COUNTRY: &str = "Total Country";
pub const TOTAL_PROVINCE: &str = "Total Province";
pub const NO_DEPARTMENTS: &str = "No Departments Found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvinceChoice {
    TotalCountry,
    Province(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartmentChoice {
    TotalProvince,
    /// The placeholder offered when a province has no departments. Narrows
    /// nothing.
    NoneFound,
    Department(String),
}

impl ProvinceChoice {
    pub fn parse(value: &str) -> Self {
        match value {
            "" | TOTAL_COUNTRY => ProvinceChoice::TotalCountry,
            other => ProvinceChoice::Province(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProvinceChoice::TotalCountry => TOTAL_COUNTRY,
            ProvinceChoice::Province(p) => p,
        }
    }
}

impl DepartmentChoice {
    pub fn parse(value: &str) -> Self {
        match value {
            "" | TOTAL_PROVINCE => DepartmentChoice::TotalProvince,
            NO_DEPARTMENTS => DepartmentChoice::NoneFound,
            other => DepartmentChoice::Department(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DepartmentChoice::TotalProvince => TOTAL_PROVINCE,
            DepartmentChoice::NoneFound => NO_DEPARTMENTS,
            DepartmentChoice::Department(d) => d,
        }
    }
}

/// The per-session filter. A department is only meaningful under a
/// concrete province; under "Total Country" it is always "Total Province".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    province: ProvinceChoice,
    department: DepartmentChoice,
}

impl Default for Selection {
    fn default() -> Self {
        Self { province: ProvinceChoice::TotalCountry, department: DepartmentChoice::TotalProvince }
    }
}

impl Selection {
    pub fn new(province: ProvinceChoice, department: DepartmentChoice) -> Self {
        let department = match province {
            ProvinceChoice::TotalCountry => DepartmentChoice::TotalProvince,
            ProvinceChoice::Province(_) => department,
        };
        Self { province, department }
    }

    pub fn province(&self) -> &ProvinceChoice {
        &self.province
    }

    pub fn department(&self) -> &DepartmentChoice {
        &self.department
    }

    pub fn matches<R: Regional + ?Sized>(&self, record: &R) -> bool {
        let ProvinceChoice::Province(province) = &self.province else {
            return true;
        };
        if record.province() != Some(province.as_str()) {
            return false;
        }
        match &self.department {
            DepartmentChoice::Department(department) => record.department() == Some(department.as_str()),
            DepartmentChoice::TotalProvince | DepartmentChoice::NoneFound => true,
        }
    }
}

/// Records matching `selection`, in their original order.
pub fn filter_records<'a, R: Regional>(records: &'a [R], selection: &Selection) -> Vec<&'a R> {
    records.iter().filter(|r| selection.matches(*r)).collect()
}

/// Options for the province selector.
pub fn province_options(venues: &[VenueRecord]) -> Vec<String> {
    std::iter::once(TOTAL_COUNTRY)
        .chain(distinct(venues.iter().filter_map(|v| v.province.as_deref())))
        .map(str::to_string)
        .collect()
}

/// Options for the department selector under `province`.
pub fn department_options(venues: &[VenueRecord], province: &ProvinceChoice) -> Vec<String> {
    let ProvinceChoice::Province(province) = province else {
        return vec![TOTAL_PROVINCE.to_string()];
    };
    let departments = distinct(
        venues.iter()
            .filter(|v| v.province.as_deref() == Some(province.as_str()))
            .filter_map(|v| v.department.as_deref()),
    );
    if departments.is_empty() {
        return vec![NO_DEPARTMENTS.to_string()];
    }
    std::iter::once(TOTAL_PROVINCE)
        .chain(departments)
        .map(str::to_string)
        .collect()
}
