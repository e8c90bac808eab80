//! Turns raw query-string values into validated filters and sorts, then makes
//! exactly one repository call.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use super::domain::{EquipmentId, JobId, ProfessionalId, UnknownVariant};
use super::error::MarketplaceError;
use super::listings::{
    EquipmentFilter, EquipmentListing, EquipmentListings, EquipmentSort, JobFilter, JobListing,
    JobSort, Jobs, ListingRepository, ListingType, MarketplaceListings, ProfessionalFilter,
    ProfessionalListing, ProfessionalSort, Professionals,
};

/// `GET /api/jobs` parameters. List-valued fields are comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    pub location: Option<String>,
    pub skills: Option<String>,
    pub urgency: Option<String>,
    pub job_type: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalQuery {
    pub location: Option<String>,
    pub skills: Option<String>,
    pub availability: Option<String>,
    pub verified: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub listing_type: Option<String>,
    pub available: Option<String>,
    pub sort: Option<String>,
}

fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Split on commas, drop blanks, parse each item, keep first occurrences.
fn enum_list<T>(raw: Option<&str>) -> Result<Vec<T>, MarketplaceError>
where
    T: FromStr<Err = UnknownVariant> + PartialEq,
{
    let mut values = Vec::new();
    for item in raw.unwrap_or_default().split(',') {
        if item.trim().is_empty() {
            continue;
        }
        let value = item.parse::<T>()?;
        if !values.contains(&value) {
            values.push(value);
        }
    }
    Ok(values)
}

fn sort<T>(raw: Option<&str>) -> Result<T, MarketplaceError>
where
    T: FromStr<Err = MarketplaceError> + Default,
{
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.parse(),
        None => Ok(T::default()),
    }
}

fn flag(name: &str, raw: Option<&str>) -> Result<bool, MarketplaceError> {
    match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(MarketplaceError::validation(format!(
            "{name} must be true or false, got '{other}'"
        ))),
    }
}

impl JobQuery {
    pub fn parse(&self) -> Result<(JobFilter, JobSort), MarketplaceError> {
        let filter = JobFilter {
            location: text(self.location.as_deref()),
            skills: enum_list(self.skills.as_deref())?,
            urgency: enum_list(self.urgency.as_deref())?,
            job_types: enum_list(self.job_type.as_deref())?,
        };
        Ok((filter, sort(self.sort.as_deref())?))
    }
}

impl ProfessionalQuery {
    pub fn parse(&self) -> Result<(ProfessionalFilter, ProfessionalSort), MarketplaceError> {
        let filter = ProfessionalFilter {
            location: text(self.location.as_deref()),
            skills: enum_list(self.skills.as_deref())?,
            availability: enum_list(self.availability.as_deref())?,
            verified_only: flag("verified", self.verified.as_deref())?,
        };
        Ok((filter, sort(self.sort.as_deref())?))
    }
}

impl EquipmentQuery {
    pub fn parse(&self) -> Result<(EquipmentFilter, EquipmentSort), MarketplaceError> {
        // "all" is what the equipment page sends when no tab is selected.
        let listing_type = match text(self.listing_type.as_deref()) {
            None => None,
            Some(value) if value.eq_ignore_ascii_case("all") => None,
            Some(value) => Some(value.parse::<ListingType>()?),
        };
        let filter = EquipmentFilter {
            search: text(self.search.as_deref()),
            categories: enum_list(self.category.as_deref())?,
            conditions: enum_list(self.condition.as_deref())?,
            listing_type,
            available_only: flag("available", self.available.as_deref())?,
        };
        Ok((filter, sort(self.sort.as_deref())?))
    }
}

/// Read side of the marketplace.
pub struct MarketplaceQuery<R> {
    repository: Arc<R>,
}

impl<R> Clone for MarketplaceQuery<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> MarketplaceQuery<R>
where
    R: MarketplaceListings + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobListing>, MarketplaceError> {
        let (filter, sort) = query.parse()?;
        ListingRepository::<Jobs>::list(&*self.repository, &filter, sort)
    }

    pub fn job(&self, id: &str) -> Result<JobListing, MarketplaceError> {
        ListingRepository::<Jobs>::get_by_id(&*self.repository, &JobId::from(id))
    }

    pub fn list_professionals(
        &self,
        query: &ProfessionalQuery,
    ) -> Result<Vec<ProfessionalListing>, MarketplaceError> {
        let (filter, sort) = query.parse()?;
        ListingRepository::<Professionals>::list(&*self.repository, &filter, sort)
    }

    pub fn professional(&self, id: &str) -> Result<ProfessionalListing, MarketplaceError> {
        ListingRepository::<Professionals>::get_by_id(&*self.repository, &ProfessionalId::from(id))
    }

    pub fn list_equipment(
        &self,
        query: &EquipmentQuery,
    ) -> Result<Vec<EquipmentListing>, MarketplaceError> {
        let (filter, sort) = query.parse()?;
        ListingRepository::<EquipmentListings>::list(&*self.repository, &filter, sort)
    }

    pub fn equipment(&self, id: &str) -> Result<EquipmentListing, MarketplaceError> {
        ListingRepository::<EquipmentListings>::get_by_id(&*self.repository, &EquipmentId::from(id))
    }
}
