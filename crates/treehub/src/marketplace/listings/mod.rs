//! Read-optimized listings over jobs, professionals, and equipment.
//!
//! One generic repository contract, [`ListingRepository`], is implemented once
//! per [`ListingKind`]. Each kind fixes its draft, filter, sort, and the
//! denormalized listing it returns.

pub mod draft;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::domain::{
    Account, Availability, Certification, CompanyProfile, Equipment, EquipmentCategory,
    EquipmentCondition, EquipmentId, Job, JobId, JobType, PortfolioItem, ProfessionalId,
    ProfessionalProfile, Skill, SkillType, Urgency,
};
use super::error::MarketplaceError;

pub use draft::{
    ApplicationDraft, CertificationDraft, EquipmentDraft, JobDraft, NumericInput,
    PortfolioDraft, ProfessionalDraft, SkillDraft,
};
pub use sqlite::{Reputation, ReputationTarget, SqliteMarketplace};

/// Binds the types one listing kind works with.
pub trait ListingKind: 'static {
    /// Used in `NotFound` errors and log fields.
    const LABEL: &'static str;
    type Id: fmt::Display + Send + Sync;
    type Draft;
    type Filter: Default;
    type Sort: Default + Copy;
    type Listing: Serialize;
}

/// Job postings, open ones only when listed.
pub enum Jobs {}

pub enum Professionals {}

/// Equipment offered for sale, rent, or both.
pub enum EquipmentListings {}

impl ListingKind for Jobs {
    const LABEL: &'static str = "job";
    type Id = JobId;
    type Draft = JobDraft;
    type Filter = JobFilter;
    type Sort = JobSort;
    type Listing = JobListing;
}

impl ListingKind for Professionals {
    const LABEL: &'static str = "professional";
    type Id = ProfessionalId;
    type Draft = ProfessionalDraft;
    type Filter = ProfessionalFilter;
    type Sort = ProfessionalSort;
    type Listing = ProfessionalListing;
}

impl ListingKind for EquipmentListings {
    const LABEL: &'static str = "equipment";
    type Id = EquipmentId;
    type Draft = EquipmentDraft;
    type Filter = EquipmentFilter;
    type Sort = EquipmentSort;
    type Listing = EquipmentListing;
}

/// Storage abstraction shared by every listing kind.
pub trait ListingRepository<K: ListingKind>: Send + Sync {
    /// Validate and persist a draft, returning the denormalized listing.
    fn create(&self, draft: K::Draft) -> Result<K::Listing, MarketplaceError>;
    /// Matching listings in `sort` order; an empty result is not an error.
    fn list(&self, filter: &K::Filter, sort: K::Sort) -> Result<Vec<K::Listing>, MarketplaceError>;
    fn get_by_id(&self, id: &K::Id) -> Result<K::Listing, MarketplaceError>;
}

/// A repository serving all three listing kinds.
pub trait MarketplaceListings:
    ListingRepository<Jobs> + ListingRepository<Professionals> + ListingRepository<EquipmentListings>
{
}

impl<T> MarketplaceListings for T where
    T: ListingRepository<Jobs>
        + ListingRepository<Professionals>
        + ListingRepository<EquipmentListings>
{
}

/// Dimensions are AND-ed; values inside one dimension are OR-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Case-insensitive substring of the job's city or state.
    pub location: Option<String>,
    /// Matches jobs requiring at least one of these.
    pub skills: Vec<SkillType>,
    pub urgency: Vec<Urgency>,
    pub job_types: Vec<JobType>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobSort {
    /// Urgency rank descending, then newest first.
    #[default]
    Priority,
    Newest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfessionalFilter {
    pub location: Option<String>,
    pub skills: Vec<SkillType>,
    pub availability: Vec<Availability>,
    pub verified_only: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfessionalSort {
    /// Verified first, then rating, then completed jobs.
    #[default]
    Ranked,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingType {
    Sale,
    Rent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquipmentFilter {
    /// Case-insensitive substring of the name or brand.
    pub search: Option<String>,
    pub categories: Vec<EquipmentCategory>,
    pub conditions: Vec<EquipmentCondition>,
    pub listing_type: Option<ListingType>,
    pub available_only: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EquipmentSort {
    #[default]
    Newest,
    /// Cheapest first; unpriced (rent-only) items last.
    PriceAscending,
}

fn unknown_sort(kind: &str, raw: &str) -> MarketplaceError {
    MarketplaceError::validation(format!("unknown {kind} sort '{}'", raw.trim()))
}

impl FromStr for JobSort {
    type Err = MarketplaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "priority" | "urgency" => Ok(Self::Priority),
            "newest" | "recent" => Ok(Self::Newest),
            _ => Err(unknown_sort("job", raw)),
        }
    }
}

impl FromStr for ProfessionalSort {
    type Err = MarketplaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ranked" | "recommended" => Ok(Self::Ranked),
            "rating" => Ok(Self::Rating),
            _ => Err(unknown_sort("professional", raw)),
        }
    }
}

impl FromStr for EquipmentSort {
    type Err = MarketplaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "newest" | "recent" => Ok(Self::Newest),
            "price" | "price_asc" | "price-asc" => Ok(Self::PriceAscending),
            _ => Err(unknown_sort("equipment", raw)),
        }
    }
}

impl FromStr for ListingType {
    type Err = MarketplaceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sale" | "buy" => Ok(Self::Sale),
            "rent" => Ok(Self::Rent),
            _ => Err(MarketplaceError::validation(format!(
                "unknown listing type '{}'",
                raw.trim()
            ))),
        }
    }
}

/// A company together with the account that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCard {
    #[serde(flatten)]
    pub profile: CompanyProfile,
    pub user: Account,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalCard {
    #[serde(flatten)]
    pub profile: ProfessionalProfile,
    pub user: Account,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    pub company: CompanyCard,
    pub applicant_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalListing {
    #[serde(flatten)]
    pub profile: ProfessionalProfile,
    pub user: Account,
    pub skills: Vec<Skill>,
    pub certifications: Vec<Certification>,
    pub portfolio: Vec<PortfolioItem>,
}

/// Whichever profile owns a piece of equipment, with its account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "profile", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerCard {
    Professional(ProfessionalCard),
    Company(CompanyCard),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentListing {
    #[serde(flatten)]
    pub equipment: Equipment,
    pub owner_profile: OwnerCard,
}
