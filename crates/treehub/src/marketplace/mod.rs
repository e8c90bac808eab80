//! TreeHub marketplace: accounts and sessions, listings for jobs,
//! professionals, and equipment, and the job-board workflow around them.

pub mod clock;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod identity;
pub mod listings;
pub mod provisioning;
pub mod query;
pub mod router;
pub mod seed;
pub mod storage;
pub mod workflow;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::AuthConfig;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::CredentialStore;
pub use domain::*;
pub use error::MarketplaceError;
pub use identity::{
    IdentityService, Principal, ProfileSummary, Session, SessionClaims, SessionError,
    SessionIssuer,
};
pub use listings::{
    ApplicationDraft, CompanyCard, EquipmentDraft, EquipmentFilter, EquipmentListing,
    EquipmentListings, EquipmentSort, JobDraft, JobFilter, JobListing, JobSort, Jobs, ListingKind,
    ListingRepository, ListingType, MarketplaceListings, NumericInput, OwnerCard,
    ProfessionalCard, ProfessionalDraft, ProfessionalFilter, ProfessionalListing,
    ProfessionalSort, Professionals, Reputation, ReputationTarget, SqliteMarketplace,
};
pub use provisioning::{AccountProvisioner, SignUpRequest};
pub use query::{EquipmentQuery, JobQuery, MarketplaceQuery, ProfessionalQuery};
pub use router::marketplace_router;
pub use seed::{seed_demo_data, SeedOutcome, SeedSummary, DEMO_EMAIL, DEMO_PASSWORD};
pub use storage::{Database, StorageError};
pub use workflow::{JobBoard, JobBoardStore, NewApplication};

/// Every marketplace service wired to one repository.
pub struct Marketplace<R> {
    pub provisioner: AccountProvisioner,
    pub identity: IdentityService,
    pub query: MarketplaceQuery<R>,
    pub board: JobBoard<R>,
    pub repository: Arc<R>,
}

impl Marketplace<SqliteMarketplace> {
    pub fn sqlite(db: Database, clock: Arc<dyn Clock>, auth: &AuthConfig) -> Self {
        let repository = Arc::new(SqliteMarketplace::new(db.clone(), clock.clone()));
        let credentials = CredentialStore::new(db.clone(), clock.clone());
        let sessions = SessionIssuer::new(
            auth.session_secret.as_bytes(),
            auth.session_ttl(),
            clock.clone(),
        );
        let identity = IdentityService::new(db.clone(), credentials, sessions);

        Self {
            provisioner: AccountProvisioner::new(db, clock),
            query: MarketplaceQuery::new(repository.clone()),
            board: JobBoard::new(identity.clone(), repository.clone()),
            identity,
            repository,
        }
    }
}
