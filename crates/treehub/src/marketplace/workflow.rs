//! Authorization-gated writes: posting jobs and equipment, moving jobs through
//! their lifecycle, and the application flow between professionals and
//! companies.

use std::sync::Arc;

use tracing::info;

use super::domain::{
    ApplicationId, ApplicationStatus, EquipmentOwner, JobApplication, JobId, JobStatus,
    ProfessionalId, Role,
};
use super::error::MarketplaceError;
use super::identity::{IdentityService, Principal};
use super::listings::{
    ApplicationDraft, EquipmentDraft, EquipmentListing, EquipmentListings, JobDraft, JobListing,
    Jobs, ListingRepository, MarketplaceListings, ProfessionalDraft, ProfessionalListing,
    Professionals,
};

/// A validated application ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub job_id: JobId,
    pub professional_id: ProfessionalId,
    pub proposed_rate: Option<f64>,
    pub cover_letter: Option<String>,
}

/// Writes the job board needs beyond the listing repository.
pub trait JobBoardStore: Send + Sync {
    /// Compare-and-set: writes `to` only while the job is still `from`.
    /// `Validation` when another change got there first.
    fn set_job_status(
        &self,
        job_id: &JobId,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<(), MarketplaceError>;
    /// `Conflict` when the professional already applied to the job.
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<JobApplication, MarketplaceError>;
    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<JobApplication>, MarketplaceError>;
    fn application_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<JobApplication>, MarketplaceError>;
    fn set_application_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<JobApplication, MarketplaceError>;
    fn update_professional(
        &self,
        id: &ProfessionalId,
        draft: ProfessionalDraft,
    ) -> Result<ProfessionalListing, MarketplaceError>;
}

/// Session-checked front door for every marketplace write except signup.
pub struct JobBoard<R> {
    identity: IdentityService,
    repository: Arc<R>,
}

impl<R> Clone for JobBoard<R> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> JobBoard<R>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    pub fn new(identity: IdentityService, repository: Arc<R>) -> Self {
        Self {
            identity,
            repository,
        }
    }

    /// Post a job for the caller's company. New jobs start OPEN.
    pub fn create_job(&self, token: &str, mut draft: JobDraft) -> Result<JobListing, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        let company_id = match (principal.account.role, principal.company_id()) {
            (Role::Company, Some(company_id)) => company_id.clone(),
            _ => return Err(MarketplaceError::Forbidden("post jobs")),
        };
        match &draft.company_id {
            Some(requested) if *requested != company_id => {
                return Err(MarketplaceError::Forbidden("post jobs for another company"));
            }
            _ => draft.company_id = Some(company_id),
        }
        ListingRepository::<Jobs>::create(&*self.repository, draft)
    }

    /// Move a job along its lifecycle. Only the owning company may do this.
    pub fn transition_job(
        &self,
        token: &str,
        job_id: &JobId,
        status: JobStatus,
    ) -> Result<JobListing, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        let listing = ListingRepository::<Jobs>::get_by_id(&*self.repository, job_id)?;
        if principal.company_id() != Some(&listing.job.company_id) {
            return Err(MarketplaceError::Forbidden("change the status of this job"));
        }
        let current = listing.job.status;
        if !current.can_transition_to(status) {
            return Err(MarketplaceError::validation(format!(
                "job cannot move from {current} to {status}"
            )));
        }
        self.repository.set_job_status(job_id, current, status)?;
        info!(%job_id, from = %current, to = %status, "job status changed");
        ListingRepository::<Jobs>::get_by_id(&*self.repository, job_id)
    }

    /// List equipment owned by the caller's own profile.
    pub fn create_equipment(
        &self,
        token: &str,
        mut draft: EquipmentDraft,
    ) -> Result<EquipmentListing, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        let own = own_equipment_owner(&principal)
            .ok_or(MarketplaceError::Forbidden("list equipment"))?;
        match &draft.owner {
            Some(requested) if *requested != own => {
                return Err(MarketplaceError::Forbidden("list equipment for another owner"));
            }
            _ => draft.owner = Some(own),
        }
        ListingRepository::<EquipmentListings>::create(&*self.repository, draft)
    }

    /// Publish a profile for a professional account that has none.
    pub fn create_professional(
        &self,
        token: &str,
        mut draft: ProfessionalDraft,
    ) -> Result<ProfessionalListing, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        if principal.account.role != Role::Professional {
            return Err(MarketplaceError::Forbidden("publish a professional profile"));
        }
        match &draft.account_id {
            Some(requested) if *requested != principal.account.id => {
                return Err(MarketplaceError::Forbidden("publish another account's profile"));
            }
            _ => draft.account_id = Some(principal.account.id),
        }
        ListingRepository::<Professionals>::create(&*self.repository, draft)
    }

    /// Replace the caller's own profile details.
    pub fn update_professional(
        &self,
        token: &str,
        mut draft: ProfessionalDraft,
    ) -> Result<ProfessionalListing, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        let professional_id = principal
            .professional_id()
            .cloned()
            .ok_or(MarketplaceError::Forbidden("edit a professional profile"))?;
        draft.account_id = Some(principal.account.id);
        self.repository.update_professional(&professional_id, draft)
    }

    /// Apply to an OPEN job as a professional.
    pub fn apply(
        &self,
        token: &str,
        job_id: &JobId,
        draft: ApplicationDraft,
    ) -> Result<JobApplication, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        let professional_id = principal
            .professional_id()
            .cloned()
            .ok_or(MarketplaceError::Forbidden("apply to jobs"))?;
        let (proposed_rate, cover_letter) = draft.validate()?;

        let listing = ListingRepository::<Jobs>::get_by_id(&*self.repository, job_id)?;
        if listing.job.status != JobStatus::Open {
            return Err(MarketplaceError::validation(format!(
                "job is {} and not accepting applications",
                listing.job.status
            )));
        }

        let application = self.repository.insert_application(NewApplication {
            job_id: job_id.clone(),
            professional_id,
            proposed_rate,
            cover_letter,
        })?;
        info!(
            application_id = %application.id,
            %job_id,
            professional_id = %application.professional_id,
            "application submitted"
        );
        Ok(application)
    }

    /// Applications to one job, visible to the owning company only.
    pub fn applications_for_job(
        &self,
        token: &str,
        job_id: &JobId,
    ) -> Result<Vec<JobApplication>, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        let listing = ListingRepository::<Jobs>::get_by_id(&*self.repository, job_id)?;
        if principal.company_id() != Some(&listing.job.company_id) {
            return Err(MarketplaceError::Forbidden("view applications for this job"));
        }
        self.repository.applications_for_job(job_id)
    }

    /// The owning company decides (ACCEPTED, REJECTED, HIRED); the applicant
    /// may only withdraw. A withdrawn application is final.
    pub fn update_application_status(
        &self,
        token: &str,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<JobApplication, MarketplaceError> {
        let principal = self.identity.current_account(token)?;
        let application = self
            .repository
            .application_by_id(application_id)?
            .ok_or_else(|| MarketplaceError::not_found("application", application_id))?;
        let listing = ListingRepository::<Jobs>::get_by_id(&*self.repository, &application.job_id)?;

        let is_owner = principal.company_id() == Some(&listing.job.company_id);
        let is_applicant = principal.professional_id() == Some(&application.professional_id);
        let permitted = match status {
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Hired => {
                is_owner
            }
            ApplicationStatus::Withdrawn => is_applicant,
            ApplicationStatus::Pending => false,
        };
        if !permitted {
            return Err(if is_owner || is_applicant {
                MarketplaceError::validation(format!("cannot set application status to {status}"))
            } else {
                MarketplaceError::Forbidden("update this application")
            });
        }
        if application.status == ApplicationStatus::Withdrawn {
            return Err(MarketplaceError::validation("application was withdrawn"));
        }

        let updated = self
            .repository
            .set_application_status(application_id, status)?;
        info!(%application_id, status = %updated.status, "application status changed");
        Ok(updated)
    }
}

fn own_equipment_owner(principal: &Principal) -> Option<EquipmentOwner> {
    if let Some(id) = principal.professional_id() {
        return Some(EquipmentOwner::Professional(id.clone()));
    }
    principal
        .company_id()
        .map(|id| EquipmentOwner::Company(id.clone()))
}
