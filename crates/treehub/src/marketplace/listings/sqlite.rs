use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::info;

use super::draft::ProfessionalRecord;
use super::{
    CompanyCard, EquipmentFilter, EquipmentListing, EquipmentListings, EquipmentSort, JobFilter,
    JobListing, JobSort, Jobs, ListingKind, ListingRepository, ListingType, OwnerCard,
    ProfessionalCard, ProfessionalDraft, ProfessionalFilter, ProfessionalListing,
    ProfessionalSort, Professionals,
};
use crate::marketplace::clock::Clock;
use crate::marketplace::domain::{
    ApplicationId, ApplicationStatus, CompanyId, EquipmentId, EquipmentOwner, JobApplication,
    JobId, JobStatus, ProfessionalId, ProfessionalProfile, Role,
};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::listings::draft::{EquipmentDraft, JobDraft};
use crate::marketplace::storage::rows::{self, JOB_SELECT};
use crate::marketplace::storage::{conflict_or_storage, Database, WhereClause};
use crate::marketplace::workflow::{JobBoardStore, NewApplication};

/// Listing repository and job-board store backed by one SQLite database.
#[derive(Clone)]
pub struct SqliteMarketplace {
    db: Database,
    clock: Arc<dyn Clock>,
}

/// Whose standing a [`Reputation`] update applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReputationTarget {
    Professional(ProfessionalId),
    Company(CompanyId),
}

/// Earned standing. Never accepted from listing drafts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reputation {
    pub rating: f64,
    pub total_jobs: u32,
    pub verified: bool,
}

impl SqliteMarketplace {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Set a profile's rating, completed-job count, and verification, and
    /// mirror the verification onto the owning account.
    pub fn record_reputation(
        &self,
        target: &ReputationTarget,
        reputation: Reputation,
    ) -> Result<(), MarketplaceError> {
        if !(0.0..=5.0).contains(&reputation.rating) {
            return Err(MarketplaceError::validation("rating must be between 0 and 5"));
        }
        let (table, kind, id) = match target {
            ReputationTarget::Professional(id) => ("professional_profiles", "professional", id.as_str()),
            ReputationTarget::Company(id) => ("company_profiles", "company", id.as_str()),
        };

        self.db.with_tx(|tx| {
            let changed = tx.execute(
                &format!("update {table} set rating = ?2, total_jobs = ?3, verified = ?4 where id = ?1"),
                params![id, reputation.rating, reputation.total_jobs, reputation.verified],
            )?;
            if changed == 0 {
                return Err(MarketplaceError::not_found(kind, id));
            }
            tx.execute(
                &format!(
                    "update accounts set verified = ?2
                     where id = (select account_id from {table} where id = ?1)"
                ),
                params![id, reputation.verified],
            )?;
            Ok(())
        })
    }
}

fn query_all<T, F>(
    conn: &Connection,
    sql: &str,
    values: &[String],
    map: F,
) -> Result<Vec<T>, MarketplaceError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut statement = conn.prepare(sql)?;
    let rows = statement.query_map(params_from_iter(values.iter()), map)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Memoizes owner lookups for the duration of one listing call.
#[derive(Default)]
struct OwnerCache {
    companies: HashMap<CompanyId, CompanyCard>,
    professionals: HashMap<ProfessionalId, ProfessionalCard>,
}

impl OwnerCache {
    fn company(&mut self, conn: &Connection, id: &CompanyId) -> Result<CompanyCard, MarketplaceError> {
        if let Some(card) = self.companies.get(id) {
            return Ok(card.clone());
        }
        let profile = conn
            .query_row("select * from company_profiles where id = ?1", [id], rows::company)
            .optional()?
            .ok_or_else(|| MarketplaceError::not_found("company", id))?;
        let user = rows::account_by_id(conn, &profile.account_id)?
            .ok_or_else(|| MarketplaceError::not_found("account", &profile.account_id))?;
        let card = CompanyCard { profile, user };
        self.companies.insert(id.clone(), card.clone());
        Ok(card)
    }

    fn professional(
        &mut self,
        conn: &Connection,
        id: &ProfessionalId,
    ) -> Result<ProfessionalCard, MarketplaceError> {
        if let Some(card) = self.professionals.get(id) {
            return Ok(card.clone());
        }
        let profile = professional_by_id(conn, id)?
            .ok_or_else(|| MarketplaceError::not_found(Professionals::LABEL, id))?;
        let user = rows::account_by_id(conn, &profile.account_id)?
            .ok_or_else(|| MarketplaceError::not_found("account", &profile.account_id))?;
        let card = ProfessionalCard { profile, user };
        self.professionals.insert(id.clone(), card.clone());
        Ok(card)
    }

    fn owner(&mut self, conn: &Connection, owner: &EquipmentOwner) -> Result<OwnerCard, MarketplaceError> {
        Ok(match owner {
            EquipmentOwner::Professional(id) => OwnerCard::Professional(self.professional(conn, id)?),
            EquipmentOwner::Company(id) => OwnerCard::Company(self.company(conn, id)?),
        })
    }
}

fn professional_by_id(
    conn: &Connection,
    id: &ProfessionalId,
) -> rusqlite::Result<Option<ProfessionalProfile>> {
    conn.query_row(
        "select * from professional_profiles where id = ?1",
        [id],
        rows::professional,
    )
    .optional()
}

fn professional_listing(
    conn: &Connection,
    profile: ProfessionalProfile,
) -> Result<ProfessionalListing, MarketplaceError> {
    let user = rows::account_by_id(conn, &profile.account_id)?
        .ok_or_else(|| MarketplaceError::not_found("account", &profile.account_id))?;
    let owner = [profile.id.to_string()];
    let skills = query_all(
        conn,
        "select * from professional_skills where professional_id = ?1 order by rowid",
        &owner,
        rows::skill,
    )?;
    let certifications = query_all(
        conn,
        "select * from certifications where professional_id = ?1 order by issue_date desc, rowid",
        &owner,
        rows::certification,
    )?;
    let portfolio = query_all(
        conn,
        "select * from portfolio_items where professional_id = ?1
         order by featured desc, completed_at desc, rowid",
        &owner,
        rows::portfolio_item,
    )?;
    Ok(ProfessionalListing {
        profile,
        user,
        skills,
        certifications,
        portfolio,
    })
}

fn insert_professional_children(
    conn: &Connection,
    record: &ProfessionalRecord,
) -> Result<(), MarketplaceError> {
    for skill in &record.skills {
        rows::insert_skill(conn, skill)
            .map_err(|err| conflict_or_storage(err, "skill listed more than once"))?;
    }
    for certification in &record.certifications {
        rows::insert_certification(conn, certification)?;
    }
    for item in &record.portfolio {
        rows::insert_portfolio_item(conn, item)?;
    }
    Ok(())
}

impl ListingRepository<Jobs> for SqliteMarketplace {
    fn create(&self, draft: JobDraft) -> Result<JobListing, MarketplaceError> {
        let job = draft.into_job(JobId::generate(), self.clock.now())?;
        let listing = self.db.with_tx(|tx| {
            let company = OwnerCache::default().company(tx, &job.company_id)?;
            rows::insert_job(tx, &job)?;
            Ok(JobListing {
                job,
                company,
                applicant_count: 0,
            })
        })?;
        info!(job_id = %listing.job.id, company_id = %listing.job.company_id, "job posted");
        Ok(listing)
    }

    fn list(&self, filter: &JobFilter, sort: JobSort) -> Result<Vec<JobListing>, MarketplaceError> {
        let mut clause = WhereClause::new("j.status = 'OPEN'");
        clause.contains_text(filter.location.as_deref(), &["j.city", "j.state"]);
        clause.any_of(filter.skills.iter().map(|skill| skill.as_str()), |slots| {
            format!(
                "exists (select 1 from job_skills js where js.job_id = j.id and js.skill in ({slots}))"
            )
        });
        clause.any_of(filter.urgency.iter().map(|urgency| urgency.as_str()), |slots| {
            format!("j.urgency in ({slots})")
        });
        clause.any_of(filter.job_types.iter().map(|job_type| job_type.as_str()), |slots| {
            format!("j.job_type in ({slots})")
        });
        let order = match sort {
            JobSort::Priority => "j.urgency_rank desc, j.posted_at desc, j.rowid asc",
            JobSort::Newest => "j.posted_at desc, j.rowid asc",
        };
        let sql = format!("{JOB_SELECT}{} order by {order}", clause.sql());

        self.db.with_conn(|conn| {
            let mut owners = OwnerCache::default();
            query_all(conn, &sql, clause.params(), rows::job)?
                .into_iter()
                .map(|(job, applicant_count)| {
                    let company = owners.company(conn, &job.company_id)?;
                    Ok::<_, MarketplaceError>(JobListing {
                        job,
                        company,
                        applicant_count,
                    })
                })
                .collect()
        })
    }

    fn get_by_id(&self, id: &JobId) -> Result<JobListing, MarketplaceError> {
        let sql = format!("{JOB_SELECT} where j.id = ?1");
        self.db.with_conn(|conn| {
            let (job, applicant_count) = conn
                .query_row(&sql, [id], rows::job)
                .optional()?
                .ok_or_else(|| MarketplaceError::not_found(Jobs::LABEL, id))?;
            let company = OwnerCache::default().company(conn, &job.company_id)?;
            Ok(JobListing {
                job,
                company,
                applicant_count,
            })
        })
    }
}

impl ListingRepository<Professionals> for SqliteMarketplace {
    /// Attach a profile to a professional account that has none yet.
    fn create(&self, draft: ProfessionalDraft) -> Result<ProfessionalListing, MarketplaceError> {
        let record = draft.into_record(ProfessionalId::generate())?;
        let listing = self.db.with_tx(|tx| {
            let user = rows::account_by_id(tx, &record.profile.account_id)?
                .ok_or_else(|| MarketplaceError::not_found("account", &record.profile.account_id))?;
            if user.role != Role::Professional {
                return Err(MarketplaceError::validation(
                    "only professional accounts can publish a professional profile",
                ));
            }
            rows::insert_professional(tx, &record.profile).map_err(|err| {
                conflict_or_storage(err, "a professional profile already exists for this account")
            })?;
            insert_professional_children(tx, &record)?;
            Ok(ProfessionalListing {
                profile: record.profile,
                user,
                skills: record.skills,
                certifications: record.certifications,
                portfolio: record.portfolio,
            })
        })?;
        info!(professional_id = %listing.profile.id, "professional profile published");
        Ok(listing)
    }

    fn list(
        &self,
        filter: &ProfessionalFilter,
        sort: ProfessionalSort,
    ) -> Result<Vec<ProfessionalListing>, MarketplaceError> {
        let mut clause = WhereClause::default();
        clause.contains_text(
            filter.location.as_deref(),
            &["p.location_city", "p.location_state"],
        );
        clause.any_of(filter.skills.iter().map(|skill| skill.as_str()), |slots| {
            format!(
                "exists (select 1 from professional_skills s \
                 where s.professional_id = p.id and s.skill_type in ({slots}))"
            )
        });
        clause.any_of(
            filter.availability.iter().map(|availability| availability.as_str()),
            |slots| format!("p.availability in ({slots})"),
        );
        if filter.verified_only {
            clause.push("p.verified = 1");
        }
        let order = match sort {
            ProfessionalSort::Ranked => "p.verified desc, p.rating desc, p.total_jobs desc, p.rowid asc",
            ProfessionalSort::Rating => "p.rating desc, p.total_jobs desc, p.rowid asc",
        };
        let sql = format!(
            "select p.* from professional_profiles p{} order by {order}",
            clause.sql()
        );

        self.db.with_conn(|conn| {
            query_all(conn, &sql, clause.params(), rows::professional)?
                .into_iter()
                .map(|profile| professional_listing(conn, profile))
                .collect()
        })
    }

    fn get_by_id(&self, id: &ProfessionalId) -> Result<ProfessionalListing, MarketplaceError> {
        self.db.with_conn(|conn| {
            let profile = professional_by_id(conn, id)?
                .ok_or_else(|| MarketplaceError::not_found(Professionals::LABEL, id))?;
            professional_listing(conn, profile)
        })
    }
}

impl ListingRepository<EquipmentListings> for SqliteMarketplace {
    fn create(&self, draft: EquipmentDraft) -> Result<EquipmentListing, MarketplaceError> {
        let equipment = draft.into_equipment(EquipmentId::generate(), self.clock.now())?;
        let listing = self.db.with_tx(|tx| {
            let owner_profile = OwnerCache::default().owner(tx, &equipment.owner)?;
            rows::insert_equipment(tx, &equipment)?;
            Ok(EquipmentListing {
                equipment,
                owner_profile,
            })
        })?;
        info!(equipment_id = %listing.equipment.id, "equipment listed");
        Ok(listing)
    }

    fn list(
        &self,
        filter: &EquipmentFilter,
        sort: EquipmentSort,
    ) -> Result<Vec<EquipmentListing>, MarketplaceError> {
        let mut clause = WhereClause::default();
        clause.contains_text(filter.search.as_deref(), &["e.name", "e.brand"]);
        clause.any_of(
            filter.categories.iter().map(|category| category.as_str()),
            |slots| format!("e.category in ({slots})"),
        );
        clause.any_of(
            filter.conditions.iter().map(|condition| condition.as_str()),
            |slots| format!("e.condition in ({slots})"),
        );
        match filter.listing_type {
            Some(ListingType::Sale) => clause.push("e.for_sale = 1"),
            Some(ListingType::Rent) => clause.push("e.for_rent = 1"),
            None => {}
        }
        if filter.available_only {
            clause.push("e.available = 1");
        }
        let order = match sort {
            EquipmentSort::Newest => "e.created_at desc, e.rowid asc",
            EquipmentSort::PriceAscending => "e.price is null, e.price asc, e.rowid asc",
        };
        let sql = format!("select e.* from equipment e{} order by {order}", clause.sql());

        self.db.with_conn(|conn| {
            let mut owners = OwnerCache::default();
            query_all(conn, &sql, clause.params(), rows::equipment)?
                .into_iter()
                .map(|equipment| {
                    let owner_profile = owners.owner(conn, &equipment.owner)?;
                    Ok::<_, MarketplaceError>(EquipmentListing {
                        equipment,
                        owner_profile,
                    })
                })
                .collect()
        })
    }

    fn get_by_id(&self, id: &EquipmentId) -> Result<EquipmentListing, MarketplaceError> {
        self.db.with_conn(|conn| {
            let equipment = conn
                .query_row("select * from equipment where id = ?1", [id], rows::equipment)
                .optional()?
                .ok_or_else(|| MarketplaceError::not_found(EquipmentListings::LABEL, id))?;
            let owner_profile = OwnerCache::default().owner(conn, &equipment.owner)?;
            Ok(EquipmentListing {
                equipment,
                owner_profile,
            })
        })
    }
}

impl JobBoardStore for SqliteMarketplace {
    fn set_job_status(
        &self,
        job_id: &JobId,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<(), MarketplaceError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "update jobs set status = ?3 where id = ?1 and status = ?2",
                params![job_id, from, to],
            )?;
            if changed > 0 {
                return Ok(());
            }
            let current: Option<JobStatus> = conn
                .query_row("select status from jobs where id = ?1", [job_id], |row| {
                    row.get(0)
                })
                .optional()?;
            match current {
                None => Err(MarketplaceError::not_found(Jobs::LABEL, job_id)),
                Some(current) => Err(MarketplaceError::validation(format!(
                    "job is {current}, no longer {from}"
                ))),
            }
        })
    }

    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<JobApplication, MarketplaceError> {
        let record = JobApplication {
            id: ApplicationId::generate(),
            job_id: application.job_id,
            professional_id: application.professional_id,
            status: ApplicationStatus::Pending,
            proposed_rate: application.proposed_rate,
            cover_letter: application.cover_letter,
            applied_at: self.clock.now(),
        };
        self.db.with_conn(|conn| {
            rows::insert_application(conn, &record)
                .map_err(|err| conflict_or_storage(err, "already applied to this job"))
        })?;
        Ok(record)
    }

    fn applications_for_job(&self, job_id: &JobId) -> Result<Vec<JobApplication>, MarketplaceError> {
        self.db.with_conn(|conn| {
            query_all(
                conn,
                "select * from job_applications where job_id = ?1 order by applied_at, rowid",
                &[job_id.to_string()],
                rows::application,
            )
        })
    }

    fn application_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<JobApplication>, MarketplaceError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "select * from job_applications where id = ?1",
                    [id],
                    rows::application,
                )
                .optional()?)
        })
    }

    fn set_application_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<JobApplication, MarketplaceError> {
        self.db.with_tx(|tx| {
            let changed = tx.execute(
                "update job_applications set status = ?2 where id = ?1",
                params![id, status],
            )?;
            if changed == 0 {
                return Err(MarketplaceError::not_found("application", id));
            }
            Ok(tx.query_row(
                "select * from job_applications where id = ?1",
                [id],
                rows::application,
            )?)
        })
    }

    /// Replace the self-described parts of a profile. Rating, job count, and
    /// verification are kept.
    fn update_professional(
        &self,
        id: &ProfessionalId,
        draft: ProfessionalDraft,
    ) -> Result<ProfessionalListing, MarketplaceError> {
        let record = draft.into_record(id.clone())?;
        self.db.with_tx(|tx| {
            let existing = professional_by_id(tx, id)?
                .ok_or_else(|| MarketplaceError::not_found(Professionals::LABEL, id))?;
            let profile = ProfessionalProfile {
                account_id: existing.account_id,
                rating: existing.rating,
                total_jobs: existing.total_jobs,
                verified: existing.verified,
                ..record.profile.clone()
            };
            tx.execute(
                "update professional_profiles set phone = ?2, bio = ?3, experience_years = ?4,
                     hourly_rate = ?5, insured = ?6, availability = ?7, location_city = ?8,
                     location_state = ?9, location_zip_code = ?10
                 where id = ?1",
                params![
                    id,
                    profile.phone,
                    profile.bio,
                    profile.experience_years,
                    profile.hourly_rate,
                    profile.insured,
                    profile.availability,
                    profile.location_city,
                    profile.location_state,
                    profile.location_zip_code
                ],
            )?;
            for table in ["professional_skills", "certifications", "portfolio_items"] {
                tx.execute(
                    &format!("delete from {table} where professional_id = ?1"),
                    [id],
                )?;
            }
            insert_professional_children(tx, &record)?;
            professional_listing(tx, profile)
        })
    }
}
