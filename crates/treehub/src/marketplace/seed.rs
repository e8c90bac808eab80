//! Demo data: one professional account that can sign in, three companies,
//! five open jobs, and three equipment listings.

use chrono::{Duration, NaiveDate};
use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::domain::{
    AccountId, Availability, CompanyId, CompanySize, EquipmentCategory, EquipmentCondition,
    EquipmentOwner, JobType, Parking, PayType, ProfessionalId, Role, SkillLevel, SkillType, Slope,
    Urgency,
};
use super::error::MarketplaceError;
use super::identity::ProfileSummary;
use super::listings::{
    CertificationDraft, EquipmentDraft, EquipmentListings, JobDraft, Jobs, ListingRepository,
    NumericInput, ProfessionalDraft, Reputation, ReputationTarget, SkillDraft, SqliteMarketplace,
};
use super::provisioning::SignUpRequest;
use super::storage::rows;
use super::workflow::JobBoardStore;
use super::Marketplace;

pub const DEMO_EMAIL: &str = "john@doe.com";
pub const DEMO_PASSWORD: &str = "johndoe123";

/// Row in `seed_runs`, written only after every demo record exists.
const SEED_NAME: &str = "demo";

const STOCK_IMAGE: &str = "https://images.unsplash.com/photo-1581578917473-c5f59b1b46dd?w=800";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub demo_account: AccountId,
    pub companies: usize,
    pub jobs: usize,
    pub equipment: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded(SeedSummary),
    /// A previous run completed; nothing was written.
    AlreadySeeded,
}

struct SeedCompany {
    name: &'static str,
    email: &'static str,
    description: &'static str,
    size: CompanySize,
    employees: u32,
    founded: i32,
    city: &'static str,
    state: &'static str,
    rating: f64,
    total_jobs: u32,
}

const COMPANIES: [SeedCompany; 3] = [
    SeedCompany {
        name: "Apex Tree Services",
        email: "info@apextreeservices.com",
        description: "Professional tree care specialists serving Austin and surrounding areas for over 20 years.",
        size: CompanySize::Medium,
        employees: 25,
        founded: 2003,
        city: "Austin",
        state: "TX",
        rating: 4.7,
        total_jobs: 312,
    },
    SeedCompany {
        name: "Metro Tree Care",
        email: "contact@metrotreecare.com",
        description: "Full-service tree care company specializing in residential and commercial properties.",
        size: CompanySize::Large,
        employees: 45,
        founded: 1998,
        city: "Denver",
        state: "CO",
        rating: 4.5,
        total_jobs: 428,
    },
    SeedCompany {
        name: "GreenLeaf Solutions",
        email: "hello@greenleafsolutions.com",
        description: "Sustainable tree care and plant health care specialists.",
        size: CompanySize::Small,
        employees: 12,
        founded: 2010,
        city: "Portland",
        state: "OR",
        rating: 4.9,
        total_jobs: 156,
    },
];

/// Load the demo data set. Job start dates are offsets from `today`.
pub fn seed_demo_data(
    marketplace: &Marketplace<SqliteMarketplace>,
    today: NaiveDate,
) -> Result<SeedOutcome, MarketplaceError> {
    let repository = &*marketplace.repository;
    let db = repository.database();

    let (completed, demo_exists) = db.with_conn(|conn| {
        let completed = conn
            .query_row(
                "select 1 from seed_runs where name = ?1",
                [SEED_NAME],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok((completed, rows::account_by_email(conn, DEMO_EMAIL)?.is_some()))
    })?;
    if completed {
        info!("demo data already present");
        return Ok(SeedOutcome::AlreadySeeded);
    }
    if demo_exists {
        return Err(MarketplaceError::Conflict(format!(
            "{DEMO_EMAIL} exists but the demo data is incomplete; seed an empty database"
        )));
    }

    let demo = marketplace.provisioner.sign_up(SignUpRequest {
        name: "John Doe".to_string(),
        email: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
        role: Role::Professional.as_str().to_string(),
    })?;
    let professional_id = match marketplace
        .identity
        .authenticate(DEMO_EMAIL, DEMO_PASSWORD)?
        .profile
    {
        ProfileSummary::Professional { id } => id,
        _ => return Err(MarketplaceError::not_found("professional", &demo.id)),
    };
    repository.update_professional(&professional_id, demo_profile(demo.id.clone())?)?;
    repository.record_reputation(
        &ReputationTarget::Professional(professional_id.clone()),
        Reputation {
            rating: 4.8,
            total_jobs: 247,
            verified: true,
        },
    )?;
    db.with_tx(|tx| {
        tx.execute(
            "update professional_skills set verified = 1 where professional_id = ?1",
            [&professional_id],
        )?;
        tx.execute(
            "update certifications set verified = 1 where professional_id = ?1",
            [&professional_id],
        )?;
        Ok(())
    })?;

    let mut company_ids = Vec::with_capacity(COMPANIES.len());
    for company in &COMPANIES {
        company_ids.push(seed_company(marketplace, company)?);
    }

    let jobs = demo_jobs(&company_ids, today)?;
    let job_count = jobs.len();
    for draft in jobs {
        ListingRepository::<Jobs>::create(repository, draft)?;
    }

    let equipment = demo_equipment(&professional_id, &company_ids)?;
    let equipment_count = equipment.len();
    for draft in equipment {
        ListingRepository::<EquipmentListings>::create(repository, draft)?;
    }

    db.with_conn(|conn| {
        conn.execute(
            "insert into seed_runs (name, seeded_on) values (?1, ?2)",
            params![SEED_NAME, today],
        )?;
        Ok(())
    })?;

    info!(
        companies = company_ids.len(),
        jobs = job_count,
        equipment = equipment_count,
        "demo data seeded"
    );
    Ok(SeedOutcome::Seeded(SeedSummary {
        demo_account: demo.id,
        companies: company_ids.len(),
        jobs: job_count,
        equipment: equipment_count,
    }))
}

/// Company accounts get an unguessable password; only the demo professional
/// is meant to sign in.
fn seed_company(
    marketplace: &Marketplace<SqliteMarketplace>,
    company: &SeedCompany,
) -> Result<CompanyId, MarketplaceError> {
    let account = marketplace.provisioner.sign_up(SignUpRequest {
        name: company.name.to_string(),
        email: company.email.to_string(),
        password: uuid::Uuid::new_v4().to_string(),
        role: Role::Company.as_str().to_string(),
    })?;

    let repository = &*marketplace.repository;
    let company_id = repository.database().with_tx(|tx| {
        let id: CompanyId = tx
            .query_row(
                "select id from company_profiles where account_id = ?1",
                [&account.id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| MarketplaceError::not_found("company", &account.id))?;
        tx.execute(
            "update company_profiles set description = ?2, size = ?3, employees = ?4,
                 founded = ?5, location_city = ?6, location_state = ?7
             where id = ?1",
            params![
                id,
                company.description,
                company.size,
                company.employees,
                company.founded,
                company.city,
                company.state
            ],
        )?;
        Ok(id)
    })?;

    repository.record_reputation(
        &ReputationTarget::Company(company_id.clone()),
        Reputation {
            rating: company.rating,
            total_jobs: company.total_jobs,
            verified: true,
        },
    )?;
    Ok(company_id)
}

fn date(raw: &str) -> Result<NaiveDate, MarketplaceError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| MarketplaceError::validation(format!("bad seed date '{raw}': {err}")))
}

fn demo_profile(account_id: AccountId) -> Result<ProfessionalDraft, MarketplaceError> {
    let skill = |skill_type, name: &str, level, years_experience| SkillDraft {
        skill_type,
        name: Some(name.to_string()),
        level,
        years_experience,
    };

    Ok(ProfessionalDraft {
        account_id: Some(account_id),
        phone: Some("+1 (555) 123-4567".to_string()),
        bio: Some(
            "Certified arborist with 15+ years of experience in tree climbing, removal, and \
             storm response. ISA certified with extensive background in emergency tree work."
                .to_string(),
        ),
        experience_years: Some(15),
        hourly_rate: Some(NumericInput::Number(45.0)),
        insured: true,
        availability: Some(Availability::Available),
        location_city: Some("Austin".to_string()),
        location_state: Some("TX".to_string()),
        location_zip_code: Some("78701".to_string()),
        skills: vec![
            skill(SkillType::Climber, "Advanced Tree Climbing", SkillLevel::Expert, 15),
            skill(SkillType::StormResponse, "Emergency Storm Response", SkillLevel::Expert, 12),
            skill(SkillType::TreeRemoval, "Complex Tree Removal", SkillLevel::Expert, 15),
            skill(SkillType::Arborist, "ISA Certified Arborist", SkillLevel::Master, 10),
        ],
        certifications: vec![
            CertificationDraft {
                name: "ISA Certified Arborist".to_string(),
                issuer: "International Society of Arboriculture".to_string(),
                number: "TX-4521A".to_string(),
                issue_date: date("2015-03-15")?,
                expiration_date: date("2025-03-15")?,
            },
            CertificationDraft {
                name: "TCIA Tree Care Safety Professional".to_string(),
                issuer: "Tree Care Industry Association".to_string(),
                number: "TCSP-892".to_string(),
                issue_date: date("2018-06-20")?,
                expiration_date: date("2026-06-20")?,
            },
        ],
        portfolio: Vec::new(),
    })
}

struct SeedJob {
    title: &'static str,
    description: &'static str,
    company: usize,
    job_type: JobType,
    urgency: Urgency,
    skills: &'static [SkillType],
    pay_amount: f64,
    overtime_rate: Option<f64>,
    hazard_pay: Option<f64>,
    equipment_provided: bool,
    address: &'static str,
    city: &'static str,
    state: &'static str,
    zip_code: &'static str,
    starts_in_days: i64,
    weather_dependent: bool,
    gate_width: f64,
    power_lines: bool,
    slope: Slope,
    parking: Parking,
}

const JOBS: [SeedJob; 5] = [
    SeedJob {
        title: "Tree Climber - Storm Cleanup",
        description: "Immediate need for experienced tree climber to assist with storm cleanup operations. Multiple large oak trees requiring careful dismantling due to storm damage. Must have own climbing gear and be comfortable with complex rigging operations.",
        company: 0,
        job_type: JobType::Contract,
        urgency: Urgency::Urgent,
        skills: &[SkillType::Climber, SkillType::StormResponse, SkillType::TreeRemoval],
        pay_amount: 42.0,
        overtime_rate: Some(63.0),
        hazard_pay: Some(10.0),
        equipment_provided: false,
        address: "1234 Oak Street",
        city: "Austin",
        state: "TX",
        zip_code: "78701",
        starts_in_days: 2,
        weather_dependent: true,
        gate_width: 8.0,
        power_lines: true,
        slope: Slope::Moderate,
        parking: Parking::Street,
    },
    SeedJob {
        title: "Crane Operator - Large Removal",
        description: "Seeking experienced crane operator for large tree removal project. 80ft+ oak tree in tight residential setting. NCCCO certification preferred. Project duration 2-3 days.",
        company: 1,
        job_type: JobType::Contract,
        urgency: Urgency::Normal,
        skills: &[SkillType::CraneOperator, SkillType::TreeRemoval],
        pay_amount: 58.0,
        overtime_rate: Some(87.0),
        hazard_pay: None,
        equipment_provided: true,
        address: "5678 Pine Avenue",
        city: "Denver",
        state: "CO",
        zip_code: "80201",
        starts_in_days: 7,
        weather_dependent: true,
        gate_width: 12.0,
        power_lines: false,
        slope: Slope::Flat,
        parking: Parking::Driveway,
    },
    SeedJob {
        title: "PHC Technician - Treatment Program",
        description: "Plant Health Care technician needed for comprehensive tree treatment program. Responsibilities include soil analysis, pest identification, and treatment application. Must have pesticide applicator license.",
        company: 2,
        job_type: JobType::PartTime,
        urgency: Urgency::Normal,
        skills: &[SkillType::PhcTech, SkillType::Diagnosis],
        pay_amount: 32.0,
        overtime_rate: None,
        hazard_pay: None,
        equipment_provided: true,
        address: "9012 Elm Street",
        city: "Portland",
        state: "OR",
        zip_code: "97201",
        starts_in_days: 5,
        weather_dependent: false,
        gate_width: 6.0,
        power_lines: false,
        slope: Slope::Flat,
        parking: Parking::Street,
    },
    SeedJob {
        title: "Ground Crew - Residential Services",
        description: "Multiple positions available for ground crew members. Duties include debris cleanup, equipment operation (chipper, stump grinder), and general labor. Entry level positions available with training provided.",
        company: 0,
        job_type: JobType::FullTime,
        urgency: Urgency::Normal,
        skills: &[SkillType::Groundwork],
        pay_amount: 18.0,
        overtime_rate: Some(27.0),
        hazard_pay: None,
        equipment_provided: true,
        address: "3456 Maple Drive",
        city: "Austin",
        state: "TX",
        zip_code: "78702",
        starts_in_days: 14,
        weather_dependent: true,
        gate_width: 8.0,
        power_lines: false,
        slope: Slope::Flat,
        parking: Parking::Driveway,
    },
    SeedJob {
        title: "Emergency Storm Response Team",
        description: "URGENT: Major storm system approaching. Need certified climbers and ground crew for 24/7 storm response operations. Hazard pay and overtime available. Must be available for immediate deployment.",
        company: 1,
        job_type: JobType::StormEmergency,
        urgency: Urgency::Emergency,
        skills: &[SkillType::Climber, SkillType::StormResponse, SkillType::EmergencyResponse],
        pay_amount: 55.0,
        overtime_rate: Some(82.0),
        hazard_pay: Some(20.0),
        equipment_provided: true,
        address: "Various Locations",
        city: "Denver",
        state: "CO",
        zip_code: "80202",
        starts_in_days: 1,
        weather_dependent: false,
        gate_width: 0.0,
        power_lines: true,
        slope: Slope::Steep,
        parking: Parking::Limited,
    },
];

fn demo_jobs(company_ids: &[CompanyId], today: NaiveDate) -> Result<Vec<JobDraft>, MarketplaceError> {
    let strings = |values: &[&str]| -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    };

    JOBS.iter()
        .map(|job| {
            let company_id = company_ids
                .get(job.company)
                .cloned()
                .ok_or_else(|| MarketplaceError::not_found("company", job.company))?;
            let certification_required = if job.skills.contains(&SkillType::CraneOperator) {
                vec!["NCCCO Certification".to_string()]
            } else {
                Vec::new()
            };
            Ok(JobDraft {
                company_id: Some(company_id),
                title: job.title.to_string(),
                description: job.description.to_string(),
                job_type: job.job_type,
                urgency: Some(job.urgency),
                skills_required: job.skills.to_vec(),
                pay_type: PayType::Hourly,
                pay_amount: Some(NumericInput::Number(job.pay_amount)),
                overtime_rate: job.overtime_rate.map(NumericInput::Number),
                hazard_pay: job.hazard_pay.map(NumericInput::Number),
                equipment_provided: job.equipment_provided,
                equipment_required: strings(&["Safety gear", "Work boots"]),
                safety_requirements: strings(&["Hard hat", "Eye protection", "Cut-resistant chaps"]),
                certification_required,
                weather_dependent: job.weather_dependent,
                address: job.address.to_string(),
                city: job.city.to_string(),
                state: job.state.to_string(),
                zip_code: job.zip_code.to_string(),
                start_date: today + Duration::days(job.starts_in_days),
                end_date: None,
                gate_width: Some(NumericInput::Number(job.gate_width)),
                power_lines: job.power_lines,
                slope: Some(job.slope),
                obstacles: strings(&["Fence", "Garden beds"]),
                parking: Some(job.parking),
            })
        })
        .collect()
}

fn demo_equipment(
    professional_id: &ProfessionalId,
    company_ids: &[CompanyId],
) -> Result<Vec<EquipmentDraft>, MarketplaceError> {
    let company = |index: usize| {
        company_ids
            .get(index)
            .cloned()
            .map(EquipmentOwner::Company)
            .ok_or_else(|| MarketplaceError::not_found("company", index))
    };

    Ok(vec![
        EquipmentDraft {
            owner: Some(EquipmentOwner::Professional(professional_id.clone())),
            name: "Stihl MS 661 Chainsaw".to_string(),
            category: EquipmentCategory::Chainsaws,
            brand: "Stihl".to_string(),
            model: "MS 661".to_string(),
            year: 2022,
            condition: EquipmentCondition::Excellent,
            price: Some(NumericInput::Number(1200.0)),
            daily_rental_rate: Some(NumericInput::Number(85.0)),
            for_sale: true,
            for_rent: true,
            available: None,
            location: "Austin, TX".to_string(),
            description: Some(
                "Professional grade chainsaw, low hours, well maintained. Perfect for large tree work."
                    .to_string(),
            ),
            images: vec![STOCK_IMAGE.to_string()],
        },
        EquipmentDraft {
            owner: Some(company(1)?),
            name: "Bandit BC-600 Chipper".to_string(),
            category: EquipmentCategory::Chippers,
            brand: "Bandit".to_string(),
            model: "BC-600".to_string(),
            year: 2020,
            condition: EquipmentCondition::Good,
            price: None,
            daily_rental_rate: Some(NumericInput::Number(250.0)),
            for_sale: false,
            for_rent: true,
            available: None,
            location: "Denver, CO".to_string(),
            description: Some("6\" capacity chipper, trailer mounted, reliable operation.".to_string()),
            images: vec![STOCK_IMAGE.to_string()],
        },
        EquipmentDraft {
            owner: Some(company(2)?),
            name: "Altec Bucket Truck".to_string(),
            category: EquipmentCategory::BucketTrucks,
            brand: "Altec".to_string(),
            model: "AT37G".to_string(),
            year: 2018,
            condition: EquipmentCondition::Good,
            price: Some(NumericInput::Number(75000.0)),
            daily_rental_rate: None,
            for_sale: true,
            for_rent: false,
            available: None,
            location: "Portland, OR".to_string(),
            description: Some(
                "37ft working height, well maintained fleet vehicle, ready for work.".to_string(),
            ),
            images: vec![STOCK_IMAGE.to_string()],
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::marketplace::listings::{JobFilter, JobSort, ProfessionalFilter, ProfessionalSort};
    use crate::marketplace::{Clock, Database, ManualClock, Professionals};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn marketplace() -> Marketplace<SqliteMarketplace> {
        let start = Utc
            .with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp");
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_at(start));
        let auth = AuthConfig {
            session_secret: "seed-secret".to_string(),
            session_ttl_days: 30,
        };
        Marketplace::sqlite(Database::open_in_memory().expect("database opens"), clock, &auth)
    }

    #[test]
    fn seeds_once_and_the_demo_account_signs_in() {
        let marketplace = marketplace();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");

        let outcome = seed_demo_data(&marketplace, today).expect("seed runs");
        let SeedOutcome::Seeded(summary) = outcome else {
            panic!("expected a fresh seed");
        };
        assert_eq!((summary.companies, summary.jobs, summary.equipment), (3, 5, 3));
        assert_eq!(
            seed_demo_data(&marketplace, today).expect("second run"),
            SeedOutcome::AlreadySeeded
        );

        let session = marketplace
            .identity
            .login(DEMO_EMAIL, DEMO_PASSWORD)
            .expect("demo login");
        assert!(session.claims.verified);

        let jobs = ListingRepository::<Jobs>::list(
            &*marketplace.repository,
            &JobFilter::default(),
            JobSort::Priority,
        )
        .expect("jobs listed");
        assert_eq!(jobs.len(), 5);
        assert_eq!(jobs[0].job.title, "Emergency Storm Response Team");
        assert_eq!(jobs[0].company.profile.name, "Metro Tree Care");
        assert_eq!(jobs[0].job.start_date, today + Duration::days(1));

        let professionals = ListingRepository::<Professionals>::list(
            &*marketplace.repository,
            &ProfessionalFilter::default(),
            ProfessionalSort::Ranked,
        )
        .expect("professionals listed");
        assert_eq!(professionals.len(), 1);
        assert_eq!(professionals[0].skills.len(), 4);
        assert!(professionals[0].skills.iter().all(|skill| skill.verified));
        assert_eq!(professionals[0].profile.rating, 4.8);
    }

    #[test]
    fn an_interrupted_seed_is_not_reported_as_done() {
        let marketplace = marketplace();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
        marketplace
            .provisioner
            .sign_up(SignUpRequest {
                name: "John Doe".to_string(),
                email: DEMO_EMAIL.to_string(),
                password: DEMO_PASSWORD.to_string(),
                role: Role::Professional.as_str().to_string(),
            })
            .expect("demo account created");

        assert!(matches!(
            seed_demo_data(&marketplace, today),
            Err(MarketplaceError::Conflict(_))
        ));
        let companies: i64 = marketplace
            .repository
            .database()
            .with_conn(|conn| {
                Ok(conn.query_row("select count(*) from company_profiles", [], |row| row.get(0))?)
            })
            .expect("count");
        assert_eq!(companies, 0);
    }
}
