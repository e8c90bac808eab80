//! Row mappers and single-row writers for every table.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{encode_list, list_column, timestamp_column, to_millis};
use crate::marketplace::domain::{
    Account, AccountId, Certification, CompanyId, CompanyProfile, Equipment, EquipmentOwner, Job,
    JobApplication, PortfolioItem, ProfessionalId, ProfessionalProfile, Skill, SkillType,
};
use crate::marketplace::error::MarketplaceError;

pub(crate) const JOB_SELECT: &str = "select j.*, \
     (select group_concat(js.skill, ',') from job_skills js where js.job_id = j.id) as skills_csv, \
     (select count(*) from job_applications a where a.job_id = j.id) as applicant_count \
     from jobs j";

pub(crate) fn account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        role: row.get("role")?,
        verified: row.get("verified")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

pub(crate) fn professional(row: &Row<'_>) -> rusqlite::Result<ProfessionalProfile> {
    Ok(ProfessionalProfile {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        phone: row.get("phone")?,
        bio: row.get("bio")?,
        experience_years: row.get("experience_years")?,
        hourly_rate: row.get("hourly_rate")?,
        rating: row.get("rating")?,
        total_jobs: row.get("total_jobs")?,
        verified: row.get("verified")?,
        insured: row.get("insured")?,
        availability: row.get("availability")?,
        location_city: row.get("location_city")?,
        location_state: row.get("location_state")?,
        location_zip_code: row.get("location_zip_code")?,
    })
}

pub(crate) fn skill(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: row.get("id")?,
        professional_id: row.get("professional_id")?,
        skill_type: row.get("skill_type")?,
        name: row.get("name")?,
        level: row.get("level")?,
        years_experience: row.get("years_experience")?,
        verified: row.get("verified")?,
    })
}

pub(crate) fn certification(row: &Row<'_>) -> rusqlite::Result<Certification> {
    Ok(Certification {
        id: row.get("id")?,
        professional_id: row.get("professional_id")?,
        name: row.get("name")?,
        issuer: row.get("issuer")?,
        number: row.get("number")?,
        issue_date: row.get("issue_date")?,
        expiration_date: row.get("expiration_date")?,
        verified: row.get("verified")?,
    })
}

pub(crate) fn portfolio_item(row: &Row<'_>) -> rusqlite::Result<PortfolioItem> {
    Ok(PortfolioItem {
        id: row.get("id")?,
        professional_id: row.get("professional_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        job_type: row.get("job_type")?,
        location: row.get("location")?,
        completed_at: row.get("completed_at")?,
        client: row.get("client")?,
        featured: row.get("featured")?,
    })
}

pub(crate) fn company(row: &Row<'_>) -> rusqlite::Result<CompanyProfile> {
    Ok(CompanyProfile {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        size: row.get("size")?,
        employees: row.get("employees")?,
        founded: row.get("founded")?,
        website: row.get("website")?,
        rating: row.get("rating")?,
        total_jobs: row.get("total_jobs")?,
        verified: row.get("verified")?,
        location_city: row.get("location_city")?,
        location_state: row.get("location_state")?,
    })
}

/// Maps a row produced by [`JOB_SELECT`]; returns the job and its applicant count.
pub(crate) fn job(row: &Row<'_>) -> rusqlite::Result<(Job, u32)> {
    let skills_csv: Option<String> = row.get("skills_csv")?;
    let mut skills_required = skills_csv
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.parse::<SkillType>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err)))?;
    skills_required.sort();

    let job = Job {
        id: row.get("id")?,
        company_id: row.get("company_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        job_type: row.get("job_type")?,
        urgency: row.get("urgency")?,
        status: row.get("status")?,
        skills_required,
        pay_type: row.get("pay_type")?,
        pay_amount: row.get("pay_amount")?,
        overtime_rate: row.get("overtime_rate")?,
        hazard_pay: row.get("hazard_pay")?,
        equipment_provided: row.get("equipment_provided")?,
        equipment_required: list_column(row, "equipment_required")?,
        safety_requirements: list_column(row, "safety_requirements")?,
        certification_required: list_column(row, "certification_required")?,
        weather_dependent: row.get("weather_dependent")?,
        address: row.get("address")?,
        city: row.get("city")?,
        state: row.get("state")?,
        zip_code: row.get("zip_code")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        gate_width: row.get("gate_width")?,
        power_lines: row.get("power_lines")?,
        slope: row.get("slope")?,
        obstacles: list_column(row, "obstacles")?,
        parking: row.get("parking")?,
        posted_at: timestamp_column(row, "posted_at")?,
    };
    Ok((job, row.get("applicant_count")?))
}

pub(crate) fn equipment(row: &Row<'_>) -> rusqlite::Result<Equipment> {
    let owner = match (
        row.get::<_, Option<String>>("professional_id")?,
        row.get::<_, Option<String>>("company_id")?,
    ) {
        (Some(professional), None) => EquipmentOwner::Professional(ProfessionalId(professional)),
        (None, Some(company)) => EquipmentOwner::Company(CompanyId(company)),
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                0,
                Type::Text,
                "equipment must have exactly one owner".into(),
            ))
        }
    };

    Ok(Equipment {
        id: row.get("id")?,
        owner,
        name: row.get("name")?,
        category: row.get("category")?,
        brand: row.get("brand")?,
        model: row.get("model")?,
        year: row.get("year")?,
        condition: row.get("condition")?,
        price: row.get("price")?,
        daily_rental_rate: row.get("daily_rental_rate")?,
        for_sale: row.get("for_sale")?,
        for_rent: row.get("for_rent")?,
        available: row.get("available")?,
        location: row.get("location")?,
        description: row.get("description")?,
        images: list_column(row, "images")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

pub(crate) fn application(row: &Row<'_>) -> rusqlite::Result<JobApplication> {
    Ok(JobApplication {
        id: row.get("id")?,
        job_id: row.get("job_id")?,
        professional_id: row.get("professional_id")?,
        status: row.get("status")?,
        proposed_rate: row.get("proposed_rate")?,
        cover_letter: row.get("cover_letter")?,
        applied_at: timestamp_column(row, "applied_at")?,
    })
}

pub(crate) fn account_by_id(conn: &Connection, id: &AccountId) -> rusqlite::Result<Option<Account>> {
    conn.query_row("select * from accounts where id = ?1", [id], account)
        .optional()
}

pub(crate) fn account_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<Account>> {
    conn.query_row("select * from accounts where email = ?1", [email], account)
        .optional()
}

pub(crate) fn insert_account(conn: &Connection, account: &Account) -> rusqlite::Result<()> {
    conn.execute(
        "insert into accounts (id, name, email, role, verified, created_at)
         values (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.id,
            account.name,
            account.email,
            account.role,
            account.verified,
            to_millis(account.created_at)
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_professional(
    conn: &Connection,
    profile: &ProfessionalProfile,
) -> rusqlite::Result<()> {
    conn.execute(
        "insert into professional_profiles (id, account_id, phone, bio, experience_years,
             hourly_rate, rating, total_jobs, verified, insured, availability, location_city,
             location_state, location_zip_code)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            profile.id,
            profile.account_id,
            profile.phone,
            profile.bio,
            profile.experience_years,
            profile.hourly_rate,
            profile.rating,
            profile.total_jobs,
            profile.verified,
            profile.insured,
            profile.availability,
            profile.location_city,
            profile.location_state,
            profile.location_zip_code
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_skill(conn: &Connection, skill: &Skill) -> rusqlite::Result<()> {
    conn.execute(
        "insert into professional_skills (id, professional_id, skill_type, name, level,
             years_experience, verified)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            skill.id,
            skill.professional_id,
            skill.skill_type,
            skill.name,
            skill.level,
            skill.years_experience,
            skill.verified
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_certification(conn: &Connection, cert: &Certification) -> rusqlite::Result<()> {
    conn.execute(
        "insert into certifications (id, professional_id, name, issuer, number, issue_date,
             expiration_date, verified)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            cert.id,
            cert.professional_id,
            cert.name,
            cert.issuer,
            cert.number,
            cert.issue_date,
            cert.expiration_date,
            cert.verified
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_portfolio_item(conn: &Connection, item: &PortfolioItem) -> rusqlite::Result<()> {
    conn.execute(
        "insert into portfolio_items (id, professional_id, title, description, job_type,
             location, completed_at, client, featured)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            item.id,
            item.professional_id,
            item.title,
            item.description,
            item.job_type,
            item.location,
            item.completed_at,
            item.client,
            item.featured
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_company(conn: &Connection, company: &CompanyProfile) -> rusqlite::Result<()> {
    conn.execute(
        "insert into company_profiles (id, account_id, name, description, size, employees,
             founded, website, rating, total_jobs, verified, location_city, location_state)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            company.id,
            company.account_id,
            company.name,
            company.description,
            company.size,
            company.employees,
            company.founded,
            company.website,
            company.rating,
            company.total_jobs,
            company.verified,
            company.location_city,
            company.location_state
        ],
    )?;
    Ok(())
}

/// Writes the job row and its skill set.
pub(crate) fn insert_job(conn: &Connection, job: &Job) -> Result<(), MarketplaceError> {
    conn.execute(
        "insert into jobs (id, company_id, title, description, job_type, urgency, urgency_rank,
             status, pay_type, pay_amount, overtime_rate, hazard_pay, equipment_provided,
             equipment_required, safety_requirements, certification_required, weather_dependent,
             address, city, state, zip_code, start_date, end_date, gate_width, power_lines, slope,
             obstacles, parking, posted_at)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
             ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)",
        params![
            job.id,
            job.company_id,
            job.title,
            job.description,
            job.job_type,
            job.urgency,
            job.urgency.rank(),
            job.status,
            job.pay_type,
            job.pay_amount,
            job.overtime_rate,
            job.hazard_pay,
            job.equipment_provided,
            encode_list(&job.equipment_required)?,
            encode_list(&job.safety_requirements)?,
            encode_list(&job.certification_required)?,
            job.weather_dependent,
            job.address,
            job.city,
            job.state,
            job.zip_code,
            job.start_date,
            job.end_date,
            job.gate_width,
            job.power_lines,
            job.slope,
            encode_list(&job.obstacles)?,
            job.parking,
            to_millis(job.posted_at)
        ],
    )?;

    let mut statement = conn.prepare("insert into job_skills (job_id, skill) values (?1, ?2)")?;
    for skill in &job.skills_required {
        statement.execute(params![job.id, skill])?;
    }
    Ok(())
}

pub(crate) fn insert_equipment(conn: &Connection, equipment: &Equipment) -> Result<(), MarketplaceError> {
    let (professional_id, company_id) = match &equipment.owner {
        EquipmentOwner::Professional(id) => (Some(id), None),
        EquipmentOwner::Company(id) => (None, Some(id)),
    };
    conn.execute(
        "insert into equipment (id, professional_id, company_id, name, category, brand, model,
             year, condition, price, daily_rental_rate, for_sale, for_rent, available, location,
             description, images, created_at)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            equipment.id,
            professional_id,
            company_id,
            equipment.name,
            equipment.category,
            equipment.brand,
            equipment.model,
            equipment.year,
            equipment.condition,
            equipment.price,
            equipment.daily_rental_rate,
            equipment.for_sale,
            equipment.for_rent,
            equipment.available,
            equipment.location,
            equipment.description,
            encode_list(&equipment.images)?,
            to_millis(equipment.created_at)
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_application(
    conn: &Connection,
    application: &JobApplication,
) -> rusqlite::Result<()> {
    conn.execute(
        "insert into job_applications (id, job_id, professional_id, status, proposed_rate,
             cover_letter, applied_at)
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            application.id,
            application.job_id,
            application.professional_id,
            application.status,
            application.proposed_rate,
            application.cover_letter,
            to_millis(application.applied_at)
        ],
    )?;
    Ok(())
}
