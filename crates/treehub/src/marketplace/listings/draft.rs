//! Inbound shapes for creating listings, and their validation.
//!
//! Drafts deserialize leniently (numbers may arrive as strings, optional text
//! may be blank) and are converted into domain records only through the
//! `into_*` methods, which enforce every field rule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::marketplace::domain::{
    AccountId, Availability, Certification, CompanyId, Equipment, EquipmentCategory,
    EquipmentCondition, EquipmentId, EquipmentOwner, Job, JobId, JobStatus, JobType, Parking,
    PayType, PortfolioItem, ProfessionalId, ProfessionalProfile, Skill, SkillLevel, SkillType,
    Slope, Urgency,
};
use crate::marketplace::error::MarketplaceError;

/// A numeric field as clients send it: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Absent, null, and blank mean "not set". Anything else must be a finite,
/// non-negative number.
pub fn optional_amount(
    field: &str,
    input: Option<&NumericInput>,
) -> Result<Option<f64>, MarketplaceError> {
    let value = match input {
        None => return Ok(None),
        Some(NumericInput::Number(value)) => *value,
        Some(NumericInput::Text(raw)) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<f64>()
                .map_err(|_| MarketplaceError::validation(format!("{field} must be a number")))?
        }
    };
    if !value.is_finite() || value < 0.0 {
        return Err(MarketplaceError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(Some(value))
}

pub fn required_amount(field: &str, input: Option<&NumericInput>) -> Result<f64, MarketplaceError> {
    optional_amount(field, input)?
        .ok_or_else(|| MarketplaceError::validation(format!("{field} is required")))
}

fn required_text(field: &str, value: String) -> Result<String, MarketplaceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MarketplaceError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|at| at.date_naive()))
        .map_err(|err| format!("failed to parse '{raw}' as a date ({err})"))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_date(raw).map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    /// Filled from the caller's company when posting through the job board.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub job_type: JobType,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub skills_required: Vec<SkillType>,
    pub pay_type: PayType,
    #[serde(default)]
    pub pay_amount: Option<NumericInput>,
    #[serde(default)]
    pub overtime_rate: Option<NumericInput>,
    #[serde(default)]
    pub hazard_pay: Option<NumericInput>,
    #[serde(default)]
    pub equipment_provided: bool,
    #[serde(default)]
    pub equipment_required: Vec<String>,
    #[serde(default)]
    pub safety_requirements: Vec<String>,
    #[serde(default)]
    pub certification_required: Vec<String>,
    #[serde(default)]
    pub weather_dependent: bool,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub gate_width: Option<NumericInput>,
    #[serde(default)]
    pub power_lines: bool,
    #[serde(default)]
    pub slope: Option<Slope>,
    #[serde(default)]
    pub obstacles: Vec<String>,
    #[serde(default)]
    pub parking: Option<Parking>,
}

impl JobDraft {
    /// Build an OPEN job. Urgency defaults to NORMAL; skills are deduplicated.
    pub fn into_job(self, id: JobId, posted_at: DateTime<Utc>) -> Result<Job, MarketplaceError> {
        let company_id = self
            .company_id
            .filter(|company| !company.as_str().trim().is_empty())
            .ok_or_else(|| MarketplaceError::validation("companyId is required"))?;
        let pay_amount = required_amount("payAmount", self.pay_amount.as_ref())?;
        let overtime_rate = optional_amount("overtimeRate", self.overtime_rate.as_ref())?;
        let hazard_pay = optional_amount("hazardPay", self.hazard_pay.as_ref())?;
        let gate_width = optional_amount("gateWidth", self.gate_width.as_ref())?;

        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                return Err(MarketplaceError::validation(
                    "endDate must not be before startDate",
                ));
            }
        }

        let mut skills_required = self.skills_required;
        skills_required.sort();
        skills_required.dedup();

        Ok(Job {
            id,
            company_id,
            title: required_text("title", self.title)?,
            description: required_text("description", self.description)?,
            job_type: self.job_type,
            urgency: self.urgency.unwrap_or(Urgency::Normal),
            status: JobStatus::Open,
            skills_required,
            pay_type: self.pay_type,
            pay_amount,
            overtime_rate,
            hazard_pay,
            equipment_provided: self.equipment_provided,
            equipment_required: clean_list(self.equipment_required),
            safety_requirements: clean_list(self.safety_requirements),
            certification_required: clean_list(self.certification_required),
            weather_dependent: self.weather_dependent,
            address: required_text("address", self.address)?,
            city: required_text("city", self.city)?,
            state: required_text("state", self.state)?,
            zip_code: required_text("zipCode", self.zip_code)?,
            start_date: self.start_date,
            end_date: self.end_date,
            gate_width,
            power_lines: self.power_lines,
            slope: self.slope,
            obstacles: clean_list(self.obstacles),
            parking: self.parking,
            posted_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentDraft {
    /// Filled from the caller's own profile when omitted.
    #[serde(default)]
    pub owner: Option<EquipmentOwner>,
    #[serde(default)]
    pub name: String,
    pub category: EquipmentCategory,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    pub year: i32,
    pub condition: EquipmentCondition,
    #[serde(default)]
    pub price: Option<NumericInput>,
    #[serde(default)]
    pub daily_rental_rate: Option<NumericInput>,
    #[serde(default)]
    pub for_sale: bool,
    #[serde(default)]
    pub for_rent: bool,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl EquipmentDraft {
    pub fn into_equipment(
        self,
        id: EquipmentId,
        created_at: DateTime<Utc>,
    ) -> Result<Equipment, MarketplaceError> {
        let owner = self
            .owner
            .ok_or_else(|| MarketplaceError::validation("owner is required"))?;
        if !self.for_sale && !self.for_rent {
            return Err(MarketplaceError::validation(
                "equipment must be listed for sale, for rent, or both",
            ));
        }
        if self.year <= 0 {
            return Err(MarketplaceError::validation("year must be positive"));
        }

        Ok(Equipment {
            id,
            owner,
            name: required_text("name", self.name)?,
            category: self.category,
            brand: required_text("brand", self.brand)?,
            model: required_text("model", self.model)?,
            year: self.year,
            condition: self.condition,
            price: optional_amount("price", self.price.as_ref())?,
            daily_rental_rate: optional_amount("dailyRentalRate", self.daily_rental_rate.as_ref())?,
            for_sale: self.for_sale,
            for_rent: self.for_rent,
            available: self.available.unwrap_or(true),
            location: required_text("location", self.location)?,
            description: optional_text(self.description),
            images: clean_list(self.images),
            created_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDraft {
    pub skill_type: SkillType,
    #[serde(default)]
    pub name: Option<String>,
    pub level: SkillLevel,
    #[serde(default)]
    pub years_experience: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub number: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub issue_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub expiration_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub job_type: SkillType,
    #[serde(default)]
    pub location: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub completed_at: NaiveDate,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

/// Profile details a professional publishes about themselves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalDraft {
    /// Filled from the session when submitted over HTTP.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub hourly_rate: Option<NumericInput>,
    #[serde(default)]
    pub insured: bool,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_state: Option<String>,
    #[serde(default)]
    pub location_zip_code: Option<String>,
    #[serde(default)]
    pub skills: Vec<SkillDraft>,
    #[serde(default)]
    pub certifications: Vec<CertificationDraft>,
    #[serde(default)]
    pub portfolio: Vec<PortfolioDraft>,
}

/// A validated professional profile with its child records.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfessionalRecord {
    pub profile: ProfessionalProfile,
    pub skills: Vec<Skill>,
    pub certifications: Vec<Certification>,
    pub portfolio: Vec<PortfolioItem>,
}

impl ProfessionalDraft {
    /// Rating, job count, and verification start at zero; they are earned,
    /// not submitted.
    pub fn into_record(self, id: ProfessionalId) -> Result<ProfessionalRecord, MarketplaceError> {
        let account_id = self
            .account_id
            .ok_or_else(|| MarketplaceError::validation("accountId is required"))?;
        let hourly_rate = optional_amount("hourlyRate", self.hourly_rate.as_ref())?;

        let mut seen = Vec::with_capacity(self.skills.len());
        let mut skills = Vec::with_capacity(self.skills.len());
        for draft in self.skills {
            if seen.contains(&draft.skill_type) {
                return Err(MarketplaceError::validation(format!(
                    "skill {} listed more than once",
                    draft.skill_type
                )));
            }
            seen.push(draft.skill_type);
            skills.push(Skill {
                id: uuid::Uuid::new_v4().to_string(),
                professional_id: id.clone(),
                skill_type: draft.skill_type,
                name: optional_text(draft.name)
                    .unwrap_or_else(|| draft.skill_type.as_str().to_string()),
                level: draft.level,
                years_experience: draft.years_experience,
                verified: false,
            });
        }

        let certifications = self
            .certifications
            .into_iter()
            .map(|draft| {
                if draft.expiration_date < draft.issue_date {
                    return Err(MarketplaceError::validation(
                        "certification expirationDate must not be before issueDate",
                    ));
                }
                Ok(Certification {
                    id: uuid::Uuid::new_v4().to_string(),
                    professional_id: id.clone(),
                    name: required_text("certification name", draft.name)?,
                    issuer: required_text("certification issuer", draft.issuer)?,
                    number: required_text("certification number", draft.number)?,
                    issue_date: draft.issue_date,
                    expiration_date: draft.expiration_date,
                    verified: false,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let portfolio = self
            .portfolio
            .into_iter()
            .map(|draft| {
                Ok(PortfolioItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    professional_id: id.clone(),
                    title: required_text("portfolio title", draft.title)?,
                    description: required_text("portfolio description", draft.description)?,
                    job_type: draft.job_type,
                    location: required_text("portfolio location", draft.location)?,
                    completed_at: draft.completed_at,
                    client: optional_text(draft.client),
                    featured: draft.featured,
                })
            })
            .collect::<Result<Vec<_>, MarketplaceError>>()?;

        let profile = ProfessionalProfile {
            id,
            account_id,
            phone: optional_text(self.phone),
            bio: optional_text(self.bio),
            experience_years: self.experience_years,
            hourly_rate,
            rating: 0.0,
            total_jobs: 0,
            verified: false,
            insured: self.insured,
            availability: self.availability.unwrap_or(Availability::Available),
            location_city: optional_text(self.location_city),
            location_state: optional_text(self.location_state),
            location_zip_code: optional_text(self.location_zip_code),
        };

        Ok(ProfessionalRecord {
            profile,
            skills,
            certifications,
            portfolio,
        })
    }
}

/// A professional's application to a job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    #[serde(default)]
    pub proposed_rate: Option<NumericInput>,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

impl ApplicationDraft {
    pub(crate) fn validate(self) -> Result<(Option<f64>, Option<String>), MarketplaceError> {
        let proposed_rate = optional_amount("proposedRate", self.proposed_rate.as_ref())?;
        Ok((proposed_rate, optional_text(self.cover_letter)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn posted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).single().expect("valid instant")
    }

    fn job_json() -> serde_json::Value {
        json!({
            "companyId": "company-1",
            "title": "Tree Climber - Storm Cleanup",
            "description": "Dismantle storm-damaged oaks.",
            "jobType": "CONTRACT",
            "urgency": "URGENT",
            "skillsRequired": ["STORM_RESPONSE", "CLIMBER", "CLIMBER"],
            "payType": "HOURLY",
            "payAmount": "42",
            "overtimeRate": 63,
            "hazardPay": "",
            "address": "1234 Oak Street",
            "city": "Austin",
            "state": "TX",
            "zipCode": "78701",
            "startDate": "2025-04-03T09:00:00Z",
            "gateWidth": null
        })
    }

    fn job_draft(value: serde_json::Value) -> JobDraft {
        serde_json::from_value(value).expect("draft deserializes")
    }

    #[test]
    fn numeric_strings_are_accepted_and_blanks_stay_unset() {
        let job = job_draft(job_json())
            .into_job(JobId::from("job-1"), posted_at())
            .expect("valid draft");

        assert_eq!(job.pay_amount, 42.0);
        assert_eq!(job.overtime_rate, Some(63.0));
        assert_eq!(job.hazard_pay, None);
        assert_eq!(job.gate_width, None);
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.skills_required, vec![SkillType::Climber, SkillType::StormResponse]);
        assert_eq!(job.start_date, NaiveDate::from_ymd_opt(2025, 4, 3).expect("date"));
    }

    #[test]
    fn negative_or_garbage_numbers_are_rejected() {
        for (field, value) in [
            ("payAmount", json!(-1)),
            ("payAmount", json!("forty")),
            ("gateWidth", json!("-3.5")),
            ("hazardPay", json!("NaN")),
        ] {
            let mut payload = job_json();
            payload[field] = value;
            let result = job_draft(payload).into_job(JobId::from("job-1"), posted_at());
            assert!(
                matches!(result, Err(MarketplaceError::Validation(ref message)) if message.contains(field)),
                "{field} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn missing_required_fields_are_named() {
        let mut payload = job_json();
        payload["title"] = json!("   ");
        match job_draft(payload).into_job(JobId::from("job-1"), posted_at()) {
            Err(MarketplaceError::Validation(message)) => assert_eq!(message, "title is required"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut payload = job_json();
        payload.as_object_mut().expect("object").remove("payAmount");
        match job_draft(payload).into_job(JobId::from("job-1"), posted_at()) {
            Err(MarketplaceError::Validation(message)) => {
                assert_eq!(message, "payAmount is required")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn equipment_must_be_offered_somehow() {
        let draft: EquipmentDraft = serde_json::from_value(json!({
            "owner": { "kind": "COMPANY", "id": "company-1" },
            "name": "Bandit BC-600 Chipper",
            "category": "CHIPPERS",
            "brand": "Bandit",
            "model": "BC-600",
            "year": 2020,
            "condition": "GOOD",
            "dailyRentalRate": 250,
            "location": "Denver, CO"
        }))
        .expect("draft deserializes");

        let rejected = draft
            .clone()
            .into_equipment(EquipmentId::from("eq-1"), posted_at());
        assert!(matches!(rejected, Err(MarketplaceError::Validation(_))));

        let equipment = EquipmentDraft {
            for_rent: true,
            ..draft
        }
        .into_equipment(EquipmentId::from("eq-1"), posted_at())
        .expect("rentable equipment");
        assert_eq!(equipment.price, None);
        assert_eq!(equipment.daily_rental_rate, Some(250.0));
        assert!(equipment.available);
    }

    #[test]
    fn professional_draft_rejects_duplicate_skills_and_backwards_certifications() {
        let duplicate: ProfessionalDraft = serde_json::from_value(json!({
            "accountId": "acct-1",
            "skills": [
                { "skillType": "CLIMBER", "level": "EXPERT" },
                { "skillType": "climber", "level": "MASTER" }
            ]
        }))
        .expect("draft deserializes");
        match duplicate.into_record(ProfessionalId::from("pro-1")) {
            Err(MarketplaceError::Validation(message)) => {
                assert_eq!(message, "skill CLIMBER listed more than once")
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let draft: ProfessionalDraft = serde_json::from_value(json!({
            "accountId": "acct-1",
            "hourlyRate": "45",
            "certifications": [{
                "name": "ISA Certified Arborist",
                "issuer": "International Society of Arboriculture",
                "number": "TX-4521A",
                "issueDate": "2025-03-15",
                "expirationDate": "2015-03-15"
            }]
        }))
        .expect("draft deserializes");
        assert!(matches!(
            draft.into_record(ProfessionalId::from("pro-1")),
            Err(MarketplaceError::Validation(_))
        ));
    }

    #[test]
    fn professional_record_starts_unrated() {
        let draft: ProfessionalDraft = serde_json::from_value(json!({
            "accountId": "acct-1",
            "hourlyRate": 45,
            "bio": "  ",
            "skills": [{ "skillType": "ARBORIST", "level": "MASTER", "yearsExperience": 10 }]
        }))
        .expect("draft deserializes");
        let record = draft
            .into_record(ProfessionalId::from("pro-1"))
            .expect("valid profile");

        assert_eq!(record.profile.rating, 0.0);
        assert_eq!(record.profile.total_jobs, 0);
        assert!(!record.profile.verified);
        assert_eq!(record.profile.bio, None);
        assert_eq!(record.profile.hourly_rate, Some(45.0));
        assert_eq!(record.skills[0].name, "ARBORIST");
    }
}
