use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Raised when a raw string does not name a variant of a marketplace enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! marketplace_enum {
    ($(#[$meta:meta])* $name:ident as $kind:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            /// Case-insensitive match against the wire label.
            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let trimmed = raw.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: trimmed.to_string(),
                    })
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

entity_id!(
    /// Root identity of the ownership graph.
    AccountId
);
entity_id!(ProfessionalId);
entity_id!(CompanyId);
entity_id!(JobId);
entity_id!(EquipmentId);
entity_id!(ApplicationId);

marketplace_enum!(
    /// Account category; decides which profile, if any, hangs off the account.
    Role as "role" {
        Professional => "PROFESSIONAL",
        Company => "COMPANY",
        Homeowner => "HOMEOWNER",
    }
);

marketplace_enum!(
    Availability as "availability" {
        Available => "AVAILABLE",
        Busy => "BUSY",
        StormOnly => "STORM_ONLY",
        Seasonal => "SEASONAL",
        Unavailable => "UNAVAILABLE",
    }
);

marketplace_enum!(
    CompanySize as "company size" {
        Startup => "STARTUP",
        Small => "SMALL",
        Medium => "MEDIUM",
        Large => "LARGE",
        Enterprise => "ENTERPRISE",
    }
);

marketplace_enum!(
    /// Trade skills used both on professional profiles and job requirements.
    SkillType as "skill" {
        Climber => "CLIMBER",
        Groundwork => "GROUNDWORK",
        CraneOperator => "CRANE_OPERATOR",
        PhcTech => "PHC_TECH",
        StormResponse => "STORM_RESPONSE",
        Arborist => "ARBORIST",
        BucketTruck => "BUCKET_TRUCK",
        StumpGrinding => "STUMP_GRINDING",
        TreeRemoval => "TREE_REMOVAL",
        Pruning => "PRUNING",
        Cabling => "CABLING",
        Diagnosis => "DIAGNOSIS",
        EmergencyResponse => "EMERGENCY_RESPONSE",
    }
);

marketplace_enum!(
    SkillLevel as "skill level" {
        Beginner => "BEGINNER",
        Intermediate => "INTERMEDIATE",
        Expert => "EXPERT",
        Master => "MASTER",
    }
);

marketplace_enum!(
    JobType as "job type" {
        FullTime => "FULL_TIME",
        PartTime => "PART_TIME",
        Contract => "CONTRACT",
        Freelance => "FREELANCE",
        StormEmergency => "STORM_EMERGENCY",
        Seasonal => "SEASONAL",
        Weekend => "WEEKEND",
        OnCall => "ON_CALL",
    }
);

marketplace_enum!(
    Urgency as "urgency" {
        Low => "LOW",
        Normal => "NORMAL",
        Urgent => "URGENT",
        Emergency => "EMERGENCY",
    }
);

impl Urgency {
    /// Ordinal used for sorting: EMERGENCY > URGENT > NORMAL > LOW.
    pub const fn rank(self) -> u8 {
        match self {
            Urgency::Low => 0,
            Urgency::Normal => 1,
            Urgency::Urgent => 2,
            Urgency::Emergency => 3,
        }
    }
}

marketplace_enum!(
    JobStatus as "job status" {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
        OnHold => "ON_HOLD",
    }
);

impl JobStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Allowed edges of the job lifecycle. Terminal states accept nothing.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match next {
            JobStatus::Cancelled | JobStatus::OnHold => true,
            JobStatus::InProgress => matches!(self, JobStatus::Open | JobStatus::OnHold),
            JobStatus::Completed => self == JobStatus::InProgress,
            JobStatus::Open => self == JobStatus::OnHold,
        }
    }
}

marketplace_enum!(
    PayType as "pay type" {
        Hourly => "HOURLY",
        Daily => "DAILY",
        Project => "PROJECT",
        PerTree => "PER_TREE",
    }
);

marketplace_enum!(
    Slope as "slope" {
        Flat => "FLAT",
        Moderate => "MODERATE",
        Steep => "STEEP",
    }
);

marketplace_enum!(
    Parking as "parking" {
        Street => "STREET",
        Driveway => "DRIVEWAY",
        Limited => "LIMITED",
        NoParking => "NONE",
    }
);

marketplace_enum!(
    EquipmentCategory as "equipment category" {
        ClimbingGear => "CLIMBING_GEAR",
        Chainsaws => "CHAINSAWS",
        Chippers => "CHIPPERS",
        StumpGrinders => "STUMP_GRINDERS",
        BucketTrucks => "BUCKET_TRUCKS",
        Cranes => "CRANES",
        Trucks => "TRUCKS",
        Trailers => "TRAILERS",
        SafetyEquipment => "SAFETY_EQUIPMENT",
        DiagnosticTools => "DIAGNOSTIC_TOOLS",
        RopesRigging => "ROPES_RIGGING",
    }
);

marketplace_enum!(
    EquipmentCondition as "equipment condition" {
        Excellent => "EXCELLENT",
        Good => "GOOD",
        Fair => "FAIR",
        NeedsRepair => "NEEDS_REPAIR",
    }
);

marketplace_enum!(
    ApplicationStatus as "application status" {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
        Withdrawn => "WITHDRAWN",
        Hired => "HIRED",
    }
);

/// Login identity. The password hash lives in the credential table and never
/// travels with this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalProfile {
    pub id: ProfessionalId,
    pub account_id: AccountId,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<u32>,
    pub hourly_rate: Option<f64>,
    pub rating: f64,
    pub total_jobs: u32,
    pub verified: bool,
    pub insured: bool,
    pub availability: Availability,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub professional_id: ProfessionalId,
    pub skill_type: SkillType,
    pub name: String,
    pub level: SkillLevel,
    pub years_experience: u32,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub id: String,
    pub professional_id: ProfessionalId,
    pub name: String,
    pub issuer: String,
    pub number: String,
    pub issue_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub id: String,
    pub professional_id: ProfessionalId,
    pub title: String,
    pub description: String,
    pub job_type: SkillType,
    pub location: String,
    pub completed_at: NaiveDate,
    pub client: Option<String>,
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub id: CompanyId,
    pub account_id: AccountId,
    pub name: String,
    pub description: Option<String>,
    pub size: CompanySize,
    pub employees: u32,
    pub founded: Option<i32>,
    pub website: Option<String>,
    pub rating: f64,
    pub total_jobs: u32,
    pub verified: bool,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
}

/// A posted job. Site-condition fields describe access for crews and equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub company_id: CompanyId,
    pub title: String,
    pub description: String,
    pub job_type: JobType,
    pub urgency: Urgency,
    pub status: JobStatus,
    pub skills_required: Vec<SkillType>,
    pub pay_type: PayType,
    pub pay_amount: f64,
    pub overtime_rate: Option<f64>,
    pub hazard_pay: Option<f64>,
    pub equipment_provided: bool,
    pub equipment_required: Vec<String>,
    pub safety_requirements: Vec<String>,
    pub certification_required: Vec<String>,
    pub weather_dependent: bool,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub gate_width: Option<f64>,
    pub power_lines: bool,
    pub slope: Option<Slope>,
    pub obstacles: Vec<String>,
    pub parking: Option<Parking>,
    pub posted_at: DateTime<Utc>,
}

/// Exactly one profile owns a piece of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentOwner {
    Professional(ProfessionalId),
    Company(CompanyId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: EquipmentId,
    pub owner: EquipmentOwner,
    pub name: String,
    pub category: EquipmentCategory,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub condition: EquipmentCondition,
    pub price: Option<f64>,
    pub daily_rental_rate: Option<f64>,
    pub for_sale: bool,
    pub for_rent: bool,
    pub available: bool,
    pub location: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub professional_id: ProfessionalId,
    pub status: ApplicationStatus,
    pub proposed_rate: Option<f64>,
    pub cover_letter: Option<String>,
    pub applied_at: DateTime<Utc>,
}
