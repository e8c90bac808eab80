use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use crate::config::AuthConfig;
use crate::marketplace::domain::{Account, CompanyId, ProfessionalId, Role, Urgency};
use crate::marketplace::listings::{EquipmentDraft, JobDraft, ProfessionalDraft};
use crate::marketplace::provisioning::SignUpRequest;
use crate::marketplace::{Clock, Database, ManualClock, Marketplace, SqliteMarketplace};

pub(super) const PASSWORD: &str = "pruning-shears";

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn auth_config() -> AuthConfig {
    AuthConfig {
        session_secret: "test-session-secret".to_string(),
        session_ttl_days: 30,
    }
}

/// A marketplace on a fresh in-memory database with a hand-driven clock.
pub(super) struct Harness {
    pub(super) clock: Arc<ManualClock>,
    pub(super) db: Database,
    pub(super) marketplace: Arc<Marketplace<SqliteMarketplace>>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let db = Database::open_in_memory().expect("in-memory database opens");
        let shared: Arc<dyn Clock> = clock.clone();
        let marketplace = Arc::new(Marketplace::sqlite(db.clone(), shared, &auth_config()));
        Self {
            clock,
            db,
            marketplace,
        }
    }

    pub(super) fn repository(&self) -> &SqliteMarketplace {
        &self.marketplace.repository
    }

    pub(super) fn tick(&self) {
        self.clock.advance(Duration::minutes(5));
    }

    pub(super) fn sign_up(&self, name: &str, email: &str, role: Role) -> Account {
        self.marketplace
            .provisioner
            .sign_up(SignUpRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                role: role.as_str().to_string(),
            })
            .expect("signup succeeds")
    }

    pub(super) fn login(&self, email: &str) -> String {
        self.marketplace
            .identity
            .login(email, PASSWORD)
            .expect("login succeeds")
            .token
    }

    /// Signs up a company account and returns its token and profile id.
    pub(super) fn company(&self, name: &str, email: &str) -> (String, CompanyId) {
        self.sign_up(name, email, Role::Company);
        let token = self.login(email);
        let principal = self
            .marketplace
            .identity
            .current_account(&token)
            .expect("token is current");
        let company_id = principal.company_id().cloned().expect("company profile");
        (token, company_id)
    }

    pub(super) fn professional(&self, name: &str, email: &str) -> (String, ProfessionalId) {
        self.sign_up(name, email, Role::Professional);
        let token = self.login(email);
        let principal = self
            .marketplace
            .identity
            .current_account(&token)
            .expect("token is current");
        let professional_id = principal
            .professional_id()
            .cloned()
            .expect("professional profile");
        (token, professional_id)
    }

    pub(super) fn count(&self, table: &str) -> i64 {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row(&format!("select count(*) from {table}"), [], |row| {
                    row.get(0)
                })?)
            })
            .expect("count query runs")
    }
}

pub(super) fn job_draft(title: &str, urgency: Urgency, city: &str, state: &str) -> JobDraft {
    serde_json::from_value(json!({
        "title": title,
        "description": "Remove a storm-damaged oak leaning over the driveway.",
        "jobType": "CONTRACT",
        "urgency": urgency.as_str(),
        "skillsRequired": ["CLIMBER", "TREE_REMOVAL"],
        "payType": "HOURLY",
        "payAmount": 45,
        "address": "100 Congress Ave",
        "city": city,
        "state": state,
        "zipCode": "78701",
        "startDate": "2025-04-01",
    }))
    .expect("job draft deserializes")
}

pub(super) fn equipment_draft(name: &str, for_sale: bool, for_rent: bool) -> EquipmentDraft {
    let price = if for_sale { json!("1299.99") } else { Value::Null };
    let daily_rental_rate = if for_rent { json!(75) } else { Value::Null };
    serde_json::from_value(json!({
        "name": name,
        "category": "CHAINSAWS",
        "brand": "Stihl",
        "model": "MS 661",
        "year": 2022,
        "condition": "EXCELLENT",
        "price": price,
        "dailyRentalRate": daily_rental_rate,
        "forSale": for_sale,
        "forRent": for_rent,
        "location": "Austin, TX",
    }))
    .expect("equipment draft deserializes")
}

pub(super) fn professional_draft() -> ProfessionalDraft {
    serde_json::from_value(json!({
        "bio": "ISA certified climber.",
        "experienceYears": 8,
        "hourlyRate": "52.5",
        "insured": true,
        "availability": "AVAILABLE",
        "locationCity": "Austin",
        "locationState": "TX",
        "skills": [
            { "skillType": "CLIMBER", "level": "EXPERT", "yearsExperience": 8 },
            { "skillType": "STORM_RESPONSE", "level": "INTERMEDIATE", "yearsExperience": 3 }
        ],
        "certifications": [{
            "name": "ISA Certified Arborist",
            "issuer": "ISA",
            "number": "TX-1234A",
            "issueDate": "2021-05-01",
            "expirationDate": "2027-05-01"
        }],
        "portfolio": []
    }))
    .expect("professional draft deserializes")
}

pub(super) fn bearer_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}
