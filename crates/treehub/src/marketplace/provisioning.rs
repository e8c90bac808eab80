use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::clock::Clock;
use super::credentials::{hash_password, store_hash};
use super::domain::{
    Account, AccountId, Availability, CompanyId, CompanyProfile, CompanySize, ProfessionalId,
    ProfessionalProfile, Role,
};
use super::error::MarketplaceError;
use super::identity::normalize_email;
use super::storage::{conflict_or_storage, rows, Database};

/// Signup form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

/// Creates an account, its credential, and its role's profile as one unit.
#[derive(Clone)]
pub struct AccountProvisioner {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl AccountProvisioner {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Either every row is written or none is. A duplicate email surfaces as
    /// `Conflict` from the unique index, not from a lookup beforehand.
    pub fn sign_up(&self, request: SignUpRequest) -> Result<Account, MarketplaceError> {
        let name = request.name.trim();
        let email = normalize_email(&request.email);
        if name.is_empty()
            || email.is_empty()
            || request.password.trim().is_empty()
            || request.role.trim().is_empty()
        {
            return Err(MarketplaceError::validation(
                "name, email, password and role are required",
            ));
        }
        if !is_plausible_email(&email) {
            return Err(MarketplaceError::validation("email address is not valid"));
        }
        let role: Role = request.role.parse()?;
        let password_hash = hash_password(&request.password)?;

        let now = self.clock.now();
        let account = Account {
            id: AccountId::generate(),
            name: name.to_string(),
            email,
            role,
            verified: false,
            created_at: now,
        };

        self.db.with_tx(|tx| {
            rows::insert_account(tx, &account).map_err(|err| {
                conflict_or_storage(err, "an account with this email already exists")
            })?;
            store_hash(tx, &account.id, &password_hash, now)?;
            match role {
                Role::Professional => {
                    rows::insert_professional(tx, &starter_professional(&account))?
                }
                Role::Company => rows::insert_company(tx, &starter_company(&account))?,
                Role::Homeowner => {}
            }
            Ok(())
        })?;

        info!(account_id = %account.id, role = %account.role, "account provisioned");
        Ok(account)
    }
}

/// One `@`, non-empty local part, a dotted domain, and no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

fn starter_professional(account: &Account) -> ProfessionalProfile {
    ProfessionalProfile {
        id: ProfessionalId::generate(),
        account_id: account.id.clone(),
        phone: None,
        bio: None,
        experience_years: None,
        hourly_rate: None,
        rating: 0.0,
        total_jobs: 0,
        verified: false,
        insured: false,
        availability: Availability::Available,
        location_city: None,
        location_state: None,
        location_zip_code: None,
    }
}

fn starter_company(account: &Account) -> CompanyProfile {
    CompanyProfile {
        id: CompanyId::generate(),
        account_id: account.id.clone(),
        name: account.name.clone(),
        description: None,
        size: CompanySize::Small,
        employees: 0,
        founded: None,
        website: None,
        rating: 0.0,
        total_jobs: 0,
        verified: false,
        location_city: None,
        location_state: None,
    }
}
