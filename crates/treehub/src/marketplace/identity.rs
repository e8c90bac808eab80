use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::clock::Clock;
use super::credentials::{verify_hash, CredentialStore};
use super::domain::{Account, AccountId, CompanyId, ProfessionalId, Role};
use super::error::MarketplaceError;
use super::storage::{rows, Database, StorageError};

/// Why a presented session token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session expired")]
    Expired,
    #[error("session invalid")]
    Invalid,
}

/// The profile hanging off an account, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileSummary {
    Professional { id: ProfessionalId },
    Company { id: CompanyId, name: String },
    #[serde(rename = "NONE")]
    Absent,
}

/// Identity snapshot carried inside a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub account_id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub profile: ProfileSummary,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    claims: SessionClaims,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub claims: SessionClaims,
}

/// Issues and validates HS256 session tokens with a fixed lifetime.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            clock,
        }
    }

    pub fn issue(&self, claims: SessionClaims) -> Result<Session, MarketplaceError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.ttl;
        let payload = TokenPayload {
            sub: claims.account_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            claims,
        };
        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
            .map_err(|err| StorageError::Signing(err.to_string()))?;
        Ok(Session {
            token,
            expires_at,
            claims: payload.claims,
        })
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = decode::<TokenPayload>(token.trim(), &self.decoding, &self.validation)
            .map_err(|_| SessionError::Invalid)?;
        let payload = data.claims;
        if payload.sub != payload.claims.account_id.as_str() {
            return Err(SessionError::Invalid);
        }
        if payload.exp <= self.clock.now().timestamp() {
            return Err(SessionError::Expired);
        }
        Ok(payload.claims)
    }
}

/// Caller identity re-read from storage for authorization-gated writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub account: Account,
    pub profile: ProfileSummary,
}

impl Principal {
    pub fn professional_id(&self) -> Option<&ProfessionalId> {
        match &self.profile {
            ProfileSummary::Professional { id } => Some(id),
            _ => None,
        }
    }

    pub fn company_id(&self) -> Option<&CompanyId> {
        match &self.profile {
            ProfileSummary::Company { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Email/password authentication plus session issuance.
#[derive(Clone)]
pub struct IdentityService {
    db: Database,
    credentials: CredentialStore,
    sessions: SessionIssuer,
}

impl IdentityService {
    pub fn new(db: Database, credentials: CredentialStore, sessions: SessionIssuer) -> Self {
        Self {
            db,
            credentials,
            sessions,
        }
    }

    /// Resolve an email/password pair to claims. Unknown emails and wrong
    /// passwords are indistinguishable to the caller.
    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionClaims, MarketplaceError> {
        let email = normalize_email(email);
        let account = self
            .db
            .with_conn(|conn| Ok(rows::account_by_email(conn, &email)?))?;

        let Some(account) = account else {
            verify_hash(None, password);
            warn!("login rejected for unknown account");
            return Err(MarketplaceError::AuthFailure);
        };

        if !self.credentials.verify_credential(&account.id, password) {
            warn!(account_id = %account.id, "login rejected");
            return Err(MarketplaceError::AuthFailure);
        }

        let profile = self.db.with_conn(|conn| profile_summary(conn, &account))?;
        Ok(claims_for(account, profile))
    }

    pub fn issue_session(&self, claims: SessionClaims) -> Result<Session, MarketplaceError> {
        self.sessions.issue(claims)
    }

    /// `authenticate` followed by `issue_session`.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, MarketplaceError> {
        let claims = self.authenticate(email, password)?;
        let session = self.issue_session(claims)?;
        info!(account_id = %session.claims.account_id, "session issued");
        Ok(session)
    }

    /// Snapshot claims as they were at issuance.
    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, MarketplaceError> {
        Ok(self.sessions.validate(token)?)
    }

    /// Validate the token, then reload the account and its profile so a
    /// deleted account or changed role no longer carries write access.
    pub fn current_account(&self, token: &str) -> Result<Principal, MarketplaceError> {
        let claims = self.validate_session(token)?;
        self.db.with_conn(|conn| {
            let account = rows::account_by_id(conn, &claims.account_id)?
                .ok_or(MarketplaceError::Session(SessionError::Invalid))?;
            let profile = profile_summary(conn, &account)?;
            Ok(Principal { account, profile })
        })
    }
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn claims_for(account: Account, profile: ProfileSummary) -> SessionClaims {
    SessionClaims {
        account_id: account.id,
        name: account.name,
        email: account.email,
        role: account.role,
        verified: account.verified,
        profile,
    }
}

fn profile_summary(conn: &Connection, account: &Account) -> Result<ProfileSummary, MarketplaceError> {
    let summary = match account.role {
        Role::Professional => conn
            .query_row(
                "select id from professional_profiles where account_id = ?1",
                [&account.id],
                |row| Ok(ProfileSummary::Professional { id: row.get(0)? }),
            )
            .optional()?,
        Role::Company => conn
            .query_row(
                "select id, name from company_profiles where account_id = ?1",
                [&account.id],
                |row| {
                    Ok(ProfileSummary::Company {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?,
        Role::Homeowner => None,
    };
    Ok(summary.unwrap_or(ProfileSummary::Absent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::clock::ManualClock;
    use chrono::TimeZone;

    fn claims() -> SessionClaims {
        SessionClaims {
            account_id: AccountId::from("acct-1"),
            name: "John Doe".to_string(),
            email: "john@doe.com".to_string(),
            role: Role::Professional,
            verified: false,
            profile: ProfileSummary::Professional {
                id: ProfessionalId::from("pro-1"),
            },
        }
    }

    fn issuer(clock: Arc<ManualClock>) -> SessionIssuer {
        SessionIssuer::new(b"test-secret", Duration::days(30), clock)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid instant")
    }

    #[test]
    fn issued_token_validates_until_expiry() {
        let clock = Arc::new(ManualClock::starting_at(start()));
        let sessions = issuer(clock.clone());
        let session = sessions.issue(claims()).expect("token issued");

        assert_eq!(session.expires_at, start() + Duration::days(30));
        assert_eq!(sessions.validate(&session.token), Ok(claims()));

        clock.advance(Duration::days(29));
        assert!(sessions.validate(&session.token).is_ok());

        clock.advance(Duration::days(1));
        assert_eq!(sessions.validate(&session.token), Err(SessionError::Expired));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_invalid() {
        let clock = Arc::new(ManualClock::starting_at(start()));
        let sessions = issuer(clock.clone());
        let session = sessions.issue(claims()).expect("token issued");

        let mut escalated = claims();
        escalated.role = Role::Company;
        let forged = sessions.issue(escalated).expect("token issued");
        let original: Vec<&str> = session.token.split('.').collect();
        let forged: Vec<&str> = forged.token.split('.').collect();
        let tampered = format!("{}.{}.{}", original[0], forged[1], original[2]);
        assert_eq!(sessions.validate(&tampered), Err(SessionError::Invalid));

        let foreign = SessionIssuer::new(b"other-secret", Duration::days(30), clock);
        assert_eq!(foreign.validate(&session.token), Err(SessionError::Invalid));
        assert_eq!(sessions.validate("not-a-token"), Err(SessionError::Invalid));
    }

    #[test]
    fn profile_summary_serializes_with_kind_tag() {
        let value = serde_json::to_value(ProfileSummary::Company {
            id: CompanyId::from("c-1"),
            name: "Acme Tree".to_string(),
        })
        .expect("serializes");
        assert_eq!(
            value,
            serde_json::json!({ "kind": "COMPANY", "id": "c-1", "name": "Acme Tree" })
        );
        let absent = serde_json::to_value(ProfileSummary::Absent).expect("serializes");
        assert_eq!(absent, serde_json::json!({ "kind": "NONE" }));
    }
}
