use std::sync::{Arc, OnceLock};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::error;

use super::clock::Clock;
use super::domain::AccountId;
use super::error::MarketplaceError;
use super::storage::{rows, to_millis, Database, StorageError};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Password hashes keyed one-to-one by account id.
#[derive(Clone)]
pub struct CredentialStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Hash `plaintext` and upsert it for `account_id`, replacing any prior hash.
    pub fn set_credential(
        &self,
        account_id: &AccountId,
        plaintext: &str,
    ) -> Result<(), MarketplaceError> {
        let hash = hash_password(plaintext)?;
        let now = self.clock.now();
        self.db.with_conn(|conn| {
            if rows::account_by_id(conn, account_id)?.is_none() {
                return Err(MarketplaceError::not_found("account", account_id));
            }
            store_hash(conn, account_id, &hash, now)
        })
    }

    /// `false` for a wrong password, a missing credential row, or a storage
    /// failure. Never errors.
    pub fn verify_credential(&self, account_id: &AccountId, plaintext: &str) -> bool {
        let stored = match self.db.with_conn(|conn| load_hash(conn, account_id)) {
            Ok(stored) => stored,
            Err(err) => {
                error!(%account_id, error = %err, "credential lookup failed");
                None
            }
        };
        verify_hash(stored.as_deref(), plaintext)
    }
}

pub fn validate_password(plaintext: &str) -> Result<(), MarketplaceError> {
    if plaintext.chars().count() < MIN_PASSWORD_LEN {
        return Err(MarketplaceError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Salted argon2id hash in PHC string form.
pub fn hash_password(plaintext: &str) -> Result<String, MarketplaceError> {
    validate_password(plaintext)?;
    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);
    hash_with_salt(plaintext, &salt_bytes)
}

fn hash_with_salt(plaintext: &str, salt_bytes: &[u8]) -> Result<String, MarketplaceError> {
    let salt = SaltString::encode_b64(salt_bytes)
        .map_err(|err| StorageError::Hashing(err.to_string()))?;
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|err| StorageError::Hashing(err.to_string()))?;
    Ok(hash.to_string())
}

/// Compares against a fixed dummy hash when no row exists so a missing
/// account costs the same as a wrong password.
pub(crate) fn verify_hash(stored: Option<&str>, plaintext: &str) -> bool {
    let candidate = match stored {
        Some(stored) => stored,
        None => match dummy_hash() {
            Ok(dummy) => dummy,
            Err(err) => {
                error!(error = %err, "dummy credential hash unavailable");
                return false;
            }
        },
    };
    let Ok(parsed) = PasswordHash::new(candidate) else {
        return false;
    };
    let matches = Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok();
    matches && stored.is_some()
}

fn dummy_hash() -> Result<&'static str, MarketplaceError> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(dummy) = DUMMY.get() {
        return Ok(dummy.as_str());
    }
    let computed = hash_with_salt("treehub-placeholder", b"treehub-dummy-salt")?;
    Ok(DUMMY.get_or_init(|| computed).as_str())
}

pub(crate) fn store_hash(
    conn: &Connection,
    account_id: &AccountId,
    hash: &str,
    now: DateTime<Utc>,
) -> Result<(), MarketplaceError> {
    conn.execute(
        "insert into credentials (account_id, password_hash, created_at, updated_at)
         values (?1, ?2, ?3, ?3)
         on conflict(account_id) do update set
             password_hash = excluded.password_hash,
             updated_at = excluded.updated_at",
        params![account_id, hash, to_millis(now)],
    )?;
    Ok(())
}

pub(crate) fn load_hash(
    conn: &Connection,
    account_id: &AccountId,
) -> Result<Option<String>, MarketplaceError> {
    Ok(conn
        .query_row(
            "select password_hash from credentials where account_id = ?1",
            [account_id],
            |row| row.get(0),
        )
        .optional()?)
}
