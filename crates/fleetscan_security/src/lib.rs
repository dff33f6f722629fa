use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, Utc};
use fleetscan_model::{CredentialId, CredentialMetadata, CredentialStatus, CredentialType};
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("credential '{0}' not found")]
    NotFound(String),
    #[error("encryption failure: {0}")]
    Crypto(String),
    #[error("invalid credential type '{0}'")]
    InvalidCredentialType(String),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Encrypted local credential store.
///
/// Passwords are never held in memory longer than the call that needs them;
/// `list()` only ever returns [`CredentialMetadata`], never ciphertext or
/// plaintext. The AES-256-GCM key is `SHA-256(secret)`, where `secret` is
/// whatever byte string the caller was handed out of band (an env var, a
/// mounted file, ...). Losing the secret makes every stored password
/// unrecoverable; there is no key-rotation support.
#[derive(Clone)]
pub struct CredentialVault {
    conn: Arc<Mutex<Connection>>,
    cipher: Arc<Aes256Gcm>,
}

impl CredentialVault {
    #[instrument(skip(secret))]
    pub fn open(db_path: impl AsRef<Path>, secret: &[u8]) -> VaultResult<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                type TEXT NOT NULL CHECK(type IN ('ssh', 'tacacs', 'generic', 'token')),
                password_ciphertext TEXT NOT NULL,
                valid_until TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;

        let digest = Sha256::digest(secret);
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        let cipher = Aes256Gcm::new(key);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            cipher: Arc::new(cipher),
        })
    }

    fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Crypto(e.to_string()))?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    fn decrypt_blob(&self, encoded: &str) -> VaultResult<String> {
        let blob = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        if blob.len() < NONCE_LEN {
            return Err(VaultError::Crypto("ciphertext too short".into()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        String::from_utf8(plaintext).map_err(|e| VaultError::Crypto(e.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> VaultResult<Vec<CredentialMetadata>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> VaultResult<Vec<CredentialMetadata>> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, name, username, type, valid_until, is_active, created_at, updated_at
                 FROM credentials ORDER BY name",
            )?;
            let rows = stmt.query_map([], row_to_metadata)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await?
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: CredentialId) -> VaultResult<CredentialMetadata> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> VaultResult<CredentialMetadata> {
            let conn = conn.lock().unwrap();
            conn.query_row(
                "SELECT id, name, username, type, valid_until, is_active, created_at, updated_at
                 FROM credentials WHERE id = ?1",
                params![id],
                row_to_metadata,
            )
            .optional()?
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
        })
        .await?
    }

    #[instrument(skip(self, password))]
    pub async fn create(
        &self,
        name: &str,
        username: &str,
        credential_type: CredentialType,
        password: &str,
        valid_until: Option<NaiveDate>,
    ) -> VaultResult<CredentialMetadata> {
        info!(target: "security::audit", credential = name, "creating credential");
        let ciphertext = self.encrypt(password)?;
        let conn = self.conn.clone();
        let name = name.to_string();
        let username = username.to_string();
        let now = Utc::now();

        tokio::task::spawn_blocking(move || -> VaultResult<CredentialMetadata> {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO credentials
                 (name, username, type, password_ciphertext, valid_until, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
                params![
                    name,
                    username,
                    credential_type.to_string(),
                    ciphertext,
                    valid_until.map(|d| d.to_string()),
                    now.to_rfc3339(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, name, username, type, valid_until, is_active, created_at, updated_at
                 FROM credentials WHERE id = ?1",
                params![id],
                row_to_metadata,
            )
            .map_err(VaultError::from)
        })
        .await?
    }

    #[instrument(skip(self, password))]
    pub async fn update(
        &self,
        id: CredentialId,
        username: Option<String>,
        password: Option<String>,
        valid_until: Option<Option<NaiveDate>>,
        is_active: Option<bool>,
    ) -> VaultResult<CredentialMetadata> {
        let ciphertext = match password {
            Some(ref p) => Some(self.encrypt(p)?),
            None => None,
        };
        let conn = self.conn.clone();
        let now = Utc::now();

        tokio::task::spawn_blocking(move || -> VaultResult<CredentialMetadata> {
            let conn = conn.lock().unwrap();
            if let Some(username) = username {
                conn.execute(
                    "UPDATE credentials SET username = ?1, updated_at = ?2 WHERE id = ?3",
                    params![username, now.to_rfc3339(), id],
                )?;
            }
            if let Some(ciphertext) = ciphertext {
                conn.execute(
                    "UPDATE credentials SET password_ciphertext = ?1, updated_at = ?2 WHERE id = ?3",
                    params![ciphertext, now.to_rfc3339(), id],
                )?;
            }
            if let Some(valid_until) = valid_until {
                conn.execute(
                    "UPDATE credentials SET valid_until = ?1, updated_at = ?2 WHERE id = ?3",
                    params![valid_until.map(|d| d.to_string()), now.to_rfc3339(), id],
                )?;
            }
            if let Some(is_active) = is_active {
                conn.execute(
                    "UPDATE credentials SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                    params![is_active as i64, now.to_rfc3339(), id],
                )?;
            }
            conn.query_row(
                "SELECT id, name, username, type, valid_until, is_active, created_at, updated_at
                 FROM credentials WHERE id = ?1",
                params![id],
                row_to_metadata,
            )
            .optional()?
            .ok_or(VaultError::NotFound(id.to_string()))
        })
        .await?
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: CredentialId) -> VaultResult<()> {
        info!(target: "security::audit", id, "deleting credential");
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> VaultResult<()> {
            let conn = conn.lock().unwrap();
            conn.execute("DELETE FROM credentials WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await?
    }

    /// Recover the plaintext password for use by the scan subsystem or the
    /// git orchestrator. Never exposed over the HTTP API.
    #[instrument(skip(self))]
    pub async fn decrypt(&self, id: CredentialId) -> VaultResult<String> {
        let conn = self.conn.clone();
        let ciphertext = tokio::task::spawn_blocking(move || -> VaultResult<String> {
            let conn = conn.lock().unwrap();
            conn.query_row(
                "SELECT password_ciphertext FROM credentials WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or(VaultError::NotFound(id.to_string()))
        })
        .await??;
        self.decrypt_blob(&ciphertext)
    }

    #[instrument(skip(self))]
    pub async fn decrypt_by_name(&self, name: &str) -> VaultResult<(String, String)> {
        let conn = self.conn.clone();
        let name = name.to_string();
        let (username, ciphertext) =
            tokio::task::spawn_blocking(move || -> VaultResult<(String, String)> {
                let conn = conn.lock().unwrap();
                conn.query_row(
                    "SELECT username, password_ciphertext FROM credentials WHERE name = ?1",
                    params![name],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?
                .ok_or_else(|| VaultError::NotFound(name.clone()))
            })
            .await??;
        let password = self.decrypt_blob(&ciphertext)?;
        Ok((username, password))
    }
}

fn row_to_metadata(row: &rusqlite::Row) -> rusqlite::Result<CredentialMetadata> {
    let type_str: String = row.get(3)?;
    let credential_type = CredentialType::from_str(&type_str).unwrap_or(CredentialType::Generic);
    let valid_until: Option<String> = row.get(4)?;
    let valid_until = valid_until.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    let status = CredentialMetadata::derive_status(valid_until, Utc::now().date_naive());

    Ok(CredentialMetadata {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        credential_type,
        valid_until,
        is_active: row.get::<_, i64>(5)? != 0,
        created_at,
        updated_at,
        status,
    })
}

/// Read the AES key material from the environment, the way the rest of this
/// codebase resolves ambient secrets. Callers in tests should use a fixed
/// byte string instead.
pub fn secret_from_env() -> VaultResult<Vec<u8>> {
    std::env::var("FLEETSCAN_ENCRYPTION_KEY")
        .map(|s| s.into_bytes())
        .map_err(|_| VaultError::Crypto("FLEETSCAN_ENCRYPTION_KEY not set".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::open(":memory:", b"test-secret").unwrap()
    }

    #[tokio::test]
    async fn create_then_decrypt_round_trips() {
        let vault = vault();
        let cred = vault
            .create("core-sw", "admin", CredentialType::Ssh, "hunter2", None)
            .await
            .unwrap();
        assert_eq!(cred.status, CredentialStatus::Active);
        let password = vault.decrypt(cred.id).await.unwrap();
        assert_eq!(password, "hunter2");
    }

    #[tokio::test]
    async fn list_never_exposes_ciphertext() {
        let vault = vault();
        vault
            .create("core-sw", "admin", CredentialType::Ssh, "hunter2", None)
            .await
            .unwrap();
        let creds = vault.list().await.unwrap();
        assert_eq!(creds.len(), 1);
        let json = serde_json::to_string(&creds[0]).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[tokio::test]
    async fn expired_credential_reports_expired_status() {
        let vault = vault();
        let yesterday = Utc::now().date_naive() - chrono::Duration::days(1);
        let cred = vault
            .create(
                "legacy-tacacs",
                "svc",
                CredentialType::Tacacs,
                "secret",
                Some(yesterday),
            )
            .await
            .unwrap();
        assert_eq!(cred.status, CredentialStatus::Expired);
    }

    #[tokio::test]
    async fn delete_removes_credential() {
        let vault = vault();
        let cred = vault
            .create("temp", "svc", CredentialType::Generic, "pw", None)
            .await
            .unwrap();
        vault.delete(cred.id).await.unwrap();
        assert!(vault.get(cred.id).await.is_err());
    }

    #[tokio::test]
    async fn decrypt_by_name_resolves_username_and_password() {
        let vault = vault();
        vault
            .create("git-bot", "svc-git", CredentialType::Token, "ghp_abc", None)
            .await
            .unwrap();
        let (username, password) = vault.decrypt_by_name("git-bot").await.unwrap();
        assert_eq!(username, "svc-git");
        assert_eq!(password, "ghp_abc");
    }
}
