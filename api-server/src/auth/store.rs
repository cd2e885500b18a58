use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;

use td_core::principal::{Principal, Role, UserId};

const DEFAULT_JWT_SECRET: &str = "dev-jwt-secret-change-me";
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60 * 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful login: claims ready to be encoded plus the user
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: AuthClaims,
    pub user: UserSummary,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: UserId,
    email: String,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
    disabled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct AuthState {
    users: HashMap<UserId, User>,
    next_id: UserId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredAuthState {
    users: Vec<User>,
}

impl From<StoredAuthState> for AuthState {
    fn from(value: StoredAuthState) -> Self {
        let next_id = value.users.iter().map(|user| user.id).max().unwrap_or(0) + 1;
        Self {
            users: value
                .users
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            next_id,
        }
    }
}

impl From<&AuthState> for StoredAuthState {
    fn from(value: &AuthState) -> Self {
        let mut users: Vec<User> = value.users.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        Self { users }
    }
}

/// User accounts plus token issuance: the authenticator behind every
/// `Principal` the task engine sees.
#[derive(Clone)]
pub struct UserStore {
    state: Arc<RwLock<AuthState>>,
    file_path: PathBuf,
    jwt_secret: String,
    token_ttl_seconds: i64,
}

impl UserStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, AuthError> {
        tokio::fs::create_dir_all(&base_dir).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create auth directory: {}", err))
        })?;

        let file_path = base_dir.join("users.json");
        let state = load_state(&file_path).await?;
        let jwt_secret =
            std::env::var("TD_JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        let token_ttl_seconds = std::env::var("TD_AUTH_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            file_path,
            jwt_secret,
            token_ttl_seconds,
        })
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserSummary, AuthError> {
        let normalized_email = normalize_email(email)?;
        validate_password(password)?;

        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|user| user.email == normalized_email)
        {
            return Err(AuthError::Conflict(format!(
                "User '{}' already exists",
                normalized_email
            )));
        }

        let id = state.next_id;
        state.next_id += 1;
        let user = User {
            id,
            email: normalized_email,
            password_hash: hash_password(password),
            role,
            created_at: Utc::now(),
            disabled_at: None,
        };
        state.users.insert(user.id, user.clone());
        persist_state(&self.file_path, &state).await?;
        Ok(user_to_summary(&user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let normalized_email = normalize_email(email)?;
        let state = self.state.read().await;

        let user = state
            .users
            .values()
            .find(|user| user.email == normalized_email)
            .cloned()
            .ok_or_else(|| AuthError::Unauthorized("Invalid credentials".to_string()))?;
        if user.disabled_at.is_some() || !verify_password(&user.password_hash, password) {
            return Err(AuthError::Unauthorized("Invalid credentials".to_string()));
        }
        drop(state);

        let claims = self.issue_claims(user.id, user.role)?;
        Ok(AuthSession {
            claims,
            user: user_to_summary(&user),
        })
    }

    pub async fn get(&self, id: UserId) -> Result<UserSummary, AuthError> {
        let state = self.state.read().await;
        state
            .users
            .get(&id)
            .map(user_to_summary)
            .ok_or_else(|| AuthError::NotFound(format!("User {} not found", id)))
    }

    /// Resolve a bearer token into a trusted principal
    ///
    /// Re-checks the account against the store so revoked users and stale
    /// role claims are rejected even while the token is unexpired.
    pub async fn authorize_bearer(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.decode_claims(token)?;
        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| AuthError::Unauthorized("Invalid token subject".to_string()))?;
        let token_role = Role::from_str(&claims.role)
            .map_err(|_| AuthError::Unauthorized("Invalid token role".to_string()))?;

        let state = self.state.read().await;
        let user = state
            .users
            .get(&user_id)
            .ok_or_else(|| AuthError::Unauthorized("User not found".to_string()))?;
        if user.disabled_at.is_some() {
            return Err(AuthError::Unauthorized("User is disabled".to_string()));
        }
        if user.role != token_role {
            return Err(AuthError::Unauthorized(
                "Token role does not match user".to_string(),
            ));
        }

        Ok(Principal::new(user.id, user.role))
    }

    fn issue_claims(&self, user_id: UserId, role: Role) -> Result<AuthClaims, AuthError> {
        let exp = (Utc::now() + Duration::seconds(self.token_ttl_seconds)).timestamp();
        let exp = usize::try_from(exp)
            .map_err(|_| AuthError::Storage("Failed to encode token expiration".to_string()))?;

        Ok(AuthClaims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp,
        })
    }

    pub fn encode_claims(&self, claims: &AuthClaims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|err| AuthError::Storage(format!("Failed to encode JWT: {}", err)))
    }

    pub fn decode_claims(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let decoded = decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| AuthError::Unauthorized(format!("Invalid token: {}", err)))?;
        Ok(decoded.claims)
    }
}

fn user_to_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
        created_at: user.created_at,
    }
}

async fn load_state(path: &Path) -> Result<AuthState, AuthError> {
    if !path.exists() {
        return Ok(StoredAuthState::default().into());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to read user store: {}", err)))?;
    if content.trim().is_empty() {
        return Ok(StoredAuthState::default().into());
    }
    let stored: StoredAuthState = serde_json::from_str(&content)
        .map_err(|err| AuthError::Storage(format!("Failed to parse user store: {}", err)))?;
    Ok(stored.into())
}

async fn persist_state(path: &Path, state: &AuthState) -> Result<(), AuthError> {
    let content = serde_json::to_string_pretty(&StoredAuthState::from(state))
        .map_err(|err| AuthError::Storage(format!("Failed to serialize user store: {}", err)))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create user store dir: {}", err))
        })?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to write user store: {}", err)))?;
    Ok(())
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(AuthError::InvalidInput("Invalid email".to_string()));
    }
    Ok(normalized)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> String {
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    format!(
        "v1${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    )
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let mut parts = stored_hash.split('$');
    let version = parts.next();
    let encoded_salt = parts.next();
    let encoded_digest = parts.next();
    let (Some(encoded_salt), Some(encoded_digest)) = (encoded_salt, encoded_digest) else {
        return false;
    };
    if version != Some("v1") {
        return false;
    }

    let salt = match URL_SAFE_NO_PAD.decode(encoded_salt) {
        Ok(value) => value,
        Err(_) => return false,
    };
    let expected_digest = match URL_SAFE_NO_PAD.decode(encoded_digest) {
        Ok(value) => value,
        Err(_) => return false,
    };

    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    let actual_digest = hasher.finalize();
    expected_digest == actual_digest.as_slice()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn build_store() -> (UserStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = UserStore::new(temp_dir.path().join("auth")).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn register_and_login_roundtrip() {
        let (store, _temp_dir) = build_store().await;
        let user = store
            .register("alice@example.com", "verysecurepw", Role::User)
            .await
            .unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "alice@example.com");

        let session = store.login("Alice@Example.com", "verysecurepw").await.unwrap();
        let token = store.encode_claims(&session.claims).unwrap();
        let principal = store.authorize_bearer(&token).await.unwrap();
        assert_eq!(principal.id, user.id);
        assert_eq!(principal.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (store, _temp_dir) = build_store().await;
        store
            .register("alice@example.com", "verysecurepw", Role::User)
            .await
            .unwrap();
        let result = store
            .register("ALICE@example.com", "otherpassword", Role::Admin)
            .await;
        assert!(matches!(result, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (store, _temp_dir) = build_store().await;
        store
            .register("alice@example.com", "verysecurepw", Role::User)
            .await
            .unwrap();
        let result = store.login("alice@example.com", "wrongpassword").await;
        assert!(matches!(result, Err(AuthError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let (store, _temp_dir) = build_store().await;
        let result = store.register("alice@example.com", "short", Role::User).await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn users_persist_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("auth");
        {
            let store = UserStore::new(base.clone()).await.unwrap();
            store
                .register("admin@example.com", "verysecurepw", Role::Admin)
                .await
                .unwrap();
        }
        let store = UserStore::new(base).await.unwrap();
        let session = store.login("admin@example.com", "verysecurepw").await.unwrap();
        assert_eq!(session.user.role, Role::Admin);

        let next = store
            .register("second@example.com", "verysecurepw", Role::User)
            .await
            .unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let (store, _temp_dir) = build_store().await;
        let result = store.authorize_bearer("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::Unauthorized(_))));
    }
}
