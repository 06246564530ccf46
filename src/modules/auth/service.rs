use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use uuid::Uuid;

use folio_http::AppError;
use folio_kernel::settings::AuthSettings;

use super::models::{Claims, UserRecord};

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Account registration, credential verification, and token issuance.
#[derive(Clone)]
pub struct AuthService {
    db: Surreal<Any>,
    keys: Arc<Keys>,
    token_ttl_secs: u64,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(db: Surreal<Any>, settings: &AuthSettings) -> Self {
        let keys = Keys {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
        };

        Self {
            db,
            keys: Arc::new(keys),
            token_ttl_secs: settings.token_ttl_secs,
            hash_cost: settings.hash_cost,
        }
    }

    /// Register a new account and return a signed token for it.
    pub async fn signup(&self, username: String, password: String) -> Result<String, AppError> {
        if self.find_user(&username).await?.is_some() {
            return Err(AppError::conflict("User already exists"));
        }

        let cost = self.hash_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("password hashing task failed")?
            .context("failed to hash password")?;

        let user_id = Uuid::now_v7().to_string();

        // The unique index on username backstops concurrent signups that
        // both pass the existence check above.
        let created = self
            .db
            .query(
                "CREATE type::thing('user', $id) CONTENT {
                    username: $username,
                    passwordHash: $hash,
                    createdAt: time::now(),
                    updatedAt: time::now()
                } RETURN NONE;",
            )
            .bind(("id", user_id.clone()))
            .bind(("username", username))
            .bind(("hash", hash))
            .await
            .context("failed to create user")?
            .check();

        if created.is_err() {
            return Err(AppError::conflict("User already exists"));
        }

        self.sign_token(&user_id)
    }

    /// Verify credentials and return a signed token.
    ///
    /// Missing users and wrong passwords are indistinguishable to callers.
    pub async fn login(&self, username: String, password: String) -> Result<String, AppError> {
        let user = match self.find_user(&username).await? {
            Some(user) => user,
            None => return Err(AppError::invalid_credentials()),
        };

        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("password verification task failed")?
            .context("failed to verify password")?;

        if !matches {
            return Err(AppError::invalid_credentials());
        }

        self.sign_token(&user.id)
    }

    /// Decode and validate a bearer token, returning the user id it carries.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.keys.decoding, &Validation::default())
            .map_err(|_| AppError::unauthenticated("Token is not valid"))?;

        Ok(data.claims.sub)
    }

    fn sign_token(&self, user_id: &str) -> Result<String, AppError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat + self.token_ttl_secs as i64,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.keys.encoding)
            .context("failed to sign token")?;

        Ok(token)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let mut response = self
            .db
            .query(
                "SELECT record::id(id) AS id, username, passwordHash
                 FROM user WHERE username = $username;",
            )
            .bind(("username", username.to_string()))
            .await
            .context("failed to query user")?;

        let user: Option<UserRecord> = response.take(0).context("failed to decode user")?;

        Ok(user)
    }
}
