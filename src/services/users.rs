//! Authentication and member account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{Claims, RegisterUser, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new member account
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(&request.password)?;

        self.repository
            .users
            .create(&request.email, &request.name, &password_hash, false)
            .await
    }

    /// Authenticate by email and password; returns a bearer token.
    /// `remember` extends the token lifetime (the remember-me checkbox).
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.create_token(&user, remember)?;

        Ok((token, user))
    }

    /// Create a JWT token for a user
    pub fn create_token(&self, user: &User, remember: bool) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let lifetime = if remember {
            self.config.remember_me_days as i64 * 86400
        } else {
            self.config.jwt_expiration_hours as i64 * 3600
        };

        let claims = Claims {
            sub: user.email.clone(),
            user_id: user.id,
            is_admin: user.is_admin,
            exp: now + lifetime,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Create the initial admin account if none exists
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<()> {
        if self.repository.users.admin_exists().await? {
            return Ok(());
        }

        let password_hash = self.hash_password(password)?;
        let admin = self
            .repository
            .users
            .create(email, "Administrator", &password_hash, true)
            .await?;

        tracing::info!("Created initial admin account {} (id={})", email, admin.id);
        Ok(())
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
