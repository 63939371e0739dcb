use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::mail::{EmailMessage, Mailer};
use crate::models::{Claims, CreateUserRequest, LoginRequest, LoginResponse, User, UserResponse};

/// Authentication service
///
/// Standard credential + token model: argon2 password hashes, one-shot uuid
/// tokens for email verification and password reset, JWT bearer access
/// tokens.
pub struct AuthService;

impl AuthService {
    /// Register a new user and send the verification email.
    ///
    /// A mail failure does not fail registration; the account simply stays
    /// unverified until the mail is re-sent or verified out of band.
    pub async fn register(
        db: &Database,
        mailer: &dyn Mailer,
        public_url: &str,
        req: CreateUserRequest,
    ) -> Result<UserResponse> {
        if !req.email.contains('@') {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }

        if req.password.len() < 6 {
            return Err(AppError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&req.email)
            .fetch_optional(db.pool())
            .await?;

        if existing.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = Self::hash_password(&req.password)?;
        let user_id = Uuid::new_v4().to_string();
        let verification_token = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, verified, verification_token, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&user_id)
        .bind(&req.email)
        .bind(&req.name)
        .bind(&password_hash)
        .bind(&verification_token)
        .bind(&now)
        .bind(&now)
        .execute(db.pool())
        .await?;

        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&user_id)
            .fetch_one(db.pool())
            .await?;

        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Account Verification".to_string(),
            body: format!(
                "Please verify your account by opening the following link:\n{}/api/v1/auth/verify-email?token={}",
                public_url, verification_token
            ),
            attachment: None,
        };
        if let Err(e) = mailer.send(&message).await {
            tracing::error!("Failed to send verification email to {}: {}", user.email, e);
        }

        Ok(UserResponse::from(user))
    }

    /// Mark the user matching a verification token as verified
    pub async fn verify_email(db: &Database, token: &str) -> Result<()> {
        let user: Option<User> =
            sqlx::query_as("SELECT * FROM users WHERE verification_token = ?")
                .bind(token)
                .fetch_optional(db.pool())
                .await?;

        let user =
            user.ok_or_else(|| AppError::NotFound("Invalid verification token".to_string()))?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE users SET verified = 1, verification_token = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(&user.id)
        .execute(db.pool())
        .await?;

        Ok(())
    }

    /// Login user
    pub async fn login(db: &Database, config: &Config, req: LoginRequest) -> Result<LoginResponse> {
        let user: User = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&req.email)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        if !Self::verify_password(&req.password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        if !user.verified {
            return Err(AppError::Forbidden("Email not verified".to_string()));
        }

        let access_token = Self::generate_access_token(&user, config)?;

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: config.jwt.access_token_expire_minutes * 60,
            user: UserResponse::from(user),
        })
    }

    /// Set a reset token (1 hour expiry) and email the reset link
    pub async fn forgot_password(
        db: &Database,
        mailer: &dyn Mailer,
        public_url: &str,
        email: &str,
    ) -> Result<()> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db.pool())
            .await?;

        let user = user.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let reset_token = Uuid::new_v4().to_string();
        let expires = (Utc::now() + Duration::hours(1)).to_rfc3339();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE users SET reset_password_token = ?, reset_password_expires = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&reset_token)
        .bind(&expires)
        .bind(&now)
        .bind(&user.id)
        .execute(db.pool())
        .await?;

        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Password Reset".to_string(),
            body: format!(
                "You are receiving this because a password reset was requested for your account.\nOpen the following link to complete the process:\n{}/reset-password/{}",
                public_url, reset_token
            ),
            attachment: None,
        };
        if let Err(e) = mailer.send(&message).await {
            tracing::error!("Failed to send password reset email to {}: {}", user.email, e);
        }

        Ok(())
    }

    /// Update the password for a valid, unexpired reset token
    pub async fn reset_password(
        db: &Database,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if password != confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        if password.len() < 6 {
            return Err(AppError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let user: Option<User> =
            sqlx::query_as("SELECT * FROM users WHERE reset_password_token = ?")
                .bind(token)
                .fetch_optional(db.pool())
                .await?;

        let user = user.ok_or_else(|| {
            AppError::NotFound("Password reset token is invalid or has expired".to_string())
        })?;

        let expired = match user.reset_password_expires.as_deref() {
            Some(expires) => chrono::DateTime::parse_from_rfc3339(expires)
                .map(|t| t < Utc::now())
                .unwrap_or(true),
            None => true,
        };
        if expired {
            return Err(AppError::NotFound(
                "Password reset token is invalid or has expired".to_string(),
            ));
        }

        let password_hash = Self::hash_password(password)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE users SET password_hash = ?, reset_password_token = NULL, reset_password_expires = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(&password_hash)
        .bind(&now)
        .bind(&user.id)
        .execute(db.pool())
        .await?;

        Ok(())
    }

    /// Generate access token (JWT)
    fn generate_access_token(user: &User, config: &Config) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(config.jwt.access_token_expire_minutes as i64);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Validate access token and extract claims
    pub fn validate_token(token: &str, config: &Config) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

        Ok(token_data.claims)
    }

    /// Hash password using Argon2
    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        Ok(password_hash)
    }

    /// Verify password against hash
    fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
