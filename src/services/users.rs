//! Authentication and account registration service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterStaff, RegisterUser, Role, User, UserClaims},
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

    /// Register a regular borrower account
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;
        self.create_account(&request.username, &request.password, &[]).await
    }

    /// Register a staff account (member of the `petugas` group)
    pub async fn register_staff(&self, request: RegisterStaff) -> AppResult<User> {
        request.validate()?;
        if request.password != request.confirm {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        self.create_account(&request.username, &request.password, &[Role::Petugas.group_name()])
            .await
    }

    async fn create_account(&self, username: &str, password: &str, groups: &[&str]) -> AppResult<User> {
        if self.repository.users.username_exists(username).await? {
            return Err(AppError::Validation(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        let hash = self.hash_password(password)?;
        let user = self.repository.users.create(username, &hash, groups).await?;
        tracing::info!(user_id = user.id, ?groups, "account registered");
        Ok(user)
    }

    /// Check credentials and issue a JWT for the user
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, UserClaims)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let groups = self.repository.users.get_groups(user.id).await?;
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            groups,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, claims))
    }

    /// Staff login: valid credentials and membership of `petugas`
    pub async fn authenticate_staff(&self, username: &str, password: &str) -> AppResult<(String, UserClaims)> {
        let (token, claims) = self.authenticate(username, password).await.map_err(|e| match e {
            AppError::Authentication(_) => {
                AppError::Authentication("Wrong username/password or not a staff member".to_string())
            }
            other => other,
        })?;
        if !claims.has_role(Role::Petugas) {
            return Err(AppError::Authentication(
                "Wrong username/password or not a staff member".to_string(),
            ));
        }
        Ok((token, claims))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

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
