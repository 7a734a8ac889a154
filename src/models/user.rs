//! User model, roles and authentication claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Roles are carried as group memberships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Staff who verify and reject loans
    Petugas,
    /// Administrator who sees verified loans and may override them
    Admin,
}

impl Role {
    pub fn group_name(&self) -> &'static str {
        match self {
            Role::Petugas => "petugas",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.group_name())
    }
}

/// User model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// Self-registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// Staff registration request, with password confirmation
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterStaff {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    pub confirm: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    /// Group names the user belongs to
    pub groups: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Group membership check. Group names compare case-insensitively.
    pub fn has_role(&self, role: Role) -> bool {
        self.groups
            .iter()
            .any(|g| g.eq_ignore_ascii_case(role.group_name()))
    }

    /// Single gate in front of every role-restricted operation
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.has_role(role) {
            Ok(())
        } else {
            tracing::warn!(user_id = self.user_id, role = %role, "role check denied");
            Err(AppError::Authorization(format!(
                "Only members of '{}' can perform this action",
                role
            )))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require_role(Role::Petugas)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(groups: &[&str]) -> UserClaims {
        UserClaims {
            sub: "budi".into(),
            user_id: 7,
            groups: groups.iter().map(|g| g.to_string()).collect(),
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_role_gate() {
        assert!(claims(&["petugas"]).require_staff().is_ok());
        assert!(claims(&["Petugas"]).require_staff().is_ok());
        assert!(matches!(
            claims(&[]).require_staff(),
            Err(AppError::Authorization(_))
        ));
        assert!(claims(&["petugas"]).require_admin().is_err());
        assert!(claims(&["admin"]).require_admin().is_ok());
    }

    #[test]
    fn test_token_round_trip_keeps_groups() {
        let issued = claims(&["petugas"]);
        let token = issued.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert!(parsed.has_role(Role::Petugas));
        assert!(UserClaims::from_token(&token, "other").is_err());
    }
}
