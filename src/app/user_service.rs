//! User accounts: registration, lookup and credential checks.

use crate::domain::auth::PasswordHasher;
use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::{NewUser, Page, Role, User};
use crate::storage::MarketplaceStore;
use std::sync::Arc;

const BAD_CREDENTIALS: &str = "Bad credentials";
const MIN_PASSWORD_LEN: usize = 4;

fn duplicate_email() -> ServiceError {
    ServiceError::Conflict("User with such email already exists".to_string())
}

/// Registration form as submitted by the client.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

/// Emails are compared case-insensitively; stored lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> ServiceResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidParameter(format!(
            "'{}' is not a valid email",
            email
        )))
    }
}

fn require_non_blank(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidParameter(format!(
            "{} must not be blank",
            field
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn MarketplaceStore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn MarketplaceStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    pub async fn read(&self, id: i64) -> ServiceResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }

    pub async fn read_all(&self, page: Page) -> ServiceResult<Vec<User>> {
        Ok(self.store.list_users(page).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ServiceError::InvalidParameter(
                "email must not be blank".to_string(),
            ));
        }
        self.store
            .user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No user with such email".to_string()))
    }

    /// Self-service registration. The account always gets the `USER` role.
    pub async fn register(&self, registration: Registration) -> ServiceResult<User> {
        self.create(registration, Role::User).await
    }

    /// Creates the configured administrator unless an account with that email exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ServiceResult<User> {
        if let Some(existing) = self.store.user_by_email(&normalize_email(email)).await? {
            if existing.role != Role::Admin {
                tracing::warn!(email = %existing.email, "admin seed email belongs to a non-admin account");
            }
            return Ok(existing);
        }
        let admin = self
            .create(
                Registration {
                    name: "Admin".to_string(),
                    surname: "Admin".to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                },
                Role::Admin,
            )
            .await?;
        tracing::info!(email = %admin.email, "seeded administrator account");
        Ok(admin)
    }

    /// Returns the user if `password` matches. Unknown email and wrong password look the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let user = self
            .store
            .user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

        let hasher = self.hasher;
        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(anyhow::Error::from)?;

        if matches {
            Ok(user)
        } else {
            Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()))
        }
    }

    async fn create(&self, registration: Registration, role: Role) -> ServiceResult<User> {
        let name = require_non_blank("name", &registration.name)?;
        let surname = require_non_blank("surname", &registration.surname)?;
        let email = normalize_email(&registration.email);
        validate_email(&email)?;
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::InvalidParameter(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.store.user_by_email(&email).await?.is_some() {
            return Err(duplicate_email());
        }

        // bcrypt is deliberately slow; keep it off the async workers.
        let hasher = self.hasher;
        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(anyhow::Error::from)??;

        let user = self
            .store
            .insert_user(NewUser {
                name,
                surname,
                email,
                password_hash,
                role,
            })
            .await?
            .ok_or_else(duplicate_email)?;
        tracing::debug!(user_id = user.id, role = %user.role, "user created");
        Ok(user)
    }
}
