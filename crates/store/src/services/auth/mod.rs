//! Authentication service.
//!
//! Email and password accounts for customers and back-office staff. A
//! back-office login additionally requires the `admin` role and an active
//! account, and both are re-checked on every admin request.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;
use tracing::{info, instrument};

use tram_sach_core::{Email, UserId, UserRole};

use crate::db::{NewUser, RepositoryError, UserRepository};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Details for a new account.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
    pub phone: Option<&'a str>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Register a customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration<'_>) -> Result<User, AuthError> {
        self.create_account(registration, UserRole::User).await
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if the account is inactive.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Back-office
    // =========================================================================

    /// Log in to the back-office.
    ///
    /// Every rejection reports `InvalidCredentials` except a correct
    /// password on a non-admin or inactive account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::NotAdmin` if the account lacks the admin role.
    /// Returns `AuthError::AccountDisabled` if the account is inactive.
    #[instrument(skip(self, password))]
    pub async fn login_admin(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.login(email, password).await?;

        if user.role != UserRole::Admin {
            return Err(AuthError::NotAdmin);
        }

        info!(user_id = %user.id, "Admin logged in");
        Ok(user)
    }

    /// Re-check that a signed-in admin may still use the back-office.
    ///
    /// Returns the current account, or `None` when it was deleted, demoted
    /// or deactivated since login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn verify_admin(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        let user = self.users.get_by_id(user_id).await?;
        Ok(user.filter(User::is_active_admin))
    }

    /// Create a back-office account.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn create_admin(&self, registration: &Registration<'_>) -> Result<User, AuthError> {
        self.create_account(registration, UserRole::Admin).await
    }

    /// Replace an account's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserNotFound` if no account has this email.
    pub async fn set_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = hash_password(password)?;
        self.users.set_password_hash(user.id, &password_hash).await?;
        Ok(user)
    }

    async fn create_account(
        &self,
        registration: &Registration<'_>,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;
        let password_hash = hash_password(registration.password)?;

        let new = NewUser {
            email: &email,
            password_hash: &password_hash,
            full_name: non_blank(registration.full_name),
            phone: non_blank(registration.phone),
            role,
        };

        self.users.create(&new).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::test_db;
    use crate::models::UserUpdate;

    fn registration<'a>(email: &'a str, password: &'a str) -> Registration<'a> {
        Registration {
            email,
            password,
            full_name: Some("Lê Văn C"),
            phone: Some("  "),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length_counts_characters() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("mậtkhẩu").is_err());
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let db = test_db().await;
        let auth = AuthService::new(&db.pool);

        let user = auth
            .register(&registration("Reader@Example.com", "sach-hay-lam"))
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "reader@example.com");
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.phone, None);

        let logged_in = auth.login("reader@example.com", "sach-hay-lam").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("reader@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "sach-hay-lam").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.register(&registration("reader@example.com", "another-one"))
                .await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.register(&registration("not-an-email", "another-one"))
                .await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let db = test_db().await;
        let auth = AuthService::new(&db.pool);

        let customer = auth
            .register(&registration("customer@example.com", "password1"))
            .await
            .unwrap();
        let admin = auth
            .create_admin(&registration("admin@example.com", "password2"))
            .await
            .unwrap();

        assert!(matches!(
            auth.login_admin("customer@example.com", "password1").await,
            Err(AuthError::NotAdmin)
        ));
        assert!(matches!(
            auth.login_admin("admin@example.com", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        let signed_in = auth
            .login_admin("admin@example.com", "password2")
            .await
            .unwrap();
        assert_eq!(signed_in.id, admin.id);

        assert!(auth.verify_admin(admin.id).await.unwrap().is_some());
        assert!(auth.verify_admin(customer.id).await.unwrap().is_none());

        UserRepository::new(&db.pool)
            .update(
                admin.id,
                &UserUpdate {
                    full_name: None,
                    phone: None,
                    role: UserRole::Admin,
                    is_active: false,
                },
            )
            .await
            .unwrap();

        assert!(auth.verify_admin(admin.id).await.unwrap().is_none());
        assert!(matches!(
            auth.login_admin("admin@example.com", "password2").await,
            Err(AuthError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn test_set_password() {
        let db = test_db().await;
        let auth = AuthService::new(&db.pool);
        auth.create_admin(&registration("ops@example.com", "first-pass"))
            .await
            .unwrap();

        auth.set_password("ops@example.com", "second-pass")
            .await
            .unwrap();

        assert!(auth.login("ops@example.com", "first-pass").await.is_err());
        assert!(auth.login("ops@example.com", "second-pass").await.is_ok());
        assert!(matches!(
            auth.set_password("ghost@example.com", "second-pass").await,
            Err(AuthError::UserNotFound)
        ));
    }
}
