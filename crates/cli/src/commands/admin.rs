//! Admin account management commands.
//!
//! ```bash
//! # Create an admin (password read from TS_ADMIN_PASSWORD when not given)
//! ts-cli admin create -e admin@example.com -n "Quản trị viên"
//!
//! # Reset any account's password
//! ts-cli admin set-password -e admin@example.com
//! ```

use tram_sach_store::services::{AuthService, Registration};

use super::{CommandError, connect};

/// Create a new admin account.
///
/// # Errors
///
/// Returns an error if the email is invalid or taken, or the password is too weak.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool)
        .create_admin(&Registration {
            email,
            password,
            full_name: Some(name),
            phone: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Admin user created");
    Ok(())
}

/// Replace an account's password.
///
/// # Errors
///
/// Returns an error if no account has this email or the password is too weak.
pub async fn set_password(email: &str, password: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool).set_password(email, password).await?;

    tracing::info!(user_id = %user.id, "Password updated");
    Ok(())
}
