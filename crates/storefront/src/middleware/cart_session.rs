//! Cart session resolution.
//!
//! API clients name their cart with a `session_id` query parameter. Browser
//! clients that omit it get an id kept in the cookie session, created the
//! first time they add something.

use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::session_keys;

/// Optional explicit cart session.
#[derive(Debug, Default, Deserialize)]
pub struct CartSessionQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

impl CartSessionQuery {
    fn explicit(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// The cart session for this request, if there is one.
///
/// An explicit `session_id` wins over the cookie session.
pub async fn current_cart_session(session: &Session, query: &CartSessionQuery) -> Option<String> {
    if let Some(id) = query.explicit() {
        return Some(id.to_owned());
    }

    session
        .get::<String>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
}

/// The cart session for this request, creating one in the cookie session
/// when neither source has it.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn cart_session_or_create(
    session: &Session,
    query: &CartSessionQuery,
) -> Result<String, tower_sessions::session::Error> {
    if let Some(id) = current_cart_session(session, query).await {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    session.insert(session_keys::CART_ID, &id).await?;
    Ok(id)
}

/// Drop the cookie session's cart id once that cart has been checked out,
/// so the next add starts a fresh cart under a new id.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn forget_cart_session(
    session: &Session,
    session_id: &str,
) -> Result<(), tower_sessions::session::Error> {
    let held = session.get::<String>(session_keys::CART_ID).await?;
    if held.as_deref() == Some(session_id) {
        session.remove_value(session_keys::CART_ID).await?;
    }
    Ok(())
}
