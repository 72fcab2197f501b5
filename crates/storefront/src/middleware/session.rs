//! Session middleware configuration.
//!
//! Sets up cookie sessions using tower-sessions. The binary backs them with
//! `PostgresStore`; tests and the memory mode use tower-sessions' `MemoryStore`.
//!
//! Anonymous carts and favorites live in the session under
//! [`session_keys::CART`] and [`session_keys::FAVORITES`]. Empty values are
//! removed rather than stored.

use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;
use crate::models::{SessionCart, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "furnish_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over `store`.
///
/// # Arguments
///
/// * `store` - Session backend
/// * `config` - Storefront configuration (for the cookie `Secure` flag)
#[must_use]
pub fn create_session_layer<S>(store: S, config: &StorefrontConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Read the anonymous cart and favorites from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be loaded or holds malformed data.
pub async fn load_session_cart(
    session: &Session,
) -> Result<SessionCart, tower_sessions::session::Error> {
    let cart = session.get(session_keys::CART).await?.unwrap_or_default();
    let favorites = session
        .get(session_keys::FAVORITES)
        .await?
        .unwrap_or_default();
    Ok(SessionCart { cart, favorites })
}

/// Write the anonymous cart and favorites back to the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn store_session_cart(
    session: &Session,
    state: &SessionCart,
) -> Result<(), tower_sessions::session::Error> {
    if state.cart.is_empty() {
        session
            .remove::<serde_json::Value>(session_keys::CART)
            .await?;
    } else {
        session.insert(session_keys::CART, &state.cart).await?;
    }

    if state.favorites.is_empty() {
        session
            .remove::<serde_json::Value>(session_keys::FAVORITES)
            .await?;
    } else {
        session.insert(session_keys::FAVORITES, &state.favorites).await?;
    }
    Ok(())
}
