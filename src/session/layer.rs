use crate::core::config::SessionConfig;
use crate::session::store::SessionRegistry;
use axum::Router;
use sha2::{Digest, Sha512};
use time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, SessionManagerLayer};

/// Cookie signing key. The signed jar wants 64 bytes of key material, so
/// the configured secret is stretched with SHA-512.
pub fn signing_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

/// Wrap a router in the signed cookie session layer
///
/// The cookie carries only the session id. It is HttpOnly, SameSite=Lax and
/// scoped to `/`, and expires after `idle_timeout` seconds without an
/// authenticated request.
pub fn with_sessions<S>(router: Router<S>, registry: SessionRegistry, config: &SessionConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let layer = SessionManagerLayer::new(registry)
        .with_name(config.cookie_name.clone())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_path("/")
        .with_secure(config.secure)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(config.idle_timeout)))
        .with_signed(signing_key(&config.secret));

    router.layer(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_sessions::cookie::{Cookie, CookieJar};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_signed_value_verifies_only_with_same_secret() {
        let mut jar = CookieJar::new();
        jar.signed_mut(&signing_key(SECRET)).add(Cookie::new("sid", "session-id"));
        let signed = jar.get("sid").unwrap().value().to_string();
        assert_ne!(signed, "session-id");

        let mut incoming = CookieJar::new();
        incoming.add_original(Cookie::new("sid", signed.clone()));
        let verified = incoming.signed(&signing_key(SECRET)).get("sid").unwrap();
        assert_eq!(verified.value(), "session-id");

        let other = signing_key("another-secret-another-secret-xx");
        assert!(incoming.signed(&other).get("sid").is_none());

        let mut forged = CookieJar::new();
        forged.add_original(Cookie::new("sid", signed.replacen("session-id", "session-ie", 1)));
        assert!(forged.signed(&signing_key(SECRET)).get("sid").is_none());
    }
}
