//! Signed-cookie sessions
//!
//! Nothing is stored server-side. The cookie value is `<expiry>|<username>`,
//! HMAC-signed by `SignedCookieJar`, so a client can present it but not forge it.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use chrono::Utc;
use sha2::{Digest, Sha512};

use crate::config::SessionConfig;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "portal_session";

/// Issues, reads and clears session cookies
#[derive(Clone)]
pub struct SessionManager {
    key: Key,
    ttl_secs: i64,
}

impl SessionManager {
    pub fn new(config: &SessionConfig) -> Self {
        let key = match &config.secret {
            Some(secret) => derive_key(secret),
            None => {
                tracing::warn!("SESSION_SECRET not set; using a random key, sessions end on restart");
                Key::generate()
            }
        };

        Self {
            key,
            ttl_secs: config.ttl_secs,
        }
    }

    /// Signing key shared with `SignedCookieJar` extraction
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Mark the client as logged in as `username`
    pub fn start_session(&self, jar: SignedCookieJar, username: &str) -> SignedCookieJar {
        let expires = Utc::now().timestamp().saturating_add(self.ttl_secs);
        let value = format!("{}|{}", expires, urlencoding::encode(username));

        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);

        jar.add(cookie)
    }

    /// The logged-in username, if the cookie is present, authentic and unexpired
    pub fn current_user(&self, jar: &SignedCookieJar) -> Option<String> {
        let cookie = jar.get(SESSION_COOKIE)?;
        let (expires, username) = cookie.value().split_once('|')?;

        let expires: i64 = expires.parse().ok()?;
        if expires <= Utc::now().timestamp() {
            return None;
        }

        let username = urlencoding::decode(username).ok()?;
        if username.is_empty() {
            return None;
        }

        Some(username.into_owned())
    }

    /// Forget the client's session
    pub fn end_session(&self, jar: SignedCookieJar) -> SignedCookieJar {
        jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
    }
}

/// Stretch an arbitrary-length secret into a 64-byte signing key
fn derive_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Extractor for routes that require a login.
///
/// Rejects with a redirect to the login page before the handler (or any body
/// extractor after it) runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionManager: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionManager::from_ref(state);
        let jar = SignedCookieJar::from_headers(&parts.headers, sessions.key().clone());

        match sessions.current_user(&jar) {
            Some(username) => Ok(AuthUser { username }),
            None => {
                tracing::debug!(path = %parts.uri.path(), "No session, redirecting to login");
                Err(Redirect::to("/"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};
    use axum::response::IntoResponse;

    fn manager(secret: &str, ttl_secs: i64) -> SessionManager {
        SessionManager::new(&SessionConfig {
            secret: Some(secret.to_string()),
            ttl_secs,
        })
    }

    /// Replay the cookies a jar would send back to the browser as a request header
    fn replay(jar: SignedCookieJar, key: &Key) -> SignedCookieJar {
        let response = (jar, ()).into_response();
        let mut headers = HeaderMap::new();
        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            headers.append(header::COOKIE, HeaderValue::from_str(pair).unwrap());
        }
        SignedCookieJar::from_headers(&headers, key.clone())
    }

    #[test]
    fn test_session_round_trip() {
        let sessions = manager("a-long-enough-test-secret", 60);
        let jar = SignedCookieJar::new(sessions.key().clone());
        let jar = sessions.start_session(jar, "admin");

        let incoming = replay(jar, sessions.key());
        assert_eq!(sessions.current_user(&incoming).as_deref(), Some("admin"));
    }

    #[test]
    fn test_usernames_with_separators_survive() {
        let sessions = manager("a-long-enough-test-secret", 60);
        let jar = sessions.start_session(SignedCookieJar::new(sessions.key().clone()), "a|b; c");

        let incoming = replay(jar, sessions.key());
        assert_eq!(sessions.current_user(&incoming).as_deref(), Some("a|b; c"));
    }

    #[test]
    fn test_no_cookie_is_absent() {
        let sessions = manager("a-long-enough-test-secret", 60);
        let jar = SignedCookieJar::from_headers(&HeaderMap::new(), sessions.key().clone());
        assert!(sessions.current_user(&jar).is_none());
    }

    #[test]
    fn test_other_key_is_rejected() {
        let issuer = manager("the-real-secret", 60);
        let forger = manager("some-other-secret", 60);

        let jar = forger.start_session(SignedCookieJar::new(forger.key().clone()), "admin");
        let incoming = replay(jar, issuer.key());

        assert!(issuer.current_user(&incoming).is_none());
    }

    #[test]
    fn test_unsigned_value_is_rejected() {
        let sessions = manager("a-long-enough-test-secret", 60);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("portal_session=4102444800|admin"),
        );
        let jar = SignedCookieJar::from_headers(&headers, sessions.key().clone());

        assert!(sessions.current_user(&jar).is_none());
    }

    #[test]
    fn test_expired_session_is_absent() {
        let sessions = manager("a-long-enough-test-secret", -1);
        let jar = sessions.start_session(SignedCookieJar::new(sessions.key().clone()), "admin");

        let incoming = replay(jar, sessions.key());
        assert!(sessions.current_user(&incoming).is_none());
    }

    #[test]
    fn test_end_session_clears_cookie() {
        let sessions = manager("a-long-enough-test-secret", 60);
        let jar = sessions.start_session(SignedCookieJar::new(sessions.key().clone()), "admin");
        let incoming = replay(jar, sessions.key());
        assert!(sessions.current_user(&incoming).is_some());

        let cleared = sessions.end_session(incoming);
        let incoming = replay(cleared, sessions.key());
        assert!(sessions.current_user(&incoming).is_none());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let sessions = manager("a-long-enough-test-secret", i64::MAX);
        let jar = sessions.start_session(SignedCookieJar::new(sessions.key().clone()), "admin");

        let incoming = replay(jar, sessions.key());
        assert_eq!(sessions.current_user(&incoming).as_deref(), Some("admin"));
    }
}
