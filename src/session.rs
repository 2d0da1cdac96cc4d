//! Per-request session context backed by an injected key-value store
//!
//! A session is identified by a random id carried in a signed cookie. Only
//! the id travels to the browser; the data lives in a [`SessionStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderName, request::Parts};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::Result;
use crate::auth::{PendingLogin, StoredToken};

pub const COOKIE_NAME: &str = "ridewise_session";

type HmacSha256 = Hmac<Sha256>;

/// Everything remembered between requests of one browser
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    /// Signed-in user, set by the identity callback
    pub user: Option<UserSession>,
    /// Last start location sent to `/calculate`
    pub start: Option<String>,
    /// Last end location sent to `/calculate`
    pub end: Option<String>,
    /// Login started but not yet completed
    pub pending_login: Option<PendingLogin>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSession {
    pub token: StoredToken,
    /// Claims returned by the provider's userinfo endpoint
    pub userinfo: Value,
}

impl UserSession {
    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.userinfo.get("given_name").and_then(Value::as_str)
    }
}

/// Storage seam for session data
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<SessionData>>;
    async fn save(&self, id: &str, data: SessionData) -> Result<()>;
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Process-local store; sessions end with the process
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn save(&self, id: &str, data: SessionData) -> Result<()> {
        self.sessions.write().await.insert(id.to_string(), data);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

/// Signs session ids with the application secret
#[derive(Clone)]
pub struct CookieSigner {
    key: Arc<Vec<u8>>,
}

impl CookieSigner {
    /// Without a configured secret a random per-process key is used
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        let key = match secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                warn!("APP_SECRET_KEY not set, sessions will not survive a restart");
                rand::random::<[u8; 32]>().to_vec()
            }
        };
        Self { key: Arc::new(key) }
    }

    fn mac(&self, id: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("HMAC key length is unrestricted"));
        mac.update(id.as_bytes());
        mac
    }

    #[must_use]
    pub fn sign(&self, id: &str) -> String {
        let tag = self.mac(id).finalize().into_bytes();
        format!("{id}.{}", hex::encode(tag))
    }

    /// The session id, if `value` is a well-formed cookie signed by us
    #[must_use]
    pub fn verify<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (id, signature) = value.split_once('.')?;
        if id.len() != 32 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let tag = hex::decode(signature).ok()?;
        self.mac(id).verify_slice(&tag).ok().map(|()| id)
    }
}

/// Shared session machinery, pulled out of the app state by the extractor
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    signer: CookieSigner,
    secure: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, signer: CookieSigner, secure: bool) -> Self {
        Self {
            store,
            signer,
            secure,
        }
    }

    fn cookie(&self, id: &str) -> String {
        let mut cookie = format!(
            "{COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax",
            self.signer.sign(id)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn new_session_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

fn cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find_map(|(key, value)| (key == name).then_some(value))
}

/// The session of the current request
///
/// Changes are local until [`Session::save`] writes them back and yields the
/// cookie header to attach to the response.
pub struct Session {
    id: String,
    pub data: SessionData,
    manager: SessionManager,
}

impl Session {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Persist the data; the returned header must be part of the response
    pub async fn save(&self) -> Result<[(HeaderName, String); 1]> {
        self.manager.store.save(&self.id, self.data.clone()).await?;
        Ok([(SET_COOKIE, self.manager.cookie(&self.id))])
    }

    /// Forget everything and expire the cookie
    pub async fn clear(self) -> Result<[(HeaderName, String); 1]> {
        self.manager.store.remove(&self.id).await?;
        Ok([(
            SET_COOKIE,
            format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
        )])
    }
}

impl<S> FromRequestParts<S> for Session
where
    SessionManager: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = crate::web::AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let manager = SessionManager::from_ref(state);

        let existing = cookie_value(parts, COOKIE_NAME).and_then(|v| manager.signer.verify(v));
        let (id, data) = match existing {
            Some(id) => {
                let data = manager.store.load(id).await?.unwrap_or_default();
                (id.to_string(), data)
            }
            None => {
                debug!("Starting new session");
                (new_session_id(), SessionData::default())
            }
        };

        Ok(Session { id, data, manager })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_signed_cookie_round_trip() {
        let signer = CookieSigner::new(Some("top-secret"));
        let id = new_session_id();
        let value = signer.sign(&id);
        assert_eq!(signer.verify(&value), Some(id.as_str()));
    }

    #[test]
    fn test_tampered_or_foreign_cookie_is_rejected() {
        let signer = CookieSigner::new(Some("top-secret"));
        let other = CookieSigner::new(Some("other-secret"));
        let id = new_session_id();

        assert_eq!(signer.verify(&other.sign(&id)), None);
        assert_eq!(signer.verify("not-a-cookie"), None);
        let forged = format!("{}.{}", "a".repeat(32), "00");
        assert_eq!(signer.verify(&forged), None);
    }

    #[test]
    fn test_signature_is_hmac_sha256() {
        // RFC 4231 test case 2
        let signer = CookieSigner::new(Some("Jefe"));
        let mac = signer.mac("what do ya want for nothing?").finalize().into_bytes();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_truncated_or_non_hex_signature_is_rejected() {
        let signer = CookieSigner::new(Some("top-secret"));
        let id = new_session_id();
        let value = signer.sign(&id);

        assert_eq!(signer.verify(&value[..value.len() - 2]), None);
        assert_eq!(signer.verify(&format!("{id}.not-hex")), None);
        assert_eq!(signer.verify(&format!("{id}.")), None);
    }

    #[test]
    fn test_cookie_value_parsing() {
        let parts = parts_with_cookie("theme=dark; ridewise_session=abc.def; other=1");
        assert_eq!(cookie_value(&parts, COOKIE_NAME), Some("abc.def"));
        assert_eq!(cookie_value(&parts, "missing"), None);
    }

    #[test]
    fn test_given_name_from_userinfo() {
        let user = UserSession {
            token: StoredToken {
                access_token: "at".to_string(),
                refresh_token: None,
                expiry: 0,
            },
            userinfo: serde_json::json!({"given_name": "Robin", "email": "r@example.com"}),
        };
        assert_eq!(user.given_name(), Some("Robin"));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load("s1").await.unwrap(), None);

        let data = SessionData {
            start: Some("A".to_string()),
            end: Some("B".to_string()),
            ..SessionData::default()
        };
        store.save("s1", data.clone()).await.unwrap();
        assert_eq!(store.load("s1").await.unwrap(), Some(data));

        store.remove("s1").await.unwrap();
        assert_eq!(store.load("s1").await.unwrap(), None);
    }
}
