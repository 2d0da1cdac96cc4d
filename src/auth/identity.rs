use anyhow::{Context, Result, bail};
use chrono::Utc;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::IdentityConfig;
use crate::http::send_json;

const SERVICE: &str = "Identity provider";
const SCOPES: [&str; 3] = ["openid", "profile", "email"];
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp in seconds
    pub expiry: i64,
}

/// State of a login between the redirect to the provider and its callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub csrf_state: String,
    pub pkce_verifier: String,
}

/// OpenID Connect provider with Auth0 style endpoints
pub struct IdentityGateway {
    client: BasicClient,
    base_url: String,
    client_id: String,
    http: ClientWithMiddleware,
}

/// `example.eu.auth0.com` and `https://example.eu.auth0.com/` both work
fn provider_base_url(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

impl IdentityGateway {
    /// `None` when the provider is not configured
    pub fn from_config(
        config: &IdentityConfig,
        public_url: &str,
        http: ClientWithMiddleware,
    ) -> Result<Option<Self>> {
        let (Some(domain), Some(client_id)) = (&config.domain, &config.client_id) else {
            return Ok(None);
        };
        let base_url = provider_base_url(domain);
        let redirect_uri = format!("{}/callback", public_url.trim_end_matches('/'));

        let client = BasicClient::new(
            ClientId::new(client_id.clone()),
            config.client_secret.clone().map(ClientSecret::new),
            AuthUrl::new(format!("{base_url}/authorize")).context("Invalid authorize URL")?,
            Some(TokenUrl::new(format!("{base_url}/oauth/token")).context("Invalid token URL")?),
        )
        .set_redirect_uri(RedirectUrl::new(redirect_uri).context("Invalid redirect URL")?);

        Ok(Some(Self {
            client,
            base_url,
            client_id: client_id.clone(),
            http,
        }))
    }

    /// Provider URL to send the browser to, plus the state to keep for the callback
    pub fn build_authorization_url(&self) -> (String, PendingLogin) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (auth_url, csrf_token) = request.set_pkce_challenge(pkce_challenge).url();

        let pending = PendingLogin {
            csrf_state: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };
        (auth_url.to_string(), pending)
    }

    /// Check the returned state and trade the code for tokens
    #[instrument(skip_all)]
    pub async fn complete_login(
        &self,
        pending: Option<PendingLogin>,
        code: &str,
        state: &str,
    ) -> Result<StoredToken> {
        let Some(pending) = pending else {
            bail!("No login in progress for this session");
        };
        if pending.csrf_state != state {
            bail!("Login state mismatch");
        }
        self.exchange_code(code, pending.pkce_verifier).await
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: String) -> Result<StoredToken> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .context("Failed to exchange code for token")?;

        let expires_in = token_response
            .expires_in()
            .map_or(DEFAULT_EXPIRES_IN, |d| d.as_secs() as i64);

        info!("Exchanged authorization code for token");
        Ok(StoredToken {
            access_token: token_response.access_token().secret().clone(),
            refresh_token: token_response.refresh_token().map(|t| t.secret().clone()),
            expiry: Utc::now().timestamp() + expires_in,
        })
    }

    /// Profile claims of the token's user
    #[instrument(skip_all)]
    pub async fn fetch_userinfo(&self, token: &StoredToken) -> Result<Value> {
        let request = self
            .http
            .get(format!("{}/userinfo", self.base_url))
            .bearer_auth(&token.access_token);
        let userinfo = send_json(SERVICE, request).await?;
        Ok(userinfo)
    }

    /// Provider logout URL that sends the browser back to `return_to`
    pub fn logout_url(&self, return_to: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/v2/logout", self.base_url),
            &[("returnTo", return_to), ("client_id", self.client_id.as_str())],
        )
        .context("Invalid logout URL")?;
        Ok(url.to_string())
    }
}
