//! OAuth 2.0 token acquisition with a persistent account cache.
//!
//! A cached account is refreshed silently. Without one, or when the refresh fails, the device
//! code flow is started: the user is shown a code to enter in a browser while the token
//! endpoint is polled until the sign-in completes, is declined or expires.

use crate::config::base_url;
use crate::error::WellboreError;
use crate::token_cache::{now, CachedAccount, TokenCache};

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Default polling interval in seconds when the identity service does not specify one.
const DEFAULT_INTERVAL: u64 = 5;

/// A successful token response
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// An error reported by the token endpoint
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TokenError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Outcome of a token request
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TokenResult {
    Granted(AccessToken),
    Denied(TokenError),
}

impl TokenResult {
    /// The access token, if one was granted.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Granted(token) => Some(&token.access_token),
            Self::Denied(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCode {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Acquires access tokens for one client, authority and scope.
#[derive(Clone, Debug)]
pub struct Authenticator {
    http: reqwest::Client,
    client_id: String,
    authority: Url,
    scope: String,
    cache_path: PathBuf,
}

impl Authenticator {
    /// # Arguments
    ///
    /// * `client_id`: Application (client) ID
    /// * `authority`: Identity service authority, including the tenant
    /// * `scope`: Scope to request
    /// * `cache_path`: Path of the token cache file
    pub fn new(client_id: &str, authority: &Url, scope: &str, cache_path: &Path) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.to_string(),
            authority: authority.clone(),
            scope: scope.to_string(),
            cache_path: cache_path.to_path_buf(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, WellboreError> {
        Ok(base_url(self.authority.as_str())?.join(path)?)
    }

    fn scopes(&self) -> String {
        format!("{} offline_access", self.scope)
    }

    /// Return a token, refreshing a cached account or running the device code flow.
    ///
    /// Granted tokens carrying a refresh token are stored in the cache.
    pub async fn get_token(&self) -> Result<TokenResult, WellboreError> {
        let mut cache = TokenCache::load(&self.cache_path)?;
        let authority = self.authority.as_str();

        info!("Checking if a cached token exists");
        let mut result = None;
        if let Some(account) = cache.account(&self.client_id, authority).cloned() {
            info!("Found a cached account, refreshing its token");
            match self.refresh(&account).await {
                Ok(TokenResult::Denied(denied)) => {
                    warn!("Token refresh was refused: {}", denied.error);
                    cache.remove(&self.client_id, authority)?;
                }
                Ok(granted) => result = Some(granted),
                Err(err) => warn!("Token refresh failed: {}", err),
            }
        }

        let result = match result {
            Some(result) => result,
            None => {
                info!("No usable cached token, starting device code sign-in");
                self.device_flow().await?
            }
        };

        match &result {
            TokenResult::Granted(token) => {
                if let Some(refresh_token) = &token.refresh_token {
                    cache.store(CachedAccount {
                        client_id: self.client_id.clone(),
                        authority: authority.to_string(),
                        refresh_token: refresh_token.clone(),
                        access_token: Some(token.access_token.clone()),
                        expires_at: token.expires_in.map(|expires_in| now() + expires_in),
                    })?;
                }
            }
            TokenResult::Denied(denied) => {
                warn!(
                    "Unable to authorize: {}",
                    denied.error_description.as_deref().unwrap_or(&denied.error)
                );
            }
        }
        Ok(result)
    }

    #[tracing::instrument(level = "DEBUG", skip(self, account))]
    async fn refresh(&self, account: &CachedAccount) -> Result<TokenResult, WellboreError> {
        let scopes = self.scopes();
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", account.refresh_token.as_str()),
            ("scope", scopes.as_str()),
        ])
        .await
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn device_flow(&self) -> Result<TokenResult, WellboreError> {
        let scopes = self.scopes();
        let response = self
            .http
            .post(self.endpoint("oauth2/v2.0/devicecode")?)
            .form(&[("client_id", self.client_id.as_str()), ("scope", scopes.as_str())])
            .send()
            .await?;
        let body: Value = response.json().await?;
        let flow: DeviceCode =
            serde_json::from_value(body.clone()).map_err(|_| WellboreError::DeviceFlow {
                message: format!("failed to create device flow: {}", body),
            })?;

        match &flow.message {
            Some(message) => eprintln!("{}", message),
            None => eprintln!(
                "To sign in, open {} and enter the code {}",
                flow.verification_uri, flow.user_code
            ),
        }

        let deadline = Instant::now() + Duration::from_secs(flow.expires_in);
        let mut interval = flow.interval.unwrap_or(DEFAULT_INTERVAL);
        loop {
            tokio::time::sleep(Duration::from_secs(interval)).await;
            let result = self
                .request_token(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", flow.device_code.as_str()),
                ])
                .await?;
            match result {
                TokenResult::Denied(denied) if denied.error == "authorization_pending" => {}
                TokenResult::Denied(denied) if denied.error == "slow_down" => {
                    interval += DEFAULT_INTERVAL
                }
                result => return Ok(result),
            }
            if Instant::now() >= deadline {
                return Ok(TokenResult::Denied(TokenError {
                    error: "expired_token".to_string(),
                    error_description: Some(
                        "the device code expired before sign-in completed".to_string(),
                    ),
                }));
            }
        }
    }

    /// POST a form to the token endpoint. Error statuses carry an error body and are returned as
    /// [TokenResult::Denied].
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResult, WellboreError> {
        let response = self
            .http
            .post(self.endpoint("oauth2/v2.0/token")?)
            .form(form)
            .send()
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Return a token for a scope, using the cache at `cache_path`.
///
/// # Arguments
///
/// * `client_id`: Application (client) ID
/// * `authority`: Identity service authority, including the tenant
/// * `scope`: Scope to request
/// * `cache_path`: Path of the token cache file
pub async fn get_token(
    client_id: &str,
    authority: &Url,
    scope: &str,
    cache_path: &Path,
) -> Result<TokenResult, WellboreError> {
    Authenticator::new(client_id, authority, scope, cache_path)
        .get_token()
        .await
}
