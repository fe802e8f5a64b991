//! Authenticated HTTP sessions for the backends.

use crate::auth::{Authenticator, TokenResult};
use crate::config::{Backend, Config};
use crate::error::WellboreError;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use url::Url;

static HEADER_SUBSCRIPTION_KEY: HeaderName = HeaderName::from_static("ocp-apim-subscription-key");

/// An HTTP client with the backend credentials attached to every request.
///
/// Headers are fixed at construction, so a session can be cloned and shared freely.
#[derive(Clone, Debug)]
pub struct Session {
    client: reqwest::Client,
}

impl Session {
    /// Create a session sending a bearer token and an API subscription key, when given.
    ///
    /// # Arguments
    ///
    /// * `access_token`: Optional bearer token
    /// * `subscription_key`: Optional `Ocp-Apim-Subscription-Key` header value
    pub fn new(
        access_token: Option<&str>,
        subscription_key: Option<&str>,
    ) -> Result<Self, WellboreError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(mime::APPLICATION_JSON.as_ref())?);
        if let Some(access_token) = access_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", access_token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(subscription_key) = subscription_key {
            let mut value = HeaderValue::from_str(subscription_key)?;
            value.set_sensitive(true);
            headers.insert(HEADER_SUBSCRIPTION_KEY.clone(), value);
        }
        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { client })
    }

    /// Create a session without credentials.
    pub fn anonymous() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Issue a GET request.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn get(&self, endpoint: &Url) -> Result<reqwest::Response, reqwest::Error> {
        self.client.get(endpoint.as_str()).send().await
    }
}

/// Authenticate against the identity service and return a session for a backend.
///
/// Authorization failures reported by the identity service are returned as
/// [WellboreError::AuthorizationDenied].
///
/// # Arguments
///
/// * `config`: Configuration
/// * `backend`: Backend to connect to
pub async fn connect(config: &Config, backend: Backend) -> Result<Session, WellboreError> {
    let backend_config = config.backend(backend);
    let authenticator = Authenticator::new(
        &config.client_id,
        &config.authority()?,
        &backend_config.scope()?,
        &backend_config.token_cache_path(&config.cache_dir),
    );
    match authenticator.get_token().await? {
        TokenResult::Granted(token) => {
            tracing::info!("Created a new {} session", backend);
            Session::new(
                Some(&token.access_token),
                backend_config.subscription_key.as_deref(),
            )
        }
        TokenResult::Denied(denied) => Err(WellboreError::AuthorizationDenied {
            backend,
            error: denied.error,
            description: denied.error_description,
        }),
    }
}
