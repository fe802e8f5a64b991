//! Explicit configuration for the identity service and the wellbore backends.
//!
//! Values are read from a dotenv file without touching the process environment, so that every
//! authenticator and provider receives its configuration as an argument.

use crate::error::WellboreError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use strum_macros::Display;
use url::Url;

/// Default identity service host. The tenant is appended to form the authority.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";

/// Supported backends
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Backend {
    /// Well master data
    #[strum(serialize = "SMDA")]
    Smda,
    /// Production and injection volumes
    #[strum(serialize = "PDM")]
    Pdm,
    /// Subsurface model and completion data
    #[strum(serialize = "SSDL")]
    Ssdl,
    /// Planned wells
    #[strum(serialize = "PlannedWell")]
    Pozo,
}

impl Backend {
    /// Prefix of the configuration keys belonging to this backend.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Smda => "SMDA",
            Self::Pdm => "PDM",
            Self::Ssdl => "SSDL",
            Self::Pozo => "POZO",
        }
    }

    /// Resource used when no `<PREFIX>_RESOURCE` is configured.
    pub fn default_resource(self) -> Option<&'static str> {
        match self {
            Self::Pozo => Some("c3781abc-b5a1-4189-9875-4ed92e5297aa"),
            _ => None,
        }
    }

    /// Production API used when no `<PREFIX>_API` override is configured.
    pub fn default_api(self) -> &'static str {
        match self {
            Self::Smda => "https://api.gateway.equinor.com/smda/v2.0/smda-api/",
            Self::Pdm => "https://api.gateway.equinor.com/pdm-internal-api/v3/api/",
            Self::Ssdl => "https://api.gateway.equinor.com/subsurfacedata/v3/api/v3.0/",
            Self::Pozo => "https://wfmwellapiprod.azurewebsites.net/",
        }
    }
}

/// Parse a base URL, making sure it ends with a slash so that relative endpoints join onto it.
pub fn base_url(url: &str) -> Result<Url, url::ParseError> {
    if url.ends_with('/') {
        Url::parse(url)
    } else {
        Url::parse(&format!("{}/", url))
    }
}

/// Configuration of a single backend
#[derive(Clone, Debug, PartialEq)]
pub struct BackendConfig {
    pub backend: Backend,
    /// Base URL of the REST API
    pub api: Url,
    /// Identity service resource the API is registered under
    pub resource: Option<String>,
    /// Value of the `Ocp-Apim-Subscription-Key` header
    pub subscription_key: Option<String>,
}

impl BackendConfig {
    /// OAuth scope requested for this backend.
    pub fn scope(&self) -> Result<String, WellboreError> {
        let resource = self
            .resource
            .as_ref()
            .ok_or_else(|| WellboreError::MissingConfig {
                key: format!("{}_RESOURCE", self.backend.key_prefix()),
            })?;
        Ok(format!("{}/user_impersonation", resource.trim_end_matches('/')))
    }

    /// Path of the token cache file for this backend.
    pub fn token_cache_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(format!("{}_token_cache.bin", self.backend))
    }
}

/// Configuration shared by all commands
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory tenant
    pub tenant: String,
    /// Application (client) ID registered with the identity service
    pub client_id: String,
    /// Identity service host
    pub authority_host: Url,
    /// Directory holding the token cache files
    pub cache_dir: PathBuf,
    pub smda: BackendConfig,
    pub pdm: BackendConfig,
    pub ssdl: BackendConfig,
    pub pozo: BackendConfig,
}

impl Config {
    /// Load configuration from a dotenv file.
    ///
    /// # Arguments
    ///
    /// * `env_file`: Path to the dotenv file
    /// * `cache_dir`: Directory holding the token cache files
    pub fn from_env_file(env_file: &Path, cache_dir: &Path) -> Result<Self, WellboreError> {
        let vars = dotenvy::from_path_iter(env_file)?.collect::<Result<HashMap<_, _>, _>>()?;
        tracing::debug!("Read {} configuration keys from {:?}", vars.len(), env_file);
        Self::from_vars(vars, cache_dir)
    }

    /// Build configuration from key/value pairs.
    pub fn from_vars<I>(vars: I, cache_dir: &Path) -> Result<Self, WellboreError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        let required = |key: &str| {
            vars.get(key)
                .cloned()
                .ok_or_else(|| WellboreError::MissingConfig {
                    key: key.to_string(),
                })
        };
        let backend = |backend: Backend| -> Result<BackendConfig, WellboreError> {
            let prefix = backend.key_prefix();
            let api = vars
                .get(&format!("{}_API", prefix))
                .map(String::as_str)
                .unwrap_or(backend.default_api());
            Ok(BackendConfig {
                backend,
                api: base_url(api)?,
                resource: vars
                    .get(&format!("{}_RESOURCE", prefix))
                    .cloned()
                    .or_else(|| backend.default_resource().map(str::to_string)),
                subscription_key: vars.get(&format!("{}_SUBSCRIPTION_KEY", prefix)).cloned(),
            })
        };
        let authority_host = vars
            .get("AUTHORITY_HOST")
            .map(String::as_str)
            .unwrap_or(DEFAULT_AUTHORITY_HOST);

        Ok(Self {
            tenant: required("TENANT")?,
            client_id: required("WEBVIZ_4D_ID")?,
            authority_host: base_url(authority_host)?,
            cache_dir: cache_dir.to_path_buf(),
            smda: backend(Backend::Smda)?,
            pdm: backend(Backend::Pdm)?,
            ssdl: backend(Backend::Ssdl)?,
            pozo: backend(Backend::Pozo)?,
        })
    }

    /// Identity service authority for the tenant.
    pub fn authority(&self) -> Result<Url, WellboreError> {
        Ok(self.authority_host.join(&self.tenant)?)
    }

    /// Configuration of the given backend.
    pub fn backend(&self, backend: Backend) -> &BackendConfig {
        match backend {
            Backend::Smda => &self.smda,
            Backend::Pdm => &self.pdm,
            Backend::Ssdl => &self.ssdl,
            Backend::Pozo => &self.pozo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn vars() -> Vec<(String, String)> {
        [
            ("TENANT", "my-tenant"),
            ("WEBVIZ_4D_ID", "client"),
            ("SMDA_RESOURCE", "api://smda"),
            ("SMDA_SUBSCRIPTION_KEY", "key"),
            ("PDM_API", "http://localhost:1234/pdm"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn from_vars() {
        let config = Config::from_vars(vars(), Path::new("/home/user")).unwrap();
        assert_eq!(config.tenant, "my-tenant");
        assert_eq!(config.client_id, "client");
        assert_eq!(
            config.authority().unwrap().as_str(),
            "https://login.microsoftonline.com/my-tenant"
        );
        assert_eq!(config.smda.scope().unwrap(), "api://smda/user_impersonation");
        assert_eq!(config.smda.subscription_key.as_deref(), Some("key"));
        assert_eq!(config.smda.api.as_str(), Backend::Smda.default_api());
        assert_eq!(config.pdm.api.as_str(), "http://localhost:1234/pdm/");
        assert_eq!(
            config.smda.token_cache_path(&config.cache_dir),
            PathBuf::from("/home/user/SMDA_token_cache.bin")
        );
    }

    #[test]
    fn missing_tenant() {
        let vars = vars().into_iter().filter(|(k, _)| k != "TENANT");
        match Config::from_vars(vars, Path::new("/tmp")) {
            Err(WellboreError::MissingConfig { key }) => assert_eq!(key, "TENANT"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn blank_values_are_missing() {
        let mut vars = vars();
        vars.push(("WEBVIZ_4D_ID".to_string(), "  ".to_string()));
        let vars = vars.into_iter().filter(|(k, v)| k != "WEBVIZ_4D_ID" || v.trim().is_empty());
        assert!(matches!(
            Config::from_vars(vars, Path::new("/tmp")),
            Err(WellboreError::MissingConfig { .. })
        ));
    }

    #[test]
    fn missing_resource_is_reported_on_use() {
        let config = Config::from_vars(vars(), Path::new("/tmp")).unwrap();
        match config.ssdl.scope() {
            Err(WellboreError::MissingConfig { key }) => assert_eq!(key, "SSDL_RESOURCE"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn planned_well_defaults() {
        let config = Config::from_vars(vars(), Path::new("/tmp")).unwrap();
        assert_eq!(
            config.pozo.scope().unwrap(),
            "c3781abc-b5a1-4189-9875-4ed92e5297aa/user_impersonation"
        );
        assert_eq!(config.pozo.subscription_key, None);
        assert_eq!(
            config.pozo.token_cache_path(Path::new("/tmp")),
            PathBuf::from("/tmp/PlannedWell_token_cache.bin")
        );
    }

    #[test]
    fn backend_display() {
        assert_eq!(Backend::Smda.to_string(), "SMDA");
        assert_eq!(Backend::Pozo.to_string(), "PlannedWell");
    }

    #[test]
    fn from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "TENANT=abc").unwrap();
        writeln!(file, "WEBVIZ_4D_ID=\"client id\"").unwrap();
        writeln!(file, "AUTHORITY_HOST=http://127.0.0.1:9999").unwrap();
        let config = Config::from_env_file(file.path(), Path::new("/tmp")).unwrap();
        assert_eq!(config.client_id, "client id");
        assert_eq!(
            config.authority().unwrap().as_str(),
            "http://127.0.0.1:9999/abc"
        );
    }
}
