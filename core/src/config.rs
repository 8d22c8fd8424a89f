use crate::identity::{Identity, IdentityProvider, LocalIdentityProvider};
use crate::oauth::OAuthRefreshProvider;
use directories::BaseDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const API_URL_ENV: &str = "POCKETBOOK_API_URL";
pub const API_TIMEOUT_ENV: &str = "POCKETBOOK_API_TIMEOUT_MS";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySettings {
    Local {
        profile: Identity,
        token: Option<String>,
    },
    OAuthRefresh {
        profile: Identity,
        token_endpoint: String,
        client_id: Option<String>,
        refresh_token: String,
    },
}

impl IdentitySettings {
    pub fn profile(&self) -> &Identity {
        match self {
            Self::Local { profile, .. } | Self::OAuthRefresh { profile, .. } => profile,
        }
    }

    pub fn build_provider(&self) -> Arc<dyn IdentityProvider> {
        match self {
            Self::Local { profile, token } => {
                Arc::new(LocalIdentityProvider::new(profile.clone(), token.clone()))
            }
            Self::OAuthRefresh {
                profile,
                token_endpoint,
                client_id,
                refresh_token,
            } => Arc::new(OAuthRefreshProvider::new(
                profile.clone(),
                token_endpoint.clone(),
                client_id.clone(),
                refresh_token.clone(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api: ApiSettings,
    pub identity: IdentitySettings,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Pocketbook is not configured: create pocketbook.yaml or set POCKETBOOK_API_URL.")]
    Missing,
    #[error("configuration invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Missing => {
                "Pocketbook is not configured: create pocketbook.yaml or set POCKETBOOK_API_URL."
                    .to_string()
            }
            Self::Invalid(detail) => format!("Pocketbook is not configured: {detail}."),
        }
    }
}

impl ClientSettings {
    /// Load `.env`, the first pocketbook.yaml found (or `explicit`), then apply
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let raw = match explicit {
            Some(path) => Some(read_config(path)?),
            None => match locate_config_file() {
                Some(path) => Some(read_config(&path)?),
                None => None,
            },
        };
        if raw.is_none() && std::env::var(API_URL_ENV).is_err() {
            return Err(ConfigError::Missing);
        }
        resolve(raw.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        resolve(parse_config(contents)?, |_| None)
    }
}

fn read_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        ConfigError::Invalid(format!("failed to read {}: {err}", path.display()))
    })?;
    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<RawConfig, ConfigError> {
    serde_yaml::from_str(contents)
        .map_err(|err| ConfigError::Invalid(format!("invalid pocketbook.yaml: {err}")))
}

fn resolve(
    raw: RawConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, ConfigError> {
    let api = raw.api.unwrap_or_default();
    let base_url = env(API_URL_ENV)
        .or(api.url)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ConfigError::Invalid("missing api url".to_string()))?;
    let timeout_ms = match env(API_TIMEOUT_ENV) {
        Some(value) => value.trim().parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!("{API_TIMEOUT_ENV} must be milliseconds, got `{value}`"))
        })?,
        None => api.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
    };
    if timeout_ms == 0 {
        return Err(ConfigError::Invalid("api timeout must be positive".to_string()));
    }
    Ok(ClientSettings {
        api: ApiSettings {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        },
        identity: resolve_identity(raw.identity.unwrap_or_default())?,
    })
}

fn resolve_identity(section: IdentitySection) -> Result<IdentitySettings, ConfigError> {
    let uid = section.uid.trim().to_string();
    let profile = Identity {
        uid: if uid.is_empty() { "local-user".to_string() } else { uid },
        display_name: non_empty(section.display_name),
        email: non_empty(section.email),
        photo_url: non_empty(section.photo_url),
    };
    match section.provider.unwrap_or_default() {
        ProviderKind::Local => Ok(IdentitySettings::Local {
            profile,
            token: non_empty(section.token),
        }),
        ProviderKind::OauthRefresh => {
            let token_endpoint = non_empty(section.token_endpoint).ok_or_else(|| {
                ConfigError::Invalid("missing identity token_endpoint".to_string())
            })?;
            let refresh_token = non_empty(section.refresh_token).ok_or_else(|| {
                ConfigError::Invalid("missing identity refresh_token".to_string())
            })?;
            Ok(IdentitySettings::OAuthRefresh {
                profile,
                token_endpoint,
                client_id: non_empty(section.client_id),
                refresh_token,
            })
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn locate_config_file() -> Option<PathBuf> {
    config_candidates().into_iter().find(|path| path.exists())
}

fn config_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = BaseDirs::new() {
        let config_dir = base.config_dir().join("pocketbook");
        paths.push(config_dir.join("pocketbook.yaml"));
        paths.push(config_dir.join("pocketbook.yml"));
        let home_dir = base.home_dir();
        paths.push(home_dir.join(".pocketbook").join("pocketbook.yaml"));
        paths.push(home_dir.join(".pocketbook").join("pocketbook.yml"));
    }
    paths.push(PathBuf::from("pocketbook.yaml"));
    paths.push(PathBuf::from("pocketbook.yml"));
    paths
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    api: Option<ApiSection>,
    identity: Option<IdentitySection>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum ProviderKind {
    #[default]
    Local,
    OauthRefresh,
}

#[derive(Debug, Default, Deserialize)]
struct IdentitySection {
    #[serde(default)]
    provider: Option<ProviderKind>,
    #[serde(default)]
    uid: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_endpoint: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}
