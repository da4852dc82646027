//! read configuration from a file or the environment

use std::fmt;
use std::path::Path;
use std::time::Duration;

use jiff::SignedDuration;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::Error;
use crate::filter::ProjectFilter;
use crate::session::Credentials;
use crate::token::RefreshPolicy;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// A named set of projects that is always exposed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub projects: Vec<String>,
}

/// Durations accept a number of seconds or a duration string (`500ms`, `1h 30m`, `PT5M`).
#[derive(Clone, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub username: String,
    pub password: String,
    #[serde(default, deserialize_with = "optional_duration")]
    pub cache_ttl: Option<Duration>,
    #[serde(default)]
    pub ignored_projects: Vec<String>,
    #[serde(default)]
    pub project_groups: Vec<ProjectGroup>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub safety_margin: Option<Duration>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub token_lifetime: Option<Duration>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub refresh_interval: Option<Duration>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cache_ttl", &self.cache_ttl)
            .field("ignored_projects", &self.ignored_projects)
            .field("project_groups", &self.project_groups)
            .field("safety_margin", &self.safety_margin)
            .field("token_lifetime", &self.token_lifetime)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

impl Config {
    /// Construct a config from explicit values.
    pub fn from_values(
        api_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        cache_ttl: Option<Duration>,
        ignored_projects: Vec<String>,
        project_groups: Vec<ProjectGroup>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            username: username.into(),
            password: password.into(),
            cache_ttl,
            ignored_projects,
            project_groups,
            safety_margin: None,
            token_lifetime: None,
            refresh_interval: None,
        }
    }

    /// Load config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through `lookup`, which maps an environment key to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| Error::Config(format!("Missing {key} env var")))
        };
        let duration = |key: &str| -> Result<Option<Duration>, Error> {
            var(key).map(|raw| parse_duration(key, &raw)).transpose()
        };

        let project_groups = match var("PROJECT_GROUPS") {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| Error::Config(format!("Failed to parse PROJECT_GROUPS: {e}")))?,
            None => Vec::new(),
        };
        let ignored_projects = var("IGNORED_PROJECTS")
            .map(|raw| {
                raw.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cfg = Config {
            api_url: required("ARGOCD_API_URL")?,
            username: required("ARGOCD_USERNAME")?,
            password: required("ARGOCD_PASSWORD")?,
            cache_ttl: duration("CACHE_TTL")?,
            ignored_projects,
            project_groups,
            safety_margin: duration("TOKEN_SAFETY_MARGIN")?,
            token_lifetime: duration("TOKEN_LIFETIME")?,
            refresh_interval: duration("TOKEN_REFRESH_INTERVAL")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(Error::Config("username and password are required".into()));
        }
        self.api_base()?;
        self.refresh_policy()?;
        Ok(())
    }

    /// Upstream base URL without a trailing slash, `https://` when no scheme is given.
    pub fn api_base(&self) -> Result<String, Error> {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        let base = if trimmed.starts_with("http") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        reqwest::Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid API URL '{base}': {e}")))?;
        Ok(base)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    pub fn project_filter(&self) -> ProjectFilter {
        ProjectFilter::new(self.ignored_projects.clone(), self.project_groups.clone())
    }

    pub fn refresh_policy(&self) -> Result<RefreshPolicy, Error> {
        RefreshPolicy::new(
            self.safety_margin
                .unwrap_or(RefreshPolicy::DEFAULT_SAFETY_MARGIN),
            self.token_lifetime
                .unwrap_or(RefreshPolicy::DEFAULT_ASSUMED_LIFETIME),
            self.refresh_interval
                .unwrap_or(RefreshPolicy::DEFAULT_BACKGROUND_INTERVAL),
        )
    }
}

/// Accepts bare seconds (`45`) or a jiff duration (`500ms`, `1.5s`, `1h 30m`, `PT5M`).
/// Negative durations clamp to zero, which disables caching.
fn parse_duration(key: &str, raw: &str) -> Result<Duration, Error> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let duration: SignedDuration = raw
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse {key} {raw:?}: {e}")))?;
    if duration.is_negative() {
        return Ok(Duration::ZERO);
    }
    Duration::try_from(duration)
        .map_err(|e| Error::Config(format!("Failed to parse {key} {raw:?}: {e}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Secs(u64),
    Text(String),
}

fn optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDuration>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDuration::Secs(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(RawDuration::Text(raw)) => parse_duration("duration", &raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
