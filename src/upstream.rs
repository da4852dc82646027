//! Authenticated, cached access to the upstream listing endpoints.

use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::TimedCache;
use crate::config::Config;
use crate::errors::Error;
use crate::filter::{ProjectFilter, ProjectGroupsResponse};
use crate::session::SessionAuthenticator;
use crate::token::{TokenGuard, TokenGuardConfig};
use crate::types::{
    HealthReport, HealthState, ResourceList, application_project, resource_name,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct UpstreamClient {
    base: String,
    http: Client,
    guard: Arc<TokenGuard>,
    filter: ProjectFilter,
    projects: TimedCache<ResourceList>,
    applications: TimedCache<ResourceList>,
}

impl UpstreamClient {
    pub fn new(
        base: impl Into<String>,
        guard: Arc<TokenGuard>,
        filter: ProjectFilter,
        cache_ttl: Duration,
    ) -> Result<Self, Error> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            http,
            guard,
            filter,
            projects: TimedCache::new(cache_ttl),
            applications: TimedCache::new(cache_ttl),
        })
    }

    /// Wires the session authenticator, token guard and caches from `config`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let base = config.api_base()?;
        let authenticator = Arc::new(SessionAuthenticator::new(&base)?);
        let guard = TokenGuard::new(
            authenticator,
            TokenGuardConfig {
                credentials: config.credentials(),
                policy: config.refresh_policy()?,
            },
        );
        Self::new(
            base,
            Arc::new(guard),
            config.project_filter(),
            config.cache_ttl(),
        )
    }

    pub fn guard(&self) -> Arc<TokenGuard> {
        Arc::clone(&self.guard)
    }

    pub fn filter(&self) -> &ProjectFilter {
        &self.filter
    }

    pub fn invalidate_caches(&self) {
        self.projects.invalidate();
        self.applications.invalidate();
    }

    /// Sends an authenticated request to `{base}{path}`.
    ///
    /// A `401` drops the token the request carried, unless a concurrent
    /// refresh has already replaced it.
    async fn send(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response, Error> {
        let url = format!("{}{}", self.base, path);
        let token = self.guard.get_valid_token(cancel).await?;
        let req = self.guard.authorize(&token, method, &url, body)?;
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            resp = self.http.execute(req) => resp?,
        };
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.guard.invalidate_if_current(&token);
        }
        Ok(resp)
    }

    /// Forwards an arbitrary authenticated request and hands back the raw
    /// response, whatever its status.
    pub async fn proxy_request(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response, Error> {
        debug!(%method, path, "proxying upstream request");
        self.send(cancel, method, path, body).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<T, Error> {
        let resp = self.send(cancel, Method::GET, path, None).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, path, body = %body, "upstream request failed");
            return Err(Error::Upstream(status, body));
        }
        Ok(resp.json().await?)
    }

    async fn cached_list(
        &self,
        cancel: &CancellationToken,
        cache: &TimedCache<ResourceList>,
        path: &str,
    ) -> Result<ResourceList, Error> {
        if let Some(list) = cache.get() {
            debug!(path, "cache.hit");
            return Ok(list);
        }
        debug!(path, "cache.miss");
        let list: ResourceList = self.get_json(cancel, path).await?;
        cache.set(list.clone());
        Ok(list)
    }

    /// All projects, unfiltered.
    pub async fn projects(&self, cancel: &CancellationToken) -> Result<ResourceList, Error> {
        self.cached_list(cancel, &self.projects, "/projects").await
    }

    pub async fn filtered_projects(&self, cancel: &CancellationToken) -> Result<Vec<Value>, Error> {
        let projects = self.projects(cancel).await?;
        Ok(projects
            .items
            .into_iter()
            .filter(|p| !self.filter.should_filter(resource_name(p).unwrap_or_default()))
            .collect())
    }

    pub async fn project_names(&self, cancel: &CancellationToken) -> Result<Vec<String>, Error> {
        let projects = self.projects(cancel).await?;
        Ok(projects
            .items
            .iter()
            .filter_map(resource_name)
            .map(str::to_string)
            .collect())
    }

    pub async fn project_groups(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ProjectGroupsResponse, Error> {
        let names = self.project_names(cancel).await?;
        Ok(self.filter.project_groups(names.as_slice()))
    }

    /// Applications outside filtered projects, each with `ingressUrls` set.
    pub async fn applications(&self, cancel: &CancellationToken) -> Result<ResourceList, Error> {
        let list = self
            .cached_list(cancel, &self.applications, "/applications")
            .await?;
        let items = list
            .items
            .iter()
            .filter(|app| !self.filter.should_filter(application_project(app).unwrap_or_default()))
            .cloned()
            .map(with_ingress_urls)
            .collect();
        Ok(list.with_items(items))
    }

    pub async fn application(&self, cancel: &CancellationToken, name: &str) -> Result<Value, Error> {
        let path = format!("/applications/{}", urlencoding::encode(name));
        let app: Value = match self.get_json(cancel, &path).await {
            Err(Error::NotFound(_)) => {
                return Err(Error::NotFound(format!("application '{name}' not found")));
            }
            other => other?,
        };
        let project = application_project(&app).unwrap_or_default();
        if self.filter.should_filter(project) {
            return Err(Error::NotFound(format!(
                "application '{name}' belongs to filtered project '{project}'"
            )));
        }
        Ok(with_ingress_urls(app))
    }

    /// External URLs of one application, empty when it exposes none.
    pub async fn ingress_urls(&self, cancel: &CancellationToken, name: &str) -> Result<Vec<String>, Error> {
        let app = self.application(cancel, name).await?;
        Ok(app
            .get("ingressUrls")
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn applications_by_project(
        &self,
        cancel: &CancellationToken,
        project: &str,
    ) -> Result<ResourceList, Error> {
        let all = self.applications(cancel).await?;
        let items = all
            .items
            .iter()
            .filter(|app| application_project(app) == Some(project))
            .cloned()
            .collect();
        Ok(all.with_items(items))
    }

    pub async fn applications_by_group(
        &self,
        cancel: &CancellationToken,
        group: &str,
    ) -> Result<ResourceList, Error> {
        let members = self
            .filter
            .group(group)
            .map(|g| g.projects.clone())
            .ok_or_else(|| Error::NotFound(format!("project group '{group}' not found")))?;
        let all = self.applications(cancel).await?;
        let items = all
            .items
            .iter()
            .filter(|app| {
                application_project(app).is_some_and(|p| members.iter().any(|m| m == p))
            })
            .cloned()
            .collect();
        Ok(all.with_items(items))
    }

    /// Token status plus a bounded probe of the upstream.
    pub async fn health(&self, cancel: &CancellationToken) -> HealthReport {
        let probe = self.probe(cancel).await;
        let (status, upstream) = match probe {
            Ok(()) => (HealthState::Healthy, "healthy".to_string()),
            Err(err) => {
                warn!(error = %err, "upstream health check failed");
                (HealthState::Degraded, format!("error: {err}"))
            }
        };
        HealthReport {
            status,
            timestamp: Timestamp::now(),
            token_status: self.guard.token_status(),
            upstream,
        }
    }

    async fn probe(&self, cancel: &CancellationToken) -> Result<(), Error> {
        self.guard.get_valid_token(cancel).await?;
        tokio::time::timeout(HEALTH_TIMEOUT, self.get_json::<Value>(cancel, "/projects"))
            .await
            .map_err(|_| Error::Timeout(HEALTH_TIMEOUT))??;
        Ok(())
    }
}

/// Copies `status.summary.externalURLs` to a top-level `ingressUrls`.
fn with_ingress_urls(mut app: Value) -> Value {
    let urls = app
        .pointer("/status/summary/externalURLs")
        .and_then(Value::as_array)
        .filter(|urls| !urls.is_empty())
        .cloned();
    if let Some(urls) = urls
        && let Some(obj) = app.as_object_mut()
    {
        obj.insert("ingressUrls".to_string(), Value::Array(urls));
    }
    app
}
