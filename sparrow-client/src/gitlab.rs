//! GitLab-backed [`RemoteInteractor`]: speaks the project-files HTTP API
//! (§4.4) with a private-token header.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use sparrow_core::{GlobalTarget, RegistryFile};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::InteractorError;
use crate::interactor::RemoteInteractor;

/// Configuration for the GitLab backend.
///
/// `branch` defaults to the project's default branch, discovered on first
/// use; if that lookup fails the backend falls back to `"main"`.
#[derive(Debug, Clone)]
pub struct GitlabConfig {
    /// Base URL of the GitLab instance, e.g. `https://gitlab.example.com`.
    pub base_url: String,
    /// Numeric or URL-encoded `namespace/project` project identifier.
    pub project_id: String,
    /// Private token sent as the `PRIVATE-TOKEN` header. Never logged.
    pub token: String,
    /// Branch to read from and commit to.
    pub branch: Option<String>,
    /// Directory within the repository holding the registry files.
    pub path: String,
}

/// [`RemoteInteractor`] implementation over the GitLab repository-files API.
pub struct GitlabInteractor {
    client: reqwest::Client,
    config: GitlabConfig,
}

impl GitlabInteractor {
    /// Build a new interactor. Fails if `base_url` or `project_id` is empty.
    pub fn new(config: GitlabConfig) -> Result<Self, InteractorError> {
        if config.base_url.is_empty() {
            return Err(InteractorError::InvalidConfig("gitlab base_url must not be empty".into()));
        }
        if config.project_id.is_empty() {
            return Err(InteractorError::InvalidConfig("gitlab project_id must not be empty".into()));
        }
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "PRIVATE-TOKEN",
            header::HeaderValue::from_str(&config.token)
                .map_err(|_| InteractorError::InvalidConfig("gitlab token contains invalid header bytes".into()))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(InteractorError::Http)?;
        Ok(Self { client, config })
    }

    async fn branch(&self) -> String {
        if let Some(branch) = &self.config.branch {
            return branch.clone();
        }
        self.discover_default_branch().await.unwrap_or_else(|| "main".to_string())
    }

    async fn discover_default_branch(&self) -> Option<String> {
        let url = format!(
            "{}/api/v4/projects/{}",
            self.config.base_url, self.config.project_id
        );
        let resp = self.client.get(&url).send().await.ok()?;
        let body: serde_json::Value = resp.json().await.ok()?;
        body.get("default_branch")?.as_str().map(str::to_string)
    }

    fn file_url(&self, name: &str) -> String {
        let encoded = urlencoding_path(&format!("{}/{}", self.config.path.trim_matches('/'), name));
        format!(
            "{}/api/v4/projects/{}/repository/files/{}",
            self.config.base_url, self.config.project_id, encoded
        )
    }
}

fn urlencoding_path(path: &str) -> String {
    path.replace('/', "%2F")
}

#[async_trait]
impl RemoteInteractor for GitlabInteractor {
    #[instrument(skip(self, cancel))]
    async fn fetch_files(&self, cancel: &CancellationToken) -> Result<Vec<GlobalTarget>, InteractorError> {
        let branch = self.branch().await;
        let mut out = Vec::new();
        let mut page_url = Some(format!(
            "{}/api/v4/projects/{}/repository/tree?path={}&ref={}&per_page=100",
            self.config.base_url,
            self.config.project_id,
            self.config.path.trim_matches('/'),
            branch
        ));

        while let Some(url) = page_url.take() {
            if cancel.is_cancelled() {
                return Err(InteractorError::InvalidConfig("cancelled".into()));
            }
            let resp = self.client.get(&url).send().await?;
            let next = next_link(resp.headers());
            let entries: Vec<serde_json::Value> = resp.json().await?;
            for entry in entries {
                let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
                    continue;
                };
                if !name.ends_with(".json") {
                    continue;
                }
                let raw_url = format!("{}/raw?ref={}", self.file_url(name), branch);
                let raw = self.client.get(&raw_url).send().await?;
                if raw.status() != StatusCode::OK {
                    debug!(status = %raw.status(), file = name, "skipping unreadable registry file");
                    continue;
                }
                let target: GlobalTarget = raw.json().await?;
                out.push(target);
            }
            page_url = next;
        }
        Ok(out)
    }

    #[instrument(skip(self, cancel, file), fields(name = %file.name))]
    async fn post_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError> {
        if cancel.is_cancelled() {
            return Err(InteractorError::InvalidConfig("cancelled".into()));
        }
        let branch = self.branch().await;
        let url = self.file_url(&file.file_name());
        let resp = self
            .client
            .post(&url)
            .json(&commit_body(file, &branch))
            .send()
            .await?;
        expect_status(resp, StatusCode::CREATED).await
    }

    #[instrument(skip(self, cancel, file), fields(name = %file.name))]
    async fn put_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError> {
        if cancel.is_cancelled() {
            return Err(InteractorError::InvalidConfig("cancelled".into()));
        }
        let branch = self.branch().await;
        let url = self.file_url(&file.file_name());
        let resp = self.client.put(&url).json(&commit_body(file, &branch)).send().await?;
        expect_status(resp, StatusCode::OK).await
    }

    #[instrument(skip(self, cancel, file), fields(name = %file.name))]
    async fn delete_file(&self, cancel: &CancellationToken, file: &RegistryFile) -> Result<(), InteractorError> {
        if file.name.is_empty() {
            return Err(InteractorError::InvalidConfig("delete_file requires a non-empty name".into()));
        }
        if cancel.is_cancelled() {
            return Err(InteractorError::InvalidConfig("cancelled".into()));
        }
        let branch = self.branch().await;
        let url = self.file_url(&file.file_name());
        let resp = self
            .client
            .delete(&url)
            .query(&[("branch", branch.as_str()), ("commit_message", file.commit_message.as_str())])
            .send()
            .await?;
        expect_status(resp, StatusCode::NO_CONTENT).await
    }
}

fn commit_body(file: &RegistryFile, branch: &str) -> serde_json::Value {
    serde_json::json!({
        "branch": branch,
        "content": serde_json::to_string(&file.content).unwrap_or_default(),
        "commit_message": file.commit_message,
        "author_name": file.author_name,
        "author_email": file.author_email,
    })
}

async fn expect_status(resp: reqwest::Response, expected: StatusCode) -> Result<(), InteractorError> {
    let status = resp.status();
    if status == expected {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        let body = resp.text().await.unwrap_or_default();
        return Err(InteractorError::NotFound(body));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(InteractorError::InvalidConfig(format!(
        "unexpected status {status}: {body}"
    )))
}

fn next_link(headers: &header::HeaderMap) -> Option<String> {
    let link = headers.get(header::LINK)?.to_str().ok()?;
    for part in link.split(',') {
        let mut segments = part.split(';');
        let url_part = segments.next()?.trim();
        let rel_is_next = segments.any(|s| s.trim() == r#"rel="next""#);
        if rel_is_next {
            return Some(url_part.trim_start_matches('<').trim_end_matches('>').to_string());
        }
    }
    None
}
