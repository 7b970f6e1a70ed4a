use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ekko_types::VersionToken;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BlobError, BlobResult};
use crate::traits::{BlobStore, RawBlob};

/// Location of the backing repository. The `token` is a bearer token with
/// contents read/write scope; it is carried in request headers only and
/// never logged.
#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
    /// Directory inside the repository holding the shard objects.
    pub dir: String,
    /// API root, overridable for proxies and tests.
    pub api_base: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            token: String::new(),
            dir: "data".to_string(),
            api_base: "https://api.github.com".to_string(),
        }
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("dir", &self.dir)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// Blob store backend over the GitHub contents API.
///
/// Each shard is one file under `{dir}/` on `{branch}`. The file's blob
/// `sha` is the version token: a `PUT` carrying a stale `sha` is rejected
/// by GitHub, which is exactly the compare-and-swap the [`BlobStore`]
/// contract requires.
pub struct GitHubBlobStore {
    config: GitHubConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

impl GitHubBlobStore {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn object_url(&self, name: &str) -> String {
        let c = &self.config;
        format!(
            "{}/repos/{}/{}/contents/{}/{}",
            c.api_base, c.owner, c.repo, c.dir, name
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            // The API rejects requests without a user agent.
            .header("User-Agent", "ekko")
    }
}

/// Decode a contents-API `content` field. GitHub wraps the base64 at 60
/// columns; the newlines must be stripped before decoding.
fn decode_content(content: &str) -> BlobResult<Vec<u8>> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(compact)
        .map_err(|e| BlobError::Unavailable(format!("undecodable content field: {e}")))
}

#[async_trait]
impl BlobStore for GitHubBlobStore {
    async fn fetch(&self, name: &str) -> BlobResult<RawBlob> {
        let url = format!("{}?ref={}", self.object_url(name), self.config.branch);
        debug!(object = name, "contents fetch");

        let res = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        match res.status() {
            StatusCode::NOT_FOUND => Err(BlobError::NotFound(name.to_string())),
            status if !status.is_success() => {
                let body = res.text().await.unwrap_or_default();
                Err(BlobError::Unavailable(format!("GET {status}: {body}")))
            }
            _ => {
                let parsed: ContentsResponse = res
                    .json()
                    .await
                    .map_err(|e| BlobError::Unavailable(e.to_string()))?;
                Ok(RawBlob {
                    bytes: decode_content(&parsed.content)?,
                    version: VersionToken::new(parsed.sha),
                })
            }
        }
    }

    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        base: Option<&VersionToken>,
        message: &str,
    ) -> BlobResult<VersionToken> {
        let url = self.object_url(name);
        debug!(object = name, create = base.is_none(), "contents put");

        let body = PutRequest {
            message,
            content: BASE64.encode(bytes),
            sha: base.map(VersionToken::as_str),
            branch: &self.config.branch,
        };

        let res = self
            .request(reqwest::Method::PUT, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        match res.status() {
            // Stale sha; 422 also covers creating a path that already exists.
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(BlobError::Conflict(name.to_string()))
            }
            status if !status.is_success() => {
                let text = res.text().await.unwrap_or_default();
                Err(BlobError::Unavailable(format!("PUT {status}: {text}")))
            }
            _ => {
                let parsed: PutResponse = res
                    .json()
                    .await
                    .map_err(|e| BlobError::Unavailable(e.to_string()))?;
                Ok(VersionToken::new(parsed.content.sha))
            }
        }
    }
}

impl std::fmt::Debug for GitHubBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubBlobStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
