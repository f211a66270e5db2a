//! GitLab provider (REST v4) for merge request listing, diffs and comments.
//!
//! Endpoints used:
//!   * GET  /projects/:id/merge_requests?state=:state
//!   * GET  /projects/:id/merge_requests/:iid/diffs
//!   * GET  /projects/:id/merge_requests/:iid/versions
//!   * POST /projects/:id/merge_requests/:iid/notes
//!   * POST /projects/:id/merge_requests/:iid/discussions
//!
//! List endpoints are paginated through the `X-Next-Page` header; items are
//! returned in the order GitLab serves them.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{
    GitContextEngineError, GitContextEngineProviderError, GitContextEngineResult,
};
use crate::git_providers::ProviderConfig;
use crate::git_providers::types::*;

const PER_PAGE: &str = "100";
const MAX_PAGES: u32 = 50;
const SNIPPET_LEN: usize = 200;

/// GitLab HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String, // e.g. "https://gitlab.com/api/v4"
    token: String,    // "PRIVATE-TOKEN"
}

impl GitLabClient {
    /// Builds a client with a stable user agent and the configured timeout.
    pub fn new(cfg: &ProviderConfig) -> GitContextEngineResult<Self> {
        debug!("Creating GitLabClient with base_api={}", cfg.base_api);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("mr-gpt-review/0.1"));

        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_api: cfg.base_api.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        })
    }

    /// Lists merge requests of `project`, filtered server-side by `state`.
    pub async fn list_merge_requests(
        &self,
        project: &str,
        state: MergeRequestState,
    ) -> GitContextEngineResult<Vec<MergeRequest>> {
        let url = format!(
            "{}/projects/{}/merge_requests",
            self.base_api,
            urlencoding::encode(project)
        );
        debug!("GitLab list_merge_requests: {} state={}", url, state.as_query());

        let raw: Vec<GitLabMr> = self
            .get_paged(&url, &[("state", state.as_query())])
            .await?;

        Ok(raw
            .into_iter()
            .map(|mr| MergeRequest {
                iid: mr.iid,
                state: mr.state,
                project_id: mr.project_id,
                title: mr.title,
                web_url: mr.web_url,
            })
            .collect())
    }

    /// Fetches file-level diffs of a merge request in service order.
    pub async fn get_changes(&self, id: &ChangeRequestId) -> GitContextEngineResult<Vec<Change>> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/diffs",
            self.base_api,
            urlencoding::encode(&id.project),
            id.iid
        );
        debug!("GitLab get_changes: {}", url);

        let files: Vec<GitLabMrDiffFile> = self.get_paged(&url, &[]).await?;

        Ok(files
            .into_iter()
            .map(|f| Change {
                old_path: f.old_path,
                new_path: f.new_path,
                diff: f.diff.unwrap_or_default(),
            })
            .collect())
    }

    /// Fetches diff versions of a merge request, newest first.
    pub async fn get_diff_versions(
        &self,
        id: &ChangeRequestId,
    ) -> GitContextEngineResult<Vec<DiffVersion>> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/versions",
            self.base_api,
            urlencoding::encode(&id.project),
            id.iid
        );
        debug!("GitLab get_diff_versions: {}", url);

        let raw: Vec<GitLabDiffVersion> = self.get_paged(&url, &[]).await?;

        Ok(raw
            .into_iter()
            .map(|v| DiffVersion {
                id: v.id,
                base_commit_sha: v.base_commit_sha,
                start_commit_sha: v.start_commit_sha,
                head_commit_sha: v.head_commit_sha,
            })
            .collect())
    }

    /// Posts an unpositioned note and returns its id.
    pub async fn create_note(&self, id: &ChangeRequestId, body: &str) -> GitContextEngineResult<u64> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/notes",
            self.base_api,
            urlencoding::encode(&id.project),
            id.iid
        );
        debug!("GitLab create_note: {} body_len={}", url, body.len());

        let resp = self
            .http
            .post(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&GitLabNoteCreate { body })
            .send()
            .await?;

        let note: GitLabNoteResp = check_status(resp, &url).await?.json().await?;
        Ok(note.id)
    }

    /// Starts a discussion anchored at `position` and returns its id.
    pub async fn create_discussion(
        &self,
        id: &ChangeRequestId,
        body: &str,
        position: &DiffPosition,
    ) -> GitContextEngineResult<String> {
        if !position.has_all_commits() {
            return Err(GitContextEngineError::Validation(
                "discussion position requires base, start and head SHAs".into(),
            ));
        }

        let url = format!(
            "{}/projects/{}/merge_requests/{}/discussions",
            self.base_api,
            urlencoding::encode(&id.project),
            id.iid
        );
        debug!(
            "GitLab create_discussion: {} path={} line={}",
            url, position.new_path, position.new_line
        );

        let payload = GitLabDiscussionCreate {
            body,
            position: GitLabPosition {
                base_sha: &position.base_sha,
                start_sha: &position.start_sha,
                head_sha: &position.head_sha,
                position_type: "text",
                old_path: &position.old_path,
                new_path: &position.new_path,
                old_line: position.old_line,
                new_line: position.new_line,
            },
        };

        let resp = self
            .http
            .post(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?;

        let disc: GitLabDiscussionResp = check_status(resp, &url).await?.json().await?;
        Ok(disc.id)
    }

    /// GETs every page of a list endpoint and concatenates the items.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> GitContextEngineResult<Vec<T>> {
        let mut out = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_str = page.to_string();
            let resp = self
                .http
                .get(url)
                .header("PRIVATE-TOKEN", &self.token)
                .query(query)
                .query(&[("per_page", PER_PAGE), ("page", page_str.as_str())])
                .send()
                .await?;

            let resp = check_status(resp, url).await?;
            let next = resp
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());

            let batch: Vec<T> = resp.json().await?;
            debug!("GitLab page {} of {}: {} items", page, url, batch.len());
            out.extend(batch);

            match next {
                Some(n) if n > page && n <= MAX_PAGES => page = n,
                Some(n) if n > MAX_PAGES => {
                    warn!(%url, "GitLab pagination stopped after {} pages", MAX_PAGES);
                    break;
                }
                _ => break,
            }
        }

        Ok(out)
    }
}

/// Passes successful responses through; maps everything else to a provider
/// error, keeping the `Retry-After` hint and logging a body snippet.
async fn check_status(resp: Response, url: &str) -> GitContextEngineResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let text = resp.text().await.unwrap_or_default();
    let snippet: String = text.chars().take(SNIPPET_LEN).collect();

    warn!(
        status = status.as_u16(),
        %url,
        %snippet,
        "GitLab returned non-success status"
    );

    Err(GitContextEngineProviderError::from_status(status.as_u16(), retry_after).into())
}

/// GitLab MR list item (subset).
#[derive(Debug, Deserialize)]
struct GitLabMr {
    iid: u64,
    state: String,
    project_id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabMrDiffFile {
    old_path: String,
    new_path: String,
    #[serde(default)]
    diff: Option<String>, // unified diff; None for binary/too large
}

#[derive(Debug, Deserialize)]
struct GitLabDiffVersion {
    id: u64,
    head_commit_sha: String,
    base_commit_sha: String,
    start_commit_sha: String,
}

#[derive(Debug, Serialize)]
struct GitLabNoteCreate<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitLabNoteResp {
    id: u64,
}

#[derive(Debug, Serialize)]
struct GitLabPosition<'a> {
    base_sha: &'a str,
    start_sha: &'a str,
    head_sha: &'a str,
    position_type: &'static str, // always "text" here
    old_path: &'a str,
    new_path: &'a str,
    old_line: u32,
    new_line: u32,
}

#[derive(Debug, Serialize)]
struct GitLabDiscussionCreate<'a> {
    body: &'a str,
    position: GitLabPosition<'a>,
}

#[derive(Debug, Deserialize)]
struct GitLabDiscussionResp {
    id: String,
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn client_for(server: &Server) -> GitLabClient {
        GitLabClient::new(&ProviderConfig {
            base_api: server.url(),
            token: "glpat-test".into(),
            timeout_secs: 5,
        })
        .expect("client")
    }

    fn mr_id(iid: u64) -> ChangeRequestId {
        ChangeRequestId {
            project: "123".into(),
            iid,
        }
    }

    #[tokio::test]
    async fn lists_merge_requests_across_pages() {
        let mut server = Server::new_async().await;

        let first = server
            .mock("GET", "/projects/123/merge_requests")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "opened".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .match_header("PRIVATE-TOKEN", "glpat-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("x-next-page", "2")
            .with_body(
                json!([{ "iid": 42, "state": "opened", "project_id": 123, "title": "Add foo" }])
                    .to_string(),
            )
            .create_async()
            .await;

        let second = server
            .mock("GET", "/projects/123/merge_requests")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "opened".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("x-next-page", "")
            .with_body(
                json!([{ "iid": 7, "state": "opened", "project_id": 123, "title": "Fix bar",
                         "web_url": "https://gitlab.example.com/g/p/-/merge_requests/7" }])
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let mrs = client
            .list_merge_requests("123", MergeRequestState::Opened)
            .await
            .expect("list");

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(mrs.iter().map(|m| m.iid).collect::<Vec<_>>(), vec![42, 7]);
        assert_eq!(mrs[0].title, "Add foo");
        assert_eq!(mrs[0].web_url, None);
        assert_eq!(
            mrs[1].web_url.as_deref(),
            Some("https://gitlab.example.com/g/p/-/merge_requests/7")
        );
    }

    #[tokio::test]
    async fn fetches_changes_in_service_order() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/123/merge_requests/42/diffs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    { "old_path": "z.go", "new_path": "z.go", "diff": "+z()",
                      "new_file": false, "renamed_file": false, "deleted_file": false },
                    { "old_path": "a.go", "new_path": "b.go", "diff": "",
                      "new_file": false, "renamed_file": true, "deleted_file": false },
                    { "old_path": "logo.png", "new_path": "logo.png",
                      "new_file": true, "renamed_file": false, "deleted_file": false }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let changes = client_for(&server)
            .get_changes(&mr_id(42))
            .await
            .expect("changes");

        assert_eq!(
            changes,
            vec![
                Change {
                    old_path: "z.go".into(),
                    new_path: "z.go".into(),
                    diff: "+z()".into()
                },
                Change {
                    old_path: "a.go".into(),
                    new_path: "b.go".into(),
                    diff: String::new()
                },
                Change {
                    old_path: "logo.png".into(),
                    new_path: "logo.png".into(),
                    diff: String::new()
                },
            ]
        );
    }

    #[tokio::test]
    async fn fetches_diff_versions() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/123/merge_requests/42/versions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "id": 110,
                    "head_commit_sha": "33e2ee85",
                    "base_commit_sha": "eeb57dff",
                    "start_commit_sha": "eeb57dff",
                    "created_at": "2016-07-26T14:44:48.926Z",
                    "merge_request_id": 105,
                    "state": "collected",
                    "real_size": "1"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let versions = client_for(&server)
            .get_diff_versions(&mr_id(42))
            .await
            .expect("versions");

        assert_eq!(
            versions,
            vec![DiffVersion {
                id: 110,
                base_commit_sha: "eeb57dff".into(),
                start_commit_sha: "eeb57dff".into(),
                head_commit_sha: "33e2ee85".into(),
            }]
        );
    }

    #[tokio::test]
    async fn posts_note_body() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/projects/123/merge_requests/42/notes")
            .match_header("PRIVATE-TOKEN", "glpat-test")
            .match_body(Matcher::PartialJson(json!({ "body": "hello" })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(json!({ "id": 9001, "body": "hello" }).to_string())
            .create_async()
            .await;

        let id = client_for(&server)
            .create_note(&mr_id(42), "hello")
            .await
            .expect("note");

        m.assert_async().await;
        assert_eq!(id, 9001);
    }

    #[tokio::test]
    async fn posts_positioned_discussion() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/projects/123/merge_requests/42/discussions")
            .match_body(Matcher::PartialJson(json!({
                "body": "Code review by ChatGPT:\nMissing nil check",
                "position": {
                    "base_sha": "base",
                    "start_sha": "start",
                    "head_sha": "head",
                    "position_type": "text",
                    "old_path": "a.go",
                    "new_path": "a.go",
                    "old_line": 1,
                    "new_line": 1
                }
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(json!({ "id": "6a9c1750b37d", "notes": [] }).to_string())
            .create_async()
            .await;

        let position = DiffPosition {
            base_sha: "base".into(),
            start_sha: "start".into(),
            head_sha: "head".into(),
            old_path: "a.go".into(),
            new_path: "a.go".into(),
            old_line: 1,
            new_line: 1,
        };

        let id = client_for(&server)
            .create_discussion(
                &mr_id(42),
                "Code review by ChatGPT:\nMissing nil check",
                &position,
            )
            .await
            .expect("discussion");

        m.assert_async().await;
        assert_eq!(id, "6a9c1750b37d");
    }

    #[tokio::test]
    async fn refuses_discussion_without_shas() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/projects/123/merge_requests/42/discussions")
            .expect(0)
            .create_async()
            .await;

        let position = DiffPosition {
            base_sha: String::new(),
            start_sha: String::new(),
            head_sha: String::new(),
            old_path: "a.go".into(),
            new_path: "a.go".into(),
            old_line: 1,
            new_line: 1,
        };

        let err = client_for(&server)
            .create_discussion(&mr_id(42), "body", &position)
            .await
            .expect_err("empty SHAs must not be posted");

        m.assert_async().await;
        assert!(matches!(err, GitContextEngineError::Validation(_)));
    }

    #[tokio::test]
    async fn refuses_discussion_without_start_sha() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/projects/123/merge_requests/42/discussions")
            .expect(0)
            .create_async()
            .await;

        let position = DiffPosition {
            base_sha: "base".into(),
            start_sha: String::new(),
            head_sha: "head".into(),
            old_path: "a.go".into(),
            new_path: "a.go".into(),
            old_line: 1,
            new_line: 1,
        };

        let err = client_for(&server)
            .create_discussion(&mr_id(42), "body", &position)
            .await
            .expect_err("blank start SHA must not be posted");

        m.assert_async().await;
        assert!(matches!(err, GitContextEngineError::Validation(_)));
    }

    #[tokio::test]
    async fn maps_rate_limit_with_retry_after() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/123/merge_requests/42/diffs")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "12")
            .with_body("slow down")
            .create_async()
            .await;

        let err = client_for(&server)
            .get_changes(&mr_id(42))
            .await
            .expect_err("429 must fail");

        assert!(matches!(
            err,
            GitContextEngineError::Provider(GitContextEngineProviderError::RateLimited {
                retry_after_secs: Some(12)
            })
        ));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn maps_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/projects/123/merge_requests")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"404 Project Not Found"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .list_merge_requests("123", MergeRequestState::All)
            .await
            .expect_err("404 must fail");

        assert!(matches!(
            err,
            GitContextEngineError::Provider(GitContextEngineProviderError::NotFound)
        ));
        assert!(!err.is_transient());
    }
}
