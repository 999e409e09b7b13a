use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::types::{Job, MergeRequest, Pipeline, Project};
use crate::auth::Token;
use crate::error::{CiWatchError, Result};

const PER_PAGE: u32 = 100;

/// Thin client over the GitLab REST v4 API.
///
/// All calls are sequential: a paginated listing fetches its pages one after
/// another, accumulating until the API stops announcing a next page.
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ciwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CiWatchError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(base_url)
            .map_err(|e| CiWatchError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| CiWatchError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .map_err(|e| CiWatchError::Config(format!("Invalid API endpoint {path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let (value, _) = self.get_with_next_page(url).await?;
        Ok(value)
    }

    /// Performs a GET and also returns the `x-next-page` pagination header,
    /// which GitLab leaves empty on the last page.
    async fn get_with_next_page<T: DeserializeOwned>(&self, url: Url) -> Result<(T, Option<u32>)> {
        debug!("GET {url}");
        let response = self.auth_request(self.client.get(url)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_owned());
            return Err(CiWatchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let next_page = response
            .headers()
            .get("x-next-page")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok());

        let body = response.text().await?;
        let value = serde_json::from_str(&body)?;
        Ok((value, next_page))
    }

    async fn post<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("POST {url}");
        let response = self.auth_request(self.client.post(url)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_owned());
            return Err(CiWatchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Resolve a namespaced project path (e.g. `group/project`) to a project.
    pub async fn find_project(&self, path: &str) -> Result<Project> {
        let url = self.endpoint(&format!("projects/{}", urlencoding::encode(path)))?;
        match self.get(url).await {
            Err(CiWatchError::Api { status: 404, .. }) => {
                Err(CiWatchError::ProjectNotFound(path.to_owned()))
            }
            other => other,
        }
    }

    /// Look up the open merge request whose source branch is `branch` and
    /// return it with its head pipeline populated.
    pub async fn merge_request_for_branch(
        &self,
        project_id: u64,
        branch: &str,
    ) -> Result<MergeRequest> {
        let mut url = self.endpoint(&format!("projects/{project_id}/merge_requests"))?;
        url.query_pairs_mut()
            .append_pair("source_branch", branch)
            .append_pair("state", "opened")
            .append_pair("per_page", "1");

        let mrs: Vec<MergeRequest> = self.get(url).await?;
        let mr = mrs
            .into_iter()
            .next()
            .ok_or_else(|| CiWatchError::MergeRequestNotFound(branch.to_owned()))?;

        // The list endpoint omits head_pipeline; fetch the detail view.
        let url = self.endpoint(&format!(
            "projects/{project_id}/merge_requests/{}",
            mr.iid
        ))?;
        self.get(url).await
    }

    /// All jobs of a pipeline, across every page, in API order.
    pub async fn pipeline_jobs(&self, project_id: u64, pipeline_id: u64) -> Result<Vec<Job>> {
        let mut all_jobs = Vec::new();
        let mut page = 1u32;

        loop {
            let mut url =
                self.endpoint(&format!("projects/{project_id}/pipelines/{pipeline_id}/jobs"))?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let (jobs, next_page): (Vec<Job>, _) = self.get_with_next_page(url).await?;
            all_jobs.extend(jobs);

            match next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        debug!("fetched {} jobs for pipeline {pipeline_id}", all_jobs.len());
        Ok(all_jobs)
    }

    pub async fn get_pipeline(&self, project_id: u64, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.endpoint(&format!("projects/{project_id}/pipelines/{pipeline_id}"))?;
        self.get(url).await
    }

    pub async fn get_job(&self, project_id: u64, job_id: u64) -> Result<Job> {
        let url = self.endpoint(&format!("projects/{project_id}/jobs/{job_id}"))?;
        self.get(url).await
    }

    /// Start a manual job when it is waiting on `manual`, otherwise retry it.
    pub async fn play_or_retry_job(&self, project_id: u64, job: &Job) -> Result<Job> {
        let action = if job.status == "manual" { "play" } else { "retry" };
        let url = self.endpoint(&format!("projects/{project_id}/jobs/{}/{action}", job.id))?;
        self.post(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn job_body(id: u64, name: &str, status: &str) -> String {
        format!(
            r#"{{"id": {id}, "name": "{name}", "stage": "test", "status": "{status}", "pipeline": {{"id": 55}}}}"#
        )
    }

    #[tokio::test]
    async fn test_find_project_resolves_encoded_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/group%2Fproject")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 11, "path_with_namespace": "group/project"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some(Token::from("t"))).unwrap();
        let project = client.find_project("group/project").await.unwrap();

        assert_eq!(project.id, 11);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_project_maps_404() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/missing%2Frepo")
            .with_status(404)
            .with_body(r#"{"message": "404 Project Not Found"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let err = client.find_project("missing/repo").await.unwrap_err();

        assert!(matches!(err, CiWatchError::ProjectNotFound(ref p) if p == "missing/repo"));
    }

    #[tokio::test]
    async fn test_pipeline_jobs_follows_next_page_header() {
        let mut server = mockito::Server::new_async().await;
        let page1 = server
            .mock("GET", "/api/v4/projects/11/pipelines/55/jobs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("x-next-page", "2")
            .with_body(format!("[{}]", job_body(1, "build", "success")))
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/api/v4/projects/11/pipelines/55/jobs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("x-next-page", "")
            .with_body(format!("[{}]", job_body(2, "deploy", "created")))
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let jobs = client.pipeline_jobs(11, 55).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name, "build");
        assert_eq!(jobs[1].name, "deploy");
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_pipeline_jobs_aborts_on_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/11/pipelines/55/jobs")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let err = client.pipeline_jobs(11, 55).await.unwrap_err();

        assert!(matches!(err, CiWatchError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_merge_request_for_branch_fetches_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/11/merge_requests")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("source_branch".into(), "feature".into()),
                Matcher::UrlEncoded("state".into(), "opened".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"iid": 3, "source_branch": "feature"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v4/projects/11/merge_requests/3")
            .with_status(200)
            .with_body(
                r#"{"iid": 3, "source_branch": "feature",
                    "head_pipeline": {"id": 55, "status": "running"}}"#,
            )
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let mr = client.merge_request_for_branch(11, "feature").await.unwrap();

        assert_eq!(mr.iid, 3);
        assert_eq!(mr.head_pipeline.unwrap().id, 55);
    }

    #[tokio::test]
    async fn test_merge_request_for_branch_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/11/merge_requests")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let err = client
            .merge_request_for_branch(11, "orphan")
            .await
            .unwrap_err();

        assert!(matches!(err, CiWatchError::MergeRequestNotFound(ref b) if b == "orphan"));
    }

    #[tokio::test]
    async fn test_play_or_retry_picks_play_for_manual_jobs() {
        let mut server = mockito::Server::new_async().await;
        let play = server
            .mock("POST", "/api/v4/projects/11/jobs/42/play")
            .with_status(200)
            .with_body(job_body(43, "deploy", "pending"))
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let manual: Job = serde_json::from_str(&job_body(42, "deploy", "manual")).unwrap();
        let started = client.play_or_retry_job(11, &manual).await.unwrap();

        assert_eq!(started.id, 43);
        play.assert_async().await;
    }

    #[tokio::test]
    async fn test_play_or_retry_retries_finished_jobs() {
        let mut server = mockito::Server::new_async().await;
        let retry = server
            .mock("POST", "/api/v4/projects/11/jobs/42/retry")
            .with_status(200)
            .with_body(job_body(44, "rspec", "pending"))
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None).unwrap();
        let failed: Job = serde_json::from_str(&job_body(42, "rspec", "failed")).unwrap();
        let retried = client.play_or_retry_job(11, &failed).await.unwrap();

        assert_eq!(retried.id, 44);
        retry.assert_async().await;
    }
}
