use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::{ExporterError, Result};

use super::types::{Build, Job};

/// Builds fetched per poll cycle. Only the first page is requested;
/// isolated here so pagination could be added without touching the
/// poll cycle's contract.
pub const BUILD_PAGE_LIMIT: usize = 100;

/// TravisCI v3 API client for one account.
#[derive(Clone)]
pub struct TravisClient {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL for the TravisCI API
    base_url: String,
}

impl TravisClient {
    /// Create a new TravisCI API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API base URL (e.g., "https://api.travis-ci.org")
    /// * `token` - API token for the account
    ///
    /// # Returns
    ///
    /// A configured TravisCI API client.
    pub fn new(base_url: String, token: &Token) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("travisci-exporter/0.1"));
        headers.insert("Travis-API-Version", HeaderValue::from_static("3"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", token.as_str()))
                .map_err(|e| ExporterError::Config(format!("Invalid API token: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ExporterError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = Url::parse(&base_url)
            .map_err(|e| ExporterError::Config(format!("Invalid base URL {base_url}: {e}")))?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_owned(),
        })
    }

    /// Fetch the most recent builds visible to this account.
    ///
    /// Single page only, newest first.
    pub async fn list_builds(&self, limit: usize) -> Result<Vec<Build>> {
        let url = format!(
            "{}/builds?limit={}&sort_by=started_at:desc",
            self.base_url, limit
        );

        let response: BuildsResponse = self.get_json(&url).await?;
        Ok(response.builds)
    }

    /// Fetch the full record for a single job.
    pub async fn find_job(&self, job_id: u64) -> Result<Job> {
        let url = format!("{}/job/{}", self.base_url, job_id);
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ExporterError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(response.json().await?)
    }
}

/// Pull the `error_message` field out of a v3 API error body, falling
/// back to the raw body for non-JSON responses.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error_message").and_then(|m| m.as_str().map(str::to_owned)))
        .unwrap_or_else(|| body.to_owned())
}

/// Response envelope from the v3 `/builds` listing.
#[derive(Deserialize)]
struct BuildsResponse {
    builds: Vec<Build>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: String) -> TravisClient {
        TravisClient::new(base_url, &Token::from("test-token")).unwrap()
    }

    #[tokio::test]
    async fn test_list_builds_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/builds")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("limit".into(), "10".into()),
                mockito::Matcher::UrlEncoded("sort_by".into(), "started_at:desc".into()),
            ]))
            .match_header("travis-api-version", "3")
            .match_header("authorization", "token test-token")
            .with_status(200)
            .with_body(
                r#"{
                  "builds": [
                    {
                      "id": 1001,
                      "repository": {"slug": "moov-io/ach"},
                      "jobs": [{"id": 2001}, {"id": 2002}],
                      "duration": 125
                    }
                  ]
                }"#,
            )
            .create_async()
            .await;

        let client = test_client(server.url());
        let builds = client.list_builds(10).await.unwrap();

        mock.assert_async().await;
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].id, 1001);
        assert_eq!(builds[0].repository.slug, "moov-io/ach");
        assert_eq!(builds[0].jobs.len(), 2);
        assert_eq!(builds[0].jobs[1].id, 2002);
        assert_eq!(builds[0].duration, Some(125));
    }

    #[tokio::test]
    async fn test_find_job_parses_timestamps() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/2001")
            .with_status(200)
            .with_body(
                r#"{
                  "id": 2001,
                  "started_at": "2021-01-01T00:00:00Z",
                  "finished_at": "2021-01-01T00:01:30Z"
                }"#,
            )
            .create_async()
            .await;

        let client = test_client(server.url());
        let job = client.find_job(2001).await.unwrap();

        assert_eq!(job.id, 2001);
        assert_eq!(job.started_at.as_deref(), Some("2021-01-01T00:00:00Z"));
        assert_eq!(job.finished_at.as_deref(), Some("2021-01-01T00:01:30Z"));
    }

    #[tokio::test]
    async fn test_find_job_running_has_no_finish() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/2002")
            .with_status(200)
            .with_body(r#"{"id": 2002, "started_at": "2021-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let client = test_client(server.url());
        let job = client.find_job(2002).await.unwrap();

        assert!(job.finished_at.is_none());
    }

    #[test]
    fn test_error_message_field_extracted_from_json_body() {
        assert_eq!(
            error_message(r#"{"error_type": "not_found", "error_message": "build not found"}"#),
            "build not found"
        );
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn test_api_error_includes_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/9999")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let client = test_client(server.url());
        let err = client.find_job(9999).await.unwrap_err();

        match err {
            ExporterError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
