//! HTTP client for the Figma REST API.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::FigmaConfig;
use crate::figma::error::FigmaError;
use crate::figma::retry::{calculate_backoff, retry_after};
use crate::figma::tokens;
use crate::figma::types::{
    DesignTokens, FigmaFile, FileListItem, FileNodes, FilesResponse, ImageData, ImageFormat,
    ImagesResponse, Project, ProjectsResponse, Team, TeamsResponse,
};
use crate::observability::metrics;

const TOKEN_HEADER: &str = "X-Figma-Token";

/// Authenticated client. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct FigmaClient {
    http: reqwest::Client,
    base: Url,
    token: String,
    max_retries: u32,
    retry_base_ms: u64,
    retry_max_ms: u64,
}

impl FigmaClient {
    pub fn new(config: &FigmaConfig) -> Result<Self, FigmaError> {
        let token = config.access_token.trim();
        if token.is_empty() {
            return Err(FigmaError::MissingToken);
        }
        let token = token.to_string();

        let base = Url::parse(&config.api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| FigmaError::InvalidBaseUrl(config.api_base.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("figma-mcp-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            token,
            max_retries: config.max_retries,
            retry_base_ms: config.retry_base_delay_ms,
            retry_max_ms: config.retry_max_delay_ms,
        })
    }

    /// Files of a team, or of the account when `team_id` is `None`.
    pub async fn get_files(&self, team_id: Option<&str>) -> Result<Vec<FileListItem>, FigmaError> {
        let url = match team_id {
            Some(team) => self.endpoint(&["teams", team, "files"], &[])?,
            None => self.endpoint(&["files"], &[])?,
        };
        let response: FilesResponse = self.get_json("files", url).await?;
        Ok(response.files)
    }

    pub async fn get_file(&self, file_id: &str) -> Result<FigmaFile, FigmaError> {
        let url = self.endpoint(&["files", file_id], &[])?;
        self.get_json("file", url).await
    }

    pub async fn get_file_nodes(
        &self,
        file_id: &str,
        node_ids: &[String],
    ) -> Result<FileNodes, FigmaError> {
        let url = self.endpoint(&["files", file_id, "nodes"], &[("ids", node_ids.join(","))])?;
        self.get_json("file_nodes", url).await
    }

    pub async fn get_teams(&self) -> Result<Vec<Team>, FigmaError> {
        let url = self.endpoint(&["teams"], &[])?;
        let response: TeamsResponse = self.get_json("teams", url).await?;
        Ok(response.teams)
    }

    pub async fn get_projects(&self, team_id: &str) -> Result<Vec<Project>, FigmaError> {
        let url = self.endpoint(&["teams", team_id, "projects"], &[])?;
        let response: ProjectsResponse = self.get_json("projects", url).await?;
        Ok(response.projects)
    }

    /// Render nodes and return the temporary image URLs.
    pub async fn get_images(
        &self,
        file_id: &str,
        node_ids: &[String],
        format: ImageFormat,
        scale: f64,
    ) -> Result<ImagesResponse, FigmaError> {
        let url = self.endpoint(
            &["images", file_id],
            &[
                ("ids", node_ids.join(",")),
                ("format", format.as_str().to_string()),
                ("scale", scale.to_string()),
            ],
        )?;
        self.get_json("images", url).await
    }

    /// Download a rendered image. Render URLs are pre-signed, so no token is sent.
    pub async fn fetch_image(&self, url: &str) -> Result<ImageData, FigmaError> {
        let url = Url::parse(url).map_err(|_| FigmaError::InvalidBaseUrl(url.to_string()))?;
        let response = self
            .send_with_retry("image_download", || self.http.get(url.clone()))
            .await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = response.bytes().await?.to_vec();

        Ok(ImageData { mime_type, bytes })
    }

    /// Case-insensitive substring match on file names.
    pub async fn search_files(
        &self,
        query: &str,
        team_id: Option<&str>,
    ) -> Result<Vec<FileListItem>, FigmaError> {
        let needle = query.to_lowercase();
        let files = self.get_files(team_id).await?;
        Ok(files
            .into_iter()
            .filter(|file| file.name.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn extract_design_tokens(&self, file_id: &str) -> Result<DesignTokens, FigmaError> {
        let file = self.get_file(file_id).await?;
        Ok(tokens::extract(&file))
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, FigmaError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FigmaError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<T, FigmaError> {
        let response = self
            .send_with_retry(endpoint, || {
                self.http.get(url.clone()).header(TOKEN_HEADER, &self.token)
            })
            .await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send until success, a non-retryable failure, or the retry budget runs out.
    async fn send_with_retry<F>(&self, endpoint: &'static str, request: F) -> Result<Response, FigmaError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let started = Instant::now();
            let (err, hint) = match request().send().await {
                Ok(response) => {
                    let status = response.status();
                    metrics::record_figma_request(endpoint, status.as_u16(), started.elapsed());
                    if status.is_success() {
                        return Ok(response);
                    }

                    let hint = retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    let message = if body.trim().is_empty() {
                        status.canonical_reason().unwrap_or("unknown status").to_string()
                    } else {
                        body
                    };
                    (
                        FigmaError::Api {
                            status: status.as_u16(),
                            message,
                        },
                        hint,
                    )
                }
                Err(err) => {
                    metrics::record_figma_request(endpoint, 0, started.elapsed());
                    (FigmaError::Http(err), None)
                }
            };

            if !err.is_retryable() || attempt >= self.max_retries {
                return Err(err);
            }

            attempt += 1;
            let backoff = calculate_backoff(attempt, self.retry_base_ms, self.retry_max_ms);
            // A server hint can lengthen the wait but never past the configured ceiling.
            let delay = hint
                .map_or(backoff, |hint| hint.max(backoff))
                .min(Duration::from_millis(self.retry_max_ms));
            metrics::record_figma_retry(endpoint);
            tracing::warn!(
                endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying Figma request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
