//! HttpVideoService - `reqwest` による video backend クライアント
//!
//! `base_url` は API ルート（例: `http://localhost:8000/api`）。
//! リクエスト先は `{base}/generate-video`, `{base}/video-status/{id}`,
//! `{base}/videos/{id}`。proxy から upstream へ、CLI から proxy へ、
//! どちらも同じクライアントで話す。
//!
//! # タイムアウト
//! - 接続: `DEFAULT_CONNECT_TIMEOUT`
//! - create / status: `request_timeout`（既定 `DEFAULT_REQUEST_TIMEOUT`）
//! - video: 接続タイムアウトのみ（本体はストリームなので長さを縛らない）

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{Client, Response};
use tracing::debug;

use crate::domain::{StatusReport, TaskId};
use crate::ports::{GenerateRequest, GenerateResponse, VideoService, VideoServiceError, VideoStream};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpVideoService {
    base_url: String,
    client: Client,
    request_timeout: Duration,
}

impl HttpVideoService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, client)
    }

    /// 呼び出し側で組み立てた `Client` を使う
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// create / status リクエスト 1 回あたりの上限
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn check(operation: &'static str, response: Response) -> Result<Response, VideoServiceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(VideoServiceError::Upstream {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl VideoService for HttpVideoService {
    async fn create_task(&self, prompt: &str) -> Result<GenerateResponse, VideoServiceError> {
        let request = GenerateRequest {
            prompt: prompt.to_string(),
        };
        let response = self
            .client
            .post(self.url("generate-video"))
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let created: GenerateResponse = Self::check("generate-video", response)?.json().await?;
        debug!(task_id = %created.task_id, status = %created.status, "backend created task");
        Ok(created)
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<StatusReport, VideoServiceError> {
        let response = self
            .client
            .get(self.url(&format!("video-status/{task_id}")))
            .timeout(self.request_timeout)
            .send()
            .await?;

        Ok(Self::check("video-status", response)?.json().await?)
    }

    async fn fetch_video(&self, task_id: &TaskId) -> Result<VideoStream, VideoServiceError> {
        let response = self
            .client
            .get(self.url(&format!("videos/{task_id}")))
            .send()
            .await?;

        let body = Self::check("videos", response)?
            .bytes_stream()
            .map_err(VideoServiceError::from);
        Ok(Box::pin(body))
    }
}
