//! VideoService port - リモートの動画生成 backend
//!
//! # 操作
//! - プロンプトからタスクを作る
//! - タスクのステータスを返す
//! - 生成済みファイルを渡す
//!
//! proxy の routes、controller、poller はすべてこの trait を経由するので、
//! HTTP クライアントと in-memory backend を差し替えられる。

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{StatusReport, TaskId};

/// `POST /api/generate-video` のリクエスト body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// `POST /api/generate-video` のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub task_id: TaskId,
    pub status: String,
    pub message: String,
}

/// 動画のバイト列（upstream から届いた順にストリームする）
pub type VideoStream = Pin<Box<dyn Stream<Item = Result<Bytes, VideoServiceError>> + Send>>;

#[derive(Debug, Error)]
pub enum VideoServiceError {
    #[error("request to video backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("video backend answered {status} to {operation}")]
    Upstream { operation: &'static str, status: u16 },

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("video backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait VideoService: Send + Sync {
    /// プロンプトを送信し、作成されたタスクを受け取る
    async fn create_task(&self, prompt: &str) -> Result<GenerateResponse, VideoServiceError>;

    /// タスクの現在のステータス
    async fn task_status(&self, task_id: &TaskId) -> Result<StatusReport, VideoServiceError>;

    /// 生成済み動画を開く
    ///
    /// backend にファイルが無ければ、1 バイトも返す前に失敗する。
    async fn fetch_video(&self, task_id: &TaskId) -> Result<VideoStream, VideoServiceError>;
}
