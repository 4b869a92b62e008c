//! Outcome - backend から見たタスクの状況

use serde::{Deserialize, Serialize};

use super::VideoStatus;

/// 1 タスク分のステータス報告（`GET /api/video-status/{taskId}` の body）
///
/// - `video_url` は `completed` のときだけ
/// - `error` は `failed` のときだけ
/// - `is_fallback` / `message` は backend が生成できず fallback 動画を返したときに付く
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: VideoStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusReport {
    pub fn processing() -> Self {
        Self {
            status: VideoStatus::Processing,
            video_url: None,
            error: None,
            is_fallback: false,
            message: None,
        }
    }

    pub fn completed(video_url: impl Into<String>) -> Self {
        Self {
            status: VideoStatus::Completed,
            video_url: Some(video_url.into()),
            ..Self::processing()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: VideoStatus::Failed,
            error: Some(error.into()),
            ..Self::processing()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
