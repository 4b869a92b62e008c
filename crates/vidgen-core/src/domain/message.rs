//! Message - 会話の 1 エントリ

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, Sender, StatusReport, TaskId, TransitionError, VideoStatus};

/// チャットメッセージ（動画生成タスクを追跡することがある）
///
/// # 不変条件
/// - `task_id` は生成リクエストの bot placeholder にだけ付く
/// - `video_status` が `Some` なのは `task_id` が `Some` のときだけ
/// - `video_status` が終端になったら、以降メッセージは変化しない
///
/// その場では変更しない。`with_task` / `with_report` は置き換え後のメッセージを
/// 丸ごと返し、store が id で差し替える。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub task_id: Option<TaskId>,
    pub video_status: Option<VideoStatus>,
    pub video_url: Option<String>,
    pub error: Option<String>,

    /// backend が生成結果の代わりに fallback 動画を返した
    #[serde(default)]
    pub fallback: bool,

    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(id: MessageId, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::new(id, Sender::User, text.into(), created_at)
    }

    pub fn bot(id: MessageId, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::new(id, Sender::Bot, text.into(), created_at)
    }

    fn new(id: MessageId, sender: Sender, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            sender,
            task_id: None,
            video_status: None,
            video_url: None,
            error: None,
            fallback: false,
            created_at,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.video_status == Some(VideoStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        self.video_status.is_some_and(VideoStatus::is_terminal)
    }

    /// placeholder → processing: backend が作ったタスクを紐付ける
    pub fn with_task(
        &self,
        task_id: TaskId,
        text: impl Into<String>,
    ) -> Result<Message, TransitionError> {
        if self.sender != Sender::Bot {
            return Err(TransitionError::NotBotMessage(self.id));
        }
        if let Some(existing) = &self.task_id {
            return Err(TransitionError::TaskAlreadyAttached {
                message_id: self.id,
                task_id: existing.clone(),
            });
        }

        Ok(Message {
            text: text.into(),
            task_id: Some(task_id),
            video_status: Some(VideoStatus::Processing),
            ..self.clone()
        })
    }

    /// processing → completed | failed（明示的な終端 report による）
    pub fn with_report(&self, report: &StatusReport) -> Result<Message, TransitionError> {
        let Some(task_id) = &self.task_id else {
            return Err(TransitionError::NoTask(self.id));
        };
        match self.video_status {
            Some(VideoStatus::Processing) => {}
            Some(status) => {
                return Err(TransitionError::NotProcessing {
                    message_id: self.id,
                    status,
                });
            }
            None => return Err(TransitionError::NoTask(self.id)),
        }
        if !report.is_terminal() {
            return Err(TransitionError::NotTerminal(task_id.clone()));
        }

        Ok(Message {
            video_status: Some(report.status),
            video_url: report.video_url.clone(),
            error: report.error.clone(),
            fallback: report.is_fallback,
            ..self.clone()
        })
    }
}
