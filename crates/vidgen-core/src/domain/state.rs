//! State - タスクとメッセージの状態

use serde::{Deserialize, Serialize};
use std::fmt;

/// VideoStatus はリモートサービスが報告する生成タスクの状態
///
/// # 状態遷移
/// - processing → completed
/// - processing → failed
///
/// completed / failed は終端（以降の遷移なし）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    /// 受付済み、生成中
    Processing,

    /// 生成完了（動画を取得できる）
    Completed,

    /// backend が生成を諦めた
    Failed,
}

impl VideoStatus {
    /// 終端状態か（これ以上遷移しない）
    pub fn is_terminal(self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// メッセージの送信者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}
