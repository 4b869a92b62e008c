//! Errors - ドメインルール違反

use thiserror::Error;

use super::{MessageId, TaskId, VideoStatus};

/// タスクのライフサイクルを壊すメッセージ更新
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("message {0} is not a bot message")]
    NotBotMessage(MessageId),

    #[error("message {message_id} already tracks task {task_id}")]
    TaskAlreadyAttached { message_id: MessageId, task_id: TaskId },

    #[error("message {0} has no generation task")]
    NoTask(MessageId),

    #[error("message {message_id} is {status}, only processing messages accept a result")]
    NotProcessing {
        message_id: MessageId,
        status: VideoStatus,
    },

    #[error("report for task {0} is not terminal")]
    NotTerminal(TaskId),
}
