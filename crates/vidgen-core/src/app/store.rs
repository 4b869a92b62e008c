//! ConversationStore - チャットメッセージの唯一の保持者
//!
//! # Publish モデル
//! - メッセージ列は `tokio::sync::watch` channel の中にある
//! - 変更は id 単位のメッセージ丸ごとの置き換えで、channel の write lock 内で行う
//! - 変更後に全 subscriber へ publish される
//! - subscriber（poller, terminal view）はまとめられた snapshot を受け取るので、
//!   差分ではなく「最新の状態」として扱うこと
//!
//! # Thread Safety
//! - lock を保持したまま await しない
//! - どの task から変更しても途中状態は見えない

use thiserror::Error;
use tokio::sync::watch;

use super::status::ConversationCounts;
use crate::domain::{Message, MessageId, StatusReport, TaskId, TransitionError, VideoStatus};

/// 会話の snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn find_by_task(&self, task_id: &TaskId) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.task_id.as_ref() == Some(task_id))
    }

    /// poller が必要なメッセージ（会話順）
    pub fn processing(&self) -> Vec<(MessageId, TaskId)> {
        self.messages
            .iter()
            .filter(|m| m.is_processing())
            .filter_map(|m| m.task_id.clone().map(|task_id| (m.id, task_id)))
            .collect()
    }

    pub fn counts(&self) -> ConversationCounts {
        let mut counts = ConversationCounts {
            messages: self.messages.len(),
            ..ConversationCounts::default()
        };
        for status in self.messages.iter().filter_map(|m| m.video_status) {
            match status {
                VideoStatus::Processing => counts.processing += 1,
                VideoStatus::Completed => counts.completed += 1,
                VideoStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("message {0} already exists")]
    DuplicateMessage(MessageId),

    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    #[error("task {task_id} is already owned by message {owner}")]
    TaskOwned { task_id: TaskId, owner: MessageId },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// タスク結果の書き戻しの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// processing だったメッセージに終端ステータスを書いた
    Applied(Message),

    /// メッセージはもうこのタスクを待っていない（何も書いていない）
    Stale,
}

pub struct ConversationStore {
    tx: watch::Sender<Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Conversation::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Conversation> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Conversation {
        self.tx.borrow().clone()
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.tx.borrow().get(id).cloned()
    }

    /// 会話の末尾にメッセージを追加
    pub fn append(&self, message: Message) -> Result<(), StoreError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|conv| {
            if conv.position(message.id).is_some() {
                result = Err(StoreError::DuplicateMessage(message.id));
                return false;
            }
            if let Some(task_id) = &message.task_id {
                if let Some(owner) = conv.find_by_task(task_id) {
                    result = Err(StoreError::TaskOwned {
                        task_id: task_id.clone(),
                        owner: owner.id,
                    });
                    return false;
                }
            }
            conv.messages.push(message);
            true
        });
        result
    }

    /// placeholder の本文を置き換え、`task_id` の追跡を始める
    pub fn attach_task(
        &self,
        message_id: MessageId,
        task_id: TaskId,
        text: &str,
    ) -> Result<Message, StoreError> {
        let mut result = Err(StoreError::MessageNotFound(message_id));
        self.tx.send_if_modified(|conv| {
            let Some(pos) = conv.position(message_id) else {
                return false;
            };
            if let Some(owner) = conv.find_by_task(&task_id) {
                result = Err(StoreError::TaskOwned {
                    task_id,
                    owner: owner.id,
                });
                return false;
            }
            match conv.messages[pos].with_task(task_id, text) {
                Ok(updated) => {
                    conv.messages[pos] = updated.clone();
                    result = Ok(updated);
                    true
                }
                Err(e) => {
                    result = Err(e.into());
                    false
                }
            }
        });
        result
    }

    /// `task_id` を持つメッセージに終端ステータスを書く
    ///
    /// 次の場合は何も変更せず `Resolution::Stale` を返す:
    /// - メッセージが無い
    /// - 別のタスクを追跡している
    /// - すでに processing を抜けている
    pub fn resolve(
        &self,
        message_id: MessageId,
        task_id: &TaskId,
        report: &StatusReport,
    ) -> Result<Resolution, StoreError> {
        if !report.is_terminal() {
            return Err(TransitionError::NotTerminal(task_id.clone()).into());
        }

        let mut result = Ok(Resolution::Stale);
        self.tx.send_if_modified(|conv| {
            let Some(pos) = conv.position(message_id) else {
                return false;
            };
            let current = &conv.messages[pos];
            if current.task_id.as_ref() != Some(task_id) || !current.is_processing() {
                return false;
            }
            match current.with_report(report) {
                Ok(updated) => {
                    conv.messages[pos] = updated.clone();
                    result = Ok(Resolution::Applied(updated));
                    true
                }
                Err(e) => {
                    result = Err(e.into());
                    false
                }
            }
        });
        result
    }

    pub fn counts(&self) -> ConversationCounts {
        self.tx.borrow().counts()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
