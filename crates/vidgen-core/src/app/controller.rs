//! ConversationController - ユーザー入力を生成タスクに変換
//!
//! # フロー
//! 1. user メッセージを追加（プロンプトはそのまま）
//! 2. bot の placeholder を追加
//! 3. `VideoService::create_task`
//! 4. 成功: placeholder に task を紐付ける（status `processing`）
//!    失敗: 別の bot メッセージで失敗を通知（placeholder は task なしのまま）
//!
//! controller 自身は poll しない。
//! store に processing のメッセージがあれば poller が拾う。

use std::sync::Arc;

use tracing::{info, warn};

use super::store::{ConversationStore, StoreError};
use crate::domain::{Message, MessageId, TaskId};
use crate::ports::{Clock, IdGenerator, VideoService};

pub const GREETING_TEXT: &str =
    "Hello! I can generate videos based on your prompts. What would you like to see?";
pub const PLACEHOLDER_TEXT: &str = "I'll generate a video for you based on your prompt...";
pub const GENERATING_TEXT: &str = "I'm generating your video. This might take a moment...";
pub const SUBMIT_FAILED_TEXT: &str =
    "Sorry, there was an error generating your video. Please try again.";

/// `submit` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 空白のみのプロンプト（会話は変化しない）
    Ignored,

    /// backend が受け付けた（`bot` が `task_id` を processing 中）
    Submitted {
        user: MessageId,
        bot: MessageId,
        task_id: TaskId,
    },

    /// backend がタスクを作れなかった（`notice` がユーザーへの通知）
    Rejected {
        user: MessageId,
        placeholder: MessageId,
        notice: MessageId,
    },
}

pub struct ConversationController {
    store: Arc<ConversationStore>,
    service: Arc<dyn VideoService>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl ConversationController {
    pub fn new(
        store: Arc<ConversationStore>,
        service: Arc<dyn VideoService>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            service,
            ids,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// 挨拶メッセージを追加
    pub fn greet(&self) -> Result<MessageId, StoreError> {
        self.append_bot(GREETING_TEXT)
    }

    /// プロンプトを送信
    ///
    /// # エラー
    /// - backend の失敗は会話の中で通知される（`Err` にはならない）
    /// - store の不変条件違反のみ `Err` を返す
    pub async fn submit(&self, prompt: &str) -> Result<SubmitOutcome, StoreError> {
        if prompt.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let user = self.ids.generate_message_id();
        self.store
            .append(Message::user(user, prompt, self.clock.now()))?;
        let bot = self.append_bot(PLACEHOLDER_TEXT)?;

        match self.service.create_task(prompt).await {
            Ok(created) => {
                let task_id = created.task_id;
                self.store
                    .attach_task(bot, task_id.clone(), GENERATING_TEXT)?;
                info!(task_id = %task_id, message_id = %bot, "video task submitted");
                Ok(SubmitOutcome::Submitted { user, bot, task_id })
            }
            Err(e) => {
                warn!(message_id = %bot, error = %e, "error generating video");
                let notice = self.append_bot(SUBMIT_FAILED_TEXT)?;
                Ok(SubmitOutcome::Rejected {
                    user,
                    placeholder: bot,
                    notice,
                })
            }
        }
    }

    fn append_bot(&self, text: &str) -> Result<MessageId, StoreError> {
        let id = self.ids.generate_message_id();
        self.store.append(Message::bot(id, text, self.clock.now()))?;
        Ok(id)
    }
}
