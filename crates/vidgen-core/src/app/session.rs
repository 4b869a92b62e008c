//! ChatSession - 1 会話分のワイヤリング
//!
//! # 構成
//! - 挨拶入りの新しい `ConversationStore`
//! - ユーザー入力を受ける `ConversationController`
//! - 同じ store を監視する `Poller`
//!
//! `close()` が teardown。以降ステータス問い合わせは発行されず、
//! 後から届いた応答も store には届かない。

use std::sync::Arc;

use tracing::info;

use super::controller::{ConversationController, SubmitOutcome};
use super::policy::PollPolicy;
use super::poller::Poller;
use super::status::ConversationCounts;
use super::store::{ConversationStore, StoreError};
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator, VideoService};

pub struct ChatSession {
    store: Arc<ConversationStore>,
    controller: ConversationController,
    poller: Poller,
}

impl ChatSession {
    /// SystemClock + ULID の message id でセッションを開始
    pub fn start(service: Arc<dyn VideoService>, policy: PollPolicy) -> Result<Self, StoreError> {
        Self::with_ports(
            service,
            policy,
            Arc::new(UlidGenerator::new(SystemClock)),
            Arc::new(SystemClock),
        )
    }

    pub fn with_ports(
        service: Arc<dyn VideoService>,
        policy: PollPolicy,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let store = Arc::new(ConversationStore::new());
        let controller =
            ConversationController::new(Arc::clone(&store), Arc::clone(&service), ids, clock);
        controller.greet()?;

        let poller = Poller::spawn(Arc::clone(&store), service, policy);
        info!("chat session started");

        Ok(Self {
            store,
            controller,
            poller,
        })
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub async fn submit(&self, prompt: &str) -> Result<SubmitOutcome, StoreError> {
        self.controller.submit(prompt).await
    }

    pub fn counts(&self) -> ConversationCounts {
        self.store.counts()
    }

    /// poll を止め、全 poll job の終了を待つ
    pub async fn close(self) -> ConversationCounts {
        self.poller.shutdown_and_join().await;
        let counts = self.store.counts();
        info!(
            messages = counts.messages,
            processing = counts.processing,
            completed = counts.completed,
            failed = counts.failed,
            "chat session closed"
        );
        counts
    }
}
