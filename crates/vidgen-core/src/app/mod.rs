//! App - アプリケーション層
//!
//! ports を組み合わせて会話のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **ConversationStore**: 順序付きメッセージ列（変更を subscriber に publish）
//! - **ConversationController**: プロンプトの送信
//! - **Poller**: processing 中のタスクごとのステータス追跡
//! - **ChatSession**: 1 会話分の store + controller + poller

pub mod controller;
pub mod policy;
pub mod poller;
pub mod session;
pub mod status;
pub mod store;

pub use self::controller::{ConversationController, SubmitOutcome};
pub use self::policy::{PollPolicy, RetryPolicy};
pub use self::poller::Poller;
pub use self::session::ChatSession;
pub use self::status::ConversationCounts;
pub use self::store::{Conversation, ConversationStore, Resolution, StoreError};
