//! Status - ログと terminal view 向けの会話カウンタ

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationCounts {
    pub messages: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}
