//! Domain identifiers (strongly-typed IDs).
//!
//! # ローカル ID（ULID）
//! このプロセスで作る ID（message）は ULID を Phantom type の `Id<T>` で包む。
//! - **時刻でソート可能**: 生成順に並ぶ
//! - **調整不要**: セッション中どこで生成しても衝突しない
//!
//! # リモート ID
//! task id はリモートの動画サービスが払い出す不透明な文字列なので、
//! `Id<T>` ではなく単純な newtype `TaskId` にする。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// ローカル生成 ID の種類ごとのマーカー trait
///
/// Display 用の prefix（`"msg-"`）を提供する。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリックな ULID identifier
///
/// `T` はコンパイル時にだけ存在する（PhantomData）ので、
/// `MessageId` を後から追加する別種の ID と混同できない。
#[repr(transparent)]
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

// derive だとマーカーに `T: Clone/Copy` を要求してしまうので手書き
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// チャットメッセージ用マーカー
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {}

impl IdMarker for MessageKind {
    fn prefix() -> &'static str {
        "msg-"
    }
}

/// メッセージ ID（セッション中一意で不変）
pub type MessageId = Id<MessageKind>;

/// 生成タスクの ID（リモートの動画サービスが払い出す）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// proxy がこのタスクの動画を配信するパス
    pub fn video_path(&self) -> String {
        format!("/api/videos/{}.mp4", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
