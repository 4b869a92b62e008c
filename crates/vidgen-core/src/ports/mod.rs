//! Ports - 抽象化レイヤー
//!
//! 会話状態の外側にあるものとの境界:
//! - **VideoService**: リモートの動画生成 backend
//! - **Clock**: 現在時刻
//! - **IdGenerator**: ID 生成

pub mod clock;
pub mod id_generator;
pub mod video_service;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::video_service::{
    GenerateRequest, GenerateResponse, VideoService, VideoServiceError, VideoStream,
};
