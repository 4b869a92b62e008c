//! Impls - ports の実装
//!
//! # 含まれるもの
//! - **HttpVideoService**: HTTP で実 backend（または proxy）と話す
//! - **InMemoryVideoService**: テストと offline 実行用の script 駆動 backend

pub mod http_service;
pub mod inmem_service;

pub use self::http_service::HttpVideoService;
pub use self::inmem_service::{InMemoryVideoService, ScriptStep};
