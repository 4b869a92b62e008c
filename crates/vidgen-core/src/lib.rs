//! vidgen-core
//!
//! 動画生成チャットの構成要素。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（message, ids, status, report, errors）
//! - **ports**: 抽象化レイヤー（VideoService, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（store, controller, poller, session）
//! - **impls**: 実装（HTTP / in-memory の VideoService）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
