//! InMemoryVideoService - 開発用 backend
//!
//! # 振る舞い
//! - task id は `T1`, `T2`, ... の順に払い出す
//! - status 問い合わせには script で答える。script が尽きたら `processing` を返し続ける
//!   （`with_auto_complete(n)` なら n 回目で completed）
//! - 終端の応答は固定される（実際の backend と同じ）
//! - 問い合わせ回数を数えるので、テストで poll の回数を検証できる
//!
//! CLI の `--offline` はこれを使う。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::{Mutex, Notify};

use crate::domain::{StatusReport, TaskId, VideoStatus};
use crate::ports::{GenerateResponse, VideoService, VideoServiceError, VideoStream};

/// 動画が登録されていない completed タスクに返すバイト列
const PLACEHOLDER_VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";

/// status 問い合わせへの 1 回分の応答
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Report(StatusReport),

    /// 一時的な失敗（ネットワークエラー、5xx など）
    Error(String),

    /// gate が notify されるまで応答を保留
    Gated(Arc<Notify>, StatusReport),
}

#[derive(Debug, Default)]
struct TaskEntry {
    created: bool,
    prompt: Option<String>,
    script: VecDeque<ScriptStep>,
    terminal: Option<StatusReport>,
    status_calls: u32,
}

#[derive(Debug, Default)]
struct State {
    next_task: u64,
    fail_next_create: bool,
    tasks: HashMap<TaskId, TaskEntry>,
    videos: HashMap<TaskId, Bytes>,
}

pub struct InMemoryVideoService {
    state: Mutex<State>,
    auto_complete_after: Option<u32>,
}

impl InMemoryVideoService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            auto_complete_after: None,
        }
    }

    /// script の無いタスクを n 回目の問い合わせで完了させる
    pub fn with_auto_complete(mut self, after: u32) -> Self {
        self.auto_complete_after = Some(after);
        self
    }

    /// タスク（未作成でもよい）の応答を積む
    pub async fn script(
        &self,
        task_id: impl Into<TaskId>,
        steps: impl IntoIterator<Item = ScriptStep>,
    ) {
        let mut state = self.state.lock().await;
        state
            .tasks
            .entry(task_id.into())
            .or_default()
            .script
            .extend(steps);
    }

    /// 次の `create_task` を失敗させる
    pub async fn fail_next_create(&self) {
        self.state.lock().await.fail_next_create = true;
    }

    pub async fn put_video(&self, task_id: impl Into<TaskId>, bytes: impl Into<Bytes>) {
        self.state
            .lock()
            .await
            .videos
            .insert(task_id.into(), bytes.into());
    }

    pub async fn status_calls(&self, task_id: &TaskId) -> u32 {
        let state = self.state.lock().await;
        state.tasks.get(task_id).map_or(0, |t| t.status_calls)
    }

    pub async fn created_tasks(&self) -> usize {
        let state = self.state.lock().await;
        state.tasks.values().filter(|t| t.created).count()
    }

    pub async fn prompt(&self, task_id: &TaskId) -> Option<String> {
        let state = self.state.lock().await;
        state.tasks.get(task_id).and_then(|t| t.prompt.clone())
    }

    fn remember(state: &mut State, task_id: &TaskId, report: &StatusReport) {
        if !report.is_terminal() {
            return;
        }
        if let Some(task) = state.tasks.get_mut(task_id) {
            task.terminal = Some(report.clone());
        }
        if report.status == VideoStatus::Completed {
            state
                .videos
                .entry(task_id.clone())
                .or_insert_with(|| Bytes::from_static(PLACEHOLDER_VIDEO));
        }
    }
}

impl Default for InMemoryVideoService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoService for InMemoryVideoService {
    async fn create_task(&self, prompt: &str) -> Result<GenerateResponse, VideoServiceError> {
        let mut state = self.state.lock().await;
        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(VideoServiceError::Unavailable(
                "scripted create failure".to_string(),
            ));
        }

        state.next_task += 1;
        let task_id = TaskId::new(format!("T{}", state.next_task));
        let task = state.tasks.entry(task_id.clone()).or_default();
        task.created = true;
        task.prompt = Some(prompt.to_string());

        Ok(GenerateResponse {
            task_id,
            status: VideoStatus::Processing.to_string(),
            message: "Video generation started".to_string(),
        })
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<StatusReport, VideoServiceError> {
        let step = {
            let mut state = self.state.lock().await;
            let Some(task) = state.tasks.get_mut(task_id) else {
                return Err(VideoServiceError::UnknownTask(task_id.clone()));
            };
            task.status_calls += 1;

            if let Some(terminal) = &task.terminal {
                return Ok(terminal.clone());
            }
            match task.script.pop_front() {
                Some(step) => step,
                None => match self.auto_complete_after {
                    Some(after) if task.status_calls >= after => {
                        ScriptStep::Report(StatusReport::completed(task_id.video_path()))
                    }
                    _ => ScriptStep::Report(StatusReport::processing()),
                },
            }
        };

        // gate を待つ前に lock を解放する
        let report = match step {
            ScriptStep::Report(report) => report,
            ScriptStep::Error(message) => return Err(VideoServiceError::Unavailable(message)),
            ScriptStep::Gated(gate, report) => {
                gate.notified().await;
                report
            }
        };

        let mut state = self.state.lock().await;
        Self::remember(&mut state, task_id, &report);
        Ok(report)
    }

    async fn fetch_video(&self, task_id: &TaskId) -> Result<VideoStream, VideoServiceError> {
        let state = self.state.lock().await;
        let Some(video) = state.videos.get(task_id).cloned() else {
            return Err(VideoServiceError::UnknownTask(task_id.clone()));
        };

        // 2 chunk に分けて返す（1 バッファ前提の利用側を検出するため）
        let split = video.len() / 2;
        let chunks: Vec<Result<Bytes, VideoServiceError>> =
            vec![Ok(video.slice(..split)), Ok(video.slice(split..))];
        Ok(Box::pin(stream::iter(chunks)))
    }
}
