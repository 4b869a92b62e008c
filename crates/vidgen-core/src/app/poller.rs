//! Poller - processing 中のメッセージを終端ステータスまで追跡する
//!
//! # 構成
//! - **supervisor**: store を subscribe し、publish のたびに「processing 中の
//!   メッセージ」と「稼働中の poll job」を突き合わせる
//! - **poll job**: task id ごとに 1 本。sleep → status 問い合わせを繰り返し、
//!   終端ステータス（または PollPolicy の上限）で終了する
//!
//! # キャンセル
//! - job は自分の cancel flag と poller 全体の shutdown flag を監視する
//! - 問い合わせ中にキャンセルされた場合は問い合わせごと破棄し、結果は書き込まない
//! - store 側も processing を抜けたメッセージへの書き込みを拒否する（二重の防御）
//!
//! processing を抜けた task id は retired になり、二度と poll されない。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::policy::PollPolicy;
use super::store::{Conversation, ConversationStore, Resolution};
use crate::domain::{MessageId, StatusReport, TaskId};
use crate::ports::VideoService;

/// Poller handle.
/// - handle を drop する（または `request_shutdown`）と全 poll が止まる
/// - `shutdown_and_join()` は全 job の終了まで待つ
pub struct Poller {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Poller {
    /// `store` の processing メッセージを全て poll し始める
    pub fn spawn(
        store: Arc<ConversationStore>,
        service: Arc<dyn VideoService>,
        policy: PollPolicy,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let supervisor = Supervisor::new(store, service, policy, shutdown_rx);
        let join = tokio::spawn(supervisor.run());

        Self { shutdown_tx, join }
    }

    /// 停止を要求する。問い合わせ中の結果は破棄される。
    pub fn request_shutdown(&self) {
        // supervisor が既に終わっていれば送信エラーになるが無視してよい
        let _ = self.shutdown_tx.send(true);
    }

    /// 停止を要求し、supervisor と全 poll job の終了を待つ
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            warn!(error = %e, "poll supervisor did not exit cleanly");
        }
    }
}

struct ActivePoll {
    message_id: MessageId,
    cancel_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ActivePoll {
    fn cancel(self) -> JoinHandle<()> {
        let _ = self.cancel_tx.send(true);
        self.join
    }
}

struct Supervisor {
    store: Arc<ConversationStore>,
    service: Arc<dyn VideoService>,
    policy: Arc<PollPolicy>,
    shutdown_rx: watch::Receiver<bool>,
    active: HashMap<TaskId, ActivePoll>,
    /// 終端に達した task id。
    /// 会話に残っている task だけを保持するので、会話のメッセージ数で上限が決まる。
    retired: HashSet<TaskId>,
    /// キャンセル済みで終了待ちの job
    draining: Vec<JoinHandle<()>>,
}

impl Supervisor {
    fn new(
        store: Arc<ConversationStore>,
        service: Arc<dyn VideoService>,
        policy: PollPolicy,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            service,
            policy: Arc::new(policy),
            shutdown_rx,
            active: HashMap::new(),
            retired: HashSet::new(),
            draining: Vec::new(),
        }
    }

    async fn run(mut self) {
        let mut conversation_rx = self.store.subscribe();

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let conversation = conversation_rx.borrow_and_update().clone();
            self.reconcile(&conversation);

            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    // sender の drop == handle の drop == teardown
                    if changed.is_err() {
                        break;
                    }
                }
                changed = conversation_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.stop_all().await;
    }

    fn reconcile(&mut self, conversation: &Conversation) {
        let wanted = conversation.processing();
        let wanted_ids: HashSet<&TaskId> = wanted.iter().map(|(_, task_id)| task_id).collect();

        // processing を抜けたメッセージの job を止める
        let retiring: Vec<TaskId> = self
            .active
            .keys()
            .filter(|task_id| !wanted_ids.contains(task_id))
            .cloned()
            .collect();
        for task_id in retiring {
            if let Some(poll) = self.active.remove(&task_id) {
                debug!(task_id = %task_id, message_id = %poll.message_id, "polling stopped");
                self.draining.push(poll.cancel());
            }
            self.retired.insert(task_id);
        }
        self.retired
            .retain(|task_id| conversation.find_by_task(task_id).is_some());
        self.draining.retain(|join| !join.is_finished());

        for (message_id, task_id) in wanted {
            if self.retired.contains(&task_id) {
                continue;
            }
            if let Some(poll) = self.active.get(&task_id) {
                if !poll.join.is_finished() {
                    continue;
                }
                warn!(task_id = %task_id, "poll job exited while task still processing, restarting");
            }
            let poll = self.start(message_id, task_id.clone());
            self.active.insert(task_id, poll);
        }
    }

    fn start(&self, message_id: MessageId, task_id: TaskId) -> ActivePoll {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let job = PollJob {
            message_id,
            task_id: task_id.clone(),
            store: Arc::clone(&self.store),
            service: Arc::clone(&self.service),
            policy: Arc::clone(&self.policy),
            cancel_rx,
            shutdown_rx: self.shutdown_rx.clone(),
        };
        debug!(task_id = %task_id, message_id = %message_id, "polling started");

        ActivePoll {
            message_id,
            cancel_tx,
            join: tokio::spawn(job.run()),
        }
    }

    async fn stop_all(mut self) {
        let active: Vec<ActivePoll> = self.active.drain().map(|(_, poll)| poll).collect();
        for poll in active {
            self.draining.push(poll.cancel());
        }
        // キャンセルされた job は問い合わせの完了を待たずに抜ける
        for join in self.draining {
            if let Err(e) = join.await {
                warn!(error = %e, "poll job did not exit cleanly");
            }
        }
        debug!("poller stopped");
    }
}

struct PollJob {
    message_id: MessageId,
    task_id: TaskId,
    store: Arc<ConversationStore>,
    service: Arc<dyn VideoService>,
    policy: Arc<PollPolicy>,
    cancel_rx: watch::Receiver<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PollJob {
    /// # ループ
    /// 1. `delay_after(failures)` だけ待つ（deadline / キャンセルで中断）
    /// 2. deadline 超過なら failed にして終了
    /// 3. status を問い合わせる（deadline / キャンセルと競争させる）
    /// 4. 終端なら store に書いて終了、processing なら 1 に戻る
    async fn run(mut self) {
        let started = Instant::now();
        let deadline = self.policy.task_timeout.map(|timeout| started + timeout);
        let mut failures: u32 = 0;

        loop {
            let delay = self.policy.delay_after(failures);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = until(deadline) => {}
                _ = self.cancel_rx.changed() => {}
                _ = self.shutdown_rx.changed() => {}
            }
            if self.is_cancelled() {
                return;
            }
            if deadline.is_some_and(|at| Instant::now() >= at) {
                self.time_out();
                return;
            }

            let answer = tokio::select! {
                answer = self.service.task_status(&self.task_id) => answer,
                _ = until(deadline) => {
                    self.time_out();
                    return;
                }
                _ = self.cancel_rx.changed() => {
                    debug!(task_id = %self.task_id, "status query abandoned after cancellation");
                    return;
                }
                _ = self.shutdown_rx.changed() => {
                    debug!(task_id = %self.task_id, "status query abandoned at shutdown");
                    return;
                }
            };

            match answer {
                Ok(report) if !report.is_terminal() => {
                    failures = 0;
                }
                Ok(report) => {
                    self.finish(&report);
                    return;
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        task_id = %self.task_id,
                        error = %e,
                        failures,
                        "error checking video status"
                    );
                    if let Some(max) = self.policy.max_consecutive_failures {
                        if failures >= max {
                            self.give_up(format!(
                                "Stopped checking video status after {failures} failed attempts"
                            ));
                            return;
                        }
                    }
                }
            }
        }
    }

    /// 明示的なキャンセル、shutdown、または所有者の消滅
    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
            || *self.shutdown_rx.borrow()
            || self.cancel_rx.has_changed().is_err()
            || self.shutdown_rx.has_changed().is_err()
    }

    fn finish(&self, report: &StatusReport) {
        if self.is_cancelled() {
            debug!(task_id = %self.task_id, "discarding status received after cancellation");
            return;
        }

        match self.store.resolve(self.message_id, &self.task_id, report) {
            Ok(Resolution::Applied(_)) => {
                info!(
                    task_id = %self.task_id,
                    message_id = %self.message_id,
                    status = %report.status,
                    "video task finished"
                );
            }
            Ok(Resolution::Stale) => {
                debug!(task_id = %self.task_id, "message no longer processing, result dropped");
            }
            Err(e) => {
                warn!(task_id = %self.task_id, error = %e, "could not record task result");
            }
        }
    }

    fn time_out(&self) {
        let secs = self.policy.task_timeout.map_or(0, |timeout| timeout.as_secs());
        self.give_up(format!("Video generation timed out after {secs}s"));
    }

    fn give_up(&self, reason: String) {
        warn!(task_id = %self.task_id, reason = %reason, "giving up on video task");
        self.finish(&StatusReport::failed(reason));
    }
}

/// `deadline` まで待つ。`None` なら永遠に完了しない。
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
