//! vidgen - 動画生成サービスのターミナルチャット
//!
//! 入力 1 行が 1 プロンプト。poller がステータスを書き込むたびに表示する。
//! - 入力終端: 処理中のタスクが終わるまで待ってから閉じる
//! - Ctrl-C: 即座に閉じる（問い合わせ中の結果は破棄）

mod view;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vidgen_core::app::{ChatSession, PollPolicy, RetryPolicy};
use vidgen_core::impls::{HttpVideoService, InMemoryVideoService};
use vidgen_core::ports::VideoService;

#[derive(Debug, Parser)]
#[command(name = "vidgen", version, about = "Chat with the video generator")]
struct Cli {
    /// API root of the proxy (or of the backend itself).
    #[arg(long, env = "VIDGEN_API_URL", default_value = "http://localhost:3000/api")]
    api_url: String,

    /// Use the built-in development backend instead of the API.
    #[arg(long)]
    offline: bool,

    #[arg(long, default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Mark a task failed after this many status errors in a row.
    #[arg(long)]
    max_poll_failures: Option<u32>,

    /// Mark a task failed when it is still processing after this long.
    #[arg(long)]
    task_timeout_secs: Option<u64>,

    /// Back off exponentially from this delay after a status error.
    #[arg(long)]
    backoff_base_ms: Option<u64>,
}

impl Cli {
    fn policy(&self) -> PollPolicy {
        let mut policy =
            PollPolicy::default().with_interval(Duration::from_millis(self.poll_interval_ms));
        if let Some(max) = self.max_poll_failures {
            policy = policy.with_max_consecutive_failures(max);
        }
        if let Some(secs) = self.task_timeout_secs {
            policy = policy.with_task_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = self.backoff_base_ms {
            policy = policy.with_backoff(RetryPolicy::exponential(Duration::from_millis(ms)));
        }
        policy
    }

    fn service(&self) -> Arc<dyn VideoService> {
        if self.offline {
            Arc::new(InMemoryVideoService::new().with_auto_complete(2))
        } else {
            Arc::new(HttpVideoService::new(self.api_url.clone()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout はチャット表示専用
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidgen=warn")),
        )
        .init();

    let cli = Cli::parse();
    info!(offline = cli.offline, api_url = %cli.api_url, "starting chat");
    let session = ChatSession::start(cli.service(), cli.policy())?;
    let render = tokio::spawn(view::run(session.store().subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(prompt) => {
                    session.submit(&prompt).await?;
                }
                None => break false,
            },
            _ = tokio::signal::ctrl_c() => break true,
        }
    };

    if !interrupted {
        let mut rx = session.store().subscribe();
        tokio::select! {
            _ = rx.wait_for(|c| c.counts().processing == 0) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    let counts = session.close().await;
    render.await?;
    println!(
        "{} messages, {} completed, {} failed, {} still processing",
        counts.messages, counts.completed, counts.failed, counts.processing
    );
    Ok(())
}
