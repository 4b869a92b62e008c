//! PollPolicy - ステータスを問い合わせる間隔と、諦めるタイミング

use std::time::Duration;

/// 同じタスクへの問い合わせ間隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// 問い合わせ失敗後の backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 1 回目の失敗後の待ち時間
    pub base_delay: Duration,

    /// 指数 backoff の倍率
    pub multiplier: f64,

    /// 1 回の待ち時間の上限
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn exponential(base_delay: Duration) -> Self {
        Self {
            base_delay,
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }

    /// `failures` 回連続で失敗した後の待ち時間（1-indexed）
    ///
    /// delay = base_delay * multiplier^(failures - 1)（`max_delay` で頭打ち）
    ///
    /// 例: base_delay=2s, multiplier=2.0
    /// - failure 1: 2s
    /// - failure 2: 4s
    /// - failure 3: 8s
    pub fn next_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }
}

/// 処理中タスクの poll 方針
///
/// `PollPolicy::default()` は 2s ごとに無期限で poll し、一時的なエラーは全て握りつぶす。
/// 上限はすべて opt-in:
/// - `max_consecutive_failures`: 問い合わせがこの回数連続で失敗したら failed にする
/// - `task_timeout`: poll 開始からこの時間たっても processing なら failed にする
///   （応答の無い問い合わせも含む）
/// - `backoff`: 失敗後は通常の間隔ではなく backoff で待つ
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_consecutive_failures: Option<u32>,
    pub task_timeout: Option<Duration>,
    pub backoff: Option<RetryPolicy>,
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = Some(max);
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_backoff(mut self, backoff: RetryPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// 現在の連続失敗回数に応じた次の問い合わせまでの待ち時間
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        match (&self.backoff, consecutive_failures) {
            (Some(backoff), n) if n > 0 => backoff.next_delay(n),
            _ => self.interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_failures: None,
            task_timeout: None,
            backoff: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_polls_forever_every_two_seconds() {
        let policy = PollPolicy::default();

        assert_eq!(policy.interval, Duration::from_millis(2000));
        assert_eq!(policy.max_consecutive_failures, None);
        assert_eq!(policy.task_timeout, None);
        assert_eq!(policy.delay_after(0), policy.interval);
        assert_eq!(policy.delay_after(7), policy.interval);
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::exponential(Duration::from_secs(2));

        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::exponential(Duration::from_secs(2));

        assert_eq!(policy.next_delay(10), Duration::from_secs(60));
        assert_eq!(policy.next_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn backoff_only_applies_after_failures() {
        let policy =
            PollPolicy::default().with_backoff(RetryPolicy::exponential(Duration::from_secs(5)));

        assert_eq!(policy.delay_after(0), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
    }
}
