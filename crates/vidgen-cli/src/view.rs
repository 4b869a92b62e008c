//! Terminal view - store の publish に合わせてメッセージを表示する
//!
//! view は何も駆動しない（snapshot を描画するだけ）。
//! メッセージは初めて現れたときと、置き換えられるたびに表示される。

use std::collections::HashMap;

use tokio::sync::watch;

use vidgen_core::app::Conversation;
use vidgen_core::domain::{Message, MessageId, Sender, VideoStatus};

pub const GENERATING_LABEL: &str = "Generating video...";
pub const FAILED_DEFAULT: &str = "Failed to generate video. Please try again.";

pub fn render(message: &Message) -> String {
    match message.sender {
        Sender::User => format!("you> {}", message.text),
        Sender::Bot => match (message.video_status, &message.task_id) {
            (Some(VideoStatus::Processing), _) => {
                format!("bot> {}\n     {GENERATING_LABEL}", message.text)
            }
            (Some(VideoStatus::Completed), Some(task_id)) => {
                let mut line = format!("bot> video ready: {}", task_id.video_path());
                if message.fallback {
                    line.push_str(" (fallback video)");
                }
                line
            }
            (Some(VideoStatus::Failed), _) => {
                format!(
                    "bot> {}",
                    message.error.as_deref().unwrap_or(FAILED_DEFAULT)
                )
            }
            _ => format!("bot> {}", message.text),
        },
    }
}

/// 前回表示した内容と異なるメッセージ
pub fn changed<'a>(
    seen: &mut HashMap<MessageId, Message>,
    conversation: &'a Conversation,
) -> Vec<&'a Message> {
    conversation
        .messages()
        .iter()
        .filter(|message| {
            if seen.get(&message.id) == Some(*message) {
                return false;
            }
            seen.insert(message.id, (*message).clone());
            true
        })
        .collect()
}

/// store が無くなるまで表示し続ける
pub async fn run(mut rx: watch::Receiver<Conversation>) {
    let mut seen = HashMap::new();
    loop {
        let lines: Vec<String> = {
            let conversation = rx.borrow_and_update();
            changed(&mut seen, &conversation)
                .into_iter()
                .map(render)
                .collect()
        };
        for line in lines {
            println!("{line}");
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use vidgen_core::app::ConversationStore;
    use vidgen_core::domain::{StatusReport, TaskId};
    use vidgen_core::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};

    fn bot_with(report: Option<StatusReport>) -> Message {
        let ids = UlidGenerator::new(SystemClock);
        let placeholder = Message::bot(ids.generate_message_id(), "placeholder", SystemClock.now());
        let processing = placeholder
            .with_task(TaskId::new("T1"), "I'm generating your video.")
            .unwrap();
        match report {
            Some(report) => processing.with_report(&report).unwrap(),
            None => processing,
        }
    }

    #[test]
    fn processing_shows_generating_label() {
        let text = render(&bot_with(None));

        assert!(text.starts_with("bot> I'm generating your video."));
        assert!(text.ends_with(GENERATING_LABEL));
    }

    #[rstest]
    #[case::plain(false, "bot> video ready: /api/videos/T1.mp4")]
    #[case::fallback(true, "bot> video ready: /api/videos/T1.mp4 (fallback video)")]
    fn completed_shows_video_path(#[case] fallback: bool, #[case] expected: &str) {
        let report = StatusReport {
            is_fallback: fallback,
            ..StatusReport::completed("/api/videos/T1.mp4")
        };

        assert_eq!(render(&bot_with(Some(report))), expected);
    }

    #[rstest]
    #[case::with_error(Some("render error"), "bot> render error")]
    #[case::without_error(None, "bot> Failed to generate video. Please try again.")]
    fn failed_shows_error_or_default(#[case] error: Option<&str>, #[case] expected: &str) {
        let report = StatusReport {
            error: error.map(str::to_string),
            ..StatusReport::failed("")
        };

        assert_eq!(render(&bot_with(Some(report))), expected);
    }

    #[test]
    fn only_replaced_messages_are_reprinted() {
        let store = ConversationStore::new();
        let ids = UlidGenerator::new(SystemClock);
        let user = ids.generate_message_id();
        let bot = ids.generate_message_id();
        store.append(Message::user(user, "hi", SystemClock.now())).unwrap();
        store.append(Message::bot(bot, "placeholder", SystemClock.now())).unwrap();

        let mut seen = HashMap::new();
        assert_eq!(changed(&mut seen, &store.snapshot()).len(), 2);
        assert!(changed(&mut seen, &store.snapshot()).is_empty());

        store.attach_task(bot, TaskId::new("T1"), "generating").unwrap();
        let snapshot = store.snapshot();
        let reprinted = changed(&mut seen, &snapshot);
        assert_eq!(reprinted.len(), 1);
        assert_eq!(reprinted[0].id, bot);
    }
}
