//! Batched fan-out of one message to many chats.

use std::{future::Future, time::Duration};

use futures::future::join_all;
use teloxide::{prelude::*, types::ParseMode};

/// How recipients are grouped to stay below Telegram's flood limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub size: usize,
    pub pause: Duration,
}

impl BatchPolicy {
    /// Admin announcements.
    pub const ANNOUNCEMENT: BatchPolicy = BatchPolicy {
        size: 30,
        pause: Duration::from_millis(500),
    };

    /// Scheduled digests.
    pub const DIGEST: BatchPolicy = BatchPolicy {
        size: 25,
        pause: Duration::from_millis(300),
    };
}

/// Runs `send` for every recipient, one batch at a time. Failures are logged
/// and counted out; the return value is the number of successful sends.
pub async fn deliver<T, F, Fut, E>(recipients: &[T], policy: BatchPolicy, send: F) -> usize
where
    T: Copy + std::fmt::Display,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let size = policy.size.max(1);
    let batches = recipients.chunks(size).count();
    let mut delivered = 0;

    for (i, batch) in recipients.chunks(size).enumerate() {
        let results = join_all(batch.iter().map(|&r| {
            let fut = send(r);
            async move { (r, fut.await) }
        }))
        .await;

        for (r, result) in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => log::warn!("failed to deliver to {r}: {e}"),
            }
        }

        if i + 1 < batches && !policy.pause.is_zero() {
            tokio::time::sleep(policy.pause).await;
        }
    }

    delivered
}

/// Sends `text` as HTML to every chat in `chats`.
pub async fn send_to_all(bot: &Bot, chats: &[ChatId], text: &str, policy: BatchPolicy) -> usize {
    deliver(chats, policy, |chat| async move {
        bot.send_message(chat, text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
    })
    .await
}
