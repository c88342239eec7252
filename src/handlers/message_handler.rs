use std::sync::Arc;

use teloxide::prelude::*;

use super::logged;
use crate::{
    broadcast::{send_to_all, BatchPolicy},
    config::Settings,
    db::Db,
    texts,
};

/// Shorter admin messages are treated as chatter, not announcements.
const MIN_BROADCAST_CHARS: usize = 10;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    db: Db,
    settings: Arc<Settings>,
) -> ResponseResult<()> {
    let Some(admin) = msg.from.as_ref().map(|u| u.id) else {
        return Ok(());
    };
    if !settings.is_admin(admin) || msg.reply_to_message().is_some() {
        return Ok(());
    }
    let Some(text) = msg.text().filter(|t| is_broadcast_text(t)) else {
        return Ok(());
    };

    let Some(users) = logged(db.all_users(), "loading users") else {
        return Ok(());
    };
    log::info!("broadcasting to {} users", users.len());
    let delivered = send_to_all(
        &bot,
        &users,
        &texts::announcement(text),
        BatchPolicy::ANNOUNCEMENT,
    )
    .await;
    logged(
        db.record_broadcast(admin, text, delivered),
        "recording broadcast",
    );

    bot.send_message(msg.chat.id, texts::broadcast_summary(delivered, users.len()))
        .await
        .and(Ok(()))
}

pub fn is_broadcast_text(text: &str) -> bool {
    !text.starts_with('/') && text.chars().count() > MIN_BROADCAST_CHARS
}

#[cfg(test)]
mod message_handler_test {
    use super::*;

    #[test]
    fn broadcast_text_rules() {
        assert!(is_broadcast_text("Exam schedule is out today"));
        assert!(!is_broadcast_text("hi there"));
        assert!(!is_broadcast_text("0123456789"));
        assert!(is_broadcast_text("01234567890"));
        assert!(!is_broadcast_text("/unknown command text"));
    }

    #[test]
    fn length_counts_characters() {
        // Ten characters, twenty bytes.
        assert!(!is_broadcast_text("éééééééééé"));
        assert!(is_broadcast_text("ééééééééééé"));
    }
}
