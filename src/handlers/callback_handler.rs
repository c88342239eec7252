use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardMarkup, MessageId, ParseMode},
    ApiError, RequestError,
};

use super::logged;
use crate::{config::Settings, db::Db, keyboards::*, texts};

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    db: Db,
    settings: Arc<Settings>,
) -> ResponseResult<()> {
    let Some(data) = q.data.as_deref() else {
        return bot.answer_callback_query(q.id.clone()).await.and(Ok(()));
    };
    log::debug!("got callback {data} from {}", q.from.id);

    let user = q.from.id;
    let origin = q.message.as_ref().map(|m| (m.chat().id, m.id()));
    let chat = origin.map_or(ChatId::from(user), |(chat, _)| chat);

    match data {
        CB_MAIN_MENU => {
            track(&db, user, "main_menu");
            edit_or_send(&bot, chat, origin, texts::MAIN_MENU, main_menu()).await?;
            bot.answer_callback_query(q.id).await?;
        }
        CB_HELP => {
            track(&db, user, "help_section");
            bot.answer_callback_query(q.id).await?;
            bot.send_message(chat, texts::HELP)
                .reply_markup(contact_admin())
                .await?;
        }
        CB_FREE_DPP => {
            track(&db, user, "free_dpp");
            bot.answer_callback_query(q.id).await?;
            bot.send_message(chat, texts::FREE_DPP)
                .reply_markup(free_dpp())
                .await?;
        }
        CB_BUY_LECTURE => {
            track(&db, user, "buy_lecture");
            edit_or_send(&bot, chat, origin, texts::PREMIUM_LECTURES, buy_lecture()).await?;
            bot.answer_callback_query(q.id).await?;
        }
        CB_YOUTUBE => {
            track(&db, user, "youtube_channels");
            edit_or_send(&bot, chat, origin, texts::YOUTUBE, youtube()).await?;
            bot.answer_callback_query(q.id).await?;
        }
        CB_GROUPS => {
            track(&db, user, "public_groups");
            edit_or_send(&bot, chat, origin, texts::GROUPS, groups()).await?;
            bot.answer_callback_query(q.id).await?;
        }
        CB_ADMIN_STATS | CB_ADMIN_BROADCAST if !settings.is_admin(user) => {
            bot.answer_callback_query(q.id)
                .text(texts::ACCESS_DENIED)
                .show_alert(true)
                .await?;
        }
        CB_ADMIN_STATS => {
            let stats = logged(db.user_stats(db.today()), "reading stats").unwrap_or_default();
            edit_or_send(&bot, chat, origin, &texts::stats(&stats), admin_panel()).await?;
            bot.answer_callback_query(q.id).await?;
        }
        CB_ADMIN_BROADCAST => {
            logged(db.log_action(user, "admin_broadcast"), "logging action");
            bot.answer_callback_query(q.id).await?;
            bot.send_message(chat, texts::BROADCAST_HOWTO)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        other => {
            log::debug!("unknown callback data {other}");
            bot.answer_callback_query(q.id).await?;
        }
    }

    Ok(())
}

fn track(db: &Db, user: UserId, action: &str) {
    logged(db.log_action(user, action), "logging action");
    logged(db.update_user_activity(user), "updating activity");
}

/// Replaces the menu the button belonged to, or sends a fresh one when the
/// original message is no longer accessible.
async fn edit_or_send(
    bot: &Bot,
    chat: ChatId,
    origin: Option<(ChatId, MessageId)>,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) -> ResponseResult<()> {
    let result = match origin {
        Some((chat, id)) => bot
            .edit_message_text(chat, id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await
            .map(|_| ()),
        None => bot
            .send_message(chat, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await
            .map(|_| ()),
    };
    match result {
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        other => other,
    }
}
