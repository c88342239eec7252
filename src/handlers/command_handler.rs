use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode, utils::command::BotCommands};

use super::logged;
use crate::{config::Settings, data_center::DataCenter, db::Db, keyboards, texts, types::Profile};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "Open the main menu.")]
    Start,
    #[command(description = "Open the admin panel. Admin only.")]
    Panel,
    #[command(description = "Show user statistics. Admin only.")]
    Stats,
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    db: Db,
    data_center: DataCenter,
    settings: Arc<Settings>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => start_handler(bot, msg, db, data_center).await,
        Command::Panel => panel_handler(bot, msg, db, &settings).await,
        Command::Stats => stats_handler(bot, msg, db, &settings).await,
    }
}

async fn start_handler(bot: Bot, msg: Message, db: Db, data_center: DataCenter) -> ResponseResult<()> {
    log::debug!("got command start");
    if let Some(user) = &msg.from {
        let profile = Profile::from(user);
        logged(db.add_user(&profile), "adding user");
        logged(db.log_action(user.id, "start_command"), "logging action");

        tokio::spawn(async move {
            if let Err(e) = data_center.notify_new_user(&profile).await {
                log::error!("Error sending to data center: {e}");
            }
        });
    }

    bot.send_message(msg.chat.id, texts::WELCOME)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::main_menu())
        .await
        .and(Ok(()))
}

async fn panel_handler(bot: Bot, msg: Message, db: Db, settings: &Settings) -> ResponseResult<()> {
    log::debug!("got command panel");
    let Some(admin) = admin_sender(&bot, &msg, settings).await? else {
        return Ok(());
    };
    logged(db.log_action(admin, "admin_panel"), "logging action");

    bot.send_message(msg.chat.id, texts::ADMIN_PANEL)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::admin_panel())
        .await
        .and(Ok(()))
}

async fn stats_handler(bot: Bot, msg: Message, db: Db, settings: &Settings) -> ResponseResult<()> {
    log::debug!("got command stats");
    if admin_sender(&bot, &msg, settings).await?.is_none() {
        return Ok(());
    }
    let stats = logged(db.user_stats(db.today()), "reading stats").unwrap_or_default();

    bot.send_message(msg.chat.id, texts::stats(&stats))
        .parse_mode(ParseMode::Html)
        .await
        .and(Ok(()))
}

/// The sender's id if they are the configured admin; everyone else is told off.
async fn admin_sender(bot: &Bot, msg: &Message, settings: &Settings) -> ResponseResult<Option<UserId>> {
    match &msg.from {
        Some(u) if settings.is_admin(u.id) => Ok(Some(u.id)),
        _ => {
            bot.send_message(msg.chat.id, texts::NO_PERMISSION).await?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod command_handler_test {
    use super::*;

    #[test]
    fn parses_lowercase_commands() {
        assert_eq!(Command::parse("/start", "naino_bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/panel", "naino_bot").unwrap(), Command::Panel);
        assert_eq!(
            Command::parse("/stats@naino_bot", "naino_bot").unwrap(),
            Command::Stats
        );
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(Command::parse("/help", "naino_bot").is_err());
        assert!(Command::parse("/stats@other_bot", "naino_bot").is_err());
    }
}
