use std::{path::PathBuf, process::ExitCode, sync::Arc};

use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use naino_academy_bot::*;
use reqwest::Url;
use teloxide::prelude::*;

use config::{Credentials, Settings, DEFAULT_DATABASE_PATH};
use data_center::DataCenter;
use db::Db;

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(about = "Naino Academy Telegram bot.")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Time zone of scheduled jobs and daily statistics
    #[arg(long, env = "SCHEDULE_TZ", default_value = "UTC", value_parser = parse_tz)]
    timezone: Tz,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Fetch updates with long polling
    Polling,
    /// Receive updates through an HTTP webhook
    Webhook {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,

        /// Public base url Telegram should call, `RENDER_EXTERNAL_URL` if unset
        #[arg(long, env = "WEBHOOK_URL")]
        url: Option<Url>,

        #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
}

fn parse_tz(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let credentials = match Credentials::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(guard::EXIT_MISSING_CONFIGURATION);
        }
    };
    let settings = Arc::new(Settings::new(credentials, cli.database, cli.timezone));

    let db = match Db::open(&settings.database_path, settings.timezone) {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to open {}: {e}", settings.database_path.display());
            return ExitCode::FAILURE;
        }
    };
    let data_center = match DataCenter::new(
        &settings.credentials.data_center_token,
        &settings.credentials.data_center_chat_id,
        db.clone(),
    ) {
        Ok(dc) => dc,
        Err(e) => {
            log::error!("Failed to build data center client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let bot = Bot::new(&settings.credentials.bot_token);
    scheduler::spawn(
        scheduler::default_jobs(),
        bot.clone(),
        db.clone(),
        settings.timezone,
    );

    let mut dispatcher = Dispatcher::builder(bot.clone(), handlers::schema())
        .dependencies(dptree::deps![db, data_center, settings])
        .enable_ctrlc_handler()
        .build();

    log::info!("Started");

    match cli.mode {
        Mode::Polling => {
            dispatcher.dispatch().await;
        }
        Mode::Webhook { port, url, secret } => {
            let Some(public_url) = url.or_else(render_external_url) else {
                log::error!("webhook mode needs WEBHOOK_URL or RENDER_EXTERNAL_URL");
                return ExitCode::FAILURE;
            };
            let config = server::WebhookConfig {
                port,
                public_url,
                secret_token: secret,
            };
            if let Err(e) = server::serve(bot, dispatcher, config).await {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn render_external_url() -> Option<Url> {
    std::env::var("RENDER_EXTERNAL_URL")
        .ok()
        .and_then(|u| Url::parse(&u).ok())
}
