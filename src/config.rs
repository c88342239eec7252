use std::{env, path::PathBuf};

use chrono_tz::Tz;
use teloxide::types::UserId;
use thiserror::Error;

pub const BOT_TOKEN_1: &str = "BOT_TOKEN_1";
pub const CHAT_ID_1: &str = "CHAT_ID_1";
pub const BOT_TOKEN_2: &str = "BOT_TOKEN_2";
pub const CHAT_ID_2: &str = "CHAT_ID_2";

/// Every variable that has to be present and non-empty before anything starts.
pub const REQUIRED_VARS: [&str; 4] = [BOT_TOKEN_1, CHAT_ID_1, BOT_TOKEN_2, CHAT_ID_2];

/// Number of leading characters of a secret that may be echoed to the console.
pub const PREVIEW_LEN: usize = 15;

pub const DEFAULT_DATABASE_PATH: &str = "bot_database.db";

#[derive(Error, Debug, PartialEq, Eq)]
#[error(
    "missing required environment variables: {} (all of {} must be set and non-empty)",
    .missing.join(", "),
    REQUIRED_VARS.join(", ")
)]
pub struct MissingConfiguration {
    pub missing: Vec<&'static str>,
}

/// The four values read once at startup. Treated as opaque strings.
#[derive(Clone)]
pub struct Credentials {
    pub bot_token: String,
    pub admin_chat_id: String,
    pub data_center_token: String,
    pub data_center_chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &preview(&self.bot_token))
            .field("admin_chat_id", &preview(&self.admin_chat_id))
            .field("data_center_token", &preview(&self.data_center_token))
            .field("data_center_chat_id", &preview(&self.data_center_chat_id))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, MissingConfiguration> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the required variables through `lookup`. Unset and empty values
    /// are both reported, in declaration order.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MissingConfiguration>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = REQUIRED_VARS.map(|name| lookup(name).filter(|v| !v.is_empty()));
        let missing = REQUIRED_VARS
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(MissingConfiguration { missing });
        }

        let [bot_token, admin_chat_id, data_center_token, data_center_chat_id] =
            values.map(Option::unwrap_or_default);
        Ok(Self {
            bot_token,
            admin_chat_id,
            data_center_token,
            data_center_chat_id,
        })
    }

    /// `(name, value)` pairs in the order the variables are declared.
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            (BOT_TOKEN_1, &self.bot_token),
            (CHAT_ID_1, &self.admin_chat_id),
            (BOT_TOKEN_2, &self.data_center_token),
            (CHAT_ID_2, &self.data_center_chat_id),
        ]
    }
}

/// First [`PREVIEW_LEN`] characters of `value`, with `...` appended when
/// anything was cut off.
pub fn preview(value: &str) -> String {
    let mut chars = value.chars();
    let head = chars.by_ref().take(PREVIEW_LEN).collect::<String>();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Everything the bot process needs beyond the raw credentials.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub admin_id: Option<UserId>,
    pub database_path: PathBuf,
    pub timezone: Tz,
}

impl Settings {
    pub fn new(credentials: Credentials, database_path: PathBuf, timezone: Tz) -> Self {
        let admin_id = parse_admin_id(&credentials.admin_chat_id);
        if admin_id.is_none() {
            log::warn!("{CHAT_ID_1} is not a numeric user id, admin commands are disabled");
        }
        Self {
            credentials,
            admin_id,
            database_path,
            timezone,
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_id == Some(user)
    }
}

fn parse_admin_id(raw: &str) -> Option<UserId> {
    raw.trim().parse::<u64>().ok().map(UserId)
}
