//! Reports every new user once to a second bot, the "data center".

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeZone};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Serialize;
use thiserror::Error;

use teloxide::types::UserId;

use crate::{db::Db, types::Profile};

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 2;
const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[derive(Error, Debug)]
pub enum DataCenterError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("data center answered {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct DataCenter {
    client: ClientWithMiddleware,
    endpoint: String,
    chat_id: String,
    db: Db,
    in_flight: Arc<Mutex<HashSet<UserId>>>,
}

/// Marks a report as being sent; released when dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<UserId>>,
    user: UserId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user);
    }
}

impl DataCenter {
    pub fn new(token: &str, chat_id: &str, db: Db) -> reqwest::Result<Self> {
        Self::with_api_base(API_BASE, token, chat_id, db)
    }

    pub fn with_api_base(
        api_base: &str,
        token: &str,
        chat_id: &str,
        db: Db,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        Ok(Self {
            client: ClientBuilder::new(client)
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build(),
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
            db,
            in_flight: Arc::default(),
        })
    }

    fn claim(&self, user: UserId) -> Option<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        set.insert(user).then(|| InFlight {
            set: &self.in_flight,
            user,
        })
    }

    /// Sends the report unless this user was already reported or a report
    /// for them is in flight. `Ok(false)` means nothing had to be sent.
    pub async fn notify_new_user(&self, profile: &Profile) -> Result<bool, DataCenterError> {
        let Some(_in_flight) = self.claim(profile.id) else {
            log::info!("User {} report already in flight (skipping)", profile.id);
            return Ok(false);
        };
        if self.db.is_data_center_sent(profile.id)? {
            log::info!("User {} already sent to Data Center (skipping)", profile.id);
            return Ok(false);
        }

        let text = new_user_report(profile, &chrono::Local::now());
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: &text,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DataCenterError::Rejected { status, body });
        }

        self.db.mark_data_center_sent(profile.id)?;
        log::info!("User data sent to Data Center: {}", profile.id);
        Ok(true)
    }
}

pub fn new_user_report<Tz: TimeZone>(profile: &Profile, joined: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "🆕 NEW USER - NAINO ACADEMY BOT

👤 User Information:
• Chat ID: {}
• Username: @{}
• First Name: {}
• Last Name: {}
• Joined: {}
• Source: Naino_Academy_Bot",
        profile.id,
        profile.username_or_default(),
        profile.first_name_or_default(),
        profile.last_name_or_default(),
        joined.format("%Y-%m-%d %H:%M:%S"),
    )
}
