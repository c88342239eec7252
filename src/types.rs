use teloxide::types::{User, UserId};

/// The part of a Telegram user the bot stores and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()).filter(|n| !n.is_empty()),
            last_name: user.last_name.clone(),
        }
    }
}

impl Profile {
    pub fn username_or_default(&self) -> &str {
        self.username.as_deref().unwrap_or("No username")
    }

    pub fn first_name_or_default(&self) -> &str {
        self.first_name.as_deref().unwrap_or("No first name")
    }

    pub fn last_name_or_default(&self) -> &str {
        self.last_name.as_deref().unwrap_or("No last name")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_users: u64,
    pub new_users_today: u64,
    pub active_today: u64,
}
