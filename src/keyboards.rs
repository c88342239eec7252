use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::texts;

pub const CB_MAIN_MENU: &str = "main_menu";
pub const CB_HELP: &str = "help";
pub const CB_FREE_DPP: &str = "free_dpp";
pub const CB_BUY_LECTURE: &str = "buy_lecture";
pub const CB_YOUTUBE: &str = "youtube";
pub const CB_GROUPS: &str = "groups";
pub const CB_ADMIN_STATS: &str = "admin_stats";
pub const CB_ADMIN_BROADCAST: &str = "admin_broadcast";

const BACK_TO_MAIN: &str = "🔙 Back to Main";

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback("🆘 Help", CB_HELP),
            InlineKeyboardButton::callback("🎁 Free DPP", CB_FREE_DPP),
        ],
        vec![
            InlineKeyboardButton::callback("🎓 Buy Lectures", CB_BUY_LECTURE),
            InlineKeyboardButton::callback("▶️ YouTube", CB_YOUTUBE),
        ],
        vec![InlineKeyboardButton::callback("👥 Groups", CB_GROUPS)],
    ])
}

pub fn admin_panel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![InlineKeyboardButton::callback(
            "📈 View Stats",
            CB_ADMIN_STATS,
        )],
        vec![InlineKeyboardButton::callback(
            "📢 Send Broadcast",
            CB_ADMIN_BROADCAST,
        )],
        vec![InlineKeyboardButton::callback("🔙 Main Menu", CB_MAIN_MENU)],
    ])
}

pub fn contact_admin() -> InlineKeyboardMarkup {
    single_link("📞 Contact Admin Now", texts::CONTACT_ADMIN_URL)
}

pub fn free_dpp() -> InlineKeyboardMarkup {
    single_link("🤖 Open Free DPP Bot", texts::FREE_DPP_BOT_URL)
}

pub fn buy_lecture() -> InlineKeyboardMarkup {
    let mut rows = vec![link("▶️ Watch Guide", texts::LECTURE_GUIDE_URL)
        .into_iter()
        .collect::<Vec<_>>()];
    rows.push(
        texts::LECTURE_CONTACTS
            .iter()
            .filter_map(|(text, url)| link(text, url))
            .collect(),
    );
    rows.push(vec![back_to_main()]);
    InlineKeyboardMarkup::new(rows)
}

pub fn youtube() -> InlineKeyboardMarkup {
    link_list(&texts::YOUTUBE_CHANNELS)
}

pub fn groups() -> InlineKeyboardMarkup {
    link_list(&texts::COMMUNITY_GROUPS)
}

/// One link per row followed by the way back to the main menu.
fn link_list(links: &[(&str, &str)]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        links
            .iter()
            .filter_map(|(text, url)| link(text, url))
            .map(|button| vec![button])
            .chain(std::iter::once(vec![back_to_main()])),
    )
}

fn single_link(text: &str, url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([link(text, url).into_iter().collect::<Vec<_>>()])
}

fn back_to_main() -> InlineKeyboardButton {
    InlineKeyboardButton::callback(BACK_TO_MAIN, CB_MAIN_MENU)
}

fn link(text: &str, url: &str) -> Option<InlineKeyboardButton> {
    match Url::parse(url) {
        Ok(u) => Some(InlineKeyboardButton::url(text, u)),
        Err(e) => {
            log::error!("invalid link {url} for button {text}: {e}");
            None
        }
    }
}
