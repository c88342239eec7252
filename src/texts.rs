//! HTML message bodies and link targets shown by the bot.

use crate::types::Stats;

pub const WELCOME: &str = "🌟 <b>Welcome to Naino Academy!</b> 🌟

🚀 Your one-stop destination for:
• 📚 Free DPP &amp; Study Materials
• 🎓 Premium Lectures
• 📺 Educational Content
• 👥 Study Groups

👇 <b>Choose an option below to get started:</b>";

pub const MAIN_MENU: &str = "🏠 <b>Main Menu</b>\n\nChoose an option:";

pub const HELP: &str = "Please click the button below to contact admin:";

pub const FREE_DPP: &str = "Please click the button below to open Free DPP bot:";

pub const PREMIUM_LECTURES: &str = "🎓 <b>Premium Lectures</b>

Enhance your learning with our premium features:
• 🎥 HD Video Lectures
• 📝 Detailed PDF Notes
• ❓ Doubt Solving Sessions
• 📱 Access Anywhere, Anytime

👇 <b>Watch the guide and contact for purchase:</b>";

pub const YOUTUBE: &str = "📺 <b>Our YouTube Channels</b>

Subscribe to our channels for:
• 🎓 Free educational content
• 📚 Subject-wise tutorials
• 💡 Study tips &amp; strategies
• 🏆 Success stories

👇 <b>Choose a channel to explore:</b>";

pub const GROUPS: &str = "👥 <b>Join Our Community</b>

Connect with fellow students in our active groups:
• 💬 Discussion &amp; Doubts
• 📚 Study Material Sharing
• 🎯 Exam Updates
• 🤝 Peer Support

👇 <b>Choose a group to join:</b>";

pub const ADMIN_PANEL: &str = "🛠️ <b>Admin Panel</b>

Manage your bot efficiently with these tools:";

pub const BROADCAST_HOWTO: &str = "📢 <b>Send Broadcast</b>

Send me the announcement as a plain text message (more than 10 characters). \
It will be delivered to every user of the bot.";

pub const NO_PERMISSION: &str = "❌ You don't have permission to use this command.";
pub const ACCESS_DENIED: &str = "❌ Access denied";

pub const DAILY_UPDATE: &str = "🗓️ <b>Today's Update!</b>

🎁 New DPP added in Free DPP section!
📚 Study tips and tricks available
💪 Stay motivated and keep learning!

Check the main menu for latest content 👇";

pub const WEEKLY_TIP: &str = "📚 <b>Weekly Study Tip</b>

🎯 Plan your week ahead and set daily goals!
📖 Small consistent efforts lead to big results.
⏰ Manage time effectively for better productivity.

Check out our YouTube channels for more tips! 👇";

pub const CONTACT_ADMIN_URL: &str = "https://t.me/Nainoacademy";
pub const FREE_DPP_BOT_URL: &str = "https://t.me/FreeDPPBot";
pub const LECTURE_GUIDE_URL: &str = "https://youtube.com/shorts/_yw9tPqkSuo?si=wUcQ9ZLbUS8svCiY";
pub const LECTURE_CONTACTS: [(&str, &str); 2] = [
    ("💬 Contact Option 1", "https://t.me/Nainoacademy"),
    ("💬 Contact Option 2", "https://t.me/Pankajmourrya"),
];

pub const YOUTUBE_CHANNELS: [(&str, &str); 3] = [
    ("🔴 Wisdom NEET", "https://www.youtube.com/@wisdomneet"),
    ("🔴 LearnX NEET", "https://www.youtube.com/@Learnxneet"),
    ("🔴 Naino NEET", "https://www.youtube.com/@NainoNeet"),
];

pub const COMMUNITY_GROUPS: [(&str, &str); 3] = [
    ("💬 GROUP 1", "https://t.me/nainoneet"),
    ("💬 GROUP 2", "https://t.me/+kYDy07SlxeI5ZDZl"),
    ("💬 GROUP 3", "https://t.me/Nainoacademy_bot"),
];

pub fn stats(stats: &Stats) -> String {
    format!(
        "📊 <b>Bot Statistics</b>

👤 Total Users: <b>{}</b>
🆕 New Users Today: <b>{}</b>
📈 Active Today: <b>{}</b>",
        stats.total_users, stats.new_users_today, stats.active_today
    )
}

/// Wraps an admin's plain-text message; the text itself is escaped.
pub fn announcement(text: &str) -> String {
    format!(
        "📢 <b>Announcement:</b>\n\n{}",
        html_escape::encode_text(text)
    )
}

pub fn broadcast_summary(delivered: usize, total: usize) -> String {
    format!("✅ Broadcast completed!\n📨 Sent to: {delivered}/{total} users")
}

#[cfg(test)]
mod texts_test {
    use super::*;

    #[test]
    fn stats_text() {
        let text = stats(&Stats {
            total_users: 10,
            new_users_today: 2,
            active_today: 5,
        });
        assert!(text.contains("Total Users: <b>10</b>"));
        assert!(text.contains("New Users Today: <b>2</b>"));
        assert!(text.contains("Active Today: <b>5</b>"));
    }

    #[test]
    fn summary_text() {
        assert_eq!(
            broadcast_summary(3, 4),
            "✅ Broadcast completed!\n📨 Sent to: 3/4 users"
        );
    }

    #[test]
    fn announcement_escapes_markup() {
        assert_eq!(
            announcement("Exam on 5 < 6 & bring <pen>"),
            "📢 <b>Announcement:</b>\n\nExam on 5 &lt; 6 &amp; bring &lt;pen&gt;"
        );
    }
}
