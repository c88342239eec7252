//! SQLite store: users, their actions, and sent broadcasts.
//! A single connection is shared behind a mutex; it is never held across an await.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension};
use teloxide::types::{ChatId, UserId};

use crate::types::{Profile, Stats};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
    tz: Tz,
}

impl Db {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: &Path, tz: Tz) -> rusqlite::Result<Self> {
        Self::init(Connection::open(path)?, tz)
    }

    pub fn open_in_memory(tz: Tz) -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?, tz)
    }

    fn init(conn: Connection, tz: Tz) -> rusqlite::Result<Self> {
        create_tables(&conn)?;
        ensure_data_center_column(&conn)?;
        log::info!("Database initialized");
        Ok(Db {
            conn: Arc::new(Mutex::new(conn)),
            tz,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> String {
        Utc::now()
            .with_timezone(&self.tz)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Inserts the user unless already known. Returns whether a row was added.
    pub fn add_user(&self, profile: &Profile) -> rusqlite::Result<bool> {
        let now = self.now();
        let added = self.conn().execute(
            "INSERT OR IGNORE INTO users (user_id, username, first_name, last_name, join_date, last_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                profile.id.0 as i64,
                profile.username,
                profile.first_name,
                profile.last_name,
                now
            ],
        )?;
        log::debug!("user {} stored (new: {})", profile.id, added > 0);
        Ok(added > 0)
    }

    pub fn mark_data_center_sent(&self, user: UserId) -> rusqlite::Result<()> {
        self.conn().execute(
            "UPDATE users SET data_center_sent = TRUE WHERE user_id = ?1",
            params![user.0 as i64],
        )?;
        Ok(())
    }

    pub fn is_data_center_sent(&self, user: UserId) -> rusqlite::Result<bool> {
        Ok(self
            .conn()
            .query_row(
                "SELECT data_center_sent FROM users WHERE user_id = ?1",
                params![user.0 as i64],
                |row| row.get::<_, bool>(0),
            )
            .optional()?
            .unwrap_or(false))
    }

    pub fn update_user_activity(&self, user: UserId) -> rusqlite::Result<()> {
        let now = self.now();
        self.conn().execute(
            "UPDATE users SET last_active = ?1 WHERE user_id = ?2",
            params![now, user.0 as i64],
        )?;
        Ok(())
    }

    pub fn log_action(&self, user: UserId, action: &str) -> rusqlite::Result<()> {
        let now = self.now();
        self.conn().execute(
            "INSERT INTO user_actions (user_id, action, timestamp) VALUES (?1, ?2, ?3)",
            params![user.0 as i64, action, now],
        )?;
        Ok(())
    }

    pub fn user_stats(&self, today: NaiveDate) -> rusqlite::Result<Stats> {
        let conn = self.conn();
        let today = today.format("%Y-%m-%d").to_string();
        let count = |sql: &str, args: &[&dyn rusqlite::ToSql]| -> rusqlite::Result<u64> {
            conn.query_row(sql, args, |row| row.get::<_, i64>(0))
                .map(|n| n.max(0) as u64)
        };
        Ok(Stats {
            total_users: count("SELECT COUNT(*) FROM users", &[])?,
            new_users_today: count(
                "SELECT COUNT(*) FROM users WHERE DATE(join_date) = ?1",
                &[&today],
            )?,
            active_today: count(
                "SELECT COUNT(*) FROM users WHERE DATE(last_active) = ?1",
                &[&today],
            )?,
        })
    }

    /// Private chat ids of every stored user, oldest first.
    pub fn all_users(&self) -> rusqlite::Result<Vec<ChatId>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0).map(ChatId))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn record_broadcast(
        &self,
        admin: UserId,
        message: &str,
        users_reached: usize,
    ) -> rusqlite::Result<()> {
        let now = self.now();
        self.conn().execute(
            "INSERT INTO broadcasts (admin_id, message, timestamp, users_reached) VALUES (?1, ?2, ?3, ?4)",
            params![admin.0 as i64, message, now, users_reached as i64],
        )?;
        Ok(())
    }

    #[cfg(test)]
    fn set_join_date(&self, user: UserId, stamp: &str) {
        self.conn()
            .execute(
                "UPDATE users SET join_date = ?1, last_active = ?1 WHERE user_id = ?2",
                params![stamp, user.0 as i64],
            )
            .unwrap();
    }
}

fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          INTEGER UNIQUE,
            username         TEXT,
            first_name       TEXT,
            last_name        TEXT,
            join_date        TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            last_active      TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            data_center_sent BOOLEAN DEFAULT FALSE
        );

        CREATE TABLE IF NOT EXISTS user_actions (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id   INTEGER,
            action    TEXT,
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS broadcasts (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            admin_id      INTEGER,
            message       TEXT,
            timestamp     TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            users_reached INTEGER DEFAULT 0
        );
        ",
    )
}

/// Databases created before the data-center report existed lack the flag.
fn ensure_data_center_column(conn: &Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(users)")?;
    let has_column = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .iter()
        .any(|c| c == "data_center_sent");
    if !has_column {
        log::info!("adding users.data_center_sent column");
        conn.execute(
            "ALTER TABLE users ADD COLUMN data_center_sent BOOLEAN DEFAULT FALSE",
            [],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod db_test {
    use super::*;

    fn profile(id: u64) -> Profile {
        Profile {
            id: UserId(id),
            username: Some(format!("user{id}")),
            first_name: Some("Foo".to_string()),
            last_name: None,
        }
    }

    #[test]
    fn add_user_is_idempotent() {
        let db = Db::open_in_memory(Tz::UTC).unwrap();
        assert!(db.add_user(&profile(1)).unwrap());
        assert!(!db.add_user(&profile(1)).unwrap());
        assert!(db.add_user(&profile(2)).unwrap());
        assert_eq!(db.all_users().unwrap(), vec![ChatId(1), ChatId(2)]);
    }

    #[test]
    fn data_center_flag() {
        let db = Db::open_in_memory(Tz::UTC).unwrap();
        assert!(!db.is_data_center_sent(UserId(1)).unwrap());
        db.add_user(&profile(1)).unwrap();
        assert!(!db.is_data_center_sent(UserId(1)).unwrap());
        db.mark_data_center_sent(UserId(1)).unwrap();
        assert!(db.is_data_center_sent(UserId(1)).unwrap());
    }

    #[test]
    fn stats_count_today_only() {
        let db = Db::open_in_memory(Tz::UTC).unwrap();
        for id in 1..=3 {
            db.add_user(&profile(id)).unwrap();
        }
        db.set_join_date(UserId(3), "2020-01-01 08:00:00");

        let stats = db.user_stats(db.today()).unwrap();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.new_users_today, 2);
        assert_eq!(stats.active_today, 2);

        db.update_user_activity(UserId(3)).unwrap();
        assert_eq!(db.user_stats(db.today()).unwrap().active_today, 3);

        let old = db
            .user_stats(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
            .unwrap();
        assert_eq!(old.new_users_today, 1);
    }

    #[test]
    fn actions_and_broadcasts_are_recorded() {
        let db = Db::open_in_memory(Tz::UTC).unwrap();
        db.log_action(UserId(1), "start_command").unwrap();
        db.record_broadcast(UserId(1), "hello everyone", 5).unwrap();
        let conn = db.conn();
        let action: String = conn
            .query_row("SELECT action FROM user_actions", [], |r| r.get(0))
            .unwrap();
        let reached: i64 = conn
            .query_row("SELECT users_reached FROM broadcasts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(action, "start_command");
        assert_eq!(reached, 5);
    }

    #[test]
    fn legacy_table_gets_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER UNIQUE,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                join_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                last_active TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO users (user_id) VALUES (7);",
        )
        .unwrap();
        let db = Db::init(conn, Tz::UTC).unwrap();
        assert!(!db.is_data_center_sent(UserId(7)).unwrap());
        db.mark_data_center_sent(UserId(7)).unwrap();
        assert!(db.is_data_center_sent(UserId(7)).unwrap());
    }
}
