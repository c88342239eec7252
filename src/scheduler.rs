//! Wall-clock jobs: the daily update and the weekly study tip.

use chrono::{DateTime, Datelike, Days, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use teloxide::prelude::*;

use crate::{
    broadcast::{send_to_all, BatchPolicy},
    db::Db,
    texts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Daily { at: NaiveTime },
    Weekly { on: Weekday, at: NaiveTime },
}

impl Trigger {
    /// First firing strictly after `now`. Local times skipped by a DST jump
    /// move to the next matching day.
    pub fn next_after(&self, now: DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let (at, weekday) = match *self {
            Trigger::Daily { at } => (at, None),
            Trigger::Weekly { on, at } => (at, Some(on)),
        };

        let mut day = now.date_naive();
        loop {
            if weekday.map_or(true, |w| day.weekday() == w) {
                if let Some(candidate) = tz.from_local_datetime(&day.and_time(at)).earliest() {
                    if candidate > now {
                        return candidate;
                    }
                }
            }
            day = match day.checked_add_days(Days::new(1)) {
                Some(d) => d,
                None => return now,
            };
        }
    }

    /// Next firing after both `now` and the slot that last fired, so a clock
    /// stepping backwards cannot repeat a slot.
    pub fn next_run(&self, now: DateTime<Tz>, last_fired: Option<DateTime<Tz>>) -> DateTime<Tz> {
        self.next_after(last_fired.map_or(now, |last| now.max(last)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Job {
    pub name: &'static str,
    pub trigger: Trigger,
    pub text: &'static str,
}

pub fn default_jobs() -> [Job; 2] {
    [
        Job {
            name: "daily_update",
            trigger: Trigger::Daily {
                at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            },
            text: texts::DAILY_UPDATE,
        },
        Job {
            name: "weekly_tip",
            trigger: Trigger::Weekly {
                on: Weekday::Mon,
                at: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            },
            text: texts::WEEKLY_TIP,
        },
    ]
}

/// Starts one task per job. Each task sleeps until the next firing and then
/// sends the job's text to every stored user.
pub fn spawn(jobs: impl IntoIterator<Item = Job>, bot: Bot, db: Db, tz: Tz) {
    for job in jobs {
        let bot = bot.clone();
        let db = db.clone();
        tokio::spawn(async move {
            let mut last_fired = None;
            loop {
                let now = Utc::now().with_timezone(&tz);
                let next = job.trigger.next_run(now, last_fired);
                log::info!("job {} scheduled for {}", job.name, next);
                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                run(&job, &bot, &db).await;
                last_fired = Some(next);
            }
        });
    }
    log::info!("Scheduler started and jobs scheduled");
}

async fn run(job: &Job, bot: &Bot, db: &Db) {
    let users = match db.all_users() {
        Ok(users) => users,
        Err(e) => {
            log::error!("Error in {}: {e}", job.name);
            return;
        }
    };
    let delivered = send_to_all(bot, &users, job.text, BatchPolicy::DIGEST).await;
    log::info!("job {} delivered to {}/{} users", job.name, delivered, users.len());
}

#[cfg(test)]
mod scheduler_test {
    use super::*;

    fn at(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn daily_later_today() {
        let trigger = Trigger::Daily { at: hm(9, 0) };
        let now = at(Tz::UTC, 2024, 5, 1, 7, 15);
        assert_eq!(trigger.next_after(now), at(Tz::UTC, 2024, 5, 1, 9, 0));
    }

    #[test]
    fn daily_exact_time_moves_to_tomorrow() {
        let trigger = Trigger::Daily { at: hm(9, 0) };
        let now = at(Tz::UTC, 2024, 5, 1, 9, 0);
        assert_eq!(trigger.next_after(now), at(Tz::UTC, 2024, 5, 2, 9, 0));
    }

    #[test]
    fn weekly_next_monday() {
        let trigger = Trigger::Weekly {
            on: Weekday::Mon,
            at: hm(10, 0),
        };
        // 2024-05-01 is a Wednesday.
        let now = at(Tz::UTC, 2024, 5, 1, 12, 0);
        assert_eq!(trigger.next_after(now), at(Tz::UTC, 2024, 5, 6, 10, 0));
    }

    #[test]
    fn weekly_same_day_after_time() {
        let trigger = Trigger::Weekly {
            on: Weekday::Mon,
            at: hm(10, 0),
        };
        let now = at(Tz::UTC, 2024, 5, 6, 10, 1);
        assert_eq!(trigger.next_after(now), at(Tz::UTC, 2024, 5, 13, 10, 0));
    }

    #[test]
    fn respects_time_zone() {
        let tz = chrono_tz::Asia::Kolkata;
        let trigger = Trigger::Daily { at: hm(9, 0) };
        let now = at(tz, 2024, 5, 1, 8, 0);
        let next = trigger.next_after(now);
        assert_eq!(next, at(tz, 2024, 5, 1, 9, 0));
        assert_eq!(next.with_timezone(&Utc).format("%H:%M").to_string(), "03:30");
    }

    #[test]
    fn skipped_local_time_moves_on() {
        // 02:30 does not exist in New York on 2024-03-10.
        let tz = chrono_tz::America::New_York;
        let trigger = Trigger::Daily { at: hm(2, 30) };
        let now = at(tz, 2024, 3, 10, 0, 0);
        assert_eq!(trigger.next_after(now), at(tz, 2024, 3, 11, 2, 30));
    }

    #[test]
    fn clock_stepping_back_does_not_repeat_slot() {
        let trigger = Trigger::Daily { at: hm(9, 0) };
        let fired = at(Tz::UTC, 2024, 5, 1, 9, 0);
        // The clock reads a little before the slot that just ran.
        let now = at(Tz::UTC, 2024, 5, 1, 8, 59);
        assert_eq!(trigger.next_after(now), fired);
        assert_eq!(
            trigger.next_run(now, Some(fired)),
            at(Tz::UTC, 2024, 5, 2, 9, 0)
        );
    }

    #[test]
    fn first_run_uses_now() {
        let trigger = Trigger::Daily { at: hm(9, 0) };
        let now = at(Tz::UTC, 2024, 5, 1, 8, 0);
        assert_eq!(trigger.next_run(now, None), at(Tz::UTC, 2024, 5, 1, 9, 0));
    }

    #[test]
    fn default_jobs_schedule() {
        let [daily, weekly] = default_jobs();
        assert_eq!(daily.trigger, Trigger::Daily { at: hm(9, 0) });
        assert_eq!(
            weekly.trigger,
            Trigger::Weekly {
                on: Weekday::Mon,
                at: hm(10, 0)
            }
        );
    }
}
