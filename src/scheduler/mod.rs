use anyhow::{Context, Result};
use chrono::{DateTime, Days, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{error, info};

const RESCHEDULE_POLL_SECONDS: u64 = 30;

/// Runs `task` once a day at the time returned by `time_provider`. The
/// provider is polled so a changed sync time applies without a restart.
pub async fn run_daily_scheduler<S, F, Fut>(mut time_provider: S, mut task: F) -> Result<()>
where
    S: FnMut() -> Result<NaiveTime>,
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut last_logged: Option<NaiveTime> = None;

    loop {
        let target = match time_provider() {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, "Failed to load sync schedule");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        let delay = match delay_until(Local::now(), target) {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, time = %target, "Failed to compute next sync");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        if last_logged != Some(target) {
            info!(seconds = delay.as_secs(), time = %target.format("%H:%M"), "Next GitHub sync scheduled");
            last_logged = Some(target);
        }

        if delay > Duration::from_secs(RESCHEDULE_POLL_SECONDS) {
            sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
            continue;
        }

        sleep(delay).await;

        let date = Local::now().date_naive();
        if let Err(error) = task(date).await {
            error!(error = %error, date = %date, "Scheduled GitHub sync failed");
        }

        sleep(Duration::from_secs(1)).await;
    }
}

/// Time from `now` to the next occurrence of `target`, today or tomorrow.
pub fn delay_until<Tz: TimeZone>(now: DateTime<Tz>, target: NaiveTime) -> Result<Duration> {
    let zone = now.timezone();
    let today = now.date_naive();

    let candidate = resolve_local(&zone, today, target)?;
    let next_run = if candidate > now {
        candidate
    } else {
        let tomorrow = today
            .checked_add_days(Days::new(1))
            .context("Failed to compute next sync day")?;
        resolve_local(&zone, tomorrow, target)?
    };

    (next_run - now)
        .to_std()
        .context("Failed to compute next sync delay")
}

/// Local wall-clock time on `day`. A time skipped by a DST jump resolves
/// to the same time on the following day.
fn resolve_local<Tz: TimeZone>(zone: &Tz, day: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>> {
    match zone.from_local_datetime(&day.and_time(time)) {
        LocalResult::Single(datetime) => Ok(datetime),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => {
            let next_day = day
                .checked_add_days(Days::new(1))
                .context("Failed to compute fallback sync day")?;
            zone.from_local_datetime(&next_day.and_time(time))
                .single()
                .context("Failed to convert sync time")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::delay_until;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    #[test]
    fn later_today_waits_for_today() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 1, 0, 0).unwrap();

        let delay = delay_until(now, hm(3, 0)).expect("delay computed");

        assert_eq!(delay.as_secs(), 2 * 3600);
    }

    #[test]
    fn passed_time_rolls_over_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 3, 0, 0).unwrap();

        let delay = delay_until(now, hm(3, 0)).expect("delay computed");

        assert_eq!(delay.as_secs(), 24 * 3600);
    }

    #[test]
    fn delay_is_positive_for_local_clock() {
        let delay = delay_until(chrono::Local::now(), hm(23, 30)).expect("delay computed");

        assert!(delay.as_secs() > 0 || delay.subsec_nanos() > 0);
    }
}
