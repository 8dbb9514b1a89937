use crate::db::ActivityRecord;
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

pub const DAYS_PER_WEEK: usize = 7;

/// Inclusive calendar window. Bounds are always ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatmapWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HeatmapWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Window ending at `end` and reaching back `months` calendar months.
    pub fn trailing_months(end: NaiveDate, months: u32) -> Self {
        let start = end
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, end)
    }

    pub fn total_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn weeks(&self) -> usize {
        self.total_days().div_ceil(DAYS_PER_WEEK)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.total_days())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub label: String,
    pub count: u32,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: usize,
    pub week_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthLabel {
    pub label: String,
    pub date: NaiveDate,
    pub week_index: usize,
}

/// Dense `[day_of_week][week_index]` grid over a window. Slots past the
/// last day of the window stay `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityGrid {
    pub window: HeatmapWindow,
    pub rows: Vec<Vec<Option<DayCell>>>,
    pub months: Vec<MonthLabel>,
}

impl ActivityGrid {
    pub fn weeks(&self) -> usize {
        self.window.weeks()
    }

    #[cfg(test)]
    pub fn cell(&self, day_of_week: usize, week_index: usize) -> Option<&DayCell> {
        self.rows
            .get(day_of_week)
            .and_then(|row| row.get(week_index))
            .and_then(Option::as_ref)
    }

    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.rows.iter().flatten().flatten()
    }

    pub fn total_count(&self) -> u64 {
        self.cells().map(|cell| u64::from(cell.count)).sum()
    }
}

pub fn bucket_activities(window: HeatmapWindow, records: &[ActivityRecord]) -> ActivityGrid {
    let counts = records
        .iter()
        .filter(|record| window.contains(record.date))
        .fold(HashMap::new(), |mut acc, record| {
            let entry = acc.entry(record.date).or_insert(0_u32);
            *entry = entry.saturating_add(record.count);
            acc
        });

    let weeks = window.weeks();
    let mut rows = vec![vec![None; weeks]; DAYS_PER_WEEK];
    let mut months: Vec<MonthLabel> = Vec::new();

    window.days().enumerate().for_each(|(offset, date)| {
        let day_of_week = date.weekday().num_days_from_sunday() as usize;
        let week_index = offset / DAYS_PER_WEEK;

        let starts_month = months
            .last()
            .is_none_or(|last| (last.date.year(), last.date.month()) != (date.year(), date.month()));
        if starts_month {
            months.push(MonthLabel {
                label: date.format("%b").to_string(),
                date,
                week_index,
            });
        }

        rows[day_of_week][week_index] = Some(DayCell {
            date,
            label: format_day_label(date),
            count: counts.get(&date).copied().unwrap_or(0),
            day_of_week,
            week_index,
        });
    });

    ActivityGrid {
        window,
        rows,
        months,
    }
}

pub fn format_day_label(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}
