pub mod grid;
pub mod intensity;

use chrono::NaiveDate;
use grid::{ActivityGrid, DAYS_PER_WEEK, MonthLabel};
use intensity::{IntensityLevel, Shade, ShadeMapper, Theme};
use serde::Serialize;

const WEEKDAY_LABELS: [&str; DAYS_PER_WEEK] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub label: String,
    pub count: u32,
    pub level: u8,
    pub shade: Shade,
}

/// Display-ready heatmap. Rebuilt per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapView {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub weeks: usize,
    pub total: u64,
    pub months: Vec<MonthLabel>,
    pub rows: Vec<Vec<Option<HeatmapCell>>>,
}

pub fn render(grid: &ActivityGrid, mapper: &ShadeMapper) -> HeatmapView {
    let rows = grid
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|slot| {
                    slot.as_ref().map(|cell| HeatmapCell {
                        date: cell.date,
                        label: cell.label.clone(),
                        count: cell.count,
                        level: IntensityLevel::from_count(cell.count).index(),
                        shade: mapper.shade(cell.count),
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    HeatmapView {
        start: grid.window.start,
        end: grid.window.end,
        weeks: grid.weeks(),
        total: grid.total_count(),
        months: grid.months.clone(),
        rows,
    }
}

/// Plain-text rendering for the terminal: one glyph per day, a month axis on top.
pub fn render_text(grid: &ActivityGrid) -> String {
    render_terminal(grid, |level| level.glyph().to_string())
}

/// Same layout as [`render_text`], with each day drawn in its palette colour.
pub fn render_ansi(grid: &ActivityGrid, theme: Theme) -> String {
    render_terminal(grid, |level| {
        let (red, green, blue) = hex_to_rgb(level.color(theme));
        format!("\x1b[38;2;{red};{green};{blue}m■\x1b[0m")
    })
}

fn render_terminal(grid: &ActivityGrid, paint: impl Fn(IntensityLevel) -> String) -> String {
    let mut axis: Vec<char> = Vec::with_capacity(grid.weeks());
    for month in &grid.months {
        // Skip a label that would overwrite the previous one.
        if axis.len() > month.week_index {
            continue;
        }
        axis.resize(month.week_index, ' ');
        axis.extend(month.label.chars());
    }

    let header = format!("    {}", axis.into_iter().collect::<String>().trim_end());
    let body = grid
        .rows
        .iter()
        .zip(WEEKDAY_LABELS)
        .map(|(row, label)| {
            let cells = row
                .iter()
                .map(|slot| {
                    slot.as_ref()
                        .map(|cell| paint(IntensityLevel::from_count(cell.count)))
                        .unwrap_or_else(|| " ".to_string())
                })
                .collect::<String>();
            format!("{label} {}", cells.trim_end())
        })
        .collect::<Vec<_>>();

    let legend = format!(
        "    less {} more  ({} contributions, {} to {})",
        IntensityLevel::ALL
            .into_iter()
            .map(&paint)
            .collect::<String>(),
        grid.total_count(),
        grid.window.start.format("%Y-%m-%d"),
        grid.window.end.format("%Y-%m-%d"),
    );

    std::iter::once(header)
        .chain(body)
        .chain(std::iter::once(legend))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let channel = |range: std::ops::Range<usize>| {
        hex.trim_start_matches('#')
            .get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .unwrap_or(0)
    };
    (channel(0..2), channel(2..4), channel(4..6))
}

#[cfg(test)]
mod tests {
    use super::grid::{HeatmapWindow, bucket_activities};
    use super::intensity::{Shade, ShadeMapper, Theme};
    use super::{hex_to_rgb, render, render_ansi, render_text};
    use crate::db::ActivityRecord;
    use chrono::NaiveDate;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn render_keeps_grid_shape_and_applies_theme() {
        let window = HeatmapWindow::new(day("2026-03-01"), day("2026-03-10"));
        let grid = bucket_activities(
            window,
            &[ActivityRecord {
                id: 1,
                date: day("2026-03-09"),
                count: 9,
                owner_id: 1,
            }],
        );
        let mapper = ShadeMapper {
            theme: Theme::Dark,
            ..ShadeMapper::default()
        };

        let view = render(&grid, &mapper);

        assert_eq!(view.weeks, 2);
        assert_eq!(view.total, 9);
        assert_eq!(view.rows.iter().flatten().flatten().count(), 10);

        // 2026-03-09 is a Monday in the second week.
        let cell = view.rows[1][1].as_ref().expect("monday cell");
        assert_eq!(cell.level, 4);
        assert_eq!(cell.shade, Shade::Color { value: "#39d353" });
        assert!(view.rows[3][1].is_none());
    }

    #[test]
    fn text_rendering_has_axis_rows_and_legend() {
        let window = HeatmapWindow::new(day("2026-03-01"), day("2026-03-07"));
        let grid = bucket_activities(
            window,
            &[ActivityRecord {
                id: 1,
                date: day("2026-03-03"),
                count: 5,
                owner_id: 1,
            }],
        );

        let text = render_text(&grid);
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "    Mar");
        assert_eq!(lines[3], "Tue ▒");
        assert!(lines[8].contains("5 contributions"));
    }

    #[test]
    fn ansi_rendering_uses_theme_palette() {
        let window = HeatmapWindow::new(day("2026-03-01"), day("2026-03-07"));
        let grid = bucket_activities(window, &[]);

        let text = render_ansi(&grid, Theme::Dark);

        assert_eq!(hex_to_rgb("#161b22"), (0x16, 0x1b, 0x22));
        assert!(text.contains("\x1b[38;2;22;27;34m■"));
        assert_eq!(text.lines().count(), 9);
    }
}
