use std::collections::BTreeMap;

use chrono::{Duration, Local, NaiveDate};

use crate::errors::{Error, Result};
use crate::models::{ProgressByUser, ProgressPoint, UserLabel};

/// How the label axis is derived. The two policies chart sparse data
/// very differently, so the choice is an explicit caller decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPolicy {
    /// One entry per calendar day in `[today - timeframe, today]`,
    /// regardless of which dates carry data. Missing days chart as
    /// gaps.
    FixedWindow,
    /// Sorted union of the dates actually present in either series.
    ObservedDates,
}

/// Latest figures for one user, taken from the raw series tail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub completion_percentage: f64,
    pub completed_tasks: u32,
    pub total_tasks: u32,
}

impl Snapshot {
    pub const EMPTY: Snapshot = Snapshot {
        completion_percentage: 0.0,
        completed_tasks: 0,
        total_tasks: 0,
    };

    fn from_point(point: &ProgressPoint) -> Self {
        Self {
            completion_percentage: point.completion_percentage,
            completed_tasks: point.completed_tasks,
            total_tasks: point.total_tasks,
        }
    }
}

/// One user's gap-filled series over the shared axis. `None` marks a
/// day without any recorded activity, never a 0% day.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSeries {
    pub label: UserLabel,
    pub values: Vec<Option<f64>>,
}

/// Chart-ready output: shared axis, one aligned series per user, and
/// the latest-snapshot figures for the textual summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub axis: Vec<NaiveDate>,
    pub series: Vec<UserSeries>,
    pub snapshots: Vec<(UserLabel, Snapshot)>,
    pub timeframe_days: u32,
}

impl ProgressView {
    pub fn snapshot(&self, label: UserLabel) -> Snapshot {
        self.snapshots
            .iter()
            .find(|(owner, _)| *owner == label)
            .map(|(_, snapshot)| *snapshot)
            .unwrap_or(Snapshot::EMPTY)
    }
}

pub fn build_view(
    raw: &ProgressByUser,
    timeframe_days: u32,
    policy: AxisPolicy,
) -> Result<ProgressView> {
    build_view_at(Local::now().date_naive(), raw, timeframe_days, policy)
}

pub fn build_view_at(
    today: NaiveDate,
    raw: &ProgressByUser,
    timeframe_days: u32,
    policy: AxisPolicy,
) -> Result<ProgressView> {
    if raw.is_empty() {
        return Err(Error::NoData);
    }

    let axis = match policy {
        AxisPolicy::FixedWindow => fixed_axis(today, timeframe_days),
        AxisPolicy::ObservedDates => observed_axis(raw),
    };

    let series = UserLabel::ALL
        .iter()
        .map(|&label| UserSeries {
            label,
            values: align(&axis, raw.series(label)),
        })
        .collect();

    let snapshots = UserLabel::ALL
        .iter()
        .map(|&label| {
            let snapshot = raw
                .series(label)
                .last()
                .map(Snapshot::from_point)
                .unwrap_or(Snapshot::EMPTY);
            (label, snapshot)
        })
        .collect();

    Ok(ProgressView {
        axis,
        series,
        snapshots,
        timeframe_days,
    })
}

fn fixed_axis(today: NaiveDate, timeframe_days: u32) -> Vec<NaiveDate> {
    let mut axis = Vec::with_capacity(timeframe_days as usize + 1);
    for offset in (0..=i64::from(timeframe_days)).rev() {
        axis.push(today - Duration::days(offset));
    }
    axis
}

fn observed_axis(raw: &ProgressByUser) -> Vec<NaiveDate> {
    let mut axis: Vec<NaiveDate> = UserLabel::ALL
        .iter()
        .flat_map(|&label| raw.series(label).iter().map(|point| point.date))
        .collect();
    axis.sort();
    axis.dedup();
    axis
}

fn align(axis: &[NaiveDate], series: &[ProgressPoint]) -> Vec<Option<f64>> {
    let by_day: BTreeMap<NaiveDate, f64> = series
        .iter()
        .map(|point| (point.date, point.completion_percentage))
        .collect();
    axis.iter().map(|date| by_day.get(date).copied()).collect()
}

/// Percentage math never divides by zero: an empty day is 0%, not NaN.
pub fn completion_percentage(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(completed) * 100.0 / f64::from(total)
    }
}

/// Summary and tooltip values always carry exactly two decimals.
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}")
}
