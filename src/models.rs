use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// The tracker serves exactly two fixed identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserLabel {
    G,
    A,
}

impl UserLabel {
    pub const ALL: [UserLabel; 2] = [UserLabel::G, UserLabel::A];

    pub fn from_user_id(user_id: u8) -> Option<Self> {
        match user_id {
            1 => Some(Self::G),
            2 => Some(Self::A),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "G" => Some(Self::G),
            "A" => Some(Self::A),
            _ => None,
        }
    }

    pub fn user_id(self) -> u8 {
        match self {
            Self::G => 1,
            Self::A => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::G => "G",
            Self::A => "A",
        }
    }
}

/// A task as the server owns it; the client only caches copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub user_id: u8,
    pub content: String,
    pub completed: bool,
    /// ISO-8601 creation timestamp the server stamps on every payload.
    /// Carried through untouched for display and export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskRequest<'a> {
    pub content: &'a str,
    pub user_id: u8,
}

#[derive(Debug, Serialize)]
pub struct SetCompletedRequest {
    pub completed: bool,
}

/// One user's completion record for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    #[serde(with = "day")]
    pub date: NaiveDate,
    pub completion_percentage: f64,
    pub completed_tasks: u32,
    pub total_tasks: u32,
}

/// Canonical internal shape for `/progress` data: one date-ordered
/// series per user, dates unique within a series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressByUser {
    pub g: Vec<ProgressPoint>,
    pub a: Vec<ProgressPoint>,
}

impl ProgressByUser {
    pub fn series(&self, label: UserLabel) -> &[ProgressPoint] {
        match label {
            UserLabel::G => &self.g,
            UserLabel::A => &self.a,
        }
    }

    pub fn series_mut(&mut self, label: UserLabel) -> &mut Vec<ProgressPoint> {
        match label {
            UserLabel::G => &mut self.g,
            UserLabel::A => &mut self.a,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.g.is_empty() && self.a.is_empty()
    }
}

/// The two `/progress` response shapes seen in the wild: an object
/// keyed by user label, or a flat per-user snapshot array carrying a
/// `name` field and no dates. Both collapse into [`ProgressByUser`]
/// here, and nowhere else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProgressPayload {
    Keyed(BTreeMap<String, Vec<ProgressPoint>>),
    Flat(Vec<FlatProgressRow>),
}

#[derive(Debug, Deserialize)]
pub struct FlatProgressRow {
    pub name: String,
    pub completion_percentage: f64,
    pub completed_tasks: u32,
    pub total_tasks: u32,
}

impl ProgressPayload {
    /// Flat rows are dateless snapshots, so they land on `today`.
    pub fn into_by_user(self, today: NaiveDate) -> Result<ProgressByUser> {
        let mut by_user = ProgressByUser::default();
        match self {
            Self::Keyed(map) => {
                for (key, points) in map {
                    let label = UserLabel::from_name(&key)
                        .ok_or_else(|| Error::protocol(format!("unknown user label `{key}`")))?;
                    *by_user.series_mut(label) = normalize_series(points)?;
                }
            }
            Self::Flat(rows) => {
                for row in rows {
                    let label = UserLabel::from_name(&row.name)
                        .ok_or_else(|| Error::protocol(format!("unknown user label `{}`", row.name)))?;
                    let series = by_user.series_mut(label);
                    if !series.is_empty() {
                        return Err(Error::protocol(format!(
                            "duplicate snapshot row for `{}`",
                            row.name
                        )));
                    }
                    let point = ProgressPoint {
                        date: today,
                        completion_percentage: row.completion_percentage,
                        completed_tasks: row.completed_tasks,
                        total_tasks: row.total_tasks,
                    };
                    check_point(&point)?;
                    series.push(point);
                }
            }
        }
        Ok(by_user)
    }
}

fn normalize_series(mut points: Vec<ProgressPoint>) -> Result<Vec<ProgressPoint>> {
    points.sort_by_key(|point| point.date);
    if let Some(pair) = points.windows(2).find(|pair| pair[0].date == pair[1].date) {
        return Err(Error::protocol(format!(
            "duplicate progress entry for {}",
            pair[0].date
        )));
    }
    for point in &points {
        check_point(point)?;
    }
    Ok(points)
}

fn check_point(point: &ProgressPoint) -> Result<()> {
    if point.completed_tasks > point.total_tasks {
        return Err(Error::protocol(format!(
            "{} completed tasks exceed {} total on {}",
            point.completed_tasks, point.total_tasks, point.date
        )));
    }
    if !(0.0..=100.0).contains(&point.completion_percentage) {
        return Err(Error::protocol(format!(
            "completion percentage {} out of range on {}",
            point.completion_percentage, point.date
        )));
    }
    Ok(())
}

/// Day-granular (de)serialization: full timestamps are truncated to
/// their calendar day before the value ever reaches comparison code.
pub(crate) mod day {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_day(&raw).ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`")))
    }

    pub fn parse_day(raw: &str) -> Option<NaiveDate> {
        if let Ok(date) = raw.parse::<NaiveDate>() {
            return Some(date);
        }
        if let Ok(timestamp) = raw.parse::<NaiveDateTime>() {
            return Some(timestamp.date());
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|timestamp| timestamp.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn keyed_payload_becomes_canonical_series() {
        let payload: ProgressPayload = serde_json::from_str(
            r#"{
                "G": [
                    {"date": "2024-01-02", "completion_percentage": 100.0, "completed_tasks": 2, "total_tasks": 2},
                    {"date": "2024-01-01", "completion_percentage": 50.0, "completed_tasks": 1, "total_tasks": 2}
                ],
                "A": []
            }"#,
        )
        .unwrap();

        let by_user = payload.into_by_user(date("2024-01-05")).unwrap();
        let dates: Vec<_> = by_user.g.iter().map(|point| point.date).collect();
        assert_eq!(dates, vec![date("2024-01-01"), date("2024-01-02")]);
        assert!(by_user.a.is_empty());
    }

    #[test]
    fn flat_payload_lands_on_today() {
        let payload: ProgressPayload = serde_json::from_str(
            r#"[
                {"name": "G", "completion_percentage": 75.0, "completed_tasks": 3, "total_tasks": 4},
                {"name": "A", "completion_percentage": 0.0, "completed_tasks": 0, "total_tasks": 1}
            ]"#,
        )
        .unwrap();

        let today = date("2024-03-10");
        let by_user = payload.into_by_user(today).unwrap();
        assert_eq!(by_user.g.len(), 1);
        assert_eq!(by_user.g[0].date, today);
        assert_eq!(by_user.g[0].completion_percentage, 75.0);
        assert_eq!(by_user.a[0].total_tasks, 1);
    }

    #[test]
    fn unknown_label_is_a_protocol_error() {
        let payload: ProgressPayload =
            serde_json::from_str(r#"{"X": []}"#).unwrap();
        let err = payload.into_by_user(date("2024-01-01")).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let payload: ProgressPayload = serde_json::from_str(
            r#"{
                "G": [
                    {"date": "2024-01-01", "completion_percentage": 50.0, "completed_tasks": 1, "total_tasks": 2},
                    {"date": "2024-01-01", "completion_percentage": 100.0, "completed_tasks": 2, "total_tasks": 2}
                ]
            }"#,
        )
        .unwrap();
        let err = payload.into_by_user(date("2024-01-05")).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn completed_beyond_total_is_rejected() {
        let payload: ProgressPayload = serde_json::from_str(
            r#"{"G": [{"date": "2024-01-01", "completion_percentage": 100.0, "completed_tasks": 3, "total_tasks": 2}]}"#,
        )
        .unwrap();
        let err = payload.into_by_user(date("2024-01-05")).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn timestamps_truncate_to_their_day() {
        assert_eq!(day::parse_day("2024-01-01"), Some(date("2024-01-01")));
        assert_eq!(
            day::parse_day("2024-01-01T13:45:00"),
            Some(date("2024-01-01"))
        );
        assert_eq!(
            day::parse_day("2024-01-01T23:59:59+02:00"),
            Some(date("2024-01-01"))
        );
        assert_eq!(day::parse_day("yesterday"), None);
    }

    #[test]
    fn user_label_mapping_is_fixed() {
        assert_eq!(UserLabel::from_user_id(1), Some(UserLabel::G));
        assert_eq!(UserLabel::from_user_id(2), Some(UserLabel::A));
        assert_eq!(UserLabel::from_user_id(3), None);
        assert_eq!(UserLabel::G.user_id(), 1);
        assert_eq!(UserLabel::from_name("A"), Some(UserLabel::A));
    }
}
