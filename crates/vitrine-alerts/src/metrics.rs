//! Alert metrics snapshot.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::alert::Alert;

/// Aggregate counters over every alert the registry has seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMetrics {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub resolved_today: usize,
    pub priority_count: BTreeMap<String, usize>,
    pub type_count: BTreeMap<String, usize>,
    pub average_resolution_time_minutes: i64,
}

impl AlertMetrics {
    /// Compute metrics over `history` (all alerts) given the active count.
    pub fn compute<'a>(history: impl IntoIterator<Item = &'a Alert>, active: usize) -> Self {
        Self::compute_on(history, active, Local::now().date_naive())
    }

    /// As [`compute`](Self::compute) with an explicit local calendar day.
    pub fn compute_on<'a>(
        history: impl IntoIterator<Item = &'a Alert>,
        active: usize,
        today: NaiveDate,
    ) -> Self {
        let mut metrics = AlertMetrics {
            active,
            ..Default::default()
        };
        let mut resolution_minutes = 0.0;

        for alert in history {
            metrics.total += 1;
            *metrics
                .priority_count
                .entry(alert.priority.as_str().to_string())
                .or_insert(0) += 1;
            *metrics
                .type_count
                .entry(alert.alert_type.as_str().to_string())
                .or_insert(0) += 1;

            if let Some(resolved_at) = alert.resolved_at {
                metrics.resolved += 1;
                if local_day(resolved_at) == today {
                    metrics.resolved_today += 1;
                }
                resolution_minutes += alert.resolution_minutes().unwrap_or(0.0);
            }
        }

        if metrics.resolved > 0 {
            metrics.average_resolution_time_minutes =
                (resolution_minutes / metrics.resolved as f64).round() as i64;
        }
        metrics
    }
}

fn local_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}
