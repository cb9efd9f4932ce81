//! Cumulative excess mortality of a target series against a one-year
//! baseline.

use crate::domain::model::{ExcessPoint, WeeklyValue};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How baseline values are paired with target weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// `target[i] - baseline[i % baseline.len()]`. The target must hold
    /// exactly one baseline length per calendar year it spans, so a 53-week
    /// year against a 52-week baseline is rejected.
    #[default]
    Position,
    /// `target[i] - baseline[week of target[i]]`. Target weeks the baseline
    /// lacks (week 53 against a 52-week year) are left out of the curve.
    CalendarWeek,
}

impl std::fmt::Display for AlignmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentPolicy::Position => write!(f, "position"),
            AlignmentPolicy::CalendarWeek => write!(f, "calendar_week"),
        }
    }
}

fn ensure_week_order(series: &str, values: &[WeeklyValue]) -> Result<()> {
    match values
        .windows(2)
        .find(|pair| (pair[1].year, pair[1].week) <= (pair[0].year, pair[0].week))
    {
        Some(pair) => Err(EtlError::SeriesOrderError {
            series: series.to_string(),
            reason: format!(
                "{}/W{:02} follows {}/W{:02}",
                pair[1].year, pair[1].week, pair[0].year, pair[0].week
            ),
        }),
        None => Ok(()),
    }
}

/// Target values paired with the baseline value they are compared against.
fn pair_with_baseline(
    target: &[WeeklyValue],
    baseline: &[WeeklyValue],
    policy: AlignmentPolicy,
) -> Result<Vec<(WeeklyValue, f64)>> {
    match policy {
        AlignmentPolicy::Position => {
            let years = target.iter().map(|v| v.year).collect::<BTreeSet<_>>().len();
            let expected = years * baseline.len();
            if target.len() != expected {
                return Err(EtlError::LengthMismatchError {
                    target: target.len(),
                    baseline: baseline.len(),
                    reason: format!(
                        "{} target years need exactly {} values for position alignment",
                        years, expected
                    ),
                });
            }
            Ok(target
                .iter()
                .enumerate()
                .map(|(i, v)| (*v, baseline[i % baseline.len()].value))
                .collect())
        }
        AlignmentPolicy::CalendarWeek => {
            let by_week: HashMap<u32, f64> = baseline.iter().map(|v| (v.week, v.value)).collect();
            let pairs: Vec<(WeeklyValue, f64)> = target
                .iter()
                .filter_map(|v| match by_week.get(&v.week) {
                    Some(base) => Some((*v, *base)),
                    None => {
                        tracing::warn!(
                            "Baseline has no week {}, skipping {}/W{:02}",
                            v.week,
                            v.year,
                            v.week
                        );
                        None
                    }
                })
                .collect();

            if pairs.is_empty() && !target.is_empty() {
                return Err(EtlError::LengthMismatchError {
                    target: target.len(),
                    baseline: baseline.len(),
                    reason: "no target week exists in the baseline".to_string(),
                });
            }
            Ok(pairs)
        }
    }
}

/// Per-week differences and their running sum. Both inputs must be sorted by
/// (year, week); the baseline must cover a single year.
pub fn cumulative_excess(
    target: &[WeeklyValue],
    baseline: &[WeeklyValue],
    policy: AlignmentPolicy,
) -> Result<Vec<ExcessPoint>> {
    if baseline.is_empty() {
        return Err(EtlError::LengthMismatchError {
            target: target.len(),
            baseline: 0,
            reason: "baseline is empty".to_string(),
        });
    }
    let baseline_years: BTreeSet<i32> = baseline.iter().map(|v| v.year).collect();
    if baseline_years.len() != 1 {
        return Err(EtlError::LengthMismatchError {
            target: target.len(),
            baseline: baseline.len(),
            reason: format!("baseline spans {} years, expected one", baseline_years.len()),
        });
    }
    ensure_week_order("baseline", baseline)?;
    ensure_week_order("target", target)?;

    let pairs = pair_with_baseline(target, baseline, policy)?;

    let mut running = 0.0;
    let points = pairs
        .into_iter()
        .map(|(value, base)| {
            let excess = value.value - base;
            running += excess;
            ExcessPoint {
                time: value.time,
                year: value.year,
                week: value.week,
                excess,
                cumulative_excess: running,
            }
        })
        .collect();

    Ok(points)
}
