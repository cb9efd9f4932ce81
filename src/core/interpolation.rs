//! Piecewise-linear lookup over a cumulative death series.
//!
//! Dates are mapped onto a real timeline as whole days since
//! 1970-01-01 ([`timeline_position`]); every series and every query use
//! that same epoch and unit.

use crate::domain::model::CovidDeathRow;
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

pub fn timeline_position(date: NaiveDate) -> f64 {
    (date - DateTime::<Utc>::UNIX_EPOCH.date_naive()).num_days() as f64
}

/// Sorted `(date, cumulative total)` points, strictly increasing in date and
/// non-decreasing and non-negative in value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl CumulativeSeries {
    pub fn new(points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        let series = "covid_deaths_cumulative";

        if let Some((date, value)) = points.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(EtlError::SeriesOrderError {
                series: series.to_string(),
                reason: format!("invalid cumulative value {} at {}", value, date),
            });
        }

        for pair in points.windows(2) {
            let ((t0, v0), (t1, v1)) = (pair[0], pair[1]);
            if t1 <= t0 {
                return Err(EtlError::SeriesOrderError {
                    series: series.to_string(),
                    reason: format!("date {} does not follow {}", t1, t0),
                });
            }
            if v1 < v0 {
                return Err(EtlError::SeriesOrderError {
                    series: series.to_string(),
                    reason: format!("total drops from {} to {} at {}", v0, v1, t1),
                });
            }
        }

        Ok(Self { points })
    }

    /// Sums per-group cumulative rows into one total per date.
    pub fn from_rows(rows: &[CovidDeathRow]) -> Result<Self> {
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for row in rows {
            *totals.entry(row.time).or_insert(0.0) += row.deaths;
        }
        Self::new(totals.into_iter().collect())
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|(_, v)| *v)
    }

    /// Linear interpolation between the bracketing points. Returns 0 before
    /// the first point and the last total at or after the last point.
    pub fn interpolate(&self, at: NaiveDate) -> f64 {
        let (Some(&(first_t, first_v)), Some(&(last_t, last_v))) = (self.points.first(), self.points.last())
        else {
            return 0.0;
        };

        if at < first_t {
            return 0.0;
        }
        if at >= last_t {
            return last_v;
        }
        if at == first_t {
            return first_v;
        }

        // first index with a date after `at`; at least 1 and below len here
        let upper = self.points.partition_point(|(t, _)| *t <= at);
        let (t0, v0) = self.points[upper - 1];
        let (t1, v1) = self.points[upper];

        let x = timeline_position(at);
        let x0 = timeline_position(t0);
        let x1 = timeline_position(t1);
        let fraction = (x - x0) / (x1 - x0);

        v0 + (v1 - v0) * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 1).unwrap() + Duration::days(n)
    }

    fn two_point() -> CumulativeSeries {
        CumulativeSeries::new(vec![(day(0), 0.0), (day(10), 100.0)]).unwrap()
    }

    #[test]
    fn test_interpolate_midpoint_and_extrapolation() {
        let series = two_point();
        assert_eq!(series.interpolate(day(5)), 50.0);
        assert_eq!(series.interpolate(day(-1)), 0.0);
        assert_eq!(series.interpolate(day(20)), 100.0);
        assert_eq!(series.interpolate(day(10)), 100.0);
        assert_eq!(series.interpolate(day(0)), 0.0);
    }

    #[test]
    fn test_left_extrapolation_is_zero_even_with_positive_start() {
        let series = CumulativeSeries::new(vec![(day(0), 40.0), (day(4), 80.0)]).unwrap();
        assert_eq!(series.interpolate(day(-3)), 0.0);
        assert_eq!(series.interpolate(day(0)), 40.0);
        assert_eq!(series.interpolate(day(1)), 50.0);
    }

    #[test]
    fn test_interpolate_on_known_points() {
        let series = CumulativeSeries::new(vec![(day(0), 1.0), (day(3), 4.0), (day(7), 12.0)]).unwrap();
        assert_eq!(series.interpolate(day(3)), 4.0);
        assert_eq!(series.interpolate(day(5)), 8.0);
    }

    #[test]
    fn test_empty_series_interpolates_to_zero() {
        assert_eq!(CumulativeSeries::default().interpolate(day(3)), 0.0);
    }

    #[test]
    fn test_interpolation_is_monotonic() {
        let series = CumulativeSeries::new(vec![
            (day(0), 0.0),
            (day(2), 3.0),
            (day(3), 3.0),
            (day(9), 20.0),
            (day(30), 21.0),
        ])
        .unwrap();

        let mut previous = series.interpolate(day(-5));
        for n in -4..40 {
            let current = series.interpolate(day(n));
            assert!(current >= previous, "dropped at day {n}");
            previous = current;
        }

        // query order does not matter
        let queries = [day(25), day(1), day(9), day(-2), day(3)];
        for a in queries {
            for b in queries {
                if a <= b {
                    assert!(series.interpolate(a) <= series.interpolate(b));
                }
            }
        }
    }

    #[test]
    fn test_rejects_unsorted_and_decreasing() {
        assert!(CumulativeSeries::new(vec![(day(2), 1.0), (day(1), 2.0)]).is_err());
        assert!(CumulativeSeries::new(vec![(day(1), 1.0), (day(1), 2.0)]).is_err());
        assert!(CumulativeSeries::new(vec![(day(1), 5.0), (day(2), 4.0)]).is_err());
        assert!(CumulativeSeries::new(vec![(day(1), -1.0)]).is_err());
        assert!(CumulativeSeries::new(vec![(day(1), f64::NAN)]).is_err());
    }

    #[test]
    fn test_from_rows_sums_groups_per_date() {
        let rows = vec![
            CovidDeathRow { time: day(1), age_group_id: Some(1), deaths: 2.0 },
            CovidDeathRow { time: day(0), age_group_id: Some(1), deaths: 1.0 },
            CovidDeathRow { time: day(1), age_group_id: Some(2), deaths: 3.0 },
            CovidDeathRow { time: day(0), age_group_id: Some(2), deaths: 0.0 },
        ];
        let series = CumulativeSeries::from_rows(&rows).unwrap();
        assert_eq!(series.points(), &[(day(0), 1.0), (day(1), 5.0)]);
        assert_eq!(series.last_value(), Some(5.0));
    }

    #[test]
    fn test_timeline_epoch() {
        assert_eq!(timeline_position(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0.0);
        assert_eq!(timeline_position(NaiveDate::from_ymd_opt(1970, 1, 11).unwrap()), 10.0);
    }
}
