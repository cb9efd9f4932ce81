use crate::core::interpolation::CumulativeSeries;
use crate::domain::model::WeeklyMortalityRecord;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;

/// COVID deaths attributed to each interval `(times[i-1], times[i]]`.
/// The first entry is 0, there is no interval before it.
pub fn covid_deltas(times: &[NaiveDate], covid: &CumulativeSeries) -> Vec<f64> {
    let at: Vec<f64> = times.iter().map(|t| covid.interpolate(*t)).collect();

    std::iter::once(0.0)
        .chain(at.windows(2).map(|pair| pair[1] - pair[0]))
        .take(times.len())
        .collect()
}

/// Returns the records with `cleaned_death_count` set to the raw count minus
/// the interpolated COVID deaths of the week. The first record keeps its raw
/// count. Records must be in chronological order.
pub fn deduct_covid_deaths(
    records: &[WeeklyMortalityRecord],
    covid: &CumulativeSeries,
) -> Result<Vec<WeeklyMortalityRecord>> {
    if let Some(pair) = records.windows(2).find(|pair| pair[1].time < pair[0].time) {
        return Err(EtlError::SeriesOrderError {
            series: "weekly_mortality".to_string(),
            reason: format!(
                "{}/W{:02} ({}) precedes {}/W{:02} ({})",
                pair[1].year, pair[1].week, pair[1].time, pair[0].year, pair[0].week, pair[0].time
            ),
        });
    }

    let times: Vec<NaiveDate> = records.iter().map(|r| r.time).collect();
    let deltas = covid_deltas(&times, covid);

    let cleaned = records
        .iter()
        .zip(deltas)
        .map(|(record, delta)| {
            let value = f64::from(record.death_count) - delta;
            if value < 0.0 {
                tracing::warn!(
                    "Cleaned death count for {}/W{:02} is negative ({:.1})",
                    record.year,
                    record.week,
                    value
                );
            }
            WeeklyMortalityRecord {
                cleaned_death_count: Some(value),
                ..record.clone()
            }
        })
        .collect();

    Ok(cleaned)
}
