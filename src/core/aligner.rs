use crate::domain::model::WeeklyMortalityRecord;
use crate::utils::error::{EtlError, Result};
use std::collections::BTreeMap;

/// Sums subgroup records (e.g. age brackets) into one record per
/// (year, week), sorted ascending. All records of a group must carry the
/// same date.
pub fn aggregate_subgroups(records: &[WeeklyMortalityRecord]) -> Result<Vec<WeeklyMortalityRecord>> {
    let mut groups: BTreeMap<(i32, u32), WeeklyMortalityRecord> = BTreeMap::new();

    for record in records {
        match groups.get_mut(&(record.year, record.week)) {
            Some(group) => {
                if group.time != record.time {
                    return Err(EtlError::InconsistentGroupError {
                        year: record.year,
                        week: record.week,
                        reason: format!("dates {} and {} differ", group.time, record.time),
                    });
                }
                group.death_count = group.death_count.checked_add(record.death_count).ok_or_else(|| {
                    EtlError::InconsistentGroupError {
                        year: record.year,
                        week: record.week,
                        reason: "death count overflow".to_string(),
                    }
                })?;
            }
            None => {
                groups.insert(
                    (record.year, record.week),
                    WeeklyMortalityRecord::new(record.year, record.week, record.time, record.death_count),
                );
            }
        }
    }

    tracing::debug!(
        "Aggregated {} subgroup records into {} weeks",
        records.len(),
        groups.len()
    );
    Ok(groups.into_values().collect())
}

/// Sorts records by (year, week) and rejects a week that appears twice.
pub fn ensure_unique_weeks(records: &[WeeklyMortalityRecord]) -> Result<Vec<WeeklyMortalityRecord>> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| (r.year, r.week));

    if let Some(pair) = sorted
        .windows(2)
        .find(|pair| (pair[0].year, pair[0].week) == (pair[1].year, pair[1].week))
    {
        return Err(EtlError::DuplicateWeekError {
            year: pair[1].year,
            week: pair[1].week,
        });
    }

    Ok(sorted)
}
