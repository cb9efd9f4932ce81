//! Readers for the three `;`-delimited open-data files.
//!
//! Each reader applies its row filters, parses the cells it needs and fails
//! on the first malformed cell with the file name, 1-based data row and
//! column in the error.

use crate::config::toml_config::{CovidConfig, MortalityConfig, VaccinationConfig};
use crate::core::week::normalize_week;
use crate::domain::model::{CovidDeathRow, VaccinationDoseRecord, WeeklyMortalityRecord};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};

fn reader(data: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(b';')
        .trim(Trim::All)
        .from_reader(data)
}

fn column_index(headers: &StringRecord, file: &str, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| EtlError::ParseError {
            context: format!("{} header", file),
            value: name.to_string(),
            reason: "column not found".to_string(),
        })
}

fn cell_error(value: &str, reason: impl Into<String>) -> EtlError {
    EtlError::ParseError {
        context: String::new(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parses a number written with either `,` or `.` as decimal separator.
pub fn parse_decimal(value: &str) -> Result<f64> {
    let normalized = value.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(cell_error(value, "not a number")),
    }
}

/// A death count: non-negative and integral, `1234,0` is accepted.
pub fn parse_count(value: &str) -> Result<u32> {
    let number = parse_decimal(value)?;
    if number < 0.0 || number.fract() != 0.0 || number > f64::from(u32::MAX) {
        return Err(cell_error(value, "expected a non-negative whole number"));
    }
    Ok(number as u32)
}

/// Day-first date, optionally followed by a time of day (`31.12.2020 00:00:00`).
pub fn parse_day_first_date(value: &str) -> Result<NaiveDate> {
    let date_part = value.split_whitespace().next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%d.%m.%Y").map_err(|e| cell_error(value, e.to_string()))
}

/// ISO timestamp whose first ten characters are `YYYY-MM-DD`.
pub fn parse_iso_date_prefix(value: &str) -> Result<NaiveDate> {
    let date_part = value
        .get(..10)
        .ok_or_else(|| cell_error(value, "expected YYYY-MM-DD prefix"))?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| cell_error(value, e.to_string()))
}

fn field<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or_default()
}

fn describe_filters<'a>(filters: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let parts: Vec<String> = filters
        .into_iter()
        .map(|(column, value)| format!("{}={}", column, value))
        .collect();
    if parts.is_empty() {
        "(none)".to_string()
    } else {
        parts.join(", ")
    }
}

/// Filtered weekly rows, one per matching line, in file order.
pub fn read_mortality(data: &[u8], file: &str, config: &MortalityConfig) -> Result<Vec<WeeklyMortalityRecord>> {
    let mut rdr = reader(data);
    let headers = rdr.headers()?.clone();

    let week_idx = column_index(&headers, file, &config.week_column)?;
    let count_idx = column_index(&headers, file, &config.count_column)?;
    let filters = config
        .filters
        .iter()
        .map(|(column, value)| Ok((column_index(&headers, file, column)?, value.as_str())))
        .collect::<Result<Vec<_>>>()?;
    let subgroup = match &config.subgroups {
        Some(subgroups) => Some((column_index(&headers, file, &subgroups.column)?, &subgroups.values)),
        None => None,
    };

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let row_number = i + 1;

        if !filters.iter().all(|(idx, value)| field(&row, *idx) == *value) {
            continue;
        }
        if let Some((idx, values)) = subgroup {
            if !values.iter().any(|v| v == field(&row, idx)) {
                continue;
            }
        }

        let week = normalize_week(field(&row, week_idx))
            .map_err(|e| e.in_row(file, row_number, &config.week_column))?;
        let count = parse_count(field(&row, count_idx))
            .map_err(|e| e.in_row(file, row_number, &config.count_column))?;

        records.push(WeeklyMortalityRecord::new(week.year, week.week, week.time, count));
    }

    if records.is_empty() {
        let mut described: Vec<(&str, String)> = config
            .filters
            .iter()
            .map(|(c, v)| (c.as_str(), v.clone()))
            .collect();
        if let Some(subgroups) = &config.subgroups {
            described.push((subgroups.column.as_str(), subgroups.values.join("|")));
        }
        return Err(EtlError::MissingDataError {
            source_name: file.to_string(),
            filter: describe_filters(described),
        });
    }

    tracing::debug!("Read {} mortality rows from {}", records.len(), file);
    Ok(records)
}

/// Cumulative COVID deaths per age group and date for the configured region.
pub fn read_covid_deaths(data: &[u8], file: &str, config: &CovidConfig) -> Result<Vec<CovidDeathRow>> {
    let mut rdr = reader(data);
    let headers = rdr.headers()?.clone();

    let time_idx = column_index(&headers, file, &config.time_column)?;
    let region_idx = column_index(&headers, file, &config.region_column)?;
    let age_limit = match config.max_age_group_id {
        Some(max) => Some((column_index(&headers, file, &config.age_group_column)?, max)),
        None => None,
    };
    let deaths_idx = column_index(&headers, file, &config.deaths_column)?;

    let mut rows = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let row_number = i + 1;

        if field(&row, region_idx) != config.region {
            continue;
        }

        let age_group_id = match age_limit {
            Some((age_idx, max)) => {
                let age_cell = field(&row, age_idx);
                let id: u32 = age_cell.parse().map_err(|_| {
                    cell_error(age_cell, "expected an age group id").in_row(file, row_number, &config.age_group_column)
                })?;
                if id > max {
                    continue;
                }
                Some(id)
            }
            None => None,
        };

        let time = parse_day_first_date(field(&row, time_idx))
            .map_err(|e| e.in_row(file, row_number, &config.time_column))?;
        let deaths = parse_decimal(field(&row, deaths_idx))
            .map_err(|e| e.in_row(file, row_number, &config.deaths_column))?;

        rows.push(CovidDeathRow {
            time,
            age_group_id,
            deaths,
        });
    }

    if rows.is_empty() {
        let mut described = vec![(config.region_column.as_str(), config.region.clone())];
        if let Some(max) = config.max_age_group_id {
            described.push((config.age_group_column.as_str(), format!("<={}", max)));
        }
        return Err(EtlError::MissingDataError {
            source_name: file.to_string(),
            filter: describe_filters(described),
        });
    }

    tracing::debug!("Read {} COVID rows from {}", rows.len(), file);
    Ok(rows)
}

pub fn read_vaccinations(data: &[u8], file: &str, config: &VaccinationConfig) -> Result<Vec<VaccinationDoseRecord>> {
    let mut rdr = reader(data);
    let headers = rdr.headers()?.clone();

    let date_idx = column_index(&headers, file, &config.date_column)?;
    let region_idx = column_index(&headers, file, &config.region_column)?;
    let vaccine_idx = column_index(&headers, file, &config.vaccine_column)?;
    let dose_idx = column_index(&headers, file, &config.dose_column)?;
    let doses_idx = column_index(&headers, file, &config.doses_column)?;

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let row_number = i + 1;

        if field(&row, region_idx) != config.region {
            continue;
        }

        let time = parse_iso_date_prefix(field(&row, date_idx))
            .map_err(|e| e.in_row(file, row_number, &config.date_column))?;
        let dose_cell = field(&row, dose_idx);
        let dose_number: u32 = dose_cell
            .parse()
            .map_err(|_| cell_error(dose_cell, "expected a dose number").in_row(file, row_number, &config.dose_column))?;
        let doses_administered_cumulative = parse_decimal(field(&row, doses_idx))
            .map_err(|e| e.in_row(file, row_number, &config.doses_column))?;

        records.push(VaccinationDoseRecord {
            time,
            vaccine: field(&row, vaccine_idx).to_string(),
            dose_number,
            doses_administered_cumulative,
        });
    }

    if records.is_empty() {
        return Err(EtlError::MissingDataError {
            source_name: file.to_string(),
            filter: describe_filters([(config.region_column.as_str(), config.region.clone())]),
        });
    }

    tracing::debug!("Read {} vaccination rows from {}", records.len(), file);
    Ok(records)
}
