use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar week of all-cause deaths after week normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMortalityRecord {
    pub year: i32,
    pub week: u32,
    pub time: NaiveDate,
    pub death_count: u32,
    /// Set by the COVID-death deduction, fractional in general.
    pub cleaned_death_count: Option<f64>,
}

impl WeeklyMortalityRecord {
    pub fn new(year: i32, week: u32, time: NaiveDate, death_count: u32) -> Self {
        Self {
            year,
            week,
            time,
            death_count,
            cleaned_death_count: None,
        }
    }

    pub fn raw_value(&self) -> WeeklyValue {
        WeeklyValue {
            year: self.year,
            week: self.week,
            time: self.time,
            value: f64::from(self.death_count),
        }
    }

    pub fn cleaned_value(&self) -> Option<WeeklyValue> {
        self.cleaned_death_count.map(|value| WeeklyValue {
            year: self.year,
            week: self.week,
            time: self.time,
            value,
        })
    }
}

/// A (year, week)-keyed observation fed to the excess calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyValue {
    pub year: i32,
    pub week: u32,
    pub time: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExcessPoint {
    pub time: NaiveDate,
    pub year: i32,
    pub week: u32,
    pub excess: f64,
    pub cumulative_excess: f64,
}

/// One row of the COVID case file after filtering: cumulative deaths of
/// one age group in one region at one date.
#[derive(Debug, Clone, PartialEq)]
pub struct CovidDeathRow {
    pub time: NaiveDate,
    /// Read only when an age limit is configured.
    pub age_group_id: Option<u32>,
    pub deaths: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaccinationDoseRecord {
    pub time: NaiveDate,
    pub vaccine: String,
    pub dose_number: u32,
    pub doses_administered_cumulative: f64,
}

/// X coordinate of an exported point: a date axis or a week-of-year axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesX {
    Date(NaiveDate),
    Week(u32),
}

impl std::fmt::Display for SeriesX {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesX::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            SeriesX::Week(week) => write!(f, "{}", week),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: SeriesX,
    pub y: f64,
}

/// A derived series handed to the rendering side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSeries {
    /// File-name safe identifier.
    pub key: String,
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

/// Everything `extract` parsed from the three input files.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub mortality: Vec<WeeklyMortalityRecord>,
    pub covid_deaths: Vec<CovidDeathRow>,
    pub vaccinations: Vec<VaccinationDoseRecord>,
}

/// An excess curve that could not be derived. The other series of the run
/// are still produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSeries {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// All weeks, sorted by (year, week), with the cleaned count attached.
    pub weekly_records: Vec<WeeklyMortalityRecord>,
    pub series: Vec<LabeledSeries>,
    pub failed_series: Vec<FailedSeries>,
}
