//! The whole study on parsed inputs: weekly alignment, COVID-death deduction,
//! both excess mortality curves and the comparison series.
//!
//! Mortality preparation, the COVID series and the deduction feed every
//! series, so their errors end the run. An excess curve that cannot be
//! derived is reported in `AnalysisReport::failed_series` and the remaining
//! series are still produced.

use crate::config::toml_config::StudyConfig;
use crate::core::aligner::{aggregate_subgroups, ensure_unique_weeks};
use crate::core::deduction::deduct_covid_deaths;
use crate::core::excess::{cumulative_excess, AlignmentPolicy};
use crate::core::interpolation::CumulativeSeries;
use crate::domain::model::{
    AnalysisReport, FailedSeries, LabeledSeries, RawInputs, SeriesPoint, SeriesX, VaccinationDoseRecord,
    WeeklyMortalityRecord, WeeklyValue,
};
use crate::utils::error::{EtlError, Result};
use std::collections::BTreeMap;

/// One record per (year, week), sorted. Subgroup rows are summed when
/// `aggregate` is set, otherwise a repeated week is an error.
pub fn prepare_mortality(records: &[WeeklyMortalityRecord], aggregate: bool) -> Result<Vec<WeeklyMortalityRecord>> {
    if aggregate {
        aggregate_subgroups(records)
    } else {
        ensure_unique_weeks(records)
    }
}

fn select_years(
    records: &[WeeklyMortalityRecord],
    years: &[i32],
    value: impl Fn(&WeeklyMortalityRecord) -> Option<WeeklyValue>,
    what: &str,
) -> Result<Vec<WeeklyValue>> {
    let selected: Vec<WeeklyValue> = records
        .iter()
        .filter(|r| years.contains(&r.year))
        .filter_map(value)
        .collect();

    if selected.is_empty() {
        let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        return Err(EtlError::MissingDataError {
            source_name: what.to_string(),
            filter: format!("year in [{}]", years.join(", ")),
        });
    }
    Ok(selected)
}

/// One cumulative excess curve of the study. Its failure does not stop the
/// other series.
struct ExcessCurve<'a> {
    key: String,
    label: String,
    what: &'static str,
    target_years: &'a [i32],
    baseline_year: i32,
}

impl ExcessCurve<'_> {
    fn derive(
        &self,
        weekly: &[WeeklyMortalityRecord],
        policy: AlignmentPolicy,
        value: impl Fn(&WeeklyMortalityRecord) -> Option<WeeklyValue> + Copy,
    ) -> Result<LabeledSeries> {
        let target = select_years(weekly, self.target_years, value, &format!("{} target", self.what))?;
        let baseline = select_years(weekly, &[self.baseline_year], value, &format!("{} baseline", self.what))?;
        let points = cumulative_excess(&target, &baseline, policy)?;

        tracing::info!(
            "{}: {:.0} over {} weeks",
            self.label,
            points.last().map(|p| p.cumulative_excess).unwrap_or_default(),
            points.len()
        );

        Ok(LabeledSeries {
            key: self.key.clone(),
            label: self.label.clone(),
            points: points
                .iter()
                .map(|p| SeriesPoint {
                    x: SeriesX::Date(p.time),
                    y: p.cumulative_excess,
                })
                .collect(),
        })
    }

    fn failed(&self, error: EtlError) -> FailedSeries {
        tracing::error!("Series {} not derived: {}", self.key, error);
        tracing::error!("Suggestion: {}", error.recovery_suggestion());
        FailedSeries {
            key: self.key.clone(),
            reason: error.to_string(),
        }
    }
}

/// Running total within one year, against the week number.
fn yearly_cumulative(
    records: &[WeeklyMortalityRecord],
    year: i32,
    value: impl Fn(&WeeklyMortalityRecord) -> Option<f64>,
) -> Vec<SeriesPoint> {
    let mut running = 0.0;
    records
        .iter()
        .filter(|r| r.year == year)
        .filter_map(|r| value(r).map(|v| (r.week, v)))
        .map(|(week, v)| {
            running += v;
            SeriesPoint {
                x: SeriesX::Week(week),
                y: running,
            }
        })
        .collect()
}

fn slug(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// One series per (vaccine, dose number), ordered by date.
pub fn vaccination_series(records: &[VaccinationDoseRecord]) -> Vec<LabeledSeries> {
    let mut groups: BTreeMap<(&str, u32), Vec<&VaccinationDoseRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.vaccine.as_str(), record.dose_number))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((vaccine, dose), mut group)| {
            group.sort_by_key(|r| r.time);
            LabeledSeries {
                key: format!("vaccination_{}_{}", slug(vaccine), dose),
                label: format!("{} {}", vaccine, dose),
                points: group
                    .iter()
                    .map(|r| SeriesPoint {
                        x: SeriesX::Date(r.time),
                        y: r.doses_administered_cumulative,
                    })
                    .collect(),
            }
        })
        .collect()
}

pub fn run_analysis(inputs: &RawInputs, aggregate: bool, study: &StudyConfig) -> Result<AnalysisReport> {
    let weekly = prepare_mortality(&inputs.mortality, aggregate)?;
    tracing::info!("Prepared {} weekly mortality records", weekly.len());

    let covid = CumulativeSeries::from_rows(&inputs.covid_deaths)?;
    tracing::info!(
        "COVID deaths: {} dates, {} total",
        covid.len(),
        covid.last_value().unwrap_or_default()
    );

    let weekly = deduct_covid_deaths(&weekly, &covid)?;

    let mut series = vec![LabeledSeries {
        key: "covid_deaths_cumulative".to_string(),
        label: "cumulated covid deaths".to_string(),
        points: covid
            .points()
            .iter()
            .map(|(time, total)| SeriesPoint {
                x: SeriesX::Date(*time),
                y: *total,
            })
            .collect(),
    }];

    let mut failed_series = Vec::new();

    let raw_excess = ExcessCurve {
        key: format!("excess_mortality_baseline_{}", study.baseline_year),
        label: format!("excess mortality, cumulated, baseline {}", study.baseline_year),
        what: "mortality",
        target_years: &study.target_years,
        baseline_year: study.baseline_year,
    };
    match raw_excess.derive(&weekly, study.alignment, |r| Some(r.raw_value())) {
        Ok(curve) => series.push(curve),
        Err(e) => failed_series.push(raw_excess.failed(e)),
    }

    for year in &study.history_years {
        let raw = yearly_cumulative(&weekly, *year, |r| Some(f64::from(r.death_count)));
        if raw.is_empty() {
            tracing::warn!("No mortality data for history year {}", year);
            continue;
        }
        series.push(LabeledSeries {
            key: format!("mortality_{}", year),
            label: year.to_string(),
            points: raw,
        });
    }
    for year in &study.history_years {
        let cleaned = yearly_cumulative(&weekly, *year, |r| r.cleaned_death_count);
        if cleaned.is_empty() {
            continue;
        }
        series.push(LabeledSeries {
            key: format!("mortality_cleaned_{}", year),
            label: format!("{}, covid deaths deducted", year),
            points: cleaned,
        });
    }

    let vaccinations = vaccination_series(&inputs.vaccinations);
    tracing::debug!("Built {} vaccination series", vaccinations.len());
    series.extend(vaccinations);

    let cleaned_excess = ExcessCurve {
        key: format!("excess_mortality_cleaned_baseline_{}", study.cleaned_baseline_year),
        label: format!(
            "excess mortality, Covid deaths deducted, cumulated, baseline {}",
            study.cleaned_baseline_year
        ),
        what: "cleaned mortality",
        target_years: &study.cleaned_target_years,
        baseline_year: study.cleaned_baseline_year,
    };
    match cleaned_excess.derive(&weekly, study.alignment, WeeklyMortalityRecord::cleaned_value) {
        Ok(curve) => series.push(curve),
        Err(e) => failed_series.push(cleaned_excess.failed(e)),
    }

    Ok(AnalysisReport {
        weekly_records: weekly,
        series,
        failed_series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::week::normalize_week;
    use crate::domain::model::CovidDeathRow;
    use chrono::{Duration, NaiveDate};

    fn year_of_weeks(year: i32, counts: &[u32]) -> Vec<WeeklyMortalityRecord> {
        let start = NaiveDate::from_ymd_opt(year, 1, 8).unwrap();
        counts
            .iter()
            .enumerate()
            .map(|(i, c)| WeeklyMortalityRecord::new(year, i as u32 + 1, start + Duration::weeks(i as i64), *c))
            .collect()
    }

    fn study() -> StudyConfig {
        StudyConfig {
            baseline_year: 2019,
            target_years: vec![2020, 2021],
            cleaned_baseline_year: 2020,
            cleaned_target_years: vec![2021],
            history_years: vec![2019, 2020, 2021],
            alignment: AlignmentPolicy::Position,
        }
    }

    fn inputs() -> RawInputs {
        let mut mortality = year_of_weeks(2019, &[10, 12, 11]);
        mortality.extend(year_of_weeks(2020, &[10, 12, 11]));
        mortality.extend(year_of_weeks(2021, &[15, 20, 25]));

        // no COVID deaths before the 2021 weeks, 7 per week afterwards
        let covid_start = NaiveDate::from_ymd_opt(2021, 1, 8).unwrap();
        let covid_deaths = (0..3)
            .map(|i| CovidDeathRow {
                time: covid_start + Duration::weeks(i),
                age_group_id: Some(1),
                deaths: 7.0 * i as f64,
            })
            .collect();

        let vaccinations = vec![
            VaccinationDoseRecord {
                time: NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
                vaccine: "BioNTech/Pfizer".to_string(),
                dose_number: 1,
                doses_administered_cumulative: 200.0,
            },
            VaccinationDoseRecord {
                time: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                vaccine: "BioNTech/Pfizer".to_string(),
                dose_number: 1,
                doses_administered_cumulative: 100.0,
            },
            VaccinationDoseRecord {
                time: NaiveDate::from_ymd_opt(2021, 1, 22).unwrap(),
                vaccine: "BioNTech/Pfizer".to_string(),
                dose_number: 2,
                doses_administered_cumulative: 50.0,
            },
        ];

        RawInputs {
            mortality,
            covid_deaths,
            vaccinations,
        }
    }

    fn series<'a>(report: &'a AnalysisReport, key: &str) -> &'a LabeledSeries {
        report
            .series
            .iter()
            .find(|s| s.key == key)
            .unwrap_or_else(|| panic!("missing series {key}"))
    }

    fn ys(series: &LabeledSeries) -> Vec<f64> {
        series.points.iter().map(|p| p.y).collect()
    }

    #[test]
    fn test_raw_excess_matches_tiling_scenario() {
        let report = run_analysis(&inputs(), false, &study()).unwrap();
        let excess = series(&report, "excess_mortality_baseline_2019");
        assert_eq!(ys(excess), vec![0.0, 0.0, 0.0, 5.0, 13.0, 27.0]);
        assert_eq!(excess.label, "excess mortality, cumulated, baseline 2019");
    }

    #[test]
    fn test_cleaned_excess_deducts_covid_deaths() {
        let report = run_analysis(&inputs(), false, &study()).unwrap();

        let cleaned: Vec<f64> = report
            .weekly_records
            .iter()
            .filter(|r| r.year == 2021)
            .map(|r| r.cleaned_death_count.unwrap())
            .collect();
        assert_eq!(cleaned, vec![15.0, 13.0, 18.0]);

        // 2021 cleaned [15, 13, 18] against 2020 [10, 12, 11]
        let excess = series(&report, "excess_mortality_cleaned_baseline_2020");
        assert_eq!(ys(excess), vec![5.0, 6.0, 13.0]);
    }

    #[test]
    fn test_history_and_covid_series() {
        let report = run_analysis(&inputs(), false, &study()).unwrap();

        let history = series(&report, "mortality_2021");
        assert_eq!(ys(history), vec![15.0, 35.0, 60.0]);
        assert_eq!(history.points[0].x, SeriesX::Week(1));

        assert_eq!(ys(series(&report, "mortality_cleaned_2021")), vec![15.0, 28.0, 46.0]);
        assert_eq!(ys(series(&report, "covid_deaths_cumulative")), vec![0.0, 7.0, 14.0]);
    }

    #[test]
    fn test_vaccination_series_grouped_and_sorted() {
        let report = run_analysis(&inputs(), false, &study()).unwrap();

        let first = series(&report, "vaccination_biontech_pfizer_1");
        assert_eq!(first.label, "BioNTech/Pfizer 1");
        assert_eq!(ys(first), vec![100.0, 200.0]);
        assert_eq!(ys(series(&report, "vaccination_biontech_pfizer_2")), vec![50.0]);
    }

    #[test]
    fn test_missing_baseline_year_fails_only_that_curve() {
        let mut study = study();
        study.baseline_year = 2015;
        let report = run_analysis(&inputs(), false, &study).unwrap();

        assert_eq!(report.failed_series.len(), 1);
        assert_eq!(report.failed_series[0].key, "excess_mortality_baseline_2015");
        assert!(report.failed_series[0].reason.contains("2015"));
        assert!(report.series.iter().all(|s| s.key != "excess_mortality_baseline_2015"));
        assert_eq!(ys(series(&report, "excess_mortality_cleaned_baseline_2020")), vec![5.0, 6.0, 13.0]);
        assert!(report.series.iter().any(|s| s.key == "covid_deaths_cumulative"));
    }

    /// Complete 2019 to 2021 export: 52, 53 and 52 week tokens. After the
    /// week corrections 2020 has 52 weeks and 2021 has 53.
    fn complete_export() -> RawInputs {
        let tokens = (1..=52)
            .map(|w| format!("KALW-2019{:02}", w))
            .chain((1..=53).map(|w| format!("KALW-2020{:02}", w)))
            .chain((1..=52).map(|w| format!("KALW-2021{:02}", w)));
        let mortality = tokens
            .map(|token| {
                let week = normalize_week(&token).unwrap();
                let deaths = if week.year == 2019 { 1500 } else { 1600 };
                WeeklyMortalityRecord::new(week.year, week.week, week.time, deaths)
            })
            .collect();

        RawInputs {
            mortality,
            covid_deaths: vec![CovidDeathRow {
                time: NaiveDate::from_ymd_opt(2020, 3, 22).unwrap(),
                age_group_id: Some(1),
                deaths: 21.0,
            }],
            vaccinations: Vec::new(),
        }
    }

    #[test]
    fn test_complete_export_with_position_alignment() {
        let report = run_analysis(&complete_export(), false, &StudyConfig::default()).unwrap();

        let failed: Vec<&str> = report.failed_series.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            failed,
            vec!["excess_mortality_baseline_2019", "excess_mortality_cleaned_baseline_2020"]
        );
        assert!(report.failed_series[0].reason.contains("105"));

        assert_eq!(series(&report, "mortality_2021").points.len(), 53);
        assert_eq!(series(&report, "mortality_2020").points.len(), 52);
        assert!(report.series.iter().any(|s| s.key == "mortality_cleaned_2021"));
        assert_eq!(ys(series(&report, "covid_deaths_cumulative")), vec![21.0]);
    }

    #[test]
    fn test_complete_export_with_calendar_week_alignment() {
        let study = StudyConfig {
            alignment: AlignmentPolicy::CalendarWeek,
            ..StudyConfig::default()
        };
        let report = run_analysis(&complete_export(), false, &study).unwrap();

        assert!(report.failed_series.is_empty());

        // 2020 weeks 1..52 and 2021 weeks 1..52; 2021/W53 has no baseline week
        let excess = series(&report, "excess_mortality_baseline_2019");
        assert_eq!(excess.points.len(), 104);
        assert_eq!(excess.points.last().unwrap().y, 104.0 * 100.0);

        let cleaned = series(&report, "excess_mortality_cleaned_baseline_2020");
        assert_eq!(cleaned.points.len(), 52);
    }

    #[test]
    fn test_missing_history_year_is_skipped() {
        let mut study = study();
        study.history_years = vec![2016, 2019];
        let report = run_analysis(&inputs(), false, &study).unwrap();
        assert!(report.series.iter().all(|s| s.key != "mortality_2016"));
        assert!(report.series.iter().any(|s| s.key == "mortality_2019"));
    }

    #[test]
    fn test_duplicate_week_without_aggregation() {
        let mut inputs = inputs();
        let duplicate = inputs.mortality[0].clone();
        inputs.mortality.push(duplicate);

        assert!(matches!(
            run_analysis(&inputs, false, &study()),
            Err(EtlError::DuplicateWeekError { year: 2019, week: 1 })
        ));

        let report = run_analysis(&inputs, true, &study()).unwrap();
        assert_eq!(report.weekly_records[0].death_count, 20);
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("BioNTech/Pfizer"), "biontech_pfizer");
        assert_eq!(slug("Moderna"), "moderna");
    }
}
