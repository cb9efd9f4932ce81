//! Serialization of the derived series for the rendering side.

use crate::domain::model::{AnalysisReport, LabeledSeries, WeeklyMortalityRecord};
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const WEEKLY_RECORDS_FILE: &str = "weekly_mortality.csv";
pub const SERIES_JSON_FILE: &str = "series.json";

/// `x,y` rows of one series.
pub fn series_csv(series: &LabeledSeries) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["x", "y"])?;
    for point in &series.points {
        writer.write_record([point.x.to_string(), point.y.to_string()])?;
    }
    writer.flush()?;
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

pub fn weekly_records_csv(records: &[WeeklyMortalityRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

pub fn series_json(series: &[LabeledSeries]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(series)?)
}

/// Named output files for the requested formats (`csv`, `json`).
pub fn render_outputs(report: &AnalysisReport, formats: &[String]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();

    if formats.iter().any(|f| f == "csv") {
        files.push((WEEKLY_RECORDS_FILE.to_string(), weekly_records_csv(&report.weekly_records)?));
        for series in &report.series {
            files.push((format!("{}.csv", series.key), series_csv(series)?));
        }
    }

    if formats.iter().any(|f| f == "json") {
        files.push((SERIES_JSON_FILE.to_string(), series_json(&report.series)?));
    }

    Ok(files)
}

pub fn zip_bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in files {
        zip.start_file(name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
