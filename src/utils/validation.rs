use crate::utils::error::{EtlError, Result};

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "path is empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "path contains a NUL byte"));
    }
    Ok(())
}

/// Case-insensitive extension check, e.g. `Mortality.CSV` passes for `csv`.
pub fn validate_extension(field_name: &str, path: &str, allowed: &[&str]) -> Result<()> {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        Some(ext) => Err(invalid(
            field_name,
            path,
            format!("expected a .{} file, got .{}", allowed.join(" or ."), ext),
        )),
        None => Err(invalid(field_name, path, "file name has no extension")),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "value is empty"));
    }
    Ok(())
}

pub fn validate_non_empty_list<T>(field_name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(EtlError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

pub fn validate_year(field_name: &str, year: i32) -> Result<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(invalid(
            field_name,
            year,
            format!("year must be between {} and {}", MIN_YEAR, MAX_YEAR),
        ));
    }
    Ok(())
}

/// A baseline compared against itself would yield an all-zero curve.
pub fn validate_baseline_not_target(field_name: &str, baseline: i32, targets: &[i32]) -> Result<()> {
    if targets.contains(&baseline) {
        return Err(invalid(field_name, baseline, "baseline year cannot be a target year"));
    }
    Ok(())
}
