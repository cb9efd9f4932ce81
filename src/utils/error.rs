use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Parse error in {context}: '{value}' ({reason})")]
    ParseError {
        context: String,
        value: String,
        reason: String,
    },

    #[error("Length mismatch: target has {target} values, baseline has {baseline} ({reason})")]
    LengthMismatchError {
        target: usize,
        baseline: usize,
        reason: String,
    },

    #[error("No data in {source_name} for filter {filter}")]
    MissingDataError { source_name: String, filter: String },

    #[error("Series '{series}' is not ordered: {reason}")]
    SeriesOrderError { series: String, reason: String },

    #[error("Inconsistent subgroup records for {year}/W{week:02}: {reason}")]
    InconsistentGroupError { year: i32, week: u32, reason: String },

    #[error("Duplicate record for {year}/W{week:02}")]
    DuplicateWeekError { year: i32, week: u32 },

    #[error("Series not derived: {}; the other outputs were written to {output}", .failed.join(", "))]
    IncompleteOutputError { output: String, failed: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    InputData,
    Computation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Outputs were written but some series are missing.
    Medium,
    High,
    Critical,
}

impl EtlError {
    /// Attaches the input location to a parse error raised by a core parser.
    /// Other variants pass through untouched.
    pub fn in_row(self, file: &str, row: usize, column: &str) -> Self {
        match self {
            EtlError::ParseError { value, reason, .. } => EtlError::ParseError {
                context: format!("{} row {} column '{}'", file, row, column),
                value,
                reason,
            },
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ZipError(_) | EtlError::IoError(_) | EtlError::SerializationError(_) => {
                ErrorCategory::Io
            }
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::ParseError { .. }
            | EtlError::MissingDataError { .. }
            | EtlError::DuplicateWeekError { .. }
            | EtlError::InconsistentGroupError { .. } => ErrorCategory::InputData,
            EtlError::LengthMismatchError { .. }
            | EtlError::SeriesOrderError { .. }
            | EtlError::IncompleteOutputError { .. } => ErrorCategory::Computation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::IncompleteOutputError { .. } => ErrorSeverity::Medium,
            _ => match self.category() {
                ErrorCategory::Io => ErrorSeverity::Critical,
                _ => ErrorSeverity::High,
            },
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ZipError(_) => "Check that the output directory is writable",
            EtlError::IoError(_) => "Check that the input files exist and the paths in the configuration are correct",
            EtlError::SerializationError(_) => "Report the series that failed to serialize",
            EtlError::CsvError(_) => "Check that the input file is ';'-delimited and has a header row",
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Fix the configuration file and run again",
            EtlError::ParseError { .. } => "Fix or remove the malformed row in the input file",
            EtlError::LengthMismatchError { .. } => {
                "Set study.alignment = \"calendar_week\" to pair weeks by number (weeks missing from the baseline, such as week 53, are skipped)"
            }
            EtlError::MissingDataError { .. } => "Check the filter values (region, subgroup, years) against the input file",
            EtlError::SeriesOrderError { .. } => "Check the input file for out-of-order dates or decreasing cumulative totals",
            EtlError::InconsistentGroupError { .. } | EtlError::DuplicateWeekError { .. } => {
                "Tighten the mortality filters so that each calendar week appears once, or configure subgroups"
            }
            EtlError::IncompleteOutputError { .. } => {
                "Check the logged reason of each missing series; the written series are complete"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("Could not read or write files: {}", self),
            ErrorCategory::Configuration => format!("The configuration is invalid: {}", self),
            ErrorCategory::InputData => format!("The input data could not be used: {}", self),
            ErrorCategory::Computation => format!("The series could not be computed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_row_rewrites_parse_context() {
        let err = EtlError::ParseError {
            context: "week token".to_string(),
            value: "KALW-20x001".to_string(),
            reason: "expected KALW-YYYYWW".to_string(),
        }
        .in_row("mortality.csv", 7, "C-KALWOCHE-0");

        let message = err.to_string();
        assert!(message.contains("mortality.csv row 7 column 'C-KALWOCHE-0'"));
        assert!(message.contains("KALW-20x001"));
    }

    #[test]
    fn test_in_row_keeps_other_variants() {
        let err = EtlError::DuplicateWeekError { year: 2020, week: 3 }.in_row("m.csv", 1, "x");
        assert!(matches!(err, EtlError::DuplicateWeekError { year: 2020, week: 3 }));
    }

    #[test]
    fn test_categories() {
        let err = EtlError::LengthMismatchError {
            target: 5,
            baseline: 3,
            reason: "test".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Computation);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = EtlError::IoError(std::io::Error::other("disk"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("Could not read"));
    }

    #[test]
    fn test_incomplete_output_is_medium() {
        let err = EtlError::IncompleteOutputError {
            output: "out".to_string(),
            failed: vec!["excess_mortality_baseline_2019".to_string()],
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.to_string().contains("excess_mortality_baseline_2019"));
        assert!(err.to_string().contains("written to out"));
    }

    #[test]
    fn test_length_mismatch_suggests_calendar_week() {
        let err = EtlError::LengthMismatchError {
            target: 105,
            baseline: 52,
            reason: "test".to_string(),
        };
        assert!(err.recovery_suggestion().contains("calendar_week"));
    }
}
