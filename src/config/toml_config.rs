use crate::core::excess::AlignmentPolicy;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

pub const VALID_OUTPUT_FORMATS: [&str; 2] = ["csv", "json"];
pub const DEFAULT_BUNDLE_FILENAME: &str = "mortality_series.zip";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub analysis: AnalysisMeta,
    pub inputs: InputsConfig,
    #[serde(default)]
    pub mortality: MortalityConfig,
    #[serde(default)]
    pub covid: CovidConfig,
    #[serde(default)]
    pub vaccination: VaccinationConfig,
    #[serde(default)]
    pub study: StudyConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMeta {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    /// Directory the three input paths are relative to.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    pub mortality: String,
    pub covid_cases: String,
    pub vaccinations: String,
}

impl InputsConfig {
    fn resolve(&self, file: &str) -> String {
        Path::new(&self.base_path).join(file).to_string_lossy().into_owned()
    }
}

fn default_base_path() -> String {
    ".".to_string()
}

/// Column names and row filters of the weekly mortality file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MortalityConfig {
    pub week_column: String,
    pub count_column: String,
    /// Exact-match `column = value` filters, all must hold.
    pub filters: BTreeMap<String, String>,
    /// Subgroups summed per week, e.g. age brackets.
    pub subgroups: Option<SubgroupConfig>,
}

impl Default for MortalityConfig {
    fn default() -> Self {
        Self {
            week_column: "C-KALWOCHE-0".to_string(),
            count_column: "F-ANZ-1".to_string(),
            filters: BTreeMap::from([
                ("C-BLWO-0".to_string(), "BLWO-0".to_string()),
                ("C-SEXWO-0".to_string(), "SEXWO-0".to_string()),
            ]),
            subgroups: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgroupConfig {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CovidConfig {
    pub time_column: String,
    pub region_column: String,
    pub region: String,
    pub age_group_column: String,
    pub deaths_column: String,
    /// Keep only age groups with an id up to and including this one.
    pub max_age_group_id: Option<u32>,
}

impl Default for CovidConfig {
    fn default() -> Self {
        Self {
            time_column: "Time".to_string(),
            region_column: "Bundesland".to_string(),
            region: "Österreich".to_string(),
            age_group_column: "AltersgruppeID".to_string(),
            deaths_column: "AnzahlTot".to_string(),
            max_age_group_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaccinationConfig {
    pub date_column: String,
    pub region_column: String,
    pub region: String,
    pub vaccine_column: String,
    pub dose_column: String,
    pub doses_column: String,
}

impl Default for VaccinationConfig {
    fn default() -> Self {
        Self {
            date_column: "date".to_string(),
            region_column: "state_name".to_string(),
            region: "Österreich".to_string(),
            vaccine_column: "vaccine".to_string(),
            dose_column: "dose_number".to_string(),
            doses_column: "doses_administered_cumulative".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Baseline for raw excess mortality against COVID deaths.
    pub baseline_year: i32,
    pub target_years: Vec<i32>,
    /// Baseline for excess mortality with COVID deaths deducted.
    pub cleaned_baseline_year: i32,
    pub cleaned_target_years: Vec<i32>,
    /// Years emitted as per-year cumulative mortality curves.
    pub history_years: Vec<i32>,
    pub alignment: AlignmentPolicy,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            baseline_year: 2019,
            target_years: vec![2020, 2021],
            cleaned_baseline_year: 2020,
            cleaned_target_years: vec![2021],
            history_years: (2016..=2021).collect(),
            alignment: AlignmentPolicy::Position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

fn default_output_formats() -> Vec<String> {
    VALID_OUTPUT_FORMATS.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

impl AnalysisConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("analysis.name", &self.analysis.name)?;

        validation::validate_path("inputs.base_path", &self.inputs.base_path)?;
        for (field, file) in [
            ("inputs.mortality", &self.inputs.mortality),
            ("inputs.covid_cases", &self.inputs.covid_cases),
            ("inputs.vaccinations", &self.inputs.vaccinations),
        ] {
            validation::validate_path(field, file)?;
            validation::validate_extension(field, file, &["csv"])?;
        }

        validation::validate_non_empty_string("mortality.week_column", &self.mortality.week_column)?;
        validation::validate_non_empty_string("mortality.count_column", &self.mortality.count_column)?;
        if let Some(subgroups) = &self.mortality.subgroups {
            validation::validate_non_empty_string("mortality.subgroups.column", &subgroups.column)?;
            validation::validate_non_empty_list("mortality.subgroups.values", &subgroups.values)?;
        }
        validation::validate_non_empty_string("covid.region", &self.covid.region)?;
        validation::validate_non_empty_string("vaccination.region", &self.vaccination.region)?;

        self.validate_study()?;

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_non_empty_list("load.output_formats", &self.load.output_formats)?;
        for format in &self.load.output_formats {
            if !VALID_OUTPUT_FORMATS.contains(&format.as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "load.output_formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_OUTPUT_FORMATS.join(", ")
                    ),
                });
            }
        }
        if let Some(filename) = self.bundle_filename() {
            validation::validate_extension("load.compression.filename", filename, &["zip"])?;
        }

        Ok(())
    }

    fn validate_study(&self) -> Result<()> {
        let study = &self.study;

        validation::validate_year("study.baseline_year", study.baseline_year)?;
        validation::validate_year("study.cleaned_baseline_year", study.cleaned_baseline_year)?;
        validation::validate_non_empty_list("study.target_years", &study.target_years)?;
        validation::validate_non_empty_list("study.cleaned_target_years", &study.cleaned_target_years)?;
        for (field, years) in [
            ("study.target_years", &study.target_years),
            ("study.cleaned_target_years", &study.cleaned_target_years),
            ("study.history_years", &study.history_years),
        ] {
            for year in years {
                validation::validate_year(field, *year)?;
            }
        }

        validation::validate_baseline_not_target("study.target_years", study.baseline_year, &study.target_years)?;
        validation::validate_baseline_not_target(
            "study.cleaned_target_years",
            study.cleaned_baseline_year,
            &study.cleaned_target_years,
        )?;

        Ok(())
    }

    pub fn bundle_filename(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_deref().unwrap_or(DEFAULT_BUNDLE_FILENAME))
    }
}

impl ConfigProvider for AnalysisConfig {
    fn mortality_file(&self) -> String {
        self.inputs.resolve(&self.inputs.mortality)
    }

    fn covid_cases_file(&self) -> String {
        self.inputs.resolve(&self.inputs.covid_cases)
    }

    fn vaccinations_file(&self) -> String {
        self.inputs.resolve(&self.inputs.vaccinations)
    }

    fn mortality(&self) -> &MortalityConfig {
        &self.mortality
    }

    fn covid(&self) -> &CovidConfig {
        &self.covid
    }

    fn vaccination(&self) -> &VaccinationConfig {
        &self.vaccination
    }

    fn study(&self) -> &StudyConfig {
        &self.study
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn bundle_filename(&self) -> Option<&str> {
        AnalysisConfig::bundle_filename(self)
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
