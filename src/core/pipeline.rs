use crate::adapters::{readers, writer};
use crate::core::analysis::run_analysis;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{AnalysisReport, RawInputs};
use crate::utils::error::{EtlError, Result};
use std::path::Path;

/// Reads the three input files through `Storage`, runs the analysis and
/// writes the derived series back through the same storage.
pub struct MortalityPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> MortalityPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for MortalityPipeline<S, C> {
    async fn extract(&self) -> Result<RawInputs> {
        let mortality_file = self.config.mortality_file();
        let data = self.storage.read_file(&mortality_file).await?;
        let mortality = readers::read_mortality(&data, &mortality_file, self.config.mortality())?;

        let covid_file = self.config.covid_cases_file();
        let data = self.storage.read_file(&covid_file).await?;
        let covid_deaths = readers::read_covid_deaths(&data, &covid_file, self.config.covid())?;

        let vaccinations_file = self.config.vaccinations_file();
        let data = self.storage.read_file(&vaccinations_file).await?;
        let vaccinations = readers::read_vaccinations(&data, &vaccinations_file, self.config.vaccination())?;

        tracing::debug!(
            "Extracted {} mortality, {} COVID and {} vaccination rows",
            mortality.len(),
            covid_deaths.len(),
            vaccinations.len()
        );

        Ok(RawInputs {
            mortality,
            covid_deaths,
            vaccinations,
        })
    }

    async fn transform(&self, data: RawInputs) -> Result<AnalysisReport> {
        let aggregate = self.config.mortality().subgroups.is_some();
        run_analysis(&data, aggregate, self.config.study())
    }

    async fn load(&self, result: AnalysisReport) -> Result<String> {
        let files = writer::render_outputs(&result, self.config.output_formats())?;

        let output = match self.config.bundle_filename() {
            Some(bundle) => {
                tracing::debug!("Creating ZIP file with {} files", files.len());
                let zip_data = writer::zip_bundle(&files)?;
                let path = self.output_file(bundle);
                tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
                self.storage.write_file(&path, &zip_data).await?;
                path
            }
            None => {
                for (name, data) in &files {
                    self.storage.write_file(&self.output_file(name), data).await?;
                }
                tracing::debug!("Wrote {} files", files.len());
                self.config.output_path().to_string()
            }
        };

        if !result.failed_series.is_empty() {
            return Err(EtlError::IncompleteOutputError {
                output,
                failed: result.failed_series.into_iter().map(|f| f.key).collect(),
            });
        }
        Ok(output)
    }
}
