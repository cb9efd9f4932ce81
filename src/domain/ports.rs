use crate::config::toml_config::{CovidConfig, MortalityConfig, StudyConfig, VaccinationConfig};
use crate::domain::model::{AnalysisReport, RawInputs};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn mortality_file(&self) -> String;
    fn covid_cases_file(&self) -> String;
    fn vaccinations_file(&self) -> String;
    fn mortality(&self) -> &MortalityConfig;
    fn covid(&self) -> &CovidConfig;
    fn vaccination(&self) -> &VaccinationConfig;
    fn study(&self) -> &StudyConfig;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    /// Bundle filename when outputs are zipped.
    fn bundle_filename(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RawInputs>;
    async fn transform(&self, data: RawInputs) -> Result<AnalysisReport>;
    async fn load(&self, result: AnalysisReport) -> Result<String>;
}
