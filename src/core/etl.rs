use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting excess mortality run");

        // Extract
        tracing::info!("Reading input files...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!(
            "Read {} mortality rows, {} COVID rows, {} vaccination rows",
            raw_data.mortality.len(),
            raw_data.covid_deaths.len(),
            raw_data.vaccinations.len()
        );

        // Transform
        tracing::info!("Deriving series...");
        let report = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "Derived {} series from {} weekly records",
            report.series.len(),
            report.weekly_records.len()
        );
        if !report.failed_series.is_empty() {
            tracing::warn!(
                "{} series could not be derived, writing the others",
                report.failed_series.len()
            );
        }

        // Load
        tracing::info!("Writing outputs...");
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Output saved to: {} ({:?})", output_path, started.elapsed());

        Ok(output_path)
    }
}
