use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "excess-mortality")]
#[command(about = "Excess mortality against COVID-19 deaths and vaccination progress")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "mortality.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines instead of compact text
    #[arg(long)]
    pub log_json: bool,

    /// Override study.baseline_year
    #[arg(long)]
    pub baseline_year: Option<i32>,

    /// Override study.cleaned_baseline_year
    #[arg(long)]
    pub cleaned_baseline_year: Option<i32>,

    /// Override load.output_path
    #[arg(long)]
    pub output_path: Option<String>,

    /// Show what would be computed without reading the inputs
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Applies command line overrides onto a loaded configuration.
    pub fn apply_overrides(&self, config: &mut crate::config::AnalysisConfig) {
        if let Some(year) = self.baseline_year {
            tracing::info!("Baseline year overridden to: {}", year);
            config.study.baseline_year = year;
        }
        if let Some(year) = self.cleaned_baseline_year {
            tracing::info!("Cleaned baseline year overridden to: {}", year);
            config.study.cleaned_baseline_year = year;
        }
        if let Some(path) = &self.output_path {
            tracing::info!("Output path overridden to: {}", path);
            config.load.output_path = path.clone();
        }
    }
}
