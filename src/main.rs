use anyhow::Context;
use clap::Parser;
use excess_mortality::core::ConfigProvider;
use excess_mortality::utils::error::ErrorSeverity;
use excess_mortality::utils::logger::{self, LogFormat};
use excess_mortality::utils::validation::Validate;
use excess_mortality::{AnalysisConfig, CliArgs, EtlEngine, LocalStorage, MortalityPipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let format = if args.log_json { LogFormat::Json } else { LogFormat::Compact };
    logger::init_logger(format, args.verbose);

    tracing::info!("Loading configuration from: {}", args.config);

    let mut config = AnalysisConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;
    args.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("Dry run, no input is read");
        return Ok(());
    }

    let storage = LocalStorage::new(".");
    let pipeline = MortalityPipeline::new(storage, config);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            println!("Series written to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn display_config_summary(config: &AnalysisConfig, args: &CliArgs) {
    let study = &config.study;
    let years = |years: &[i32]| years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(", ");

    println!("Configuration Summary:");
    println!("  Analysis: {}", config.analysis.name);
    println!("  Mortality: {}", config.mortality_file());
    println!("  COVID cases: {}", config.covid_cases_file());
    println!("  Vaccinations: {}", config.vaccinations_file());
    println!(
        "  Excess mortality: {} against {}",
        years(&study.target_years),
        study.baseline_year
    );
    println!(
        "  Excess mortality, COVID deaths deducted: {} against {}",
        years(&study.cleaned_target_years),
        study.cleaned_baseline_year
    );
    println!("  Alignment: {}", study.alignment);
    if config.mortality.subgroups.is_some() {
        println!("  Subgroups summed per week");
    }
    println!("  Output: {} ({})", config.output_path(), config.load.output_formats.join(", "));
    if let Some(bundle) = config.bundle_filename() {
        println!("  Bundle: {}", bundle);
    }
    if args.dry_run {
        println!("  DRY RUN MODE ENABLED");
    }
    println!();
}
