pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::storage::LocalStorage;
pub use config::AnalysisConfig;
pub use core::{etl::EtlEngine, excess::AlignmentPolicy, pipeline::MortalityPipeline};
pub use utils::error::{EtlError, Result};
