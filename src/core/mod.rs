pub mod aligner;
pub mod analysis;
pub mod deduction;
pub mod etl;
pub mod excess;
pub mod interpolation;
pub mod pipeline;
pub mod week;

pub use crate::domain::model::{AnalysisReport, RawInputs};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
