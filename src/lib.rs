//! Quality-cut star selection for APOGEE-style spectroscopic surveys.
//!
//! ```no_run
//! use std::path::Path;
//! use starnet_select::{SurveyConfig, StarSelector, loader};
//!
//! let config = SurveyConfig::default();
//! let source = loader::load_file(&config.resolve(Path::new("apStar_combined.parquet")))?;
//! let bundle = StarSelector::new(config)?.get(&source, true)?;
//! println!("{} of {} stars selected", bundle.selected_count(), bundle.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod export;

pub use config::{QualityCuts, SurveyConfig};
pub use data::filter::{FilterObserver, LogObserver, Stage, StageCounts, StarSelector};
pub use data::model::{ColumnData, ResultBundle, Value};
pub use data::source::{DataSource, MemorySource};
pub use data::{columns, loader};
pub use error::SelectError;
