//! Data types shared by the analysis core, the orchestrator and the API

pub mod analysis;
pub mod audio;
pub mod batch;
pub mod file_path;

pub use analysis::{
    AnalysisResult, AnalysisSummary, ItemResult, Prediction, SummaryStat, TimelineEntry,
    TimelineParams,
};
pub use audio::{AudioBuffer, Window};
pub use batch::{BatchItem, BatchOptions, BatchReport, FailedItem};
pub use file_path::FilePathInfo;
